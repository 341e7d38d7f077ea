//! Invocation report: return code, per-DD results and cleanup warnings.

use serde::Serialize;

use crate::cleanup::DeletionWarning;

/// Message for a plan that was not executed.
pub const CHECK_MODE_MESSAGE: &str = "CHECK MODE: PROGRAM NOT RUN.";

/// The program's return code as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnCode {
    /// Raw exit code (-1 when there was none).
    pub code: i32,
    /// The code as text.
    pub msg: String,
    /// The code, when the program produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_code: Option<i32>,
    /// Human-readable summary.
    pub msg_txt: String,
}

impl ReturnCode {
    /// Return code for a finished program.
    pub fn from_exit(code: i32) -> Self {
        let msg_txt = match code {
            0 => "THE z/OS PROGRAM EXECUTION SUCCEED.".to_string(),
            c if c > 0 => format!("THE z/OS PROGRAM EXECUTION ENDED WITH RETURN CODE {c}."),
            _ => "THE z/OS PROGRAM TERMINATED WITHOUT A RETURN CODE.".to_string(),
        };
        Self {
            code,
            msg: code.to_string(),
            msg_code: (code >= 0).then_some(code),
            msg_txt,
        }
    }

    /// Return code of a check-mode plan.
    pub fn not_run() -> Self {
        Self {
            code: 0,
            msg: "0".to_string(),
            msg_code: Some(0),
            msg_txt: CHECK_MODE_MESSAGE.to_string(),
        }
    }

    /// Whether the program ended with return code 0.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Result for one DD target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingResult {
    /// DD name.
    #[serde(rename = "ddname")]
    pub name: String,
    /// Target actually bound (data set name, path, `stdout`, `dummy`...).
    #[serde(rename = "dataset")]
    pub target: String,
    /// Content, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Number of records.
    pub record_count: u64,
    /// Number of bytes.
    pub byte_count: u64,
}

/// Everything one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    /// Whether the program was run.
    pub changed: bool,
    /// Return code.
    pub ret_code: ReturnCode,
    /// Per-DD results in binding order.
    #[serde(rename = "ddnames")]
    pub dd_names: Vec<BindingResult>,
    /// Resources cleanup could not remove.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DeletionWarning>,
    /// Launcher argument vector.
    pub invocation: Vec<String>,
}

impl InvocationReport {
    /// Results for one DD name.
    pub fn results_for<'a>(&'a self, ddname: &'a str) -> impl Iterator<Item = &'a BindingResult> {
        self.dd_names
            .iter()
            .filter(move |r| r.name.eq_ignore_ascii_case(ddname))
    }

    /// Whether cleanup left something behind.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
