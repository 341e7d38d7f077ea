//! Invocation requests.
//!
//! An [`InvocationRequest`] names the program, its argument string, whether
//! it needs APF authorization, and the ordered DD bindings it runs with. It
//! can be built in code or read from a JSON request document:
//!
//! ```json
//! {
//!   "program_name": "IEBGENER",
//!   "auth": false,
//!   "dds": [
//!     {"dd_dataset": {"dd_name": "sysut1", "data_set_name": "USER.INPUT"}},
//!     {"dd_sysout":  {"dd_name": "sysprint", "return_content": "text"}}
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::binding::{validate_ddname, Binding};
use crate::error::{MvsRawError, Result};

/// A program to run and the DD bindings to run it with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvocationRequest {
    /// Program (load module) name.
    #[serde(rename = "program_name")]
    pub program: String,
    /// Argument string passed to the program verbatim.
    #[serde(rename = "parms", default)]
    pub args: Option<String>,
    /// Run through the authorized launcher.
    #[serde(rename = "auth", default)]
    pub authorized: bool,
    /// Ask the launcher for verbose messages.
    #[serde(default)]
    pub verbose: bool,
    /// Ask the launcher for debug messages.
    #[serde(default)]
    pub debug: bool,
    /// Ordered DD bindings.
    #[serde(rename = "dds", default)]
    pub bindings: Vec<Binding>,
}

impl InvocationRequest {
    /// A request to run `program` with no arguments and no bindings.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: None,
            authorized: false,
            verbose: false,
            debug: false,
            bindings: Vec::new(),
        }
    }

    /// Set the argument string.
    pub fn args(mut self, args: impl Into<String>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Run authorized.
    pub fn authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    /// Set the launcher verbose flag.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the launcher debug flag.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Append a binding.
    pub fn bind(mut self, binding: impl Into<Binding>) -> Self {
        self.bindings.push(binding.into());
        self
    }

    /// Parse a JSON request document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MvsRawError::InvalidRequest {
            reason: format!("malformed request document: {e}"),
        })
    }

    /// Read a JSON request document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MvsRawError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| MvsRawError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Check the program name, every binding, and DD name uniqueness.
    pub fn validate(&self) -> Result<()> {
        let program = self.program.trim();
        if program.is_empty() {
            return Err(MvsRawError::InvalidRequest {
                reason: "THE z/OS PROGRAM CAN NOT BE EMPTY.".to_string(),
            });
        }
        validate_ddname(program).map_err(|reason| MvsRawError::InvalidRequest {
            reason: format!("program name '{program}' {reason}"),
        })?;

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            binding.validate()?;
            if !seen.insert(binding.name().to_uppercase()) {
                return Err(MvsRawError::invalid_binding(
                    binding.name(),
                    "DD name is used more than once",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{DatasetBinding, InlineBinding, SysoutBinding};

    #[test]
    fn builder_sets_fields() {
        let req = InvocationRequest::new("IDCAMS")
            .args("MARGINS(1,72)")
            .authorized(true)
            .bind(SysoutBinding::new("SYSPRINT"))
            .bind(InlineBinding::text("SYSIN", " LISTCAT"));
        assert_eq!(req.args.as_deref(), Some("MARGINS(1,72)"));
        assert!(req.authorized);
        assert_eq!(req.bindings.len(), 2);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_program_rejected() {
        let err = InvocationRequest::new("  ").validate().unwrap_err();
        match err {
            MvsRawError::InvalidRequest { reason } => {
                assert_eq!(reason, "THE z/OS PROGRAM CAN NOT BE EMPTY.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_program_name_rejected() {
        let err = InvocationRequest::new("PROGRAM99").validate().unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidRequest { .. }));
    }

    #[test]
    fn duplicate_dd_names_rejected_case_insensitively() {
        let req = InvocationRequest::new("IEBGENER")
            .bind(DatasetBinding::new("SYSUT1", "A.B"))
            .bind(SysoutBinding::new("sysut1"));
        let err = req.validate().unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidBinding { ref name, .. } if name == "sysut1"));
    }

    #[test]
    fn parse_request_document() {
        let req = InvocationRequest::from_json(
            r#"{
                "program_name": "IDCAMS",
                "parms": "MARGINS(1,72)",
                "auth": true,
                "dds": [
                    {"dd_dataset": {"dd_name": "sysut1", "data_set_name": "A.B:C.D", "disposition": "SHR"}},
                    {"dd_input": {"dd_name": "sysin", "dd_content": ["  LISTCAT ENT('A.B')"]}},
                    {"dd_sysout": {"dd_name": "sysprint", "sysout_class": "*", "return_content": "text"}},
                    {"dd_uss": {"dd_name": "sysut2", "path": "/tmp/out.txt", "path_status_group": ["OCREAT"]}},
                    {"dd_dummy": {"dd_name": "sysut3"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(req.program, "IDCAMS");
        assert!(req.authorized);
        assert!(!req.verbose);
        assert_eq!(req.bindings.len(), 5);
        match &req.bindings[0] {
            Binding::Dataset(dd) => assert_eq!(dd.targets, ["A.B", "C.D"]),
            other => panic!("expected data set, got {other:?}"),
        }
        assert!(req.validate().is_ok());
    }

    #[test]
    fn malformed_document_is_invalid_request() {
        let err = InvocationRequest::from_json(r#"{"dds": []}"#).unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidRequest { .. }));

        let err = InvocationRequest::from_json(
            r#"{"program_name": "X", "dds": [{"dd_tape": {"dd_name": "T"}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidRequest { .. }));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = InvocationRequest::from_file("/no/such/request.json").unwrap_err();
        assert!(matches!(err, MvsRawError::Config { .. }));
    }
}
