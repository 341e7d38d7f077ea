//! `dd_uss` bindings: UNIX file paths with PATHOPTS/PATHMODE/FILEDATA.

use std::path::PathBuf;

use serde::Deserialize;

use super::{deserialize_keywords, ReturnContent};
use crate::error::{MvsRawError, Result};

/// PATHDISP: what happens to the file after the program ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PathDisposition {
    /// Keep the file.
    Keep,
    /// Delete the file.
    Delete,
}

impl PathDisposition {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "delete" | "del" => Some(Self::Delete),
            _ => None,
        }
    }
}

keyword_enum!(PathDisposition, "path disposition");

/// Permission bits for PATHMODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PathMode {
    /// SIRUSR: owner read.
    Sirusr,
    /// SIWUSR: owner write.
    Siwusr,
    /// SIXUSR: owner execute.
    Sixusr,
    /// SIRWXU: owner read/write/execute.
    Sirwxu,
    /// SIRGRP: group read.
    Sirgrp,
    /// SIWGRP: group write.
    Siwgrp,
    /// SIXGRP: group execute.
    Sixgrp,
    /// SIRWXG: group read/write/execute.
    Sirwxg,
    /// SIROTH: other read.
    Siroth,
    /// SIWOTH: other write.
    Siwoth,
    /// SIXOTH: other execute.
    Sixoth,
    /// SIRWXO: other read/write/execute.
    Sirwxo,
    /// SISUID: set user id on execution.
    Sisuid,
    /// SISGID: set group id on execution.
    Sisgid,
}

impl PathMode {
    /// Octal permission bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Sirusr => 0o400,
            Self::Siwusr => 0o200,
            Self::Sixusr => 0o100,
            Self::Sirwxu => 0o700,
            Self::Sirgrp => 0o040,
            Self::Siwgrp => 0o020,
            Self::Sixgrp => 0o010,
            Self::Sirwxg => 0o070,
            Self::Siroth => 0o004,
            Self::Siwoth => 0o002,
            Self::Sixoth => 0o001,
            Self::Sirwxo => 0o007,
            Self::Sisuid => 0o4000,
            Self::Sisgid => 0o2000,
        }
    }

    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SIRUSR" => Some(Self::Sirusr),
            "SIWUSR" => Some(Self::Siwusr),
            "SIXUSR" => Some(Self::Sixusr),
            "SIRWXU" => Some(Self::Sirwxu),
            "SIRGRP" => Some(Self::Sirgrp),
            "SIWGRP" => Some(Self::Siwgrp),
            "SIXGRP" => Some(Self::Sixgrp),
            "SIRWXG" => Some(Self::Sirwxg),
            "SIROTH" => Some(Self::Siroth),
            "SIWOTH" => Some(Self::Siwoth),
            "SIXOTH" => Some(Self::Sixoth),
            "SIRWXO" => Some(Self::Sirwxo),
            "SISUID" => Some(Self::Sisuid),
            "SISGID" => Some(Self::Sisgid),
            _ => None,
        }
    }
}

keyword_enum!(PathMode, "path mode");

/// Access group of PATHOPTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PathAccess {
    /// ORDONLY.
    ReadOnly,
    /// OWRONLY.
    WriteOnly,
    /// ORDWR.
    #[default]
    ReadWrite,
}

impl PathAccess {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read_only" | "ordonly" => Some(Self::ReadOnly),
            "write_only" | "owronly" => Some(Self::WriteOnly),
            "read_write" | "ordwr" => Some(Self::ReadWrite),
            _ => None,
        }
    }
}

keyword_enum!(PathAccess, "path access group");

/// Status group of PATHOPTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PathStatus {
    /// OAPPEND: append writes.
    Oappend,
    /// OCREAT: create the file if it does not exist.
    Ocreat,
    /// OEXCL: fail if the file exists (with OCREAT).
    Oexcl,
    /// ONOCTTY: do not make a terminal the controlling terminal.
    Onoctty,
    /// ONONBLOCK: non-blocking open.
    Ononblock,
    /// OSYNC: synchronous writes.
    Osync,
    /// OTRUNC: truncate on open.
    Otrunc,
}

impl PathStatus {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OAPPEND" => Some(Self::Oappend),
            "OCREAT" => Some(Self::Ocreat),
            "OEXCL" => Some(Self::Oexcl),
            "ONOCTTY" => Some(Self::Onoctty),
            "ONONBLOCK" => Some(Self::Ononblock),
            "OSYNC" => Some(Self::Osync),
            "OTRUNC" => Some(Self::Otrunc),
            _ => None,
        }
    }
}

keyword_enum!(PathStatus, "path status");

/// FILEDATA: how the file content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FileData {
    /// No conversion.
    Binary,
    /// Text with line delimiters.
    Text,
    /// Record-oriented.
    Record,
}

impl FileData {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "binary" => Some(Self::Binary),
            "text" => Some(Self::Text),
            "record" => Some(Self::Record),
            _ => None,
        }
    }
}

keyword_enum!(FileData, "file data");

/// `dd_uss`: a UNIX file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UssBinding {
    /// DD name.
    #[serde(rename = "dd_name")]
    pub name: String,
    /// Absolute file path.
    pub path: PathBuf,
    /// Disposition after normal termination.
    #[serde(rename = "path_disposition_normal", default)]
    pub normal: Option<PathDisposition>,
    /// Disposition after abnormal termination.
    #[serde(rename = "path_disposition_abnormal", default)]
    pub abnormal: Option<PathDisposition>,
    /// Permission bits for a created file.
    #[serde(rename = "path_mode", default, deserialize_with = "deserialize_keywords")]
    pub mode: Vec<PathMode>,
    /// Access group.
    #[serde(rename = "path_access_group", default)]
    pub access: PathAccess,
    /// Status flags.
    #[serde(rename = "path_status_group", default, deserialize_with = "deserialize_keywords")]
    pub status: Vec<PathStatus>,
    /// Data representation.
    #[serde(default)]
    pub file_data: Option<FileData>,
    /// Content returned in the report.
    #[serde(default)]
    pub return_content: ReturnContent,
}

impl UssBinding {
    /// Binding to an existing file, opened read/write.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            normal: None,
            abnormal: None,
            mode: Vec::new(),
            access: PathAccess::ReadWrite,
            status: Vec::new(),
            file_data: None,
            return_content: ReturnContent::None,
        }
    }

    /// Set PATHOPTS status flags.
    pub fn status(mut self, status: impl IntoIterator<Item = PathStatus>) -> Self {
        self.status = status.into_iter().collect();
        self
    }

    /// Set PATHMODE bits.
    pub fn mode(mut self, mode: impl IntoIterator<Item = PathMode>) -> Self {
        self.mode = mode.into_iter().collect();
        self
    }

    /// Set PATHDISP.
    pub fn dispositions(
        mut self,
        normal: Option<PathDisposition>,
        abnormal: Option<PathDisposition>,
    ) -> Self {
        self.normal = normal;
        self.abnormal = abnormal;
        self
    }

    /// Set the returned content mode.
    pub fn return_content(mut self, mode: ReturnContent) -> Self {
        self.return_content = mode;
        self
    }

    /// Combined PATHMODE permission bits (0o600 when none are given).
    pub fn mode_bits(&self) -> u32 {
        if self.mode.is_empty() {
            0o600
        } else {
            self.mode.iter().fold(0, |bits, m| bits | m.bits())
        }
    }

    /// Whether OCREAT was requested.
    pub fn creates(&self) -> bool {
        self.status.contains(&PathStatus::Ocreat)
    }

    /// Whether either disposition asks for deletion.
    pub fn deletes(&self) -> bool {
        self.normal == Some(PathDisposition::Delete)
            || self.abnormal == Some(PathDisposition::Delete)
    }

    pub(super) fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| MvsRawError::invalid_binding(&self.name, reason);
        if !self.path.is_absolute() {
            return Err(invalid("path must be absolute"));
        }
        if self.status.len() > 6 {
            return Err(invalid("at most 6 path status flags may be given"));
        }
        if self.status.contains(&PathStatus::Oexcl) && !self.creates() {
            return Err(invalid("OEXCL requires OCREAT"));
        }
        if self.status.contains(&PathStatus::Oappend) && self.status.contains(&PathStatus::Otrunc) {
            return Err(invalid("OAPPEND and OTRUNC are mutually exclusive"));
        }
        Ok(())
    }
}
