//! DD binding model: the five kinds of data definition a program runs with.
//!
//! A [`Binding`] is a closed sum over the DD kinds the launcher understands:
//!
//! - **`dd_dataset`**: one or more cataloged data sets (colon-separated)
//! - **`dd_input`**: inline content, like `DD *`
//! - **`dd_sysout`**: program output routed to a SYSOUT class
//! - **`dd_uss`**: a UNIX System Services file
//! - **`dd_dummy`**: `DD DUMMY`, no data at all
//!
//! The serde representation is the request document format, so a list of
//! bindings can be read directly from JSON.

/// Implements case-insensitive keyword parsing for a `from_str_opt` enum.
macro_rules! keyword_enum {
    ($ty:ty, $what:literal) => {
        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
                Self::from_str_opt(&value)
                    .ok_or_else(|| format!("invalid {} '{}'", $what, value))
            }
        }
    };
}

pub mod dataset;
pub mod uss;

pub use dataset::{
    AllocationAttributes, DatasetBinding, DatasetStatus, DatasetType, DispositionAction,
    EncryptionKey, KeyEncoding, RecordFormat, SpaceType,
};
pub use uss::{FileData, PathAccess, PathDisposition, PathMode, PathStatus, UssBinding};

use serde::{Deserialize, Deserializer};

use crate::error::{MvsRawError, Result};

/// How the content behind a DD is returned in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ReturnContent {
    /// Do not return content.
    #[default]
    None,
    /// Return content as text.
    Text,
    /// Return content base64-encoded.
    Base64,
}

impl ReturnContent {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "text" => Some(Self::Text),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    /// Whether any content is requested.
    pub fn is_requested(self) -> bool {
        self != Self::None
    }
}

keyword_enum!(ReturnContent, "return_content");

/// One named DD binding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Binding {
    /// Cataloged data set(s).
    #[serde(rename = "dd_dataset")]
    Dataset(DatasetBinding),
    /// Inline input content.
    #[serde(rename = "dd_input")]
    InlineInput(InlineBinding),
    /// SYSOUT class.
    #[serde(rename = "dd_sysout")]
    Sysout(SysoutBinding),
    /// UNIX file.
    #[serde(rename = "dd_uss")]
    UssFile(UssBinding),
    /// DD DUMMY.
    #[serde(rename = "dd_dummy")]
    Dummy(DummyBinding),
}

impl Binding {
    /// The DD name.
    pub fn name(&self) -> &str {
        match self {
            Self::Dataset(dd) => &dd.name,
            Self::InlineInput(dd) => &dd.name,
            Self::Sysout(dd) => &dd.name,
            Self::UssFile(dd) => &dd.name,
            Self::Dummy(dd) => &dd.name,
        }
    }

    /// Requested content materialization.
    pub fn return_content(&self) -> ReturnContent {
        match self {
            Self::Dataset(dd) => dd.return_content,
            Self::InlineInput(dd) => dd.return_content,
            Self::Sysout(dd) => dd.return_content,
            Self::UssFile(dd) => dd.return_content,
            Self::Dummy(_) => ReturnContent::None,
        }
    }

    /// Document keyword of this binding kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dataset(_) => "dd_dataset",
            Self::InlineInput(_) => "dd_input",
            Self::Sysout(_) => "dd_sysout",
            Self::UssFile(_) => "dd_uss",
            Self::Dummy(_) => "dd_dummy",
        }
    }

    /// Check the DD name and the kind-specific attributes.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        validate_ddname(name).map_err(|reason| MvsRawError::invalid_binding(name, reason))?;
        match self {
            Self::Dataset(dd) => dd.validate(),
            Self::UssFile(dd) => dd.validate(),
            Self::Sysout(dd) => dd.validate(),
            Self::InlineInput(_) | Self::Dummy(_) => Ok(()),
        }
    }

    /// A `DD DUMMY` binding.
    pub fn dummy(name: impl Into<String>) -> Self {
        Self::Dummy(DummyBinding { name: name.into() })
    }
}

impl From<DatasetBinding> for Binding {
    fn from(dd: DatasetBinding) -> Self {
        Self::Dataset(dd)
    }
}

impl From<InlineBinding> for Binding {
    fn from(dd: InlineBinding) -> Self {
        Self::InlineInput(dd)
    }
}

impl From<SysoutBinding> for Binding {
    fn from(dd: SysoutBinding) -> Self {
        Self::Sysout(dd)
    }
}

impl From<UssBinding> for Binding {
    fn from(dd: UssBinding) -> Self {
        Self::UssFile(dd)
    }
}

// ---------------------------------------------------------------------------
//  Inline input
// ---------------------------------------------------------------------------

/// Inline content: one string, or lines joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InlineContent {
    /// Literal text.
    Text(String),
    /// Ordered lines.
    Lines(Vec<String>),
}

impl InlineContent {
    /// The content as one string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }

    /// Length of the longest line.
    pub fn longest_line(&self) -> usize {
        match self {
            Self::Text(text) => text.lines().map(str::len).max().unwrap_or(0),
            Self::Lines(lines) => lines.iter().map(String::len).max().unwrap_or(0),
        }
    }
}

/// `dd_input`: content supplied directly in the request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InlineBinding {
    /// DD name.
    #[serde(rename = "dd_name")]
    pub name: String,
    /// The inline data.
    #[serde(rename = "dd_content")]
    pub content: InlineContent,
    /// Content returned in the report.
    #[serde(default)]
    pub return_content: ReturnContent,
}

impl InlineBinding {
    /// Inline input from a single string.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: InlineContent::Text(text.into()),
            return_content: ReturnContent::None,
        }
    }

    /// Inline input from lines.
    pub fn lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            content: InlineContent::Lines(lines.into_iter().map(Into::into).collect()),
            return_content: ReturnContent::None,
        }
    }

    /// Set the returned content mode.
    pub fn return_content(mut self, mode: ReturnContent) -> Self {
        self.return_content = mode;
        self
    }
}

// ---------------------------------------------------------------------------
//  Sysout
// ---------------------------------------------------------------------------

/// SYSOUT class that maps to the launcher's standard output.
pub const STDOUT_CLASS: char = '*';

/// `dd_sysout`: output written to a SYSOUT class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SysoutBinding {
    /// DD name.
    #[serde(rename = "dd_name")]
    pub name: String,
    /// Output class (A-Z, 0-9, `*`).
    #[serde(rename = "sysout_class", default = "default_sysout_class")]
    pub class: char,
    /// Content returned in the report.
    #[serde(default)]
    pub return_content: ReturnContent,
}

fn default_sysout_class() -> char {
    STDOUT_CLASS
}

impl SysoutBinding {
    /// SYSOUT=* binding.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: STDOUT_CLASS,
            return_content: ReturnContent::None,
        }
    }

    /// Route to another class.
    pub fn class(mut self, class: char) -> Self {
        self.class = class;
        self
    }

    /// Set the returned content mode.
    pub fn return_content(mut self, mode: ReturnContent) -> Self {
        self.return_content = mode;
        self
    }

    /// Whether the output lands on the launcher's stdout.
    pub fn is_stdout(&self) -> bool {
        self.class == STDOUT_CLASS
    }

    fn validate(&self) -> Result<()> {
        if self.class == STDOUT_CLASS || self.class.is_ascii_alphanumeric() {
            Ok(())
        } else {
            Err(MvsRawError::invalid_binding(
                &self.name,
                format!("invalid SYSOUT class '{}'", self.class),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
//  Dummy
// ---------------------------------------------------------------------------

/// `dd_dummy`: no data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DummyBinding {
    /// DD name.
    #[serde(rename = "dd_name")]
    pub name: String,
}

// ---------------------------------------------------------------------------
//  Name validation and document helpers
// ---------------------------------------------------------------------------

/// Validate a DD name or program name (1-8 characters, starting with a
/// letter or national character).
pub(crate) fn validate_ddname(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() || name.len() > 8 {
        return Err("must be 1-8 characters".to_string());
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && !is_national(first) {
            return Err("must start with a letter or national character (@#$)".to_string());
        }
    }
    for ch in chars {
        if !ch.is_ascii_alphanumeric() && !is_national(ch) {
            return Err(format!("invalid character '{ch}'"));
        }
    }
    Ok(())
}

fn is_national(ch: char) -> bool {
    matches!(ch, '@' | '#' | '$')
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// Split a string-or-list field on `sep`, dropping empty items.
fn split_items(values: Vec<String>, sep: char) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(sep))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Deserialize a string (or list of strings) of colon-separated names.
pub(crate) fn deserialize_colon_list<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(split_items(OneOrMany::deserialize(de)?.into_vec(), ':'))
}

/// Deserialize a string (or list of strings) of comma-separated items.
pub(crate) fn deserialize_comma_list<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(split_items(OneOrMany::deserialize(de)?.into_vec(), ','))
}

/// Deserialize a comma-separated keyword list into enum values.
pub(crate) fn deserialize_keywords<'de, D, T>(de: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<String, Error = String>,
{
    deserialize_comma_list(de)?
        .into_iter()
        .map(|item| T::try_from(item).map_err(serde::de::Error::custom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_content_is_case_insensitive() {
        assert_eq!(ReturnContent::from_str_opt("TEXT"), Some(ReturnContent::Text));
        assert_eq!(ReturnContent::from_str_opt("Base64"), Some(ReturnContent::Base64));
        assert_eq!(ReturnContent::from_str_opt("none"), Some(ReturnContent::None));
        assert_eq!(ReturnContent::from_str_opt("hex"), None);
    }

    #[test]
    fn inline_lines_join_with_newline() {
        let dd = InlineBinding::lines("SYSIN", ["LINE 1", "LINE 2"]);
        assert_eq!(dd.content.to_text(), "LINE 1\nLINE 2");
        assert_eq!(dd.content.longest_line(), 6);
    }

    #[test]
    fn inline_text_and_lines_are_equivalent() {
        let a = InlineBinding::text("SYSIN", "A\nB");
        let b = InlineBinding::lines("SYSIN", ["A", "B"]);
        assert_eq!(a.content.to_text(), b.content.to_text());
    }

    #[test]
    fn sysout_defaults_to_stdout() {
        let dd = SysoutBinding::new("SYSPRINT");
        assert!(dd.is_stdout());
        assert!(!dd.class('A').is_stdout());
    }

    #[test]
    fn ddname_validation() {
        assert!(validate_ddname("SYSPRINT").is_ok());
        assert!(validate_ddname("sysin").is_ok());
        assert!(validate_ddname("$DD#1").is_ok());
        assert!(validate_ddname("").is_err());
        assert!(validate_ddname("TOOLONGDD").is_err());
        assert!(validate_ddname("1DD").is_err());
        assert!(validate_ddname("DD-1").is_err());
    }

    #[test]
    fn binding_accessors_cover_every_kind() {
        let bindings: Vec<Binding> = vec![
            DatasetBinding::new("SYSUT1", "A.B").into(),
            InlineBinding::text("SYSIN", "X").into(),
            SysoutBinding::new("SYSPRINT").into(),
            UssBinding::new("SYSUT2", "/tmp/x").into(),
            Binding::dummy("SYSUT3"),
        ];
        let kinds: Vec<&str> = bindings.iter().map(Binding::kind).collect();
        assert_eq!(kinds, ["dd_dataset", "dd_input", "dd_sysout", "dd_uss", "dd_dummy"]);
        assert_eq!(bindings[4].return_content(), ReturnContent::None);
    }

    #[test]
    fn deserialize_binding_document() {
        let json = r#"[
            {"dd_sysout": {"dd_name": "sysprint", "return_content": "TEXT"}},
            {"dd_input": {"dd_name": "sysin", "dd_content": ["A", "B"]}},
            {"dd_input": {"dd_name": "sysin2", "dd_content": "single"}},
            {"dd_dummy": {"dd_name": "sysut3"}}
        ]"#;
        let bindings: Vec<Binding> = serde_json::from_str(json).unwrap();
        assert_eq!(bindings.len(), 4);
        match &bindings[0] {
            Binding::Sysout(dd) => {
                assert!(dd.is_stdout());
                assert_eq!(dd.return_content, ReturnContent::Text);
            }
            other => panic!("expected sysout, got {other:?}"),
        }
        match &bindings[2] {
            Binding::InlineInput(dd) => assert_eq!(dd.content.to_text(), "single"),
            other => panic!("expected inline input, got {other:?}"),
        }
    }

    #[test]
    fn invalid_sysout_class_rejected() {
        let dd: Binding = SysoutBinding::new("SYSOUT").class('%').into();
        assert!(matches!(dd.validate(), Err(MvsRawError::InvalidBinding { .. })));
    }
}
