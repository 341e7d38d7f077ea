//! `dd_dataset` bindings: data set names, disposition and allocation attributes.

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::{deserialize_colon_list, deserialize_comma_list, ReturnContent};
use crate::error::{MvsRawError, Result};

/// Data set status (DISP first sub-parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DatasetStatus {
    /// New data set to be created before the run.
    New,
    /// Existing data set, shared access.
    #[default]
    Shr,
    /// Existing data set, extend mode.
    Mod,
    /// Existing data set, exclusive access.
    Old,
}

impl DatasetStatus {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(Self::New),
            "shr" => Some(Self::Shr),
            "mod" => Some(Self::Mod),
            "old" => Some(Self::Old),
            _ => None,
        }
    }
}

keyword_enum!(DatasetStatus, "disposition");

/// What happens to a data set after the program ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DispositionAction {
    /// Delete the data set.
    Delete,
    /// Keep the data set.
    Keep,
    /// Catalog the data set.
    Catalog,
    /// Uncatalog the data set.
    Uncatalog,
}

impl DispositionAction {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "delete" | "del" => Some(Self::Delete),
            "keep" => Some(Self::Keep),
            "catalog" | "catlg" | "catlog" => Some(Self::Catalog),
            "uncatalog" | "uncatlg" => Some(Self::Uncatalog),
            _ => None,
        }
    }
}

keyword_enum!(DispositionAction, "disposition action");

/// Unit of the primary/secondary space quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SpaceType {
    /// Tracks.
    Trk,
    /// Cylinders.
    Cyl,
    /// Blocks of `block_size` bytes.
    Blklgth,
    /// Records of `record_length` bytes.
    Reclgth,
}

impl SpaceType {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trk" => Some(Self::Trk),
            "cyl" => Some(Self::Cyl),
            "blklgth" => Some(Self::Blklgth),
            "reclgth" => Some(Self::Reclgth),
            _ => None,
        }
    }
}

keyword_enum!(SpaceType, "space type");

/// Data set organization / type of a new data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DatasetType {
    /// PDSE.
    Library,
    /// Partitioned data set.
    Pds,
    /// Hierarchical file system data set.
    Hfs,
    /// FIFO pipe.
    Pipe,
    /// Extended format required.
    ExtReq,
    /// Extended format preferred.
    ExtPref,
    /// Large format sequential.
    Large,
    /// Basic format sequential.
    Basic,
}

impl DatasetType {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "library" => Some(Self::Library),
            "pds" => Some(Self::Pds),
            "hfs" => Some(Self::Hfs),
            "pipe" => Some(Self::Pipe),
            "extreq" => Some(Self::ExtReq),
            "extpref" => Some(Self::ExtPref),
            "large" => Some(Self::Large),
            "basic" => Some(Self::Basic),
            _ => None,
        }
    }

    /// Whether members live inside the data set.
    pub fn is_partitioned(self) -> bool {
        matches!(self, Self::Library | Self::Pds)
    }
}

keyword_enum!(DatasetType, "data set type");

/// Record format (RECFM).
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum RecordFormat {
    U,
    UT,
    V,
    VB,
    VS,
    VT,
    VBS,
    VBT,
    VBST,
    F,
    #[default]
    FB,
    FT,
    FBT,
    D,
    DB,
    DS,
    DBS,
}

impl RecordFormat {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "U" => Some(Self::U),
            "UT" => Some(Self::UT),
            "V" => Some(Self::V),
            "VB" => Some(Self::VB),
            "VS" => Some(Self::VS),
            "VT" => Some(Self::VT),
            "VBS" => Some(Self::VBS),
            "VBT" => Some(Self::VBT),
            "VBST" => Some(Self::VBST),
            "F" => Some(Self::F),
            "FB" => Some(Self::FB),
            "FT" => Some(Self::FT),
            "FBT" => Some(Self::FBT),
            "D" => Some(Self::D),
            "DB" => Some(Self::DB),
            "DS" => Some(Self::DS),
            "DBS" => Some(Self::DBS),
            _ => None,
        }
    }

    /// Fixed-length records.
    pub fn is_fixed(self) -> bool {
        matches!(self, Self::F | Self::FB | Self::FT | Self::FBT)
    }

    /// Undefined-length records.
    pub fn is_undefined(self) -> bool {
        matches!(self, Self::U | Self::UT)
    }

    /// LRECL used when none is given: 80 fixed, 137 variable, 0 undefined.
    pub fn default_record_length(self) -> u32 {
        if self.is_fixed() {
            80
        } else if self.is_undefined() {
            0
        } else {
            137
        }
    }
}

keyword_enum!(RecordFormat, "record format");

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// How an encryption key label is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum KeyEncoding {
    /// `L`: label encoding.
    Label,
    /// `H`: hash encoding.
    Hash,
}

impl KeyEncoding {
    /// Parse from string.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "L" | "LABEL" => Some(Self::Label),
            "H" | "HASH" => Some(Self::Hash),
            _ => None,
        }
    }
}

keyword_enum!(KeyEncoding, "key encoding");

/// Key-encrypting key used by the encryption key manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncryptionKey {
    /// Key label (up to 64 characters).
    pub label: String,
    /// Label encoding.
    pub encoding: KeyEncoding,
}

/// Attributes of a data set allocated with `disposition: new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AllocationAttributes {
    #[serde(default)]
    pub data_set_type: Option<DatasetType>,
    #[serde(default)]
    pub space_type: Option<SpaceType>,
    #[serde(default)]
    pub space_primary: Option<u32>,
    #[serde(default)]
    pub space_secondary: Option<u32>,
    /// Volume serials.
    #[serde(rename = "volume", default, deserialize_with = "deserialize_comma_list")]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub sms_storage_class: Option<String>,
    #[serde(default)]
    pub sms_management_class: Option<String>,
    #[serde(default)]
    pub sms_data_class: Option<String>,
    /// Maximum block length in bytes.
    #[serde(default, deserialize_with = "deserialize_block_size")]
    pub block_size: Option<u64>,
    #[serde(rename = "data_set_key_label", default)]
    pub key_label: Option<String>,
    #[serde(default)]
    pub encryption_key_1: Option<EncryptionKey>,
    #[serde(default)]
    pub encryption_key_2: Option<EncryptionKey>,
    #[serde(default)]
    pub key_length: Option<u32>,
    #[serde(default)]
    pub record_length: Option<u32>,
    #[serde(default)]
    pub record_format: Option<RecordFormat>,
}

impl AllocationAttributes {
    /// Whether no attribute was given.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// RECFM to allocate with (FB when unspecified).
    pub fn effective_record_format(&self) -> RecordFormat {
        self.record_format.unwrap_or_default()
    }

    /// LRECL to allocate with.
    pub fn effective_record_length(&self) -> u32 {
        self.record_length
            .unwrap_or_else(|| self.effective_record_format().default_record_length())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (what, class) in [
            ("sms_storage_class", &self.sms_storage_class),
            ("sms_management_class", &self.sms_management_class),
            ("sms_data_class", &self.sms_data_class),
        ] {
            if let Some(class) = class {
                validate_sms_class(class).map_err(|reason| format!("{what}: {reason}"))?;
            }
        }
        if let Some(len) = self.key_length {
            if len > 255 {
                return Err(format!("key_length {len} is not in 0-255"));
            }
        }
        if let Some(len) = self.record_length {
            if !(1..=32760).contains(&len) {
                return Err(format!("record_length {len} is not in 1-32760"));
            }
        }
        for key in [&self.encryption_key_1, &self.encryption_key_2].into_iter().flatten() {
            if key.label.is_empty() || key.label.len() > 64 {
                return Err("encryption key label must be 1-64 characters".to_string());
            }
        }
        for volser in &self.volumes {
            if volser.is_empty() || volser.len() > 6 {
                return Err(format!("volume serial '{volser}' must be 1-6 characters"));
            }
        }
        Ok(())
    }
}

/// `dd_dataset`: one or more cataloged data sets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetBinding {
    /// DD name.
    #[serde(rename = "dd_name")]
    pub name: String,
    /// Data set names; several names form a concatenation.
    #[serde(rename = "data_set_name", default, deserialize_with = "deserialize_colon_list")]
    pub targets: Vec<String>,
    /// Status.
    #[serde(default)]
    pub disposition: DatasetStatus,
    /// Disposition after normal termination.
    #[serde(rename = "disposition_normal", default)]
    pub normal: Option<DispositionAction>,
    /// Disposition after abnormal termination.
    #[serde(rename = "disposition_abnormal", default)]
    pub abnormal: Option<DispositionAction>,
    /// Allocation attributes for new data sets.
    #[serde(flatten)]
    pub allocation: AllocationAttributes,
    /// Content returned in the report.
    #[serde(default)]
    pub return_content: ReturnContent,
}

impl DatasetBinding {
    /// Binding to existing data set(s), given as `A.B` or `A.B:C.D`.
    pub fn new(name: impl Into<String>, dsnames: &str) -> Self {
        Self {
            name: name.into(),
            targets: dsnames
                .split(':')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            disposition: DatasetStatus::Shr,
            normal: None,
            abnormal: None,
            allocation: AllocationAttributes::default(),
            return_content: ReturnContent::None,
        }
    }

    /// Set the status.
    pub fn disposition(mut self, status: DatasetStatus) -> Self {
        self.disposition = status;
        self
    }

    /// Set the normal and abnormal dispositions.
    pub fn dispositions(
        mut self,
        normal: Option<DispositionAction>,
        abnormal: Option<DispositionAction>,
    ) -> Self {
        self.normal = normal;
        self.abnormal = abnormal;
        self
    }

    /// Set the allocation attributes.
    pub fn allocation(mut self, allocation: AllocationAttributes) -> Self {
        self.allocation = allocation;
        self
    }

    /// Set the returned content mode.
    pub fn return_content(mut self, mode: ReturnContent) -> Self {
        self.return_content = mode;
        self
    }

    /// Whether the data set is created before the run.
    pub fn is_new(&self) -> bool {
        self.disposition == DatasetStatus::New
    }

    /// Whether either disposition asks for deletion.
    pub fn deletes(&self) -> bool {
        self.normal == Some(DispositionAction::Delete)
            || self.abnormal == Some(DispositionAction::Delete)
    }

    pub(super) fn validate(&self) -> Result<()> {
        let invalid = |reason: String| MvsRawError::invalid_binding(&self.name, reason);
        if self.targets.is_empty() && !self.is_new() {
            return Err(invalid(
                "a data set name is required unless disposition is new".to_string(),
            ));
        }
        for dsn in &self.targets {
            validate_dsname(dsn).map_err(|reason| invalid(format!("'{dsn}' {reason}")))?;
        }
        if self.is_new() {
            self.allocation.validate().map_err(invalid)?;
        } else if !self.allocation.is_empty() {
            warn!(
                binding = %self.name,
                "allocation attributes are ignored for an existing data set"
            );
        }
        Ok(())
    }
}

/// Validate a data set name: 1-44 characters, qualifiers of 1-8
/// characters, optionally followed by `(member)` or a relative generation.
///
/// Qualifiers and members start with a letter or `@#$` and continue with
/// letters, digits, `@#$` or `-`. Case is ignored.
pub(crate) fn validate_dsname(name: &str) -> std::result::Result<(), String> {
    let (base, suffix) = match name.find('(') {
        Some(pos) => {
            let inner = name[pos + 1..]
                .strip_suffix(')')
                .ok_or_else(|| "has an unterminated member reference".to_string())?;
            (&name[..pos], Some(inner))
        }
        None => (name, None),
    };
    if base.is_empty() || base.len() > 44 {
        return Err("must be 1-44 characters".to_string());
    }
    for qualifier in base.split('.') {
        validate_name_segment(qualifier)
            .map_err(|reason| format!("qualifier '{qualifier}' {reason}"))?;
    }
    if let Some(inner) = suffix {
        let relative = inner.strip_prefix(['+', '-']).unwrap_or(inner);
        let is_generation = !relative.is_empty() && relative.chars().all(|c| c.is_ascii_digit());
        if !is_generation {
            validate_name_segment(inner).map_err(|reason| format!("member '{inner}' {reason}"))?;
        }
    }
    Ok(())
}

fn validate_name_segment(segment: &str) -> std::result::Result<(), String> {
    if segment.is_empty() || segment.len() > 8 {
        return Err("must be 1-8 characters".to_string());
    }
    let national = |c: char| matches!(c, '@' | '#' | '$');
    let mut chars = segment.chars().map(|c| c.to_ascii_uppercase());
    if !chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || national(c))
    {
        return Err("must start with a letter or @, # or $".to_string());
    }
    if !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || national(c) || c == '-') {
        return Err("may only contain letters, digits, @, #, $ or -".to_string());
    }
    Ok(())
}

fn validate_sms_class(class: &str) -> std::result::Result<(), String> {
    if class.is_empty() || class.len() > 8 {
        return Err(format!("'{class}' must be 1-8 characters"));
    }
    if !class
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '#' | '$'))
    {
        return Err(format!("'{class}' must be alphanumeric"));
    }
    Ok(())
}

/// Parse a block size such as `23472`, `204K` or `1M`.
pub(crate) fn parse_block_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, multiplier) = match text.chars().last()?.to_ascii_uppercase() {
        'K' => (&text[..text.len() - 1], 1024),
        'M' => (&text[..text.len() - 1], 1024 * 1024),
        'G' => (&text[..text.len() - 1], 1024 * 1024 * 1024),
        _ => (text, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

fn deserialize_block_size<'de, D>(de: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bytes(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Bytes(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => parse_block_size(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid block size '{text}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_separated_targets() {
        let dd = DatasetBinding::new("SYSUT1", "USER.A:USER.B");
        assert_eq!(dd.targets, ["USER.A", "USER.B"]);
        assert!(!dd.is_new());
    }

    #[test]
    fn dsname_validation() {
        assert!(validate_dsname("USER.DATA.SET").is_ok());
        assert!(validate_dsname("USER.PDS(MEMBER1)").is_ok());
        assert!(validate_dsname("USER.GDG(+1)").is_ok());
        assert!(validate_dsname("USER.GDG(-2)").is_ok());
        assert!(validate_dsname("USER.GDG(0)").is_ok());
        assert!(validate_dsname("").is_err());
        assert!(validate_dsname(&"A".repeat(45)).is_err());
        assert!(validate_dsname("USER.TOOLONGQUAL").is_err());
        assert!(validate_dsname("USER..DATA").is_err());
        assert!(validate_dsname("USER.PDS(TOOLONGMEM)").is_err());
        assert!(validate_dsname("USER.PDS(MEM").is_err());
        assert!(validate_dsname("USER.1DATA").is_err());
        assert!(validate_dsname("user.$work#1.a-b").is_ok());
        assert!(validate_dsname("X./TMP").is_err());
        assert!(validate_dsname("USER.A B").is_err());
        assert!(validate_dsname("USER.DAT\u{c9}").is_err());
        assert!(validate_dsname("USER.PDS(../X)").is_err());
        assert!(validate_dsname("USER.PDS(1MEM)").is_err());
    }

    #[test]
    fn binding_rejects_bad_characters() {
        assert!(DatasetBinding::new("DD1", "USER.A B").validate().is_err());
        assert!(DatasetBinding::new("DD1", "USER.OK:X./TMP").validate().is_err());
    }

    #[test]
    fn dispositions_accept_aliases() {
        assert_eq!(DispositionAction::from_str_opt("del"), Some(DispositionAction::Delete));
        assert_eq!(DispositionAction::from_str_opt("CATLG"), Some(DispositionAction::Catalog));
        assert_eq!(DispositionAction::from_str_opt("catlog"), Some(DispositionAction::Catalog));
        assert_eq!(
            DispositionAction::from_str_opt("uncatalog"),
            Some(DispositionAction::Uncatalog)
        );
        assert_eq!(DispositionAction::from_str_opt("pass"), None);
    }

    #[test]
    fn record_length_defaults_follow_format() {
        assert_eq!(RecordFormat::FB.default_record_length(), 80);
        assert_eq!(RecordFormat::VB.default_record_length(), 137);
        assert_eq!(RecordFormat::VBS.default_record_length(), 137);
        assert_eq!(RecordFormat::U.default_record_length(), 0);

        let attrs = AllocationAttributes::default();
        assert_eq!(attrs.effective_record_format(), RecordFormat::FB);
        assert_eq!(attrs.effective_record_length(), 80);
    }

    #[test]
    fn block_size_suffixes() {
        assert_eq!(parse_block_size("23472"), Some(23472));
        assert_eq!(parse_block_size("204K"), Some(204 * 1024));
        assert_eq!(parse_block_size("1m"), Some(1024 * 1024));
        assert_eq!(parse_block_size("K"), None);
        assert_eq!(parse_block_size("abc"), None);
        assert_eq!(parse_block_size("17179869184G"), None);
    }

    #[test]
    fn overflowing_block_size_is_a_document_error() {
        let json = r#"{"dd_name": "SYSUT2", "data_set_name": "USER.NEW", "disposition": "new",
                       "block_size": "17179869184G"}"#;
        assert!(serde_json::from_str::<DatasetBinding>(json).is_err());
    }

    #[test]
    fn new_without_name_is_allowed() {
        let dd = DatasetBinding::new("SYSUT2", "").disposition(DatasetStatus::New);
        assert!(dd.targets.is_empty());
        assert!(dd.validate().is_ok());

        let existing = DatasetBinding::new("SYSUT1", "");
        assert!(existing.validate().is_err());
    }

    #[test]
    fn allocation_ranges_checked_for_new() {
        let dd = DatasetBinding::new("SYSUT2", "USER.NEW")
            .disposition(DatasetStatus::New)
            .allocation(AllocationAttributes {
                record_length: Some(40000),
                ..Default::default()
            });
        assert!(matches!(dd.validate(), Err(MvsRawError::InvalidBinding { .. })));

        let dd = DatasetBinding::new("SYSUT2", "USER.NEW")
            .disposition(DatasetStatus::New)
            .allocation(AllocationAttributes {
                sms_storage_class: Some("BAD-CLASS".to_string()),
                ..Default::default()
            });
        assert!(dd.validate().is_err());
    }

    #[test]
    fn deserialize_full_dataset_document() {
        let json = r#"{
            "dd_name": "sysut2",
            "data_set_name": "USER.OUT:USER.OUT2",
            "disposition": "NEW",
            "disposition_normal": "delete",
            "disposition_abnormal": "keep",
            "space_type": "cyl",
            "space_primary": 5,
            "space_secondary": 1,
            "volume": "VOL001,VOL002",
            "block_size": "27K",
            "record_format": "vb",
            "encryption_key_1": {"label": "KEYLBL", "encoding": "L"},
            "return_content": "base64"
        }"#;
        let dd: DatasetBinding = serde_json::from_str(json).unwrap();
        assert_eq!(dd.targets, ["USER.OUT", "USER.OUT2"]);
        assert!(dd.is_new());
        assert!(dd.deletes());
        assert_eq!(dd.allocation.space_type, Some(SpaceType::Cyl));
        assert_eq!(dd.allocation.volumes, ["VOL001", "VOL002"]);
        assert_eq!(dd.allocation.block_size, Some(27 * 1024));
        assert_eq!(dd.allocation.effective_record_length(), 137);
        assert_eq!(
            dd.allocation.encryption_key_1.as_ref().map(|k| k.encoding),
            Some(KeyEncoding::Label)
        );
        assert_eq!(dd.return_content, ReturnContent::Base64);
    }
}
