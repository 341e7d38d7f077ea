//! Runner configuration: launcher commands, temporary names, inline input and cleanup.
//!
//! ```toml
//! temp_hlq = "MVSRAW"
//! inline_input = "dataset"
//!
//! [launcher]
//! unauthorized = "mvscmd"
//! authorized = "mvscmdauth"
//!
//! [cleanup]
//! policy = "disposition"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cleanup::CleanupPolicy;
use crate::error::{MvsRawError, Result};

/// Top-level runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Launcher commands.
    #[serde(default)]
    pub launcher: LauncherConfig,
    /// High-level qualifier of generated temporary data set names.
    #[serde(default = "default_temp_hlq")]
    pub temp_hlq: String,
    /// How inline input reaches the program.
    #[serde(default)]
    pub inline_input: InlineInputMode,
    /// Cleanup settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Launcher command configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Command for unauthorized programs.
    #[serde(default = "default_unauthorized")]
    pub unauthorized: String,
    /// Command for APF-authorized programs.
    #[serde(default = "default_authorized")]
    pub authorized: String,
    /// Working directory of the launcher process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Delivery of `dd_input` content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineInputMode {
    /// Write the content to a temporary data set.
    #[default]
    Dataset,
    /// Pipe the content to the launcher's standard input.
    Stdin,
}

/// Cleanup configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Which queued resources are deleted.
    #[serde(default)]
    pub policy: CleanupPolicy,
}

impl RunnerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MvsRawError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            MvsRawError::Config { reason, .. } => MvsRawError::Config {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| MvsRawError::Config {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| MvsRawError::Config {
            path: "<inline>".to_string(),
            reason,
        };
        let hlq = &self.temp_hlq;
        if hlq.is_empty()
            || hlq.len() > 8
            || hlq.starts_with(|c: char| c.is_ascii_digit())
            || !hlq
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '#' | '$'))
        {
            return Err(invalid(format!("temp_hlq '{hlq}' is not a valid qualifier")));
        }
        if self.launcher.unauthorized.trim().is_empty()
            || self.launcher.authorized.trim().is_empty()
        {
            return Err(invalid("launcher commands must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            launcher: LauncherConfig::default(),
            temp_hlq: default_temp_hlq(),
            inline_input: InlineInputMode::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            unauthorized: default_unauthorized(),
            authorized: default_authorized(),
            working_dir: None,
        }
    }
}

fn default_temp_hlq() -> String {
    "MVSRAW".to_string()
}

fn default_unauthorized() -> String {
    "mvscmd".to_string()
}

fn default_authorized() -> String {
    "mvscmdauth".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.launcher.unauthorized, "mvscmd");
        assert_eq!(config.launcher.authorized, "mvscmdauth");
        assert_eq!(config.temp_hlq, "MVSRAW");
        assert_eq!(config.inline_input, InlineInputMode::Dataset);
        assert_eq!(config.cleanup.policy, CleanupPolicy::Disposition);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
temp_hlq = "TMPHLQ"
inline_input = "stdin"

[launcher]
unauthorized = "/usr/lpp/bin/mvscmd"
working_dir = "/tmp"

[cleanup]
policy = "always"
"#;
        let config = RunnerConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.temp_hlq, "TMPHLQ");
        assert_eq!(config.inline_input, InlineInputMode::Stdin);
        assert_eq!(config.launcher.unauthorized, "/usr/lpp/bin/mvscmd");
        assert_eq!(config.launcher.authorized, "mvscmdauth");
        assert_eq!(config.launcher.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(config.cleanup.policy, CleanupPolicy::Always);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(RunnerConfig::from_toml("").unwrap(), RunnerConfig::default());
    }

    #[test]
    fn test_invalid_hlq_rejected() {
        let err = RunnerConfig::from_toml(r#"temp_hlq = "TOOLONGHLQ""#).unwrap_err();
        assert!(matches!(err, MvsRawError::Config { .. }));
        assert!(RunnerConfig::from_toml(r#"temp_hlq = "1ABC""#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mvsraw.toml");
        std::fs::write(&path, "[cleanup]\npolicy = \"bogus\"\n").unwrap();
        match RunnerConfig::from_file(&path).unwrap_err() {
            MvsRawError::Config { path: reported, .. } => {
                assert_eq!(reported, path.display().to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
