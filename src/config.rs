//! Configuration loaded from an optional TOML file.
//!
//! Every section defaults, so an empty or partial file is valid. Command
//! line flags override values read from the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::layout::OverflowPolicy;
use crate::record::DEFAULT_YEAR;
use crate::wizard::AdvancePolicy;

/// Maximum number of proposals pushed to list subscribers.
pub const DEFAULT_LIST_LIMIT: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub proposal: ProposalConfig,
    pub layout: LayoutConfig,
    pub wizard: WizardConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Branding and naming of exported proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// Year stamped on new proposals
    pub default_year: String,
    /// First header line of the document
    pub brand_name: String,
    /// Second header line of the document
    pub subtitle: String,
    /// Organization tag used in download file names
    pub org_tag: String,
    /// Used in file names when a proposal has no name
    pub placeholder_name: String,
    /// Optional logo drawn in the header (file path or http(s) URL)
    pub logo: Option<String>,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        ProposalConfig {
            default_year: DEFAULT_YEAR.to_string(),
            brand_name: "LA MAXIMA".to_string(),
            subtitle: "Educational and Recreational Hub".to_string(),
            org_tag: "LaMaxima".to_string(),
            placeholder_name: "activity".to_string(),
            logo: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub advance: AdvancePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding saved proposals; in-memory only when unset
    pub store_path: Option<PathBuf>,
    /// Directory for the in-progress proposal cache
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on proposals delivered to list subscribers
    pub list_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            store_path: None,
            cache_dir: None,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log to rotating files here instead of stderr
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Reads a config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| AppError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.storage.list_limit == 0 {
            return Err(AppError::ConfigError("storage.list_limit must be at least 1".into()));
        }
        if self.proposal.org_tag.trim().is_empty() {
            return Err(AppError::ConfigError("proposal.org_tag must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.proposal.default_year, "2026");
        assert_eq!(config.storage.list_limit, DEFAULT_LIST_LIMIT);
        assert_eq!(config.layout.overflow, OverflowPolicy::KeepTogether);
        assert_eq!(config.wizard.advance, AdvancePolicy::Free);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [proposal]
            default_year = "2027"
            org_tag = "Hub"

            [layout]
            overflow = "split-lines"

            [wizard]
            advance = "require-name"
            "#,
        )
        .unwrap();
        assert_eq!(config.proposal.default_year, "2027");
        assert_eq!(config.proposal.org_tag, "Hub");
        assert_eq!(config.proposal.placeholder_name, "activity");
        assert_eq!(config.layout.overflow, OverflowPolicy::SplitLines);
        assert_eq!(config.wizard.advance, AdvancePolicy::RequireName);
    }

    #[test]
    fn rejects_zero_list_limit() {
        let err = AppConfig::from_toml("[storage]\nlist_limit = 0\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(AppConfig::from_toml("[proposal\n").is_err());
    }
}
