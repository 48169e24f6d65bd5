//! Configuration for schema extraction.
//!
//! `ExtractConfig` centralizes the scan limits, container limits, entry-name
//! pattern tables and lexical settings so none of them are hardcoded in the
//! parsers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::ContainerLimits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names to skip entirely during traversal.
    pub ignore_dir_names: Vec<String>,
    /// Maximum file size to read into memory (bytes).
    pub max_file_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_dir_names: vec![
                ".git".to_string(),
                ".pbi".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
                ".venv".to_string(),
                ".idea".to_string(),
                ".vscode".to_string(),
            ],
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Entry-name pattern tables used to locate the model payload inside a
/// container, tried in the order the fields are declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPatterns {
    /// Path segments that root a modern text-model tree (`definition/`).
    pub definition_segments: Vec<String>,
    /// Extension of text-model entries below a definition segment.
    pub definition_extension: String,
    /// Entry basenames holding the legacy JSON schema.
    pub legacy_schema_entries: Vec<String>,
    /// Entry basenames holding the binary model backup; recognized only.
    pub legacy_binary_entries: Vec<String>,
    /// Full entry paths of the report layout, the last-resort source.
    pub report_layout_entries: Vec<String>,
}

impl Default for LayoutPatterns {
    fn default() -> Self {
        Self {
            definition_segments: vec!["definition".to_string()],
            definition_extension: "tmdl".to_string(),
            legacy_schema_entries: vec!["DataModelSchema".to_string()],
            legacy_binary_entries: vec!["DataModel".to_string()],
            report_layout_entries: vec!["Report/Layout".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub scan: ScanConfig,
    pub container: ContainerLimits,
    pub layout: LayoutPatterns,
    /// Column width of a tab when measuring indentation.
    pub tab_width: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            container: ContainerLimits::default(),
            layout: LayoutPatterns::default(),
            tab_width: 4,
        }
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            inner: ExtractConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 || self.tab_width > 16 {
            return Err(ConfigError::InvalidTabWidth {
                value: self.tab_width,
            });
        }

        ensure_non_zero(self.scan.max_file_bytes, "scan.max_file_bytes")?;
        ensure_non_zero(self.container.max_entries as u64, "container.max_entries")?;
        ensure_non_zero(
            self.container.max_part_uncompressed_bytes,
            "container.max_part_uncompressed_bytes",
        )?;
        ensure_non_zero(
            self.container.max_total_uncompressed_bytes,
            "container.max_total_uncompressed_bytes",
        )?;

        if self.layout.definition_segments.iter().all(|s| s.trim().is_empty())
            && self.layout.legacy_schema_entries.iter().all(|s| s.trim().is_empty())
            && self.layout.report_layout_entries.iter().all(|s| s.trim().is_empty())
        {
            return Err(ConfigError::EmptyPatternTable);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tab_width must be in 1..=16 (got {value})")]
    InvalidTabWidth { value: usize },
    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveLimit { field: &'static str, value: u64 },
    #[error("layout patterns must name at least one payload entry")]
    EmptyPatternTable,
}

fn ensure_non_zero(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositiveLimit { field, value });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ExtractConfigBuilder {
    inner: ExtractConfig,
}

impl Default for ExtractConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractConfigBuilder {
    pub fn new() -> Self {
        ExtractConfig::builder()
    }

    pub fn tab_width(mut self, value: usize) -> Self {
        self.inner.tab_width = value;
        self
    }

    pub fn max_file_bytes(mut self, value: u64) -> Self {
        self.inner.scan.max_file_bytes = value;
        self
    }

    pub fn ignore_dir_name(mut self, name: impl Into<String>) -> Self {
        self.inner.scan.ignore_dir_names.push(name.into());
        self
    }

    pub fn container_limits(mut self, value: ContainerLimits) -> Self {
        self.inner.container = value;
        self
    }

    pub fn layout_patterns(mut self, value: LayoutPatterns) -> Self {
        self.inner.layout = value;
        self
    }

    pub fn build(self) -> Result<ExtractConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ExtractConfig::default();
        assert_eq!(cfg.tab_width, 4);
        assert_eq!(cfg.scan.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.layout.legacy_schema_entries, vec!["DataModelSchema"]);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn serde_fills_missing_fields_with_defaults() {
        let json = r#"{ "tab_width": 2, "scan": { "max_file_bytes": 1024 } }"#;
        let cfg: ExtractConfig = serde_json::from_str(json).expect("deserialize partial config");
        assert_eq!(cfg.tab_width, 2);
        assert_eq!(cfg.scan.max_file_bytes, 1024);
        assert!(cfg.scan.ignore_dir_names.iter().any(|d| d == ".pbi"));
        assert_eq!(cfg.container, ContainerLimits::default());
    }

    #[test]
    fn builder_rejects_zero_tab_width() {
        let err = ExtractConfig::builder()
            .tab_width(0)
            .build()
            .expect_err("zero tab width is invalid");
        assert_eq!(err, ConfigError::InvalidTabWidth { value: 0 });
    }

    #[test]
    fn builder_rejects_empty_pattern_table() {
        let err = ExtractConfig::builder()
            .layout_patterns(LayoutPatterns {
                definition_segments: Vec::new(),
                definition_extension: "tmdl".to_string(),
                legacy_schema_entries: Vec::new(),
                legacy_binary_entries: Vec::new(),
                report_layout_entries: Vec::new(),
            })
            .build()
            .expect_err("no payload patterns");
        assert_eq!(err, ConfigError::EmptyPatternTable);
    }

    #[test]
    fn builder_rejects_zero_file_cap() {
        let err = ExtractConfig::builder()
            .max_file_bytes(0)
            .build()
            .expect_err("zero cap");
        assert!(matches!(
            err,
            ConfigError::NonPositiveLimit {
                field: "scan.max_file_bytes",
                ..
            }
        ));
    }
}
