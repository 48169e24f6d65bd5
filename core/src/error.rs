use thiserror::Error;

use crate::config::ConfigError;
use crate::container::ContainerError;
use crate::error_codes;

/// Failure kinds surfaced by the extraction entry points.
///
/// `MalformedDefinition` is usually collected per file into
/// [`Extraction::file_errors`](crate::Extraction::file_errors) rather than
/// returned; the other kinds abort the extraction of one project.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// Structural parse failure in one definition file. `line` is 1-based;
    /// 0 means the failure concerns the file as a whole (unreadable, too large).
    #[error("{file}:{line}: malformed definition: {detail}")]
    MalformedDefinition {
        file: String,
        line: usize,
        detail: String,
    },
    #[error("container error: {detail}")]
    ContainerError { detail: String },
    #[error("unsupported layout: {detail}")]
    UnsupportedLayout { detail: String },
    #[error("schema conflict on '{entity}': {detail}")]
    SchemaConflict { entity: String, detail: String },
    #[error("cannot read project root {path}: {detail}")]
    Io { path: String, detail: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl ExtractError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::MalformedDefinition { .. } => error_codes::MALFORMED_DEFINITION,
            ExtractError::ContainerError { .. } => error_codes::CONTAINER_ZIP,
            ExtractError::UnsupportedLayout { .. } => error_codes::UNSUPPORTED_LAYOUT,
            ExtractError::SchemaConflict { .. } => error_codes::SCHEMA_CONFLICT,
            ExtractError::Io { .. } => error_codes::ROOT_IO,
            ExtractError::InvalidConfig(_) => error_codes::INVALID_CONFIG,
        }
    }

    pub(crate) fn malformed(file: &str, line: usize, detail: impl Into<String>) -> Self {
        ExtractError::MalformedDefinition {
            file: file.to_string(),
            line,
            detail: detail.into(),
        }
    }

    pub(crate) fn conflict(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        ExtractError::SchemaConflict {
            entity: entity.into(),
            detail: detail.into(),
        }
    }

    /// True for the kinds that abort a whole project rather than one file.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExtractError::MalformedDefinition { .. })
    }
}

impl From<ContainerError> for ExtractError {
    fn from(err: ContainerError) -> Self {
        ExtractError::ContainerError {
            detail: format!("[{}] {err}", err.code()),
        }
    }
}
