use serde::Serialize;

use crate::error::ExtractError;
use crate::error_codes;
use crate::model::Model;
use crate::report_layout::Visual;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// A relationship endpoint did not resolve; the relationship was dropped.
    DanglingRelationship,
    /// The same relationship endpoints were declared more than once with
    /// different properties; the first declaration was kept.
    DuplicateRelationship,
    /// A second active relationship between the same two tables was demoted
    /// to inactive.
    AmbiguousActiveRelationship,
    /// The payload was recognized but only partially extractable.
    UnsupportedLayout,
    /// A container entry matched a pattern but could not be used.
    SkippedEntry,
}

impl WarningKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::DanglingRelationship => error_codes::WARN_DANGLING_RELATIONSHIP,
            Self::DuplicateRelationship => error_codes::WARN_DUPLICATE_RELATIONSHIP,
            Self::AmbiguousActiveRelationship => error_codes::WARN_AMBIGUOUS_ACTIVE_RELATIONSHIP,
            Self::UnsupportedLayout => error_codes::WARN_DEGRADED_EXTRACTION,
            Self::SkippedEntry => error_codes::WARN_SKIPPED_ENTRY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub detail: String,
    /// File or container entry the warning is about, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Warning {
    pub fn new(kind: WarningKind, detail: impl Into<String>, source: Option<&str>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: source.map(str::to_string),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "[{}] {}: {}", self.kind.code(), source, self.detail),
            None => write!(f, "[{}] {}", self.kind.code(), self.detail),
        }
    }
}

/// Result of one project extraction: the canonical model plus everything
/// that went wrong without aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub model: Model,
    /// Per-file `MalformedDefinition` errors; their files contributed nothing.
    pub file_errors: Vec<ExtractError>,
    pub warnings: Vec<Warning>,
    /// Report visuals, when the source carries a report layout.
    pub visuals: Vec<Visual>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.file_errors.is_empty() && self.warnings.is_empty()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}
