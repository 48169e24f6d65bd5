//! Raw entity tree: what the parsers recovered, before normalization.
//!
//! Every fragment remembers where it came from so the normalizer can name the
//! files involved in a conflict or a dangling reference.

use serde::Serialize;

use crate::model::Annotations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// A definition file of a text-model project on disk or in memory.
    TextModel,
    /// A definition entry inside a modern container.
    ContainerDefinition,
    /// The legacy JSON schema entry of a container, or a `model.bim` file.
    LegacySchema,
    /// Table/column shells recovered from a report layout.
    ReportLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOrigin {
    pub kind: SourceKind,
    /// Project-relative file path or container entry name.
    pub path: String,
}

impl SourceOrigin {
    pub fn new(kind: SourceKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// The entities recovered from one file or container entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFragment {
    pub origin: SourceOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<RawModelInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<RawTable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RawRelationship>,
    /// Measures found without an owning table (degraded legacy decode).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphan_measures: Vec<RawOrphanMeasure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RawRole>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cultures: Vec<String>,
}

impl RawFragment {
    pub fn new(origin: SourceOrigin) -> Self {
        Self {
            origin,
            model: None,
            tables: Vec::new(),
            relationships: Vec::new(),
            orphan_measures: Vec::new(),
            roles: Vec::new(),
            cultures: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.tables.is_empty()
            && self.relationships.is_empty()
            && self.orphan_measures.is_empty()
            && self.roles.is_empty()
            && self.cultures.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModelInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_query_culture: Option<String>,
    /// Table names in the order the model lists them (`ref table`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub table_order: Vec<String>,
    /// Power Query folders (`queryGroup`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_groups: Vec<String>,
    #[serde(skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub name: String,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_hidden: bool,
    pub columns: Vec<RawColumn>,
    pub measures: Vec<RawMeasure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<RawPartition>,
    #[serde(skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumn {
    pub name: String,
    pub line: usize,
    /// Declared type spelling, verbatim from the source vocabulary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeasure {
    pub name: String,
    pub line: usize,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_folder: Option<String>,
    #[serde(skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

/// A measure recovered outside any table declaration, with the name of the
/// nearest enclosing named object as an ownership hint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrphanMeasure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(flatten)]
    pub measure: RawMeasure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPartition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationship {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub line: usize,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_cardinality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_cardinality: Option<String>,
    /// Whole-relationship spelling used by some legacy layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_filtering_behavior: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRole {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_permission: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub table_permissions: Vec<(String, Option<String>)>,
}
