//! Canonical schema produced by normalization.
//!
//! This shape is the serialization contract for every consumer: the CLI
//! output, cached copies handed to a [`SchemaStore`](crate::SchemaStore), and
//! context builders downstream.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::data_type::ColumnType;
use crate::error::ExtractError;

pub type Annotations = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_query_culture: Option<String>,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cultures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub measures: Vec<Measure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<Partition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// DAX text of a calculated column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarize_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub name: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_folder: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    #[default]
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "oneToOne",
            Self::OneToMany => "oneToMany",
            Self::ManyToOne => "manyToOne",
            Self::ManyToMany => "manyToMany",
        }
    }

    /// Combines per-end cardinalities (`one`/`many`); missing ends default to
    /// many on the from side and one on the to side.
    pub fn from_ends(from: Option<&str>, to: Option<&str>) -> Cardinality {
        let from_many = from.is_none_or(|v| !v.trim().eq_ignore_ascii_case("one"));
        let to_many = to.is_some_and(|v| v.trim().eq_ignore_ascii_case("many"));
        match (from_many, to_many) {
            (false, false) => Cardinality::OneToOne,
            (false, true) => Cardinality::OneToMany,
            (true, false) => Cardinality::ManyToOne,
            (true, true) => Cardinality::ManyToMany,
        }
    }

    /// Parses a whole-relationship spelling such as `ManyToOne` or `1:*`.
    pub fn parse(value: &str) -> Option<Cardinality> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "onetoone" | "1:1" => Some(Cardinality::OneToOne),
            "onetomany" | "1:*" | "1:n" => Some(Cardinality::OneToMany),
            "manytoone" | "*:1" | "n:1" => Some(Cardinality::ManyToOne),
            "manytomany" | "*:*" | "n:n" => Some(Cardinality::ManyToMany),
            _ => None,
        }
    }

    /// The `(fromCardinality, toCardinality)` pair written back to text.
    pub fn ends(self) -> (&'static str, &'static str) {
        match self {
            Self::OneToOne => ("one", "one"),
            Self::OneToMany => ("one", "many"),
            Self::ManyToOne => ("many", "one"),
            Self::ManyToMany => ("many", "many"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_filtering_behavior: Option<String>,
}

impl Relationship {
    pub fn label(&self) -> String {
        format!(
            "{}[{}] -> {}[{}]",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub name: String,
    /// Source language of the partition, e.g. `m` or `calculated`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_permission: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_permissions: Vec<TablePermission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePermission {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

/// Case-insensitive identity of a model object name.
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Unordered identity of a table pair, used for the active-relationship rule.
pub(crate) fn table_pair_key(a: &str, b: &str) -> (String, String) {
    let (a, b) = (name_key(a), name_key(b));
    if a <= b { (a, b) } else { (b, a) }
}

impl Model {
    pub fn table(&self, name: &str) -> Option<&Table> {
        let key = name_key(name);
        self.tables.iter().find(|t| name_key(&t.name) == key)
    }

    pub fn measures(&self) -> impl Iterator<Item = (&Table, &Measure)> {
        self.tables
            .iter()
            .flat_map(|t| t.measures.iter().map(move |m| (t, m)))
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn measure_count(&self) -> usize {
        self.tables.iter().map(|t| t.measures.len()).sum()
    }

    /// Checks the structural invariants of a canonical model.
    pub fn validate(&self) -> Result<(), ExtractError> {
        let mut tables: FxHashMap<String, &Table> = FxHashMap::default();
        let mut measures: FxHashMap<String, &str> = FxHashMap::default();

        for table in &self.tables {
            if tables.insert(name_key(&table.name), table).is_some() {
                return Err(ExtractError::conflict(
                    &table.name,
                    "table name declared more than once",
                ));
            }

            let mut columns: FxHashSet<String> = FxHashSet::default();
            for column in &table.columns {
                if !columns.insert(name_key(&column.name)) {
                    return Err(ExtractError::conflict(
                        format!("{}[{}]", table.name, column.name),
                        "column name declared more than once in its table",
                    ));
                }
            }

            for measure in &table.measures {
                if let Some(owner) = measures.insert(name_key(&measure.name), &table.name) {
                    return Err(ExtractError::conflict(
                        &measure.name,
                        format!(
                            "measure name must be unique across the model (declared in '{owner}' and '{}')",
                            table.name
                        ),
                    ));
                }
            }
        }

        let mut active_pairs: FxHashSet<(String, String)> = FxHashSet::default();
        for rel in &self.relationships {
            for (table, column) in [
                (&rel.from_table, &rel.from_column),
                (&rel.to_table, &rel.to_column),
            ] {
                let resolved = tables.get(&name_key(table)).is_some_and(|t| {
                    let key = name_key(column);
                    t.columns.iter().any(|c| name_key(&c.name) == key)
                });
                if !resolved {
                    return Err(ExtractError::conflict(
                        rel.label(),
                        format!("relationship endpoint {table}[{column}] does not resolve"),
                    ));
                }
            }

            if rel.active && !active_pairs.insert(table_pair_key(&rel.from_table, &rel.to_table)) {
                return Err(ExtractError::conflict(
                    rel.label(),
                    "more than one active relationship between the same tables",
                ));
            }
        }

        Ok(())
    }
}
