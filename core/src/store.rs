//! Boundary for keeping extracted schemas between sessions.
//!
//! Storage itself belongs to the caller; the crate ships the trait and an
//! in-memory implementation that stores the serialized canonical form, so
//! anything it returns has been through the same round trip a persistent
//! store would apply.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("schema id must not be empty")]
    EmptyId,
    #[error("failed to serialize schema '{id}': {detail}")]
    Serialize { id: String, detail: String },
    #[error("stored schema '{id}' is corrupt: {detail}")]
    Corrupt { id: String, detail: String },
}

/// Listing entry for a stored schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSummary {
    pub id: String,
    pub name: String,
    pub tables: usize,
    pub measures: usize,
    pub relationships: usize,
}

impl SchemaSummary {
    pub fn of(id: &str, model: &Model) -> Self {
        Self {
            id: id.to_string(),
            name: model.name.clone(),
            tables: model.tables.len(),
            measures: model.measure_count(),
            relationships: model.relationships.len(),
        }
    }
}

pub trait SchemaStore {
    /// Stores `model` under `id`, replacing any previous schema with that id.
    fn save(&mut self, id: &str, model: &Model) -> Result<(), StoreError>;

    fn load(&self, id: &str) -> Result<Option<Model>, StoreError>;

    /// Summaries of every stored schema, ordered by id.
    fn list(&self) -> Result<Vec<SchemaSummary>, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySchemaStore {
    entries: BTreeMap<String, String>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaStore for MemorySchemaStore {
    fn save(&mut self, id: &str, model: &Model) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::EmptyId);
        }
        let json = serde_json::to_string(model).map_err(|e| StoreError::Serialize {
            id: id.to_string(),
            detail: e.to_string(),
        })?;
        self.entries.insert(id.to_string(), json);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<Model>, StoreError> {
        self.entries
            .get(id)
            .map(|json| {
                serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
                    id: id.to_string(),
                    detail: e.to_string(),
                })
            })
            .transpose()
    }

    fn list(&self) -> Result<Vec<SchemaSummary>, StoreError> {
        self.entries
            .keys()
            .map(|id| {
                let model = self.load(id)?.ok_or_else(|| StoreError::Corrupt {
                    id: id.clone(),
                    detail: "entry vanished during listing".to_string(),
                })?;
                Ok(SchemaSummary::of(id, &model))
            })
            .collect()
    }
}
