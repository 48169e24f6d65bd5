//! Reader for a container's report `Layout`: the inventory of visuals on the
//! report pages, and, when a container carries no schema, table and column
//! names recovered from the fields those visuals reference.

use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::name_key;
use crate::raw::{RawColumn, RawFragment, RawTable, SourceOrigin};
use crate::text_decode::{TextDecodeError, decode_text};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportLayoutError {
    #[error("layout text could not be decoded: {0}")]
    Decode(#[from] TextDecodeError),
    #[error("layout JSON parse error: {0}")]
    Json(String),
}

/// One visual placed on a report page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visual {
    /// `visualType` of the visual (`barChart`, `card`, ...), or `unknown`.
    #[serde(rename = "type")]
    pub visual_type: String,
    /// Report page (section) display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub fields: Vec<VisualField>,
}

/// A field bound to a visual: the data role (`Category`, `Y`, `Values`, ...)
/// and the query reference as written in the layout (`Sum(Sales.Amount)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualField {
    pub role: String,
    pub field: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ReportLayout {
    /// Table/column shells for every field a visual references. Measures
    /// cannot be told apart reliably from a bare query reference, so only
    /// explicit column selections and projections are kept.
    pub fragment: RawFragment,
    pub visuals: Vec<Visual>,
}

pub(crate) fn parse_report_layout(
    bytes: &[u8],
    origin: SourceOrigin,
) -> Result<ReportLayout, ReportLayoutError> {
    let text = decode_text(bytes)?;
    let layout: Value =
        serde_json::from_str(&text).map_err(|e| ReportLayoutError::Json(e.to_string()))?;

    let mut shells = Shells::default();
    let mut visuals = Vec::new();

    for section in array_field(&layout, "sections") {
        let page = section
            .get("displayName")
            .or_else(|| section.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        for container in array_field(section, "visualContainers") {
            let Some(config) = container.get("config").and_then(embedded_json) else {
                continue;
            };
            let Some(visual) = config.get("singleVisual") else {
                continue;
            };

            visuals.push(Visual {
                visual_type: visual
                    .get("visualType")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                page: page.clone(),
                fields: visual_fields(visual),
            });

            let from_query = collect_prototype_query(visual, &mut shells);
            if !from_query {
                collect_projections(visual, &mut shells);
            }
        }
    }

    let mut fragment = RawFragment::new(origin);
    fragment.tables = shells.tables;
    Ok(ReportLayout { fragment, visuals })
}

fn visual_fields(visual: &Value) -> Vec<VisualField> {
    let Some(projections) = visual.get("projections").and_then(Value::as_object) else {
        return Vec::new();
    };
    projections
        .iter()
        .flat_map(|(role, fields)| {
            fields
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .filter_map(move |f| {
                    Some(VisualField {
                        role: role.clone(),
                        field: f.get("queryRef")?.as_str()?.to_string(),
                    })
                })
        })
        .collect()
}

#[derive(Default)]
struct Shells {
    tables: Vec<RawTable>,
    seen: FxHashSet<(String, String)>,
}

impl Shells {
    fn add(&mut self, table: &str, column: &str) {
        let (table, column) = (table.trim(), column.trim());
        if table.is_empty() || column.is_empty() {
            return;
        }
        if !self.seen.insert((name_key(table), name_key(column))) {
            return;
        }

        let key = name_key(table);
        let idx = match self.tables.iter().position(|t| name_key(&t.name) == key) {
            Some(idx) => idx,
            None => {
                self.tables.push(RawTable {
                    name: table.to_string(),
                    ..Default::default()
                });
                self.tables.len() - 1
            }
        };
        self.tables[idx].columns.push(RawColumn {
            name: column.to_string(),
            ..Default::default()
        });
    }
}

/// Reads `prototypeQuery` selections. Returns false when the visual has no
/// query to read.
fn collect_prototype_query(visual: &Value, shells: &mut Shells) -> bool {
    let Some(query) = visual.get("prototypeQuery") else {
        return false;
    };

    let aliases: Vec<(&str, &str)> = array_field(query, "From")
        .filter_map(|f| {
            Some((
                f.get("Name").and_then(Value::as_str)?,
                f.get("Entity").and_then(Value::as_str)?,
            ))
        })
        .collect();

    for select in array_field(query, "Select") {
        let column = select.get("Column").or_else(|| {
            select
                .get("Aggregation")
                .and_then(|a| a.get("Expression"))
                .and_then(|e| e.get("Column"))
        });
        let Some(column) = column else {
            continue;
        };
        let Some(property) = column.get("Property").and_then(Value::as_str) else {
            continue;
        };
        let source_ref = column.get("Expression").and_then(|e| e.get("SourceRef"));
        let entity = source_ref
            .and_then(|r| r.get("Entity"))
            .and_then(Value::as_str)
            .or_else(|| {
                let alias = source_ref?.get("Source")?.as_str()?;
                aliases.iter().find(|(name, _)| *name == alias).map(|(_, e)| *e)
            });
        if let Some(entity) = entity {
            shells.add(entity, property);
        }
    }
    true
}

fn collect_projections(visual: &Value, shells: &mut Shells) {
    let Some(projections) = visual.get("projections").and_then(Value::as_object) else {
        return;
    };
    for fields in projections.values() {
        for field in fields.as_array().map(Vec::as_slice).unwrap_or(&[]) {
            if let Some((table, column)) = field
                .get("queryRef")
                .and_then(Value::as_str)
                .and_then(split_query_ref)
            {
                shells.add(table, column);
            }
        }
    }
}

/// Splits `Table.Column`, unwrapping an aggregation such as
/// `Sum(Table.Column)`.
fn split_query_ref(query_ref: &str) -> Option<(&str, &str)> {
    let mut inner = query_ref.trim();
    if let Some(open) = inner.find('(') {
        if inner.ends_with(')') {
            inner = &inner[open + 1..inner.len() - 1];
        }
    }
    let (table, column) = inner.split_once('.')?;
    Some((table, column))
}

/// Visual configs are stored as JSON documents inside JSON strings.
fn embedded_json(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text).ok(),
        Value::Object(_) => Some(value.clone()),
        _ => None,
    }
}

fn array_field<'a>(v: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    v.get(key)
        .and_then(|x| x.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
}
