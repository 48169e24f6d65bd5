//! Reader for JSON model descriptions: the legacy `DataModelSchema` entry of
//! a container and the `model.bim` file of a project.

use serde_json::Value;
use thiserror::Error;

use crate::diagnostics::{Warning, WarningKind};
use crate::model::Annotations;
use crate::raw::{
    RawColumn, RawFragment, RawMeasure, RawModelInfo, RawOrphanMeasure, RawPartition,
    RawRelationship, RawRole, RawTable, SourceOrigin,
};
use crate::text_decode::{TextDecodeError, decode_text};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TabularSchemaError {
    #[error("schema text could not be decoded: {0}")]
    Decode(#[from] TextDecodeError),
    #[error("schema JSON parse error: {0}")]
    Json(String),
}

/// Raw entities read from one JSON model description.
#[derive(Debug, Clone)]
pub(crate) struct TabularSchema {
    pub fragment: RawFragment,
    /// True when `model.tables` was missing and only measures could be
    /// collected by walking the whole document.
    pub degraded: bool,
    /// Objects that were present but unusable, one line each.
    pub skipped: Vec<String>,
}

impl TabularSchema {
    /// One `SkippedEntry` warning per unusable object, attributed to `source`.
    pub(crate) fn skipped_warnings(&self, source: &str) -> impl Iterator<Item = Warning> + '_ {
        let source = source.to_string();
        self.skipped
            .iter()
            .map(move |detail| Warning::new(WarningKind::SkippedEntry, detail.clone(), Some(source.as_str())))
    }
}

pub(crate) fn parse_tabular_schema(
    bytes: &[u8],
    origin: SourceOrigin,
) -> Result<TabularSchema, TabularSchemaError> {
    let text = decode_text(bytes)?;
    let v: Value =
        serde_json::from_str(&text).map_err(|e| TabularSchemaError::Json(e.to_string()))?;

    let mut fragment = RawFragment::new(origin);
    let mut skipped = Vec::new();

    if try_collect_from_model_tables(&v, &mut fragment, &mut skipped) {
        return Ok(TabularSchema {
            fragment,
            degraded: false,
            skipped,
        });
    }

    collect_measures_anywhere(&v, None, &mut fragment.orphan_measures);
    Ok(TabularSchema {
        fragment,
        degraded: true,
        skipped,
    })
}

fn try_collect_from_model_tables(v: &Value, out: &mut RawFragment, skipped: &mut Vec<String>) -> bool {
    let Some(model) = v.get("model") else {
        return false;
    };
    let Some(tables) = model.get("tables").and_then(|t| t.as_array()) else {
        return false;
    };

    out.model = Some(RawModelInfo {
        name: opt_string_field(v, "name").or_else(|| opt_string_field(model, "name")),
        culture: opt_string_field(model, "culture"),
        source_query_culture: opt_string_field(model, "sourceQueryCulture"),
        table_order: Vec::new(),
        query_groups: Vec::new(),
        annotations: annotations(model),
    });

    for (idx, t) in tables.iter().enumerate() {
        match parse_table_obj(t, skipped) {
            Some(table) => out.tables.push(table),
            None => skipped.push(format!("table #{} has no name; skipped", idx + 1)),
        }
    }

    for (idx, rel) in array_field(model, "relationships").enumerate() {
        match parse_relationship_obj(rel) {
            Ok(raw_rel) => out.relationships.push(raw_rel),
            Err(missing) => {
                let label = opt_string_field(rel, "name").unwrap_or_else(|| format!("#{}", idx + 1));
                skipped.push(format!("relationship '{label}' has no {missing}; skipped"));
            }
        }
    }

    for role in array_field(model, "roles") {
        if let Some(name) = opt_string_field(role, "name") {
            out.roles.push(RawRole {
                name,
                model_permission: opt_string_field(role, "modelPermission"),
                table_permissions: array_field(role, "tablePermissions")
                    .filter_map(|p| {
                        let table = opt_string_field(p, "name")?;
                        Some((table, text_field(p, "filterExpression")))
                    })
                    .collect(),
            });
        }
    }

    out.cultures = array_field(model, "cultures")
        .filter_map(|c| opt_string_field(c, "name"))
        .collect();

    true
}

fn parse_table_obj(v: &Value, skipped: &mut Vec<String>) -> Option<RawTable> {
    let name = opt_string_field(v, "name")?;
    let mut columns = Vec::new();
    for c in array_field(v, "columns") {
        match parse_column_obj(c) {
            Some(column) => columns.push(column),
            None => skipped.push(format!("column without a name in table '{name}'; skipped")),
        }
    }
    let mut measures = Vec::new();
    for m in array_field(v, "measures") {
        match parse_measure_obj(m) {
            Some(measure) => measures.push(measure),
            None => skipped.push(format!("measure without a name in table '{name}'; skipped")),
        }
    }
    Some(RawTable {
        line: 0,
        description: text_field(v, "description"),
        is_hidden: bool_field(v, "isHidden").unwrap_or(false),
        columns,
        measures,
        partitions: array_field(v, "partitions")
            .filter_map(parse_partition_obj)
            .collect(),
        annotations: annotations(v),
        name,
    })
}

fn parse_column_obj(v: &Value) -> Option<RawColumn> {
    let name = opt_string_field(v, "name")?;
    // Legacy layouts may carry the numeric type code instead of its name.
    let data_type = match v.get("dataType") {
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => opt_string_field(v, "dataType"),
    };

    Some(RawColumn {
        name,
        line: 0,
        data_type,
        source_column: opt_string_field(v, "sourceColumn"),
        format_string: opt_string_field(v, "formatString"),
        expression: text_field(v, "expression"),
        summarize_by: opt_string_field(v, "summarizeBy"),
        description: text_field(v, "description"),
        is_hidden: bool_field(v, "isHidden").unwrap_or(false),
        annotations: annotations(v),
    })
}

fn parse_measure_obj(v: &Value) -> Option<RawMeasure> {
    let name = opt_string_field(v, "name")?;
    Some(RawMeasure {
        name,
        line: 0,
        expression: text_field(v, "expression").unwrap_or_default(),
        format_string: opt_string_field(v, "formatString"),
        description: text_field(v, "description"),
        display_folder: opt_string_field(v, "displayFolder"),
        annotations: annotations(v),
    })
}

fn parse_partition_obj(v: &Value) -> Option<RawPartition> {
    let name = opt_string_field(v, "name")?;
    let source = v.get("source");
    Some(RawPartition {
        name,
        kind: source.and_then(|s| opt_string_field(s, "type")),
        mode: opt_string_field(v, "mode"),
        source: source.and_then(|s| text_field(s, "expression").or_else(|| text_field(s, "query"))),
    })
}

/// Err names the first missing endpoint field.
fn parse_relationship_obj(v: &Value) -> Result<RawRelationship, &'static str> {
    let endpoint = |key: &'static str| opt_string_field(v, key).ok_or(key);
    Ok(RawRelationship {
        name: opt_string_field(v, "name"),
        line: 0,
        from_table: endpoint("fromTable")?,
        from_column: endpoint("fromColumn")?,
        to_table: endpoint("toTable")?,
        to_column: endpoint("toColumn")?,
        from_cardinality: opt_string_field(v, "fromCardinality"),
        to_cardinality: opt_string_field(v, "toCardinality"),
        cardinality: opt_string_field(v, "cardinality"),
        is_active: bool_field(v, "isActive"),
        cross_filtering_behavior: opt_string_field(v, "crossFilteringBehavior"),
    })
}

fn collect_measures_anywhere(v: &Value, owner: Option<&str>, out: &mut Vec<RawOrphanMeasure>) {
    match v {
        Value::Object(map) => {
            let next_owner = map.get("name").and_then(|x| x.as_str()).or(owner);

            if let Some(measures) = map.get("measures").and_then(|m| m.as_array()) {
                for m in measures {
                    if let Some(measure) = parse_measure_obj(m) {
                        out.push(RawOrphanMeasure {
                            owner: next_owner.map(str::to_string),
                            measure,
                        });
                    }
                }
            }

            for (key, child) in map {
                if key != "measures" {
                    collect_measures_anywhere(child, next_owner, out);
                }
            }
        }
        Value::Array(arr) => {
            for child in arr {
                collect_measures_anywhere(child, owner, out);
            }
        }
        _ => {}
    }
}

fn array_field<'a>(v: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    v.get(key)
        .and_then(|x| x.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
}

fn annotations(v: &Value) -> Annotations {
    array_field(v, "annotations")
        .filter_map(|a| {
            let name = opt_string_field(a, "name")?;
            Some((name, text_field(a, "value").unwrap_or_default()))
        })
        .collect()
}

fn opt_string_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|x| x.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// A text field that may be written as one string or as an array of lines.
fn text_field(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(lines) => {
            let lines: Vec<&str> = lines.iter().filter_map(|l| l.as_str()).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

fn bool_field(v: &Value, key: &str) -> Option<bool> {
    match v.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(!s.eq_ignore_ascii_case("false")),
        _ => None,
    }
}
