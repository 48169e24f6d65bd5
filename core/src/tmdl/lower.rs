//! Lowers a parsed block tree into raw entities.

use tracing::trace;

use super::line::split_column_ref;
use super::parse::{TmdlDocument, TmdlNode};
use crate::error::ExtractError;
use crate::model::Annotations;
use crate::raw::{
    RawColumn, RawFragment, RawMeasure, RawModelInfo, RawPartition, RawRelationship, RawRole,
    RawTable, SourceOrigin,
};

pub fn lower_document(doc: &TmdlDocument, origin: SourceOrigin) -> Result<RawFragment, ExtractError> {
    let mut fragment = RawFragment::new(origin);
    let file = doc.path.as_str();
    let mut loose = RawModelInfo::default();

    for node in &doc.nodes {
        match node.keyword.as_str() {
            "model" => {
                if fragment.model.is_some() {
                    return Err(ExtractError::malformed(
                        file,
                        node.line,
                        "model declared more than once in one file",
                    ));
                }
                fragment.model = Some(lower_model(node));
            }
            "table" => fragment.tables.push(lower_table(file, node)?),
            "relationship" => fragment.relationships.push(lower_relationship(file, node)?),
            "role" => fragment.roles.push(lower_role(node)),
            "cultureInfo" => {
                if let Some(name) = &node.name {
                    fragment.cultures.push(name.clone());
                }
            }
            "annotation" => {
                if let Some(name) = &node.name {
                    loose
                        .annotations
                        .insert(name.clone(), node.value.clone().unwrap_or_default());
                }
            }
            "ref" if node.object_type.as_deref() == Some("table") => {
                loose.table_order.extend(node.name.clone());
            }
            "queryGroup" => loose.query_groups.extend(node.name.clone()),
            other => trace!(file, keyword = other, line = node.line, "skipping block"),
        }
    }

    if loose != RawModelInfo::default() {
        let model = fragment.model.get_or_insert_with(RawModelInfo::default);
        model.table_order.append(&mut loose.table_order);
        model.query_groups.append(&mut loose.query_groups);
        model.annotations.append(&mut loose.annotations);
    }

    Ok(fragment)
}

fn lower_model(node: &TmdlNode) -> RawModelInfo {
    RawModelInfo {
        name: node.name.clone(),
        culture: node.text("culture").map(str::to_string),
        source_query_culture: node.text("sourceQueryCulture").map(str::to_string),
        table_order: node
            .children_of("ref")
            .filter(|r| r.object_type.as_deref() == Some("table"))
            .filter_map(|r| r.name.clone())
            .collect(),
        query_groups: Vec::new(),
        annotations: annotations(node),
    }
}

fn lower_table(file: &str, node: &TmdlNode) -> Result<RawTable, ExtractError> {
    let name = node.name.clone().unwrap_or_default();
    let mut table = RawTable {
        name,
        line: node.line,
        description: node.description.clone(),
        is_hidden: node.flag("isHidden"),
        annotations: annotations(node),
        ..Default::default()
    };

    for child in &node.children {
        match child.keyword.as_str() {
            "column" => table.columns.push(lower_column(child)),
            "measure" => table.measures.push(lower_measure(file, child)?),
            "partition" => table.partitions.push(RawPartition {
                name: child.name.clone().unwrap_or_default(),
                kind: child.value.clone(),
                mode: child.text("mode").map(str::to_string),
                source: child.text("source").map(str::to_string),
            }),
            _ => {}
        }
    }

    Ok(table)
}

fn lower_column(node: &TmdlNode) -> RawColumn {
    RawColumn {
        name: node.name.clone().unwrap_or_default(),
        line: node.line,
        data_type: node.text("dataType").map(str::to_string),
        source_column: node.text("sourceColumn").map(str::to_string),
        format_string: node.text("formatString").map(str::to_string),
        expression: node
            .value
            .clone()
            .or_else(|| node.text("expression").map(str::to_string)),
        summarize_by: node.text("summarizeBy").map(str::to_string),
        description: node.description.clone(),
        is_hidden: node.flag("isHidden"),
        annotations: annotations(node),
    }
}

fn lower_measure(file: &str, node: &TmdlNode) -> Result<RawMeasure, ExtractError> {
    let name = node.name.clone().unwrap_or_default();
    let expression = node
        .value
        .clone()
        .or_else(|| node.text("expression").map(str::to_string))
        .ok_or_else(|| {
            ExtractError::malformed(file, node.line, format!("measure '{name}' has no expression"))
        })?;

    Ok(RawMeasure {
        line: node.line,
        expression,
        format_string: node.text("formatString").map(str::to_string),
        description: node.description.clone(),
        display_folder: node.text("displayFolder").map(str::to_string),
        annotations: annotations(node),
        name,
    })
}

fn lower_relationship(file: &str, node: &TmdlNode) -> Result<RawRelationship, ExtractError> {
    let label = node.display_name();
    let endpoint = |key: &str| -> Result<(String, String), ExtractError> {
        let value = node.text(key).ok_or_else(|| {
            ExtractError::malformed(file, node.line, format!("relationship '{label}' has no {key}"))
        })?;
        split_column_ref(value).ok_or_else(|| {
            ExtractError::malformed(
                file,
                node.property(key).map_or(node.line, |p| p.line),
                format!("relationship '{label}': {key} '{value}' is not a qualified column reference"),
            )
        })
    };

    let (from_table, from_column) = endpoint("fromColumn")?;
    let (to_table, to_column) = endpoint("toColumn")?;

    Ok(RawRelationship {
        name: node.name.clone(),
        line: node.line,
        from_table,
        from_column,
        to_table,
        to_column,
        from_cardinality: node.text("fromCardinality").map(str::to_string),
        to_cardinality: node.text("toCardinality").map(str::to_string),
        cardinality: None,
        is_active: node.boolean("isActive"),
        cross_filtering_behavior: node.text("crossFilteringBehavior").map(str::to_string),
    })
}

fn lower_role(node: &TmdlNode) -> RawRole {
    RawRole {
        name: node.name.clone().unwrap_or_default(),
        model_permission: node.text("modelPermission").map(str::to_string),
        table_permissions: node
            .children_of("tablePermission")
            .map(|perm| {
                let filter = perm
                    .value
                    .clone()
                    .or_else(|| perm.text("filterExpression").map(str::to_string));
                (perm.name.clone().unwrap_or_default(), filter)
            })
            .collect(),
    }
}

fn annotations(node: &TmdlNode) -> Annotations {
    node.children_of("annotation")
        .filter_map(|a| {
            let name = a.name.clone()?;
            Some((name, a.value.clone().unwrap_or_default()))
        })
        .collect()
}
