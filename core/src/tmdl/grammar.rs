//! Which block keywords may open a child block in which context.
//!
//! Anything not listed for the enclosing block is a malformed definition;
//! property lines (`key: value`, `key = value`, bare flags) are not
//! restricted here.

pub(crate) const DOCUMENT: &str = "document";
/// Context of lines nested under a property line; only properties and flags.
pub(crate) const PROPERTY: &str = "property";

const DOCUMENT_BLOCKS: &[&str] = &[
    "database",
    "model",
    "table",
    "relationship",
    "role",
    "cultureInfo",
    "expression",
    "dataSource",
    "perspective",
    "function",
    "queryGroup",
    // model.tmdl lists these at column 0 after the model block.
    "annotation",
    "ref",
];

const MODEL_BLOCKS: &[&str] = &["annotation", "ref", "queryGroup", "extendedProperty"];

const TABLE_BLOCKS: &[&str] = &[
    "column",
    "measure",
    "partition",
    "hierarchy",
    "calculationGroup",
    "refreshPolicy",
    "annotation",
    "extendedProperty",
];

const COLUMN_BLOCKS: &[&str] = &["annotation", "variation", "alternateOf", "extendedProperty"];
const MEASURE_BLOCKS: &[&str] = &["annotation", "kpi", "extendedProperty"];
const HIERARCHY_BLOCKS: &[&str] = &["level", "annotation", "extendedProperty"];
const ROLE_BLOCKS: &[&str] = &["tablePermission", "member", "annotation", "extendedProperty"];
const TABLE_PERMISSION_BLOCKS: &[&str] = &["columnPermission", "annotation"];
const PERSPECTIVE_BLOCKS: &[&str] = &["perspectiveTable", "annotation"];
const PERSPECTIVE_TABLE_BLOCKS: &[&str] = &[
    "perspectiveColumn",
    "perspectiveMeasure",
    "perspectiveHierarchy",
    "annotation",
];
const CALCULATION_GROUP_BLOCKS: &[&str] = &["calculationItem", "annotation"];
const ANNOTATED: &[&str] = &["annotation", "extendedProperty"];
const LEAF: &[&str] = &[];

/// Blocks that are written without a name (`kpi`, `refreshPolicy`, ...).
const UNNAMED_BLOCKS: &[&str] = &["calculationGroup", "refreshPolicy", "kpi", "alternateOf"];

pub(crate) fn allowed_blocks(context: &str) -> &'static [&'static str] {
    match context {
        DOCUMENT => DOCUMENT_BLOCKS,
        "model" => MODEL_BLOCKS,
        "table" => TABLE_BLOCKS,
        "column" => COLUMN_BLOCKS,
        "measure" => MEASURE_BLOCKS,
        "hierarchy" => HIERARCHY_BLOCKS,
        "role" => ROLE_BLOCKS,
        "tablePermission" => TABLE_PERMISSION_BLOCKS,
        "perspective" => PERSPECTIVE_BLOCKS,
        "perspectiveTable" => PERSPECTIVE_TABLE_BLOCKS,
        "calculationGroup" => CALCULATION_GROUP_BLOCKS,
        "annotation" | "extendedProperty" | "ref" | PROPERTY => LEAF,
        _ => ANNOTATED,
    }
}

pub(crate) fn is_block(context: &str, keyword: &str) -> bool {
    allowed_blocks(context).contains(&keyword)
}

pub(crate) fn is_unnamed_block(context: &str, keyword: &str) -> bool {
    UNNAMED_BLOCKS.contains(&keyword) && is_block(context, keyword)
}
