//! Schema normalizer: merges the raw fragments of one project into a single
//! canonical [`Model`].
//!
//! Fragments are consumed in their source order, which keeps the output
//! deterministic. Merge rules:
//! - tables merge by case-insensitive name; a repeated declaration with an
//!   identical column set is ignored, any other repeat is a conflict;
//! - measure names are unique across the whole model;
//! - relationships that do not resolve are dropped with a warning, repeated
//!   ones are deduplicated, and a second active relationship between the same
//!   two tables is demoted to inactive;
//! - model annotations merge last, later fragments winning.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::data_type::ColumnType;
use crate::diagnostics::{Warning, WarningKind};
use crate::error::ExtractError;
use crate::hashing::column_set_fingerprint;
use crate::model::{
    Annotations, Cardinality, Column, Measure, Model, Partition, Relationship, Role, Table,
    TablePermission, name_key, table_pair_key,
};
use crate::raw::{RawColumn, RawFragment, RawMeasure, RawRelationship, RawTable};

const DEFAULT_MODEL_NAME: &str = "Model";
const ORPHAN_MEASURE_TABLE: &str = "Measures";

/// Merges `fragments` into one model. `fallback_name` names the model when
/// no fragment declares one.
pub fn normalize(
    fragments: &[RawFragment],
    fallback_name: Option<&str>,
) -> Result<(Model, Vec<Warning>), ExtractError> {
    let mut state = MergeState::default();

    for fragment in fragments {
        for table in &fragment.tables {
            state.merge_table(table, &fragment.origin.path)?;
        }
    }
    for fragment in fragments {
        for orphan in &fragment.orphan_measures {
            state.add_orphan_measure(orphan.owner.as_deref(), &orphan.measure, &fragment.origin.path)?;
        }
    }

    let info = ModelInfo::collect(fragments, fallback_name);
    let tables = state.ordered_tables(&info.table_order);

    let mut warnings = Vec::new();
    let relationships = resolve_relationships(fragments, &tables, &mut warnings);

    let model = Model {
        name: info.name,
        culture: info.culture,
        source_query_culture: info.source_query_culture,
        tables,
        relationships,
        annotations: info.annotations,
        roles: collect_roles(fragments),
        cultures: collect_cultures(fragments),
        query_groups: info.query_groups,
    };
    model.validate()?;

    debug!(
        tables = model.tables.len(),
        relationships = model.relationships.len(),
        warnings = warnings.len(),
        "normalized model"
    );
    Ok((model, warnings))
}

struct MergedTable {
    table: Table,
    origin: String,
    fingerprint: u128,
}

#[derive(Default)]
struct MergeState {
    tables: Vec<MergedTable>,
    by_name: FxHashMap<String, usize>,
    /// Measure name key to the table that declares it.
    measures: FxHashMap<String, String>,
}

impl MergeState {
    fn merge_table(&mut self, raw: &RawTable, origin: &str) -> Result<(), ExtractError> {
        let columns = convert_columns(raw, origin)?;
        let fingerprint = column_set_fingerprint(&raw.columns);
        let key = name_key(&raw.name);

        let idx = match self.by_name.get(&key) {
            Some(&idx) => {
                let existing = &self.tables[idx];
                if existing.fingerprint != fingerprint {
                    return Err(ExtractError::conflict(
                        &raw.name,
                        format!(
                            "table declared in '{}' and '{}' with different columns",
                            existing.origin, origin
                        ),
                    ));
                }
                debug!(table = %raw.name, first = %existing.origin, repeat = %origin, "ignoring identical table declaration");
                idx
            }
            None => {
                self.tables.push(MergedTable {
                    table: Table {
                        name: raw.name.clone(),
                        columns,
                        measures: Vec::new(),
                        description: raw.description.clone(),
                        is_hidden: raw.is_hidden,
                        partitions: raw
                            .partitions
                            .iter()
                            .map(|p| Partition {
                                name: p.name.clone(),
                                kind: p.kind.clone(),
                                mode: p.mode.clone(),
                                source: p.source.clone(),
                            })
                            .collect(),
                        annotations: raw.annotations.clone(),
                    },
                    origin: origin.to_string(),
                    fingerprint,
                });
                self.by_name.insert(key, self.tables.len() - 1);
                self.tables.len() - 1
            }
        };

        for measure in &raw.measures {
            self.add_measure(idx, measure, origin)?;
        }
        Ok(())
    }

    fn add_measure(&mut self, idx: usize, raw: &RawMeasure, origin: &str) -> Result<(), ExtractError> {
        let key = name_key(&raw.name);
        let table = &mut self.tables[idx].table;

        if let Some(owner) = self.measures.get(&key) {
            let repeated = name_key(owner) == name_key(&table.name)
                && table
                    .measures
                    .iter()
                    .any(|m| name_key(&m.name) == key && m.expression == raw.expression);
            if repeated {
                trace!(measure = %raw.name, table = %table.name, "ignoring repeated measure");
                return Ok(());
            }
            return Err(ExtractError::conflict(
                &raw.name,
                format!(
                    "measure name must be unique across the model (declared in '{owner}' and again in '{}' at {origin}:{})",
                    table.name, raw.line
                ),
            ));
        }

        self.measures.insert(key, table.name.clone());
        table.measures.push(Measure {
            name: raw.name.clone(),
            expression: raw.expression.clone(),
            format: raw.format_string.clone(),
            description: raw.description.clone(),
            display_folder: raw.display_folder.clone(),
            annotations: raw.annotations.clone(),
        });
        Ok(())
    }

    /// Places a measure recovered without a table declaration on the table
    /// named by its owner hint, creating an empty shell when needed.
    fn add_orphan_measure(
        &mut self,
        owner: Option<&str>,
        raw: &RawMeasure,
        origin: &str,
    ) -> Result<(), ExtractError> {
        let owner = owner
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(ORPHAN_MEASURE_TABLE);
        let key = name_key(owner);
        let idx = match self.by_name.get(&key) {
            Some(&idx) => idx,
            None => {
                self.tables.push(MergedTable {
                    table: Table {
                        name: owner.to_string(),
                        ..Default::default()
                    },
                    origin: origin.to_string(),
                    fingerprint: column_set_fingerprint(&[]),
                });
                self.by_name.insert(key, self.tables.len() - 1);
                self.tables.len() - 1
            }
        };
        self.add_measure(idx, raw, origin)
    }

    /// Tables listed by the model come first in that order, then the rest in
    /// source order.
    fn ordered_tables(self, table_order: &[String]) -> Vec<Table> {
        let mut slots: Vec<Option<Table>> = self.tables.into_iter().map(|m| Some(m.table)).collect();
        let mut ordered = Vec::with_capacity(slots.len());

        for name in table_order {
            if let Some(&idx) = self.by_name.get(&name_key(name)) {
                if let Some(table) = slots[idx].take() {
                    ordered.push(table);
                }
            }
        }
        ordered.extend(slots.into_iter().flatten());
        ordered
    }
}

fn convert_columns(raw: &RawTable, origin: &str) -> Result<Vec<Column>, ExtractError> {
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    let mut columns = Vec::with_capacity(raw.columns.len());

    for column in &raw.columns {
        if let Some(first_line) = seen.insert(name_key(&column.name), column.line) {
            return Err(ExtractError::conflict(
                format!("{}[{}]", raw.name, column.name),
                format!(
                    "column declared more than once in its table ({origin}:{first_line} and {origin}:{})",
                    column.line
                ),
            ));
        }
        columns.push(convert_column(column));
    }
    Ok(columns)
}

fn convert_column(raw: &RawColumn) -> Column {
    Column {
        name: raw.name.clone(),
        data_type: ColumnType::from_declared(raw.data_type.as_deref()),
        source_column: raw.source_column.clone(),
        format: raw.format_string.clone(),
        expression: raw.expression.clone(),
        summarize_by: raw.summarize_by.clone(),
        description: raw.description.clone(),
        is_hidden: raw.is_hidden,
        annotations: raw.annotations.clone(),
    }
}

struct ModelInfo {
    name: String,
    culture: Option<String>,
    source_query_culture: Option<String>,
    table_order: Vec<String>,
    query_groups: Vec<String>,
    annotations: Annotations,
}

impl ModelInfo {
    fn collect(fragments: &[RawFragment], fallback_name: Option<&str>) -> ModelInfo {
        let mut name: Option<String> = None;
        let mut culture = None;
        let mut source_query_culture = None;
        let mut table_order: Vec<String> = Vec::new();
        let mut ordered: FxHashSet<String> = FxHashSet::default();
        let mut query_groups: Vec<String> = Vec::new();
        let mut annotations = Annotations::new();

        for info in fragments.iter().filter_map(|f| f.model.as_ref()) {
            if name.is_none() {
                name = info.name.clone().filter(|n| !n.trim().is_empty());
            }
            if info.culture.is_some() {
                culture = info.culture.clone();
            }
            if info.source_query_culture.is_some() {
                source_query_culture = info.source_query_culture.clone();
            }
            for table in &info.table_order {
                if ordered.insert(name_key(table)) {
                    table_order.push(table.clone());
                }
            }
            for group in &info.query_groups {
                if !query_groups.iter().any(|g| g == group) {
                    query_groups.push(group.clone());
                }
            }
            // Later fragments override earlier ones key by key.
            annotations.extend(info.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let name = name
            .or_else(|| fallback_name.map(str::to_string).filter(|n| !n.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());

        ModelInfo {
            name,
            culture,
            source_query_culture,
            table_order,
            query_groups,
            annotations,
        }
    }
}

type EndpointKey = (String, String, String, String);

fn resolve_relationships(
    fragments: &[RawFragment],
    tables: &[Table],
    warnings: &mut Vec<Warning>,
) -> Vec<Relationship> {
    let by_name: FxHashMap<String, &Table> = tables.iter().map(|t| (name_key(&t.name), t)).collect();

    let mut out: Vec<Relationship> = Vec::new();
    let mut seen: FxHashMap<EndpointKey, usize> = FxHashMap::default();
    let mut active_pairs: FxHashSet<(String, String)> = FxHashSet::default();

    for fragment in fragments {
        let source = fragment.origin.path.as_str();
        for raw in &fragment.relationships {
            let label = format!(
                "{}[{}] -> {}[{}]",
                raw.from_table, raw.from_column, raw.to_table, raw.to_column
            );

            let from = resolve_endpoint(&by_name, &raw.from_table, &raw.from_column);
            let to = resolve_endpoint(&by_name, &raw.to_table, &raw.to_column);
            let ((from_table, from_column), (to_table, to_column)) = match (from, to) {
                (Ok(from), Ok(to)) => (from, to),
                (Err(missing), _) | (_, Err(missing)) => {
                    warnings.push(Warning::new(
                        WarningKind::DanglingRelationship,
                        format!("relationship {label} dropped: {missing}"),
                        Some(source),
                    ));
                    continue;
                }
            };

            let mut rel = Relationship {
                name: raw.name.clone(),
                from_table,
                from_column,
                to_table,
                to_column,
                cardinality: cardinality_of(raw),
                active: raw.is_active.unwrap_or(true),
                cross_filtering_behavior: raw.cross_filtering_behavior.clone(),
            };

            let key = (
                name_key(&rel.from_table),
                name_key(&rel.from_column),
                name_key(&rel.to_table),
                name_key(&rel.to_column),
            );
            if let Some(&idx) = seen.get(&key) {
                let first = &out[idx];
                let differs = first.cardinality != rel.cardinality
                    || first.active != rel.active
                    || first.cross_filtering_behavior != rel.cross_filtering_behavior;
                if differs {
                    warnings.push(Warning::new(
                        WarningKind::DuplicateRelationship,
                        format!("relationship {label} declared again with different properties; first declaration kept"),
                        Some(source),
                    ));
                } else {
                    trace!(relationship = %label, "ignoring repeated relationship");
                }
                continue;
            }

            if rel.active && !active_pairs.insert(table_pair_key(&rel.from_table, &rel.to_table)) {
                warnings.push(Warning::new(
                    WarningKind::AmbiguousActiveRelationship,
                    format!(
                        "relationship {label} made inactive: tables '{}' and '{}' already have an active relationship",
                        rel.from_table, rel.to_table
                    ),
                    Some(source),
                ));
                rel.active = false;
            }

            seen.insert(key, out.len());
            out.push(rel);
        }
    }

    out
}

/// Resolves a weak name reference, returning the declared casing.
fn resolve_endpoint(
    by_name: &FxHashMap<String, &Table>,
    table: &str,
    column: &str,
) -> Result<(String, String), String> {
    let Some(resolved) = by_name.get(&name_key(table)) else {
        return Err(format!("table '{table}' not found"));
    };
    let key = name_key(column);
    let Some(col) = resolved.columns.iter().find(|c| name_key(&c.name) == key) else {
        return Err(format!("column '{}[{column}]' not found", resolved.name));
    };
    Ok((resolved.name.clone(), col.name.clone()))
}

fn cardinality_of(raw: &RawRelationship) -> Cardinality {
    raw.cardinality
        .as_deref()
        .and_then(Cardinality::parse)
        .unwrap_or_else(|| {
            Cardinality::from_ends(raw.from_cardinality.as_deref(), raw.to_cardinality.as_deref())
        })
}

fn collect_roles(fragments: &[RawFragment]) -> Vec<Role> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    fragments
        .iter()
        .flat_map(|f| f.roles.iter())
        .filter(|r| seen.insert(name_key(&r.name)))
        .map(|r| Role {
            name: r.name.clone(),
            model_permission: r.model_permission.clone(),
            table_permissions: r
                .table_permissions
                .iter()
                .map(|(table, filter)| TablePermission {
                    table: table.clone(),
                    filter_expression: filter.clone(),
                })
                .collect(),
        })
        .collect()
}

fn collect_cultures(fragments: &[RawFragment]) -> Vec<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    fragments
        .iter()
        .flat_map(|f| f.cultures.iter())
        .filter(|c| seen.insert(name_key(c)))
        .cloned()
        .collect()
}
