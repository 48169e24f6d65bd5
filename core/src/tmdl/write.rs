//! Renders a canonical [`Model`] as a set of definition files that parse back
//! to the same model.

use rustc_hash::FxHashSet;

use super::line::quote_name;
use crate::model::{Annotations, Column, Measure, Model, Partition, Relationship, Role, Table};

/// One rendered definition file; `path` is relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmdlFile {
    pub path: String,
    pub text: String,
}

/// Renders `model` as `definition/model.tmdl`, one file per table under
/// `definition/tables/`, `definition/relationships.tmdl`, and one file per
/// role and culture.
pub fn write_model(model: &Model) -> Vec<TmdlFile> {
    let mut files = Vec::new();
    let mut used: FxHashSet<String> = FxHashSet::default();

    files.push(TmdlFile {
        path: "definition/model.tmdl".to_string(),
        text: render_model(model),
    });

    for table in &model.tables {
        let mut out = Writer::default();
        write_table(&mut out, table);
        files.push(TmdlFile {
            path: unique_path("definition/tables", &table.name, &mut used),
            text: out.finish(),
        });
    }

    if !model.relationships.is_empty() {
        let mut out = Writer::default();
        for (idx, rel) in model.relationships.iter().enumerate() {
            if idx > 0 {
                out.blank();
            }
            write_relationship(&mut out, rel);
        }
        files.push(TmdlFile {
            path: "definition/relationships.tmdl".to_string(),
            text: out.finish(),
        });
    }

    for role in &model.roles {
        let mut out = Writer::default();
        write_role(&mut out, role);
        files.push(TmdlFile {
            path: unique_path("definition/roles", &role.name, &mut used),
            text: out.finish(),
        });
    }

    for culture in &model.cultures {
        let mut out = Writer::default();
        out.line(0, &format!("cultureInfo {}", quote_name(culture)));
        files.push(TmdlFile {
            path: unique_path("definition/cultures", culture, &mut used),
            text: out.finish(),
        });
    }

    files
}

/// Writes the rendered files below `root`, creating directories as needed.
#[cfg(feature = "std-fs")]
pub fn write_model_to_dir(model: &Model, root: &std::path::Path) -> std::io::Result<Vec<TmdlFile>> {
    let files = write_model(model);
    for file in &files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &file.text)?;
    }
    Ok(files)
}

#[derive(Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn description(&mut self, depth: usize, description: Option<&str>) {
        if let Some(text) = description {
            for line in text.split('\n') {
                if line.is_empty() {
                    self.line(depth, "///");
                } else {
                    self.line(depth, &format!("/// {line}"));
                }
            }
        }
    }

    /// Writes `head = value`, choosing the inline, indented or fenced form
    /// so the value parses back unchanged.
    fn assignment(&mut self, depth: usize, head: &str, value: &str) {
        let single_line = !value.contains('\n') && !value.is_empty() && value.trim() == value;
        if single_line && value != "```" {
            self.line(depth, &format!("{head} = {value}"));
            return;
        }

        let first_flush = value
            .split('\n')
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| !l.starts_with([' ', '\t']));
        let clean = value
            .split('\n')
            .all(|l| l.trim_end() == l && l.trim() != "```");
        let ends_clean = !value.ends_with('\n');

        if first_flush && clean && ends_clean {
            self.line(depth, &format!("{head} ="));
            for line in value.split('\n') {
                if line.is_empty() {
                    self.blank();
                } else {
                    self.line(depth + 2, line);
                }
            }
        } else {
            self.line(depth, &format!("{head} = ```"));
            for line in value.split('\n') {
                if line.is_empty() {
                    self.blank();
                } else {
                    self.line(depth + 1, line);
                }
            }
            self.line(depth + 1, "```");
        }
    }

    fn annotations(&mut self, depth: usize, annotations: &Annotations) {
        for (key, value) in annotations {
            self.assignment(depth, &format!("annotation {}", quote_name(key)), value);
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn render_model(model: &Model) -> String {
    let mut out = Writer::default();
    out.line(0, &format!("model {}", quote_name(&model.name)));
    if let Some(culture) = &model.culture {
        out.line(1, &format!("culture: {culture}"));
    }
    if let Some(culture) = &model.source_query_culture {
        out.line(1, &format!("sourceQueryCulture: {culture}"));
    }
    out.annotations(1, &model.annotations);
    if !model.tables.is_empty() {
        out.blank();
    }
    for table in &model.tables {
        out.line(1, &format!("ref table {}", quote_name(&table.name)));
    }
    for group in &model.query_groups {
        out.blank();
        out.line(0, &format!("queryGroup {}", quote_name(group)));
    }
    out.finish()
}

fn write_table(out: &mut Writer, table: &Table) {
    out.description(0, table.description.as_deref());
    out.line(0, &format!("table {}", quote_name(&table.name)));
    if table.is_hidden {
        out.line(1, "isHidden");
    }

    for column in &table.columns {
        out.blank();
        write_column(out, column);
    }
    for measure in &table.measures {
        out.blank();
        write_measure(out, measure);
    }
    for partition in &table.partitions {
        out.blank();
        write_partition(out, partition);
    }
    if !table.annotations.is_empty() {
        out.blank();
        out.annotations(1, &table.annotations);
    }
}

fn write_column(out: &mut Writer, column: &Column) {
    out.description(1, column.description.as_deref());
    let head = format!("column {}", quote_name(&column.name));
    match &column.expression {
        Some(expression) => out.assignment(1, &head, expression),
        None => out.line(1, &head),
    }
    out.line(2, &format!("dataType: {}", column.data_type.tmdl_name()));
    if let Some(source) = &column.source_column {
        out.line(2, &format!("sourceColumn: {source}"));
    }
    if let Some(format) = &column.format {
        out.line(2, &format!("formatString: {format}"));
    }
    if let Some(summarize_by) = &column.summarize_by {
        out.line(2, &format!("summarizeBy: {summarize_by}"));
    }
    if column.is_hidden {
        out.line(2, "isHidden");
    }
    out.annotations(2, &column.annotations);
}

fn write_measure(out: &mut Writer, measure: &Measure) {
    out.description(1, measure.description.as_deref());
    out.assignment(1, &format!("measure {}", quote_name(&measure.name)), &measure.expression);
    if let Some(format) = &measure.format {
        out.line(2, &format!("formatString: {format}"));
    }
    if let Some(folder) = &measure.display_folder {
        out.line(2, &format!("displayFolder: {folder}"));
    }
    out.annotations(2, &measure.annotations);
}

fn write_partition(out: &mut Writer, partition: &Partition) {
    let head = format!("partition {}", quote_name(&partition.name));
    match &partition.kind {
        Some(kind) => out.line(1, &format!("{head} = {kind}")),
        None => out.line(1, &head),
    }
    if let Some(mode) = &partition.mode {
        out.line(2, &format!("mode: {mode}"));
    }
    if let Some(source) = &partition.source {
        out.assignment(2, "source", source);
    }
}

fn write_relationship(out: &mut Writer, rel: &Relationship) {
    let name = rel.name.clone().unwrap_or_else(|| {
        format!(
            "{}_{}_{}_{}",
            rel.from_table, rel.from_column, rel.to_table, rel.to_column
        )
    });
    let (from_cardinality, to_cardinality) = rel.cardinality.ends();

    out.line(0, &format!("relationship {}", quote_name(&name)));
    out.line(
        1,
        &format!("fromColumn: {}.{}", quote_name(&rel.from_table), quote_name(&rel.from_column)),
    );
    out.line(
        1,
        &format!("toColumn: {}.{}", quote_name(&rel.to_table), quote_name(&rel.to_column)),
    );
    out.line(1, &format!("fromCardinality: {from_cardinality}"));
    out.line(1, &format!("toCardinality: {to_cardinality}"));
    if !rel.active {
        out.line(1, "isActive: false");
    }
    if let Some(behavior) = &rel.cross_filtering_behavior {
        out.line(1, &format!("crossFilteringBehavior: {behavior}"));
    }
}

fn write_role(out: &mut Writer, role: &Role) {
    out.line(0, &format!("role {}", quote_name(&role.name)));
    if let Some(permission) = &role.model_permission {
        out.line(1, &format!("modelPermission: {permission}"));
    }
    for perm in &role.table_permissions {
        let head = format!("tablePermission {}", quote_name(&perm.table));
        match &perm.filter_expression {
            Some(filter) => out.assignment(1, &head, filter),
            None => out.line(1, &head),
        }
    }
}

fn unique_path(dir: &str, name: &str, used: &mut FxHashSet<String>) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem.trim().is_empty() { "_".to_string() } else { stem };

    let mut candidate = format!("{dir}/{stem}.tmdl");
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{dir}/{stem}-{n}.tmdl");
        n += 1;
    }
    candidate
}
