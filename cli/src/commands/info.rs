use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use super::{extract_path, load_config};
use crate::output::diagnostics::report_diagnostics;

pub fn run(path: &str, config: Option<&str>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let extraction = extract_path(path, &config)?;
    let model = &extraction.model;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let source = Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| path.into());

    writeln!(handle, "Source: {}", source)?;
    writeln!(handle, "Model: {}", model.name)?;
    if let Some(culture) = &model.culture {
        writeln!(handle, "Culture: {}", culture)?;
    }
    writeln!(
        handle,
        "Tables: {} ({} columns, {} measures)",
        model.tables.len(),
        model.column_count(),
        model.measure_count()
    )?;
    for table in &model.tables {
        let hidden = if table.is_hidden { " [hidden]" } else { "" };
        writeln!(
            handle,
            "  - \"{}\"{} {} columns, {} measures",
            table.name,
            hidden,
            table.columns.len(),
            table.measures.len()
        )?;
    }

    let active = model.relationships.iter().filter(|r| r.active).count();
    writeln!(
        handle,
        "Relationships: {} ({} active)",
        model.relationships.len(),
        active
    )?;
    for rel in &model.relationships {
        let state = if rel.active { "" } else { " (inactive)" };
        writeln!(handle, "  - {} {}{}", rel.label(), rel.cardinality.as_str(), state)?;
    }
    if !model.roles.is_empty() {
        writeln!(handle, "Roles: {}", model.roles.len())?;
    }
    if !extraction.visuals.is_empty() {
        writeln!(handle, "Visuals: {}", extraction.visuals.len())?;
        for visual in &extraction.visuals {
            let page = visual
                .page
                .as_deref()
                .map(|p| format!(" on \"{p}\""))
                .unwrap_or_default();
            let fields: Vec<String> = visual
                .fields
                .iter()
                .map(|f| format!("{}={}", f.role, f.field))
                .collect();
            writeln!(
                handle,
                "  - {}{} [{}]",
                visual.visual_type,
                page,
                fields.join(", ")
            )?;
        }
    }
    writeln!(handle, "Warnings: {}", extraction.warnings.len())?;
    writeln!(handle, "File errors: {}", extraction.file_errors.len())?;
    drop(handle);

    report_diagnostics(&extraction.file_errors, &extraction.warnings)?;

    Ok(if extraction.file_errors.is_empty() {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    })
}
