use anyhow::{Context, Result};
use pbi_schema::{JsonStyle, serialize_model, serialize_raw};
use std::io::{self, Write};
use std::process::ExitCode;

use super::{extract_path, harvest_path, load_config};
use crate::output::diagnostics::report_diagnostics;

pub fn run(
    path: &str,
    raw: bool,
    output: Option<&str>,
    compact: bool,
    config: Option<&str>,
) -> Result<ExitCode> {
    let config = load_config(config)?;
    let style = if compact {
        JsonStyle::Compact
    } else {
        JsonStyle::Pretty
    };

    let (json, has_file_errors) = if raw {
        let harvest = harvest_path(path, &config)?;
        report_diagnostics(&harvest.file_errors, &harvest.warnings)?;
        let json = serialize_raw(&harvest, style).context("Failed to serialize raw fragments")?;
        (json, !harvest.file_errors.is_empty())
    } else {
        let extraction = extract_path(path, &config)?;
        report_diagnostics(&extraction.file_errors, &extraction.warnings)?;
        let json = serialize_model(&extraction.model, style).context("Failed to serialize model")?;
        (json, !extraction.file_errors.is_empty())
    };

    match output {
        Some(target) => std::fs::write(target, format!("{json}\n"))
            .with_context(|| format!("Failed to write output: {target}"))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}")?;
        }
    }

    Ok(if has_file_errors {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    })
}
