use anyhow::Result;
use pbi_schema::{ErrorReport, ExtractError, Warning};
use std::io::{self, Write};

/// Writes per-file errors and warnings to stderr, one per line.
pub fn report_diagnostics(file_errors: &[ExtractError], warnings: &[Warning]) -> Result<()> {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    write_diagnostics(&mut handle, file_errors, warnings)
}

pub fn write_diagnostics<W: Write>(
    w: &mut W,
    file_errors: &[ExtractError],
    warnings: &[Warning],
) -> Result<()> {
    for err in file_errors {
        let report = ErrorReport::from(err);
        writeln!(w, "error[{}]: {}", report.code, report.message)?;
    }
    for warning in warnings {
        writeln!(w, "warning{}", warning)?;
    }
    Ok(())
}
