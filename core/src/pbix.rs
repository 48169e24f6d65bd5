//! Container parser: locates the model payload inside a `.pbix`/`.pbit`
//! archive and hands it to the matching reader.
//!
//! Payload kinds are tried in a fixed priority order, each located through
//! the configured [`LayoutPatterns`]:
//! 1. a modern `definition/` tree of text-model entries,
//! 2. the legacy JSON schema entry,
//! 3. the report layout, yielding table/column shells only.
//!
//! Anything below the first tier is reported as degraded extraction. The
//! report layout is read whenever present, for its visual inventory.

use tracing::debug;

use crate::config::{ExtractConfig, LayoutPatterns};
use crate::container::PbixContainer;
use crate::diagnostics::{Warning, WarningKind};
use crate::error::ExtractError;
use crate::raw::{SourceKind, SourceOrigin};
use crate::report_layout::{ReportLayout, parse_report_layout};
use crate::source::{SourceHarvest, TextEntry, parse_text_entries};
use crate::tabular_schema::parse_tabular_schema;

pub(crate) fn harvest_container(
    container: &mut PbixContainer,
    config: &ExtractConfig,
) -> Result<SourceHarvest, ExtractError> {
    let patterns = &config.layout;
    let mut names = container.entry_names();
    names.sort();

    let mut layout_warnings = Vec::new();
    let layout = match find_by_path(&names, &patterns.report_layout_entries) {
        Some(name) => {
            debug!(entry = %name, "reading report layout entry");
            let bytes = container.read_entry(name)?;
            match parse_report_layout(&bytes, SourceOrigin::new(SourceKind::ReportLayout, name)) {
                Ok(layout) => Some((name, layout)),
                Err(err) => {
                    layout_warnings.push(Warning::new(
                        WarningKind::SkippedEntry,
                        err.to_string(),
                        Some(name),
                    ));
                    None
                }
            }
        }
        None => None,
    };

    let visuals = layout
        .as_ref()
        .map(|(_, layout)| layout.visuals.clone())
        .unwrap_or_default();
    let mut harvest = harvest_model(container, &names, patterns, config, layout)?;
    harvest.warnings.append(&mut layout_warnings);
    harvest.visuals = visuals;
    Ok(harvest)
}

fn harvest_model(
    container: &mut PbixContainer,
    names: &[String],
    patterns: &LayoutPatterns,
    config: &ExtractConfig,
    layout: Option<(&str, ReportLayout)>,
) -> Result<SourceHarvest, ExtractError> {
    let definitions: Vec<&String> = names
        .iter()
        .filter(|name| is_definition_entry(name, patterns))
        .collect();
    if !definitions.is_empty() {
        debug!(entries = definitions.len(), "reading definition entries");
        let mut entries = Vec::with_capacity(definitions.len());
        for name in definitions {
            let bytes = container.read_entry(name)?;
            entries.push(TextEntry::from_bytes(name, &bytes));
        }
        return Ok(parse_text_entries(entries, SourceKind::ContainerDefinition, config));
    }

    let mut harvest = SourceHarvest::default();

    if let Some(name) = find_by_basename(names, &patterns.legacy_schema_entries) {
        debug!(entry = %name, "reading legacy schema entry");
        let bytes = container.read_entry(name)?;
        match parse_tabular_schema(&bytes, SourceOrigin::new(SourceKind::LegacySchema, name)) {
            Ok(schema) => {
                let detail = if schema.degraded {
                    "legacy schema has no table list; only measures were recovered"
                } else {
                    "legacy schema layout; extraction is degraded (no source positions or descriptions from definition files)"
                };
                harvest
                    .warnings
                    .push(Warning::new(WarningKind::UnsupportedLayout, detail, Some(name)));
                harvest.warnings.extend(schema.skipped_warnings(name));
                harvest.fragments.push(schema.fragment);
                return Ok(harvest);
            }
            Err(err) => harvest.warnings.push(Warning::new(
                WarningKind::SkippedEntry,
                err.to_string(),
                Some(name),
            )),
        }
    }

    if let Some((name, layout)) = layout {
        if layout.fragment.tables.is_empty() {
            harvest.warnings.push(Warning::new(
                WarningKind::SkippedEntry,
                "report layout references no fields",
                Some(name),
            ));
        } else {
            harvest.warnings.push(Warning::new(
                WarningKind::UnsupportedLayout,
                "no schema payload; table and column names recovered from report visuals, types unknown",
                Some(name),
            ));
            harvest.fragments.push(layout.fragment);
            return Ok(harvest);
        }
    }

    let detail = match find_by_basename(names, &patterns.legacy_binary_entries) {
        Some(name) => format!("container holds only a binary model backup ('{name}') that cannot be decoded"),
        None => "container holds no recognizable model payload".to_string(),
    };
    Err(ExtractError::UnsupportedLayout { detail })
}

fn is_definition_entry(name: &str, patterns: &LayoutPatterns) -> bool {
    let segments: Vec<&str> = name.split(['/', '\\']).collect();
    let Some((file, dirs)) = segments.split_last() else {
        return false;
    };
    let extension_matches = file
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(&patterns.definition_extension));
    extension_matches
        && dirs.iter().any(|dir| {
            patterns
                .definition_segments
                .iter()
                .any(|segment| dir.eq_ignore_ascii_case(segment))
        })
}

fn find_by_basename<'a>(names: &'a [String], basenames: &[String]) -> Option<&'a str> {
    basenames.iter().find_map(|wanted| {
        names
            .iter()
            .find(|name| {
                let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
                base.eq_ignore_ascii_case(wanted)
            })
            .map(String::as_str)
    })
}

fn find_by_path<'a>(names: &'a [String], paths: &[String]) -> Option<&'a str> {
    paths.iter().find_map(|wanted| {
        names
            .iter()
            .find(|name| name.trim_start_matches('/').eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    })
}
