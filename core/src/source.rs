//! Raw entity sources: every project representation the crate can read,
//! behind one capability that yields raw fragments for the normalizer.

#[cfg(feature = "std-fs")]
use std::path::{Path, PathBuf};

use std::io::{Read, Seek};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::container::PbixContainer;
use crate::diagnostics::{Warning, WarningKind};
use crate::error::ExtractError;
use crate::pbix::harvest_container;
use crate::raw::{RawFragment, SourceKind, SourceOrigin};
use crate::report_layout::Visual;
use crate::tabular_schema::parse_tabular_schema;
use crate::text_decode::decode_text;
use crate::tmdl;

/// Everything a source recovered before normalization.
#[derive(Debug, Clone, Default)]
pub struct SourceHarvest {
    /// Fragments in deterministic source order.
    pub fragments: Vec<RawFragment>,
    /// Per-file `MalformedDefinition` errors.
    pub file_errors: Vec<ExtractError>,
    pub warnings: Vec<Warning>,
    /// Model name to use when no fragment declares one.
    pub fallback_name: Option<String>,
    /// Visuals listed in a container's report layout.
    pub visuals: Vec<Visual>,
}

/// A project representation that can produce raw entity fragments.
///
/// Implementations own their input and release it (file handles, archives)
/// before `harvest` returns.
pub trait RawEntitySource {
    /// Short human-readable label used in logs.
    fn describe(&self) -> String;

    fn harvest(self, config: &ExtractConfig) -> Result<SourceHarvest, ExtractError>
    where
        Self: Sized;
}

/// A text-model project directory on disk.
#[cfg(feature = "std-fs")]
#[derive(Debug, Clone)]
pub struct TextProject {
    root: PathBuf,
}

#[cfg(feature = "std-fs")]
impl TextProject {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(feature = "std-fs")]
impl RawEntitySource for TextProject {
    fn describe(&self) -> String {
        format!("text project {}", self.root.display())
    }

    fn harvest(self, config: &ExtractConfig) -> Result<SourceHarvest, ExtractError> {
        let files = tmdl::scan_project(&self.root, &config.scan)?;
        let entries = files
            .into_iter()
            .map(|f| TextEntry {
                path: f.path,
                text: f.text,
            })
            .collect();
        let mut harvest = parse_text_entries(entries, SourceKind::TextModel, config);
        harvest.fallback_name = project_name(&self.root);
        Ok(harvest)
    }
}

/// Definition files held in memory, e.g. an uploaded set of `.tmdl` files.
/// Files ending in `.bim` are read as JSON model descriptions.
#[derive(Debug, Clone)]
pub struct TextFiles {
    name: String,
    files: Vec<(String, String)>,
}

impl TextFiles {
    pub fn new<P, T>(name: impl Into<String>, files: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            files: files
                .into_iter()
                .map(|(path, text)| (path.into(), text.into()))
                .collect(),
        }
    }
}

impl RawEntitySource for TextFiles {
    fn describe(&self) -> String {
        format!("{} in-memory files of {}", self.files.len(), self.name)
    }

    fn harvest(self, config: &ExtractConfig) -> Result<SourceHarvest, ExtractError> {
        let mut entries: Vec<TextEntry> = self
            .files
            .into_iter()
            .map(|(path, text)| TextEntry {
                path: path.replace('\\', "/"),
                text: Ok(text),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        let mut harvest = parse_text_entries(entries, SourceKind::TextModel, config);
        harvest.fallback_name = Some(self.name).filter(|n| !n.trim().is_empty());
        Ok(harvest)
    }
}

/// A `.pbix`/`.pbit` container file on disk.
#[cfg(feature = "std-fs")]
#[derive(Debug, Clone)]
pub struct ContainerFile {
    path: PathBuf,
}

#[cfg(feature = "std-fs")]
impl ContainerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "std-fs")]
impl RawEntitySource for ContainerFile {
    fn describe(&self) -> String {
        format!("container {}", self.path.display())
    }

    fn harvest(self, config: &ExtractConfig) -> Result<SourceHarvest, ExtractError> {
        let mut container = PbixContainer::open_path(&self.path, config.container)?;
        let mut harvest = harvest_container(&mut container, config)?;
        harvest.fallback_name = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned());
        Ok(harvest)
    }
}

/// A container read from any seekable byte stream.
pub struct ContainerReader<R> {
    reader: R,
    name: String,
}

impl<R: Read + Seek + 'static> ContainerReader<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
        }
    }
}

impl<R: Read + Seek + 'static> RawEntitySource for ContainerReader<R> {
    fn describe(&self) -> String {
        format!("container stream {}", self.name)
    }

    fn harvest(self, config: &ExtractConfig) -> Result<SourceHarvest, ExtractError> {
        let mut container = PbixContainer::open(self.reader, config.container)?;
        let mut harvest = harvest_container(&mut container, config)?;
        let stem = self
            .name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem);
        harvest.fallback_name = Some(stem.to_string()).filter(|n| !n.trim().is_empty());
        Ok(harvest)
    }
}

/// One text file awaiting parsing; `text` holds the read error otherwise.
#[derive(Debug, Clone)]
pub(crate) struct TextEntry {
    pub path: String,
    pub text: Result<String, String>,
}

impl TextEntry {
    pub(crate) fn from_bytes(path: &str, bytes: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            text: decode_text(bytes).map_err(|e| format!("failed to decode text: {e}")),
        }
    }
}

enum EntryOutcome {
    Parsed(RawFragment, Vec<Warning>),
    Failed(ExtractError),
}

/// Parses text entries independently and collects the results in input
/// order. A failing file contributes an error and nothing else.
pub(crate) fn parse_text_entries(
    entries: Vec<TextEntry>,
    kind: SourceKind,
    config: &ExtractConfig,
) -> SourceHarvest {
    #[cfg(feature = "parallel")]
    let outcomes: Vec<EntryOutcome> = entries
        .par_iter()
        .map(|entry| parse_entry(entry, kind, config))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<EntryOutcome> = entries
        .iter()
        .map(|entry| parse_entry(entry, kind, config))
        .collect();

    let mut harvest = SourceHarvest::default();
    for outcome in outcomes {
        match outcome {
            EntryOutcome::Parsed(fragment, warnings) => {
                harvest.warnings.extend(warnings);
                if !fragment.is_empty() {
                    harvest.fragments.push(fragment);
                }
            }
            EntryOutcome::Failed(err) => harvest.file_errors.push(err),
        }
    }
    harvest
}

fn parse_entry(entry: &TextEntry, kind: SourceKind, config: &ExtractConfig) -> EntryOutcome {
    let text = match &entry.text {
        Ok(text) => text,
        Err(detail) => return EntryOutcome::Failed(ExtractError::malformed(&entry.path, 0, detail.clone())),
    };

    if entry.path.to_ascii_lowercase().ends_with(".bim") {
        let origin = SourceOrigin::new(SourceKind::LegacySchema, &entry.path);
        return match parse_tabular_schema(text.as_bytes(), origin) {
            Ok(schema) => {
                let mut warnings: Vec<Warning> = schema
                    .degraded
                    .then(|| {
                        Warning::new(
                            WarningKind::UnsupportedLayout,
                            "model description has no table list; only measures were recovered",
                            Some(&entry.path),
                        )
                    })
                    .into_iter()
                    .collect();
                warnings.extend(schema.skipped_warnings(&entry.path));
                EntryOutcome::Parsed(schema.fragment, warnings)
            }
            Err(err) => EntryOutcome::Failed(ExtractError::malformed(&entry.path, 0, err.to_string())),
        };
    }

    debug!(path = %entry.path, "parsing definition file");
    let parsed = tmdl::parse_document(&entry.path, text, config.tab_width)
        .and_then(|doc| tmdl::lower_document(&doc, SourceOrigin::new(kind, &entry.path)));
    match parsed {
        Ok(fragment) => EntryOutcome::Parsed(fragment, Vec::new()),
        Err(err) => EntryOutcome::Failed(err),
    }
}

/// Project name from the directory layout: `Sales.SemanticModel` gives
/// `Sales`; a bare `definition` directory defers to its parent.
#[cfg(feature = "std-fs")]
fn project_name(root: &Path) -> Option<String> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let dir = match root.file_name() {
        Some(name) if name.eq_ignore_ascii_case("definition") => root.parent()?,
        _ => root.as_path(),
    };
    let name = dir.file_name()?.to_string_lossy();
    let stem = name.split_once('.').map_or(&*name, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_files_sort_by_path_and_keep_failures_separate() {
        let files = TextFiles::new(
            "Upload",
            [
                ("tables/b.tmdl", "table B\n\tcolumn Id\n"),
                ("tables/a.tmdl", "table A\n\tcolumn Id\n"),
                ("broken.tmdl", "table 'Open\n"),
            ],
        );

        let harvest = files.harvest(&ExtractConfig::default()).expect("harvest");
        let names: Vec<&str> = harvest
            .fragments
            .iter()
            .map(|f| f.tables[0].name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(harvest.file_errors.len(), 1);
        assert_eq!(harvest.fallback_name.as_deref(), Some("Upload"));
    }

    #[cfg(feature = "std-fs")]
    #[test]
    fn project_name_strips_suffix_and_skips_definition_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("Sales.SemanticModel");
        std::fs::create_dir_all(root.join("definition")).expect("mkdir");

        assert_eq!(project_name(&root).as_deref(), Some("Sales"));
        assert_eq!(project_name(&root.join("definition")).as_deref(), Some("Sales"));
    }
}
