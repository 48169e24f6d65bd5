//! pbi-schema: extract a normalized schema from Power BI projects.
//!
//! This crate provides functionality for:
//! - Parsing text-model (TMDL) projects, on disk or as in-memory files
//! - Reading `.pbix`/`.pbit` containers, modern and legacy layouts
//! - Merging everything into one canonical [`Model`] of tables, columns,
//!   measures and relationships
//! - Serializing the model (or the raw fragments) to JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use pbi_schema::parse_text_project;
//!
//! let extraction = parse_text_project("Sales.SemanticModel")?;
//! for table in &extraction.model.tables {
//!     println!("{}: {} columns", table.name, table.columns.len());
//! }
//! for warning in &extraction.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

mod config;
mod container;
mod data_type;
mod diagnostics;
mod error;
pub mod error_codes;
mod hashing;
mod model;
mod normalize;
mod output;
mod pbix;
mod raw;
mod report_layout;
mod source;
mod store;
mod tabular_schema;
mod text_decode;
pub mod tmdl;

use std::io::{Read, Seek};

use tracing::debug;

pub use config::{ConfigError, ExtractConfig, ExtractConfigBuilder, LayoutPatterns, ScanConfig};
pub use container::{ContainerError, ContainerLimits, PbixContainer};
pub use data_type::ColumnType;
pub use diagnostics::{Extraction, Warning, WarningKind};
pub use error::ExtractError;
pub use model::{
    Annotations, Cardinality, Column, Measure, Model, Partition, Relationship, Role, Table,
    TablePermission,
};
pub use normalize::normalize;
pub use output::json::{
    ErrorReport, JsonStyle, serialize_extraction, serialize_model, serialize_raw,
};
pub use raw::{
    RawColumn, RawFragment, RawMeasure, RawModelInfo, RawOrphanMeasure, RawPartition,
    RawRelationship, RawRole, RawTable, SourceKind, SourceOrigin,
};
pub use report_layout::{Visual, VisualField};
pub use source::{ContainerReader, RawEntitySource, SourceHarvest, TextFiles};
#[cfg(feature = "std-fs")]
pub use source::{ContainerFile, TextProject};
pub use store::{MemorySchemaStore, SchemaStore, SchemaSummary, StoreError};
pub use text_decode::{TextDecodeError, decode_text};

/// Harvests `source` and normalizes the result.
///
/// Per-file parse failures land in [`Extraction::file_errors`]; the call
/// itself fails only when nothing trustworthy can be produced.
pub fn extract<S: RawEntitySource>(
    source: S,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    let harvest = extract_raw(source, config)?;
    let (model, mut warnings) = normalize(&harvest.fragments, harvest.fallback_name.as_deref())?;

    let mut all_warnings = harvest.warnings;
    all_warnings.append(&mut warnings);
    debug!(
        model = %model.name,
        tables = model.tables.len(),
        file_errors = harvest.file_errors.len(),
        warnings = all_warnings.len(),
        "extraction finished"
    );

    Ok(Extraction {
        model,
        file_errors: harvest.file_errors,
        warnings: all_warnings,
        visuals: harvest.visuals,
    })
}

/// Harvests `source` without normalizing: the raw fragments in source order.
pub fn extract_raw<S: RawEntitySource>(
    source: S,
    config: &ExtractConfig,
) -> Result<SourceHarvest, ExtractError> {
    config.validate()?;
    debug!(source = %source.describe(), "harvesting");
    source.harvest(config)
}

#[cfg(feature = "std-fs")]
pub fn parse_text_project(root: impl AsRef<std::path::Path>) -> Result<Extraction, ExtractError> {
    parse_text_project_with_config(root, &ExtractConfig::default())
}

#[cfg(feature = "std-fs")]
pub fn parse_text_project_with_config(
    root: impl AsRef<std::path::Path>,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    extract(TextProject::new(root.as_ref()), config)
}

/// Parses in-memory definition files given as `(relative path, text)` pairs.
pub fn parse_text_files<P, T>(
    name: &str,
    files: impl IntoIterator<Item = (P, T)>,
) -> Result<Extraction, ExtractError>
where
    P: Into<String>,
    T: Into<String>,
{
    parse_text_files_with_config(name, files, &ExtractConfig::default())
}

pub fn parse_text_files_with_config<P, T>(
    name: &str,
    files: impl IntoIterator<Item = (P, T)>,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError>
where
    P: Into<String>,
    T: Into<String>,
{
    extract(TextFiles::new(name, files), config)
}

#[cfg(feature = "std-fs")]
pub fn parse_container(path: impl AsRef<std::path::Path>) -> Result<Extraction, ExtractError> {
    parse_container_with_config(path, &ExtractConfig::default())
}

#[cfg(feature = "std-fs")]
pub fn parse_container_with_config(
    path: impl AsRef<std::path::Path>,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    extract(ContainerFile::new(path.as_ref()), config)
}

/// Parses a container from a seekable stream; `name` supplies the fallback
/// model name (its extension is dropped).
pub fn parse_container_reader<R: Read + Seek + 'static>(
    reader: R,
    name: &str,
) -> Result<Extraction, ExtractError> {
    parse_container_reader_with_config(reader, name, &ExtractConfig::default())
}

pub fn parse_container_reader_with_config<R: Read + Seek + 'static>(
    reader: R,
    name: &str,
    config: &ExtractConfig,
) -> Result<Extraction, ExtractError> {
    extract(ContainerReader::new(reader, name), config)
}
