pub mod extract;
pub mod info;

use anyhow::{Context, Result};
use pbi_schema::{
    ContainerFile, ExtractConfig, Extraction, SourceHarvest, TextFiles, TextProject, extract,
    extract_raw,
};
use std::path::Path;
use tracing::debug;

/// How a command-line path is read.
enum Input {
    Project(TextProject),
    Container(ContainerFile),
    Bim(TextFiles),
}

fn classify(path: &str) -> Result<Input> {
    let path = Path::new(path);
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to access input: {}", path.display()))?;
    if meta.is_dir() {
        debug!(path = %path.display(), "reading text project");
        return Ok(Input::Project(TextProject::new(path)));
    }

    let is_bim = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bim"));
    if !is_bim {
        debug!(path = %path.display(), "reading container");
        return Ok(Input::Container(ContainerFile::new(path)));
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read input: {}", path.display()))?;
    let text = pbi_schema::decode_text(&bytes)
        .with_context(|| format!("Failed to decode input: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.bim".to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Input::Bim(TextFiles::new(stem, [(file_name, text)])))
}

pub fn load_config(path: Option<&str>) -> Result<ExtractConfig> {
    let Some(path) = path else {
        return Ok(ExtractConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {path}"))?;
    let config: ExtractConfig =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {path}"))?;
    Ok(config)
}

pub fn extract_path(path: &str, config: &ExtractConfig) -> Result<Extraction> {
    let extraction = match classify(path)? {
        Input::Project(source) => extract(source, config),
        Input::Container(source) => extract(source, config),
        Input::Bim(source) => extract(source, config),
    };
    extraction.with_context(|| format!("Failed to extract schema: {path}"))
}

pub fn harvest_path(path: &str, config: &ExtractConfig) -> Result<SourceHarvest> {
    let harvest = match classify(path)? {
        Input::Project(source) => extract_raw(source, config),
        Input::Container(source) => extract_raw(source, config),
        Input::Bim(source) => extract_raw(source, config),
    };
    harvest.with_context(|| format!("Failed to read project: {path}"))
}
