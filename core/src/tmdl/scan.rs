use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ScanConfig;
use crate::error::ExtractError;

/// Kind of model file found while walking a project directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFileKind {
    Tmdl,
    /// A `model.bim` JSON model description.
    Bim,
}

/// One model file of a text project. `text` is the file content or the
/// reason it could not be read.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    /// Root-relative path with forward slashes.
    pub path: String,
    pub kind: ProjectFileKind,
    pub text: Result<String, String>,
}

/// Walks `root` and reads every model file below it, sorted by relative path.
///
/// Problems with individual files are kept on the file; only an unreadable
/// root or directory aborts the scan.
pub fn scan_project(root: &Path, scan: &ScanConfig) -> Result<Vec<ProjectFile>, ExtractError> {
    let io_err = |path: &Path, detail: String| ExtractError::Io {
        path: path.display().to_string(),
        detail,
    };

    if !root.exists() {
        return Err(io_err(root, "project root not found".to_string()));
    }
    if !root.is_dir() {
        return Err(io_err(root, "project root must be a directory".to_string()));
    }

    let mut files: Vec<ProjectFile> = Vec::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, format!("failed to read directory: {e}")))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| io_err(&dir, format!("failed to read directory entry: {e}")))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| io_err(&path, format!("failed to stat: {e}")))?;
            if file_type.is_dir() {
                if should_ignore_dir_name(&path, &scan.ignore_dir_names) {
                    continue;
                }
                stack.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let Some(kind) = kind_for_path(&path) else {
                continue;
            };
            let rel = rel_path(root, &path);
            debug!(path = %rel, ?kind, "discovered model file");

            let text = match entry.metadata() {
                Err(e) => Err(format!("failed to read metadata: {e}")),
                Ok(meta) if meta.len() > scan.max_file_bytes => Err(format!(
                    "file too large to read ({} bytes > {} bytes cap)",
                    meta.len(),
                    scan.max_file_bytes
                )),
                Ok(_) => std::fs::read(&path)
                    .map_err(|e| format!("failed to read file: {e}"))
                    .and_then(|bytes| {
                        crate::text_decode::decode_text(&bytes)
                            .map_err(|e| format!("failed to decode text: {e}"))
                    }),
            };

            files.push(ProjectFile {
                path: rel,
                kind,
                text,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn should_ignore_dir_name(path: &Path, ignore: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    ignore.iter().any(|value| value == name)
}

fn kind_for_path(path: &Path) -> Option<ProjectFileKind> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "tmdl" => Some(ProjectFileKind::Tmdl),
        "bim" => Some(ProjectFileKind::Bim),
        _ => None,
    }
}

fn rel_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
