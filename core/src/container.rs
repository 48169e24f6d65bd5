//! ZIP container handling for `.pbix`/`.pbit` packages.
//!
//! Wraps `zip::ZipArchive` with resource limits so a hostile archive cannot
//! force unbounded decompression. The archive handle is owned by
//! [`PbixContainer`] and released when it is dropped.

use std::io::{Read, Seek};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error_codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContainerLimits {
    pub max_entries: usize,
    pub max_part_uncompressed_bytes: u64,
    pub max_total_uncompressed_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_part_uncompressed_bytes: 100 * 1024 * 1024,
            max_total_uncompressed_bytes: 500 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a ZIP container")]
    NotZipContainer,
    #[error("archive has too many entries: {entries} (limit: {max_entries})")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("entry '{path}' is too large: {size} bytes (limit: {limit} bytes)")]
    PartTooLarge { path: String, size: u64, limit: u64 },
    #[error("total uncompressed size exceeds limit: would exceed {limit} bytes")]
    TotalTooLarge { limit: u64 },
    #[error("failed to read ZIP entry '{path}': {reason}")]
    ZipRead { path: String, reason: String },
    #[error("entry not found in archive: {path}")]
    FileNotFound { path: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::TooManyEntries { .. } => error_codes::CONTAINER_TOO_MANY_ENTRIES,
            ContainerError::PartTooLarge { .. } => error_codes::CONTAINER_PART_TOO_LARGE,
            ContainerError::TotalTooLarge { .. } => error_codes::CONTAINER_TOTAL_TOO_LARGE,
            ContainerError::ZipRead { .. } => error_codes::CONTAINER_ZIP,
            ContainerError::FileNotFound { .. } => error_codes::CONTAINER_ZIP,
        }
    }
}

pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub struct PbixContainer {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    limits: ContainerLimits,
    total_read: u64,
}

impl PbixContainer {
    /// Opens an archive; rejects it up front when it lists more entries than
    /// `limits` allow.
    pub fn open<R: Read + Seek + 'static>(
        reader: R,
        limits: ContainerLimits,
    ) -> Result<PbixContainer, ContainerError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                ContainerError::NotZipContainer
            }
            ZipError::Io(e) => ContainerError::Io(e),
            other => ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        })?;

        if archive.len() > limits.max_entries {
            return Err(ContainerError::TooManyEntries {
                entries: archive.len(),
                max_entries: limits.max_entries,
            });
        }

        Ok(PbixContainer {
            archive,
            limits,
            total_read: 0,
        })
    }

    #[cfg(feature = "std-fs")]
    pub fn open_path(
        path: impl AsRef<std::path::Path>,
        limits: ContainerLimits,
    ) -> Result<PbixContainer, ContainerError> {
        let file = std::fs::File::open(path)?;
        Self::open(file, limits)
    }

    /// Reads one entry, enforcing the per-part and cumulative limits.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let size = {
            let file = self.archive.by_name(name).map_err(|e| match e {
                ZipError::FileNotFound => ContainerError::FileNotFound {
                    path: name.to_string(),
                },
                other => ContainerError::ZipRead {
                    path: name.to_string(),
                    reason: other.to_string(),
                },
            })?;
            file.size()
        };

        if size > self.limits.max_part_uncompressed_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size,
                limit: self.limits.max_part_uncompressed_bytes,
            });
        }

        let new_total = self.total_read.saturating_add(size);
        if new_total > self.limits.max_total_uncompressed_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: self.limits.max_total_uncompressed_bytes,
            });
        }

        let file = self
            .archive
            .by_name(name)
            .map_err(|e| ContainerError::ZipRead {
                path: name.to_string(),
                reason: e.to_string(),
            })?;

        // The declared size can lie; never read past the per-part limit.
        let mut buf = Vec::new();
        file.take(self.limits.max_part_uncompressed_bytes.saturating_add(1))
            .read_to_end(&mut buf)
            .map_err(|e| ContainerError::ZipRead {
                path: name.to_string(),
                reason: e.to_string(),
            })?;
        if buf.len() as u64 > self.limits.max_part_uncompressed_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size: buf.len() as u64,
                limit: self.limits.max_part_uncompressed_bytes,
            });
        }

        self.total_read = new_total;
        Ok(buf)
    }

    /// Entry names in archive order, directories excluded.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, contents) in entries {
                writer.start_file(*name, options).expect("start zip entry");
                writer.write_all(contents).expect("write zip entry");
            }
            writer.finish().expect("finish zip");
        }
        buf
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let garbage = Cursor::new(b"definitely not a zip".to_vec());
        let err = PbixContainer::open(garbage, ContainerLimits::default())
            .err()
            .expect("garbage must not open");
        assert!(matches!(err, ContainerError::NotZipContainer), "{err:?}");
    }

    #[test]
    fn enforces_entry_count_limit() {
        let bytes = make_zip(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);
        let limits = ContainerLimits {
            max_entries: 2,
            ..Default::default()
        };
        let err = PbixContainer::open(Cursor::new(bytes), limits)
            .err()
            .expect("too many entries");
        assert!(matches!(
            err,
            ContainerError::TooManyEntries {
                entries: 3,
                max_entries: 2
            }
        ));
    }

    #[test]
    fn enforces_part_and_total_limits() {
        let bytes = make_zip(&[("small", b"1234"), ("other", b"5678")]);
        let limits = ContainerLimits {
            max_entries: 10,
            max_part_uncompressed_bytes: 3,
            max_total_uncompressed_bytes: 100,
        };
        let mut container = PbixContainer::open(Cursor::new(bytes.clone()), limits).expect("open");
        assert!(matches!(
            container.read_entry("small"),
            Err(ContainerError::PartTooLarge { size: 4, .. })
        ));

        let limits = ContainerLimits {
            max_entries: 10,
            max_part_uncompressed_bytes: 10,
            max_total_uncompressed_bytes: 6,
        };
        let mut container = PbixContainer::open(Cursor::new(bytes), limits).expect("open");
        assert_eq!(container.read_entry("small").expect("first read"), b"1234");
        assert!(matches!(
            container.read_entry("other"),
            Err(ContainerError::TotalTooLarge { limit: 6 })
        ));
    }

    #[test]
    fn entry_names_skip_directories() {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            writer
                .add_directory("Report/", SimpleFileOptions::default())
                .expect("add directory");
            writer
                .start_file("Report/Layout", SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(b"{}").expect("write zip entry");
            writer.finish().expect("finish zip");
        }
        let container =
            PbixContainer::open(Cursor::new(buf), ContainerLimits::default()).expect("open");
        assert_eq!(container.entry_names(), vec!["Report/Layout".to_string()]);
    }
}
