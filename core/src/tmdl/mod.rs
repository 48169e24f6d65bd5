//! Text-model (TMDL) support: parse definition files into raw entities and
//! write a canonical model back out.
//!
//! Parsing runs in two passes per file. [`parse_document`] turns the
//! indentation-structured text into a tree of blocks and properties without
//! interpreting them beyond a keyword grammar; [`lower_document`] maps that
//! tree onto the raw entity types the normalizer consumes.

mod grammar;
mod line;
mod lower;
mod parse;
#[cfg(feature = "std-fs")]
mod scan;
mod write;

pub use lower::lower_document;
pub use parse::{PropertyValue, TmdlDocument, TmdlNode, TmdlProperty, parse_document};
#[cfg(feature = "std-fs")]
pub use scan::{ProjectFile, ProjectFileKind, scan_project};
pub use write::{TmdlFile, write_model};
#[cfg(feature = "std-fs")]
pub use write::write_model_to_dir;

use crate::error::ExtractError;
use crate::raw::{RawFragment, SourceKind, SourceOrigin};

/// Parses and lowers one definition file.
pub fn parse_definition(path: &str, text: &str, tab_width: usize) -> Result<RawFragment, ExtractError> {
    let doc = parse_document(path, text, tab_width)?;
    lower_document(&doc, SourceOrigin::new(SourceKind::TextModel, path))
}
