//! Structural fingerprints used to recognize repeated declarations.

use std::hash::Hash;

use xxhash_rust::xxh3::Xxh3;

use crate::raw::RawColumn;

/// Fingerprint of a table's declared column set, in declaration order.
///
/// Types are hashed as spelled in the source, so `int64` and `integer` are
/// different declarations even though both normalize to the same type. Line
/// numbers are left out.
pub(crate) fn column_set_fingerprint(columns: &[RawColumn]) -> u128 {
    let mut hasher = Xxh3::new();
    columns.len().hash(&mut hasher);
    for column in columns {
        column.name.hash(&mut hasher);
        column.data_type.hash(&mut hasher);
        column.source_column.hash(&mut hasher);
        column.format_string.hash(&mut hasher);
        column.expression.hash(&mut hasher);
        column.summarize_by.hash(&mut hasher);
        column.description.hash(&mut hasher);
        column.is_hidden.hash(&mut hasher);
        column.annotations.hash(&mut hasher);
    }
    hasher.digest128()
}
