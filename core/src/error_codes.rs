//! Stable string codes attached to every error kind.
//!
//! Codes are part of the serialized output contract; never renumber.

pub const MALFORMED_DEFINITION: &str = "PBI001";
pub const SCHEMA_CONFLICT: &str = "PBI002";
pub const UNSUPPORTED_LAYOUT: &str = "PBI003";
pub const ROOT_IO: &str = "PBI004";
pub const INVALID_CONFIG: &str = "PBI005";

pub const CONTAINER_IO: &str = "PBI100";
pub const CONTAINER_ZIP: &str = "PBI101";
pub const CONTAINER_NOT_ZIP: &str = "PBI102";
pub const CONTAINER_TOO_MANY_ENTRIES: &str = "PBI103";
pub const CONTAINER_PART_TOO_LARGE: &str = "PBI104";
pub const CONTAINER_TOTAL_TOO_LARGE: &str = "PBI105";

pub const WARN_DANGLING_RELATIONSHIP: &str = "PBW001";
pub const WARN_DUPLICATE_RELATIONSHIP: &str = "PBW002";
pub const WARN_AMBIGUOUS_ACTIVE_RELATIONSHIP: &str = "PBW003";
pub const WARN_DEGRADED_EXTRACTION: &str = "PBW004";
pub const WARN_SKIPPED_ENTRY: &str = "PBW005";
