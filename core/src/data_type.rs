use serde::{Deserialize, Serialize};

/// Fixed column type enumeration of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Binary,
    #[default]
    Variant,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Variant => "variant",
        }
    }

    /// The spelling the text model format uses when writing this type back.
    pub fn tmdl_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "int64",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Variant => "variant",
        }
    }

    /// Maps a declared type spelling from either vocabulary onto the enum.
    ///
    /// Text models spell types by name (`int64`, `dateTime`, ...); legacy
    /// layouts may also carry the numeric data type codes of the tabular
    /// object model. Anything unrecognized becomes `Variant`.
    pub fn from_declared(raw: Option<&str>) -> ColumnType {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return ColumnType::Variant;
        };

        if let Ok(code) = raw.parse::<i64>() {
            return Self::from_legacy_code(code);
        }

        match raw.to_ascii_lowercase().as_str() {
            "string" | "text" | "wstr" => ColumnType::String,
            "int64" | "integer" | "int" | "whole number" | "wholenumber" => ColumnType::Integer,
            "decimal" | "double" | "currency" | "fixed decimal number" | "fixeddecimal"
            | "number" | "r8" | "cy" => ColumnType::Decimal,
            "boolean" | "bool" | "true/false" => ColumnType::Boolean,
            "datetime" | "date" | "time" | "date/time" | "datetimezone" => ColumnType::DateTime,
            "binary" => ColumnType::Binary,
            _ => ColumnType::Variant,
        }
    }

    fn from_legacy_code(code: i64) -> ColumnType {
        match code {
            2 => ColumnType::String,
            6 => ColumnType::Integer,
            8 | 10 => ColumnType::Decimal,
            9 => ColumnType::DateTime,
            11 => ColumnType::Boolean,
            17 => ColumnType::Binary,
            _ => ColumnType::Variant,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
