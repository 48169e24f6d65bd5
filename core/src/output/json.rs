use serde::Serialize;

use crate::diagnostics::{Extraction, Warning};
use crate::error::ExtractError;
use crate::model::Model;
use crate::raw::RawFragment;
use crate::report_layout::Visual;
use crate::source::SourceHarvest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    Pretty,
    Compact,
}

/// Serialized form of an [`ExtractError`]: its stable code plus the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}

impl From<&ExtractError> for ErrorReport {
    fn from(err: &ExtractError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionReport<'a> {
    model: &'a Model,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_errors: Vec<ErrorReport>,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [Warning],
    #[serde(skip_serializing_if = "no_visuals")]
    visuals: &'a [Visual],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_name: Option<&'a str>,
    fragments: &'a [RawFragment],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_errors: Vec<ErrorReport>,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [Warning],
    #[serde(skip_serializing_if = "no_visuals")]
    visuals: &'a [Visual],
}

/// The canonical model alone, the shape downstream consumers read.
pub fn serialize_model(model: &Model, style: JsonStyle) -> serde_json::Result<String> {
    to_string(model, style)
}

/// The canonical model together with file errors and warnings.
pub fn serialize_extraction(extraction: &Extraction, style: JsonStyle) -> serde_json::Result<String> {
    let report = ExtractionReport {
        model: &extraction.model,
        file_errors: extraction.file_errors.iter().map(ErrorReport::from).collect(),
        warnings: &extraction.warnings,
        visuals: &extraction.visuals,
    };
    to_string(&report, style)
}

/// Un-normalized fragments with their provenance, for inspecting what each
/// file contributed.
pub fn serialize_raw(harvest: &SourceHarvest, style: JsonStyle) -> serde_json::Result<String> {
    let report = RawReport {
        fallback_name: harvest.fallback_name.as_deref(),
        fragments: &harvest.fragments,
        file_errors: harvest.file_errors.iter().map(ErrorReport::from).collect(),
        warnings: &harvest.warnings,
        visuals: &harvest.visuals,
    };
    to_string(&report, style)
}

fn no_warnings(warnings: &&[Warning]) -> bool {
    warnings.is_empty()
}

fn no_visuals(visuals: &&[Visual]) -> bool {
    visuals.is_empty()
}

fn to_string<T: Serialize + ?Sized>(value: &T, style: JsonStyle) -> serde_json::Result<String> {
    match style {
        JsonStyle::Pretty => serde_json::to_string_pretty(value),
        JsonStyle::Compact => serde_json::to_string(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use crate::raw::{SourceKind, SourceOrigin};
    use crate::report_layout::VisualField;

    #[test]
    fn extraction_report_carries_codes() {
        let extraction = Extraction {
            model: Model {
                name: "M".to_string(),
                ..Default::default()
            },
            file_errors: vec![ExtractError::malformed("a.tmdl", 3, "bad")],
            warnings: vec![Warning::new(WarningKind::DanglingRelationship, "gone", None)],
            visuals: Vec::new(),
        };

        let json: serde_json::Value =
            serde_json::from_str(&serialize_extraction(&extraction, JsonStyle::Compact).expect("json"))
                .expect("parse");
        assert_eq!(json["model"]["name"], "M");
        assert_eq!(json["fileErrors"][0]["code"], "PBI001");
        assert_eq!(json["warnings"][0]["kind"], "danglingRelationship");
        assert!(json.get("visuals").is_none());
    }

    #[test]
    fn raw_report_lists_fragments_with_origin() {
        let harvest = SourceHarvest {
            fragments: vec![RawFragment::new(SourceOrigin::new(SourceKind::TextModel, "model.tmdl"))],
            fallback_name: Some("P".to_string()),
            visuals: vec![Visual {
                visual_type: "card".to_string(),
                page: None,
                fields: vec![VisualField {
                    role: "Values".to_string(),
                    field: "Sales.Total".to_string(),
                }],
            }],
            ..Default::default()
        };
        let text = serialize_raw(&harvest, JsonStyle::Pretty).expect("json");
        assert!(text.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(json["fragments"][0]["origin"]["kind"], "textModel");
        assert_eq!(json["fallbackName"], "P");
        assert!(json.get("fileErrors").is_none());
        assert_eq!(json["visuals"][0]["type"], "card");
        assert_eq!(json["visuals"][0]["fields"][0]["role"], "Values");
    }
}
