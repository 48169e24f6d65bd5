mod common;

use std::io::Cursor;

use common::{LEGACY_SCHEMA_JSON, sales_project_files, utf16le_with_bom, zip_bytes};
use pbi_schema::{
    ColumnType, ContainerLimits, ExtractConfig, ExtractError, SourceKind, WarningKind,
    extract_raw, parse_container, parse_container_reader, parse_container_reader_with_config,
    ContainerReader,
};

#[test]
fn legacy_utf16_schema_yields_two_tables_one_measure_and_a_degraded_warning() {
    let schema = utf16le_with_bom(LEGACY_SCHEMA_JSON);
    let bytes = zip_bytes(&[
        ("[Content_Types].xml", b"<Types/>"),
        ("DataModelSchema", &schema),
        ("Report/Layout", b"{}"),
    ]);

    let extraction = parse_container_reader(Cursor::new(bytes), "Legacy.pbit").expect("extract");
    let model = &extraction.model;

    assert_eq!(model.name, "SemanticModel");
    assert_eq!(model.tables.len(), 2);
    assert_eq!(model.measure_count(), 1);

    let sales = model.table("Sales").expect("sales");
    assert_eq!(sales.columns[0].data_type, ColumnType::Integer);
    assert_eq!(sales.columns[1].data_type, ColumnType::Decimal);
    assert_eq!(sales.measures[0].expression, "SUM(\n    Sales[Amount]\n)");
    assert_eq!(sales.partitions[0].kind.as_deref(), Some("m"));

    let product = model.table("Product").expect("product");
    assert_eq!(product.columns[1].data_type, ColumnType::String);
    assert_eq!(model.relationships.len(), 1);

    let degraded: Vec<_> = extraction.warnings_of(WarningKind::UnsupportedLayout).collect();
    assert_eq!(degraded.len(), 1, "{:?}", extraction.warnings);
    assert_eq!(degraded[0].source.as_deref(), Some("DataModelSchema"));
}

#[test]
fn legacy_relationship_without_target_column_is_reported() {
    let schema = r#"{
        "model": {
            "tables": [
                { "name": "Sales", "columns": [ { "name": "ProductKey", "dataType": "int64" } ] },
                { "name": "Product", "columns": [ { "name": "ProductKey", "dataType": "int64" } ] }
            ],
            "relationships": [
                { "name": "broken", "fromTable": "Sales", "fromColumn": "ProductKey", "toTable": "Product" }
            ]
        }
    }"#;
    let bytes = zip_bytes(&[("DataModelSchema", schema.as_bytes())]);

    let extraction = parse_container_reader(Cursor::new(bytes), "Broken.pbit").expect("extract");
    assert!(extraction.model.relationships.is_empty());
    let skipped: Vec<_> = extraction.warnings_of(WarningKind::SkippedEntry).collect();
    assert_eq!(skipped.len(), 1, "{:?}", extraction.warnings);
    assert!(skipped[0].detail.contains("'broken' has no toColumn"), "{}", skipped[0].detail);
    assert_eq!(skipped[0].source.as_deref(), Some("DataModelSchema"));
}

#[test]
fn definition_entries_take_priority_over_legacy_schema() {
    let mut entries: Vec<(String, Vec<u8>)> = sales_project_files()
        .into_iter()
        .map(|(path, text)| (path.to_string(), text.as_bytes().to_vec()))
        .collect();
    entries.push(("DataModelSchema".to_string(), LEGACY_SCHEMA_JSON.as_bytes().to_vec()));
    let refs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    let bytes = zip_bytes(&refs);

    let extraction = parse_container_reader(Cursor::new(bytes), "Modern.pbix").expect("extract");
    let names: Vec<&str> = extraction.model.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Sales", "Calendar"]);
    assert_eq!(extraction.warnings_of(WarningKind::UnsupportedLayout).count(), 0);
    assert_eq!(
        extraction.warnings_of(WarningKind::DanglingRelationship).count(),
        1
    );
}

#[test]
fn legacy_schema_without_tables_recovers_measures_only() {
    let schema = br#"{ "name": "M", "model": { "perspectives": [
        { "name": "Finance", "measures": [ { "name": "Budget", "expression": "1" } ] }
    ] } }"#;
    let bytes = zip_bytes(&[("DataModelSchema", schema.as_slice())]);

    let extraction = parse_container_reader(Cursor::new(bytes), "Odd.pbix").expect("extract");
    assert_eq!(extraction.model.measure_count(), 1);
    let warning = extraction
        .warnings_of(WarningKind::UnsupportedLayout)
        .next()
        .expect("degraded warning");
    assert!(warning.detail.contains("only measures"), "{}", warning.detail);
}

#[test]
fn report_layout_is_the_last_resort() {
    let config = serde_json::json!({
        "singleVisual": {
            "prototypeQuery": {
                "From": [{ "Name": "s", "Entity": "Sales" }],
                "Select": [
                    { "Column": { "Expression": { "SourceRef": { "Source": "s" } }, "Property": "Region" } }
                ]
            }
        }
    });
    let layout = serde_json::json!({
        "sections": [{ "visualContainers": [{ "config": config.to_string() }] }]
    });
    let layout = utf16le_with_bom(&layout.to_string());
    let bytes = zip_bytes(&[("Report/Layout", layout.as_slice()), ("DataModel", b"\0\0")]);

    let extraction = parse_container_reader(Cursor::new(bytes), "Thin.pbix").expect("extract");
    let sales = extraction.model.table("Sales").expect("shell table");
    assert_eq!(sales.columns[0].name, "Region");
    assert_eq!(sales.columns[0].data_type, ColumnType::Variant);
    assert_eq!(extraction.warnings_of(WarningKind::UnsupportedLayout).count(), 1);
    assert_eq!(extraction.visuals.len(), 1);
    assert_eq!(extraction.visuals[0].visual_type, "unknown");
}

#[test]
fn report_visuals_are_listed_alongside_a_definition_model() {
    let chart = serde_json::json!({
        "singleVisual": {
            "visualType": "lineChart",
            "projections": {
                "Category": [{ "queryRef": "Calendar.Date" }],
                "Y": [{ "queryRef": "Sales.Total Sales" }]
            }
        }
    });
    let layout = serde_json::json!({
        "sections": [{ "displayName": "Trend", "visualContainers": [{ "config": chart.to_string() }] }]
    });
    let layout = utf16le_with_bom(&layout.to_string());
    let mut entries: Vec<(&str, &[u8])> = sales_project_files()
        .into_iter()
        .map(|(path, text)| (path, text.as_bytes()))
        .collect();
    entries.push(("Report/Layout", layout.as_slice()));
    let bytes = zip_bytes(&entries);

    let extraction = parse_container_reader(Cursor::new(bytes.clone()), "Full.pbix").expect("extract");
    assert_eq!(extraction.model.tables.len(), 2);
    assert_eq!(extraction.warnings_of(WarningKind::UnsupportedLayout).count(), 0);
    assert_eq!(extraction.visuals.len(), 1);
    let visual = &extraction.visuals[0];
    assert_eq!(visual.visual_type, "lineChart");
    assert_eq!(visual.page.as_deref(), Some("Trend"));
    let fields: Vec<(&str, &str)> = visual
        .fields
        .iter()
        .map(|f| (f.role.as_str(), f.field.as_str()))
        .collect();
    assert_eq!(fields, vec![("Category", "Calendar.Date"), ("Y", "Sales.Total Sales")]);

    let harvest = extract_raw(
        ContainerReader::new(Cursor::new(bytes), "Full.pbix"),
        &ExtractConfig::default(),
    )
    .expect("harvest");
    assert_eq!(harvest.visuals, extraction.visuals);
}

#[test]
fn unreadable_layout_is_skipped_without_losing_the_model() {
    let mut entries: Vec<(&str, &[u8])> = sales_project_files()
        .into_iter()
        .map(|(path, text)| (path, text.as_bytes()))
        .collect();
    entries.push(("Report/Layout", b"{ not json"));
    let bytes = zip_bytes(&entries);

    let extraction = parse_container_reader(Cursor::new(bytes), "Odd.pbix").expect("extract");
    assert_eq!(extraction.model.tables.len(), 2);
    assert!(extraction.visuals.is_empty());
    let skipped: Vec<_> = extraction.warnings_of(WarningKind::SkippedEntry).collect();
    assert_eq!(skipped.len(), 1, "{:?}", extraction.warnings);
    assert_eq!(skipped[0].source.as_deref(), Some("Report/Layout"));
}

#[test]
fn binary_model_only_is_unsupported() {
    let bytes = zip_bytes(&[("DataModel", b"\x00\x01binary"), ("Version", b"1.0")]);
    let err = parse_container_reader(Cursor::new(bytes), "Binary.pbix").expect_err("unsupported");
    match err {
        ExtractError::UnsupportedLayout { detail } => {
            assert!(detail.contains("DataModel"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn empty_archive_has_no_payload() {
    let bytes = zip_bytes(&[("Version", b"1.0")]);
    let err = parse_container_reader(Cursor::new(bytes), "Empty.pbix").expect_err("unsupported");
    assert_eq!(err.code(), "PBI003");
}

#[test]
fn non_zip_input_is_a_container_error() {
    let err = parse_container_reader(Cursor::new(b"not a zip".to_vec()), "x.pbix")
        .expect_err("not a zip");
    assert!(matches!(err, ExtractError::ContainerError { .. }), "{err:?}");
}

#[test]
fn container_limits_are_enforced() {
    let bytes = zip_bytes(&[
        ("definition/tables/a.tmdl", b"table A\n\tcolumn Id\n"),
        ("definition/tables/b.tmdl", b"table B\n\tcolumn Id\n"),
    ]);
    let config = ExtractConfig::builder()
        .container_limits(ContainerLimits {
            max_entries: 1,
            ..Default::default()
        })
        .build()
        .expect("valid config");

    let err = parse_container_reader_with_config(Cursor::new(bytes), "Many.pbix", &config)
        .expect_err("too many entries");
    assert!(matches!(err, ExtractError::ContainerError { .. }), "{err:?}");
}

#[test]
fn malformed_definition_entry_is_collected() {
    let bytes = zip_bytes(&[
        ("definition/tables/a.tmdl", b"table A\n\tcolumn Id\n"),
        ("definition/tables/b.tmdl", b"table B\n\tmeasure M\n"),
    ]);
    let extraction = parse_container_reader(Cursor::new(bytes), "Partial.pbix").expect("extract");
    assert_eq!(extraction.model.tables.len(), 1);
    assert_eq!(extraction.file_errors.len(), 1);
}

#[test]
fn raw_harvest_keeps_provenance() {
    let bytes = zip_bytes(&[("DataModelSchema", LEGACY_SCHEMA_JSON.as_bytes())]);
    let harvest = extract_raw(
        ContainerReader::new(Cursor::new(bytes), "Raw.pbix"),
        &ExtractConfig::default(),
    )
    .expect("harvest");

    assert_eq!(harvest.fragments.len(), 1);
    assert_eq!(harvest.fragments[0].origin.kind, SourceKind::LegacySchema);
    assert_eq!(harvest.fallback_name.as_deref(), Some("Raw"));
}

#[test]
fn container_file_on_disk_uses_its_stem_as_fallback_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Quarterly.pbix");
    let bytes = zip_bytes(&[("definition/tables/a.tmdl", b"table A\n\tcolumn Id\n")]);
    std::fs::write(&path, bytes).expect("write container");

    let extraction = parse_container(&path).expect("extract");
    assert_eq!(extraction.model.name, "Quarterly");
}
