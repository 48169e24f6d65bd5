mod common;

use common::{desktop_project_files, sales_project_files, write_files};
use pbi_schema::{
    Cardinality, ColumnType, ExtractConfig, ExtractError, WarningKind, parse_text_files,
    parse_text_project, parse_text_project_with_config,
};

#[test]
fn sales_calendar_project_drops_dangling_relationship() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(dir.path(), &sales_project_files());

    let extraction = parse_text_project(dir.path()).expect("extract project");
    let model = &extraction.model;

    assert_eq!(model.name, "Model");
    assert_eq!(model.culture.as_deref(), Some("en-US"));
    let names: Vec<&str> = model.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Sales", "Calendar"], "ref table order wins");

    let sales = model.table("sales").expect("case-insensitive lookup");
    assert_eq!(sales.columns.len(), 2);
    assert_eq!(sales.columns[0].data_type, ColumnType::DateTime);
    assert_eq!(sales.columns[1].format.as_deref(), Some("#,0.00"));
    assert_eq!(sales.measures[0].name, "Total Sales");
    assert_eq!(sales.measures[0].expression, "SUM(Sales[Amount])");

    assert_eq!(model.relationships.len(), 1);
    let rel = &model.relationships[0];
    assert_eq!(rel.label(), "Sales[OrderDate] -> Calendar[Date]");
    assert_eq!(rel.cardinality, Cardinality::ManyToOne);
    assert!(rel.active);

    let dangling: Vec<_> = extraction
        .warnings_of(WarningKind::DanglingRelationship)
        .collect();
    assert_eq!(dangling.len(), 1, "{:?}", extraction.warnings);
    assert!(dangling[0].detail.contains("Customer"), "{}", dangling[0].detail);
    assert_eq!(dangling[0].source.as_deref(), Some("definition/relationships.tmdl"));
    assert!(extraction.file_errors.is_empty());
    model.validate().expect("canonical model is valid");
}

#[test]
fn desktop_saved_project_keeps_model_metadata() {
    let extraction = parse_text_files("Desktop", desktop_project_files()).expect("extract");
    assert!(extraction.file_errors.is_empty(), "{:?}", extraction.file_errors);

    let model = &extraction.model;
    assert_eq!(model.name, "Model");
    assert_eq!(model.culture.as_deref(), Some("en-US"));
    assert_eq!(model.source_query_culture.as_deref(), Some("en-US"));
    assert_eq!(model.cultures, vec!["en-US"]);
    assert_eq!(model.query_groups, vec!["Helpers"]);
    assert_eq!(model.annotations["__PBI_TimeIntelligenceEnabled"], "1");
    let names: Vec<&str> = model.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Calendar", "Sales"]);
}

#[test]
fn malformed_file_is_reported_and_the_rest_survives() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut files = sales_project_files();
    files.push((
        "definition/tables/Broken.tmdl",
        "table Broken\n    column A\n  column B\n",
    ));
    write_files(dir.path(), &files);

    let extraction = parse_text_project(dir.path()).expect("partial result");
    assert_eq!(extraction.file_errors.len(), 1);
    match &extraction.file_errors[0] {
        ExtractError::MalformedDefinition { file, line, .. } => {
            assert_eq!(file, "definition/tables/Broken.tmdl");
            assert_eq!(*line, 3);
        }
        other => panic!("unexpected file error {other:?}"),
    }
    assert!(extraction.model.table("Broken").is_none());
    assert_eq!(extraction.model.tables.len(), 2);
    assert!(!extraction.is_complete());
}

#[test]
fn duplicate_table_with_different_columns_is_a_conflict() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(
        dir.path(),
        &[
            ("definition/tables/a.tmdl", "table Sales\n\tcolumn A\n"),
            ("definition/tables/b.tmdl", "table SALES\n\tcolumn B\n"),
        ],
    );

    let err = parse_text_project(dir.path()).expect_err("conflicting tables");
    match err {
        ExtractError::SchemaConflict { entity, detail } => {
            assert_eq!(entity, "SALES");
            assert!(detail.contains("definition/tables/a.tmdl"), "{detail}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn identical_duplicate_tables_merge_silently() {
    let table = "table Sales\n\tcolumn A\n\t\tdataType: string\n";
    let extraction = parse_text_files(
        "Dup",
        [
            ("definition/tables/a.tmdl", table),
            ("definition/tables/b.tmdl", table),
        ],
    )
    .expect("identical tables merge");
    assert_eq!(extraction.model.tables.len(), 1);
    assert!(extraction.warnings.is_empty());
}

#[test]
fn ignored_directories_and_other_files_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(
        dir.path(),
        &[
            ("definition/tables/Sales.tmdl", common::SALES_TMDL),
            (".pbi/cache.tmdl", "this is not tmdl at all"),
            ("definition/notes.md", "table Nope"),
        ],
    );

    let extraction = parse_text_project(dir.path()).expect("extract");
    assert!(extraction.file_errors.is_empty(), "{:?}", extraction.file_errors);
    assert_eq!(extraction.model.tables.len(), 1);
}

#[test]
fn fallback_name_comes_from_the_project_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().join("Contoso.SemanticModel");
    write_files(&root, &[("definition/tables/Sales.tmdl", common::SALES_TMDL)]);

    let extraction = parse_text_project(&root).expect("extract");
    assert_eq!(extraction.model.name, "Contoso");
}

#[test]
fn missing_root_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = parse_text_project(dir.path().join("nope")).expect_err("missing root");
    assert!(matches!(err, ExtractError::Io { .. }), "{err:?}");
    assert_eq!(err.code(), "PBI004");
}

#[test]
fn oversized_files_become_file_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(dir.path(), &[("definition/tables/Sales.tmdl", common::SALES_TMDL)]);

    let config = ExtractConfig::builder()
        .max_file_bytes(16)
        .build()
        .expect("valid config");
    let extraction = parse_text_project_with_config(dir.path(), &config).expect("extract");
    assert_eq!(extraction.file_errors.len(), 1);
    assert!(extraction.model.tables.is_empty());
}

#[test]
fn invalid_config_is_rejected_before_reading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = ExtractConfig {
        tab_width: 0,
        ..Default::default()
    };
    let err = parse_text_project_with_config(dir.path(), &config).expect_err("bad config");
    assert!(matches!(err, ExtractError::InvalidConfig(_)), "{err:?}");
}

#[test]
fn bim_file_in_a_project_is_read_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(dir.path(), &[("model.bim", common::LEGACY_SCHEMA_JSON)]);

    let extraction = parse_text_project(dir.path()).expect("extract");
    assert_eq!(extraction.model.name, "SemanticModel");
    assert_eq!(extraction.model.tables.len(), 2);
    assert_eq!(extraction.model.measure_count(), 1);
    assert!(extraction.warnings.is_empty(), "{:?}", extraction.warnings);
}

#[test]
fn in_memory_files_match_the_directory_form() {
    let dir = tempfile::tempdir().expect("tempdir");
    let files = sales_project_files();
    write_files(dir.path(), &files);

    let on_disk = parse_text_project(dir.path()).expect("disk");
    let in_memory = parse_text_files("Upload", files).expect("memory");
    assert_eq!(on_disk.model, in_memory.model);
    assert_eq!(on_disk.warnings, in_memory.warnings);
}

#[test]
fn active_relationship_conflict_demotes_the_second() {
    let extraction = parse_text_files(
        "Roles",
        [
            ("definition/tables/Sales.tmdl", "table Sales\n\tcolumn OrderDate\n\tcolumn ShipDate\n"),
            ("definition/tables/Calendar.tmdl", "table Calendar\n\tcolumn Date\n"),
            (
                "definition/relationships.tmdl",
                "relationship a\n\tfromColumn: Sales.OrderDate\n\ttoColumn: Calendar.Date\n\n\
                 relationship b\n\tfromColumn: Sales.ShipDate\n\ttoColumn: Calendar.Date\n",
            ),
        ],
    )
    .expect("extract");

    let rels = &extraction.model.relationships;
    assert_eq!(rels.len(), 2);
    assert!(rels[0].active);
    assert!(!rels[1].active);
    assert_eq!(
        extraction
            .warnings_of(WarningKind::AmbiguousActiveRelationship)
            .count(),
        1
    );
}
