mod common;

use common::{desktop_project_files, sales_project_files, write_files};
use pbi_schema::tmdl::{write_model, write_model_to_dir};
use pbi_schema::{
    JsonStyle, MemorySchemaStore, Model, SchemaStore, parse_text_files, parse_text_project,
    serialize_extraction, serialize_model,
};

fn sales_model() -> Model {
    let extraction = parse_text_files("Sales", sales_project_files()).expect("extract");
    extraction.model
}

#[test]
fn written_project_parses_back_to_the_same_model() {
    let model = sales_model();
    let dir = tempfile::tempdir().expect("tempdir");
    write_model_to_dir(&model, dir.path()).expect("write project");

    let again = parse_text_project(dir.path()).expect("re-extract");
    assert!(again.file_errors.is_empty(), "{:?}", again.file_errors);
    assert!(again.warnings.is_empty(), "{:?}", again.warnings);
    assert_eq!(again.model, model);
}

#[test]
fn desktop_metadata_survives_the_round_trip() {
    let model = parse_text_files("Desktop", desktop_project_files())
        .expect("extract")
        .model;
    assert_eq!(model.query_groups, vec!["Helpers"]);

    let files: Vec<(String, String)> = write_model(&model)
        .into_iter()
        .map(|f| (f.path, f.text))
        .collect();
    let again = parse_text_files("Desktop", files).expect("re-extract");
    assert!(again.file_errors.is_empty(), "{:?}", again.file_errors);
    assert_eq!(again.model, model);
}

#[test]
fn awkward_names_and_expressions_survive_the_round_trip() {
    let files = [
        (
            "definition/tables/Odd.tmdl",
            "\
/// First line
///
/// Third line
table 'It''s = odd'
\tcolumn 'Key Col'
\t\tdataType: int64

\tcolumn Calc = ```
\t\t\t[Key Col] * 2
\t\t  + 1
\t\t```
\t\tdataType: decimal

\tmeasure 'Fenced' = ```
\t\t```
\t\tdisplayFolder: A\\B

\tpartition p = calculated
\t\tsource = ```
\t\t\tDATATABLE(\"x\", STRING, {{\"a\"}})
\t\t\t```
",
        ),
        (
            "definition/roles/Reader.tmdl",
            "role Reader\n\tmodelPermission: read\n\ttablePermission 'It''s = odd' = [Key Col] > 0\n",
        ),
        ("definition/cultures/de-DE.tmdl", "cultureInfo de-DE\n"),
    ];
    let model = parse_text_files("Odd", files).expect("extract").model;

    let table = &model.tables[0];
    assert_eq!(table.name, "It's = odd");
    assert_eq!(table.description.as_deref(), Some("First line\n\nThird line"));
    assert_eq!(table.columns[1].expression.as_deref(), Some("\t[Key Col] * 2\n  + 1"));
    assert_eq!(table.measures[0].expression, "");

    let written = write_model(&model);
    let again = parse_text_files(
        "Odd",
        written.iter().map(|f| (f.path.clone(), f.text.clone())),
    )
    .expect("re-extract");
    assert!(again.file_errors.is_empty(), "{:?}", again.file_errors);
    assert_eq!(again.model, model);
}

#[test]
fn canonical_json_has_the_documented_shape() {
    let extraction = parse_text_files("Sales", sales_project_files()).expect("extract");
    let json = serialize_extraction(&extraction, JsonStyle::Compact).expect("serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    let model = &value["model"];
    assert_eq!(model["name"], "Model");
    assert_eq!(model["tables"][0]["columns"][0]["type"], "dateTime");
    assert_eq!(model["tables"][0]["measures"][0]["format"], "#,0");
    assert_eq!(model["relationships"][0]["fromTable"], "Sales");
    assert_eq!(model["relationships"][0]["cardinality"], "manyToOne");
    assert_eq!(model["relationships"][0]["active"], true);
    assert_eq!(value["warnings"][0]["kind"], "danglingRelationship");
    assert!(!json.contains('\n'));

    let pretty = serialize_model(&extraction.model, JsonStyle::Pretty).expect("serialize");
    let back: Model = serde_json::from_str(&pretty).expect("model deserializes");
    assert_eq!(back, extraction.model);
}

#[test]
fn store_keeps_models_across_loads() {
    let model = sales_model();
    let mut store = MemorySchemaStore::new();
    store.save("sales", &model).expect("save");

    assert_eq!(store.load("sales").expect("load"), Some(model));
    let listed = store.list().expect("list");
    assert_eq!(listed[0].tables, 2);
    assert_eq!(listed[0].relationships, 1);
}
