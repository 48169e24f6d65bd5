//! Fixture builders shared across integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builds a deflate-compressed ZIP archive in memory.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(contents).expect("write zip entry contents");
        }
        writer.finish().expect("finish zip");
    }
    buf
}

/// UTF-16LE with a byte order mark, the encoding desktop tools use for
/// legacy schema entries.
pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Writes `(relative path, contents)` pairs below `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
    }
}

pub const SALES_TMDL: &str = "\
table Sales
\tcolumn OrderDate
\t\tdataType: dateTime
\t\tsourceColumn: OrderDate

\tcolumn Amount
\t\tdataType: decimal
\t\tformatString: #,0.00

\tmeasure 'Total Sales' = SUM(Sales[Amount])
\t\tformatString: #,0
";

pub const CALENDAR_TMDL: &str = "\
table Calendar
\tcolumn Date
\t\tdataType: dateTime
\t\tisKey
";

/// `Sales[OrderDate] -> Calendar[Date]` plus one relationship whose target
/// table exists nowhere.
pub const RELATIONSHIPS_TMDL: &str = "\
relationship sales_calendar
\tfromColumn: Sales.OrderDate
\ttoColumn: Calendar.Date

relationship sales_customer
\tfromColumn: Sales.CustomerKey
\ttoColumn: Customer.CustomerKey
";

pub const MODEL_TMDL: &str = "\
model Model
\tculture: en-US

\tref table Sales
\tref table Calendar
";

/// `model.tmdl` the way Power BI Desktop saves it: options nested under a
/// flag, and annotations and `ref` lines at column 0 after the model block.
pub const DESKTOP_MODEL_TMDL: &str = "\
model Model
\tculture: en-US
\tdefaultPowerBIDataSourceVersion: powerBI_V3
\tsourceQueryCulture: en-US
\tdataAccessOptions
\t\tlegacyRedirects
\t\treturnErrorValuesAsNull

queryGroup Helpers

\tannotation PBI_QueryGroupOrder = 0

annotation __PBI_TimeIntelligenceEnabled = 1

annotation PBI_QueryOrder = [\"Sales\",\"Calendar\"]

ref table Calendar
ref table Sales

ref cultureInfo en-US
";

/// `cultures/en-US.tmdl` as Desktop writes it.
pub const DESKTOP_CULTURE_TMDL: &str = "\
cultureInfo en-US

\tlinguisticMetadata =
\t\t\t{
\t\t\t  \"Version\": \"1.0.0\",
\t\t\t  \"Language\": \"en-US\",
\t\t\t  \"DynamicImprovement\": \"HighConfidence\"
\t\t\t}
\t\tcontentType: json

";

pub fn desktop_project_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("definition/model.tmdl", DESKTOP_MODEL_TMDL),
        ("definition/cultures/en-US.tmdl", DESKTOP_CULTURE_TMDL),
        ("definition/tables/Sales.tmdl", SALES_TMDL),
        ("definition/tables/Calendar.tmdl", CALENDAR_TMDL),
    ]
}

pub fn sales_project_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("definition/model.tmdl", MODEL_TMDL),
        ("definition/tables/Sales.tmdl", SALES_TMDL),
        ("definition/tables/Calendar.tmdl", CALENDAR_TMDL),
        ("definition/relationships.tmdl", RELATIONSHIPS_TMDL),
    ]
}

/// Legacy schema with two tables, one measure and one relationship.
pub const LEGACY_SCHEMA_JSON: &str = r#"{
  "name": "SemanticModel",
  "compatibilityLevel": 1550,
  "model": {
    "culture": "en-US",
    "tables": [
      {
        "name": "Sales",
        "columns": [
          { "name": "ProductKey", "dataType": "int64", "sourceColumn": "ProductKey" },
          { "name": "Amount", "dataType": "double", "formatString": "0.00" }
        ],
        "measures": [
          { "name": "Revenue", "expression": ["SUM(", "    Sales[Amount]", ")"] }
        ],
        "partitions": [
          { "name": "Sales", "mode": "import", "source": { "type": "m", "expression": "let Source = 1 in Source" } }
        ]
      },
      {
        "name": "Product",
        "columns": [
          { "name": "ProductKey", "dataType": 6 },
          { "name": "Name", "dataType": 2 }
        ]
      }
    ],
    "relationships": [
      { "name": "r1", "fromTable": "Sales", "fromColumn": "ProductKey", "toTable": "Product", "toColumn": "ProductKey" }
    ]
  }
}"#;
