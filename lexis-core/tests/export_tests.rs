// Tests for spreadsheet export

use lexis_core::export::{
    ExportFormat, NAME_HEADER, export_file_name, export_rows, sanitize_file_stem,
};
use lexis_scanner::Row;
use std::fs;
use tempfile::TempDir;

fn rows() -> Vec<Row> {
    vec![Row::new("apple"), Row::new("banana, ripe"), Row::new("苹果")]
}

// ============================================================================
// Export Format Tests
// ============================================================================

#[test]
fn test_export_format_from_str() {
    assert!(matches!(ExportFormat::from_str("xlsx"), Some(ExportFormat::Xlsx)));
    assert!(matches!(ExportFormat::from_str("Excel"), Some(ExportFormat::Xlsx)));
    assert!(matches!(ExportFormat::from_str("CSV"), Some(ExportFormat::Csv)));
    assert!(matches!(ExportFormat::from_str("json"), Some(ExportFormat::Json)));
    assert!(ExportFormat::from_str("pdf").is_none());
}

#[test]
fn test_export_format_from_path() {
    assert_eq!(
        ExportFormat::from_path("words.CSV".as_ref()),
        Some(ExportFormat::Csv)
    );
    assert_eq!(ExportFormat::from_path("words".as_ref()), None);
    assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
}

// ============================================================================
// File Name Tests
// ============================================================================

#[test]
fn test_sanitize_file_stem() {
    assert_eq!(sanitize_file_stem("A/B: C?"), "A_B_ C_");
    assert_eq!(sanitize_file_stem("  Plain Title  "), "Plain Title");
    assert_eq!(sanitize_file_stem("..hidden.."), "hidden");
    assert_eq!(sanitize_file_stem("tab\there"), "tab_here");
}

#[test]
fn test_export_file_name_uses_title() {
    assert_eq!(
        export_file_name(Some("英汉词典"), "R1", ExportFormat::Xlsx),
        "英汉词典.xlsx"
    );
}

#[test]
fn test_export_file_name_falls_back_to_book_id() {
    assert_eq!(export_file_name(None, "R1", ExportFormat::Csv), "R1.csv");
    assert_eq!(export_file_name(Some("   "), "R1", ExportFormat::Json), "R1.json");
}

// ============================================================================
// Sink Tests
// ============================================================================

#[test]
fn test_csv_export_keeps_order_and_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");

    export_rows(&rows(), &path, ExportFormat::Csv).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), vec![NAME_HEADER]);
    let names: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(0).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["apple", "banana, ripe", "苹果"]);
}

#[test]
fn test_csv_export_of_nothing_still_has_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");

    export_rows(&[], &path, ExportFormat::Csv).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap().trim(), NAME_HEADER);
}

#[test]
fn test_json_export_round_trips_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.json");

    export_rows(&rows(), &path, ExportFormat::Json).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let parsed: Vec<Row> = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed, rows());
    assert!(content.contains(r#""Name": "apple""#));
}

#[test]
fn test_xlsx_export_writes_workbook() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("words.xlsx");

    export_rows(&rows(), &path, ExportFormat::Xlsx).unwrap();

    let bytes = fs::read(&path).unwrap();
    // xlsx files are zip archives
    assert!(bytes.starts_with(b"PK"));
}
