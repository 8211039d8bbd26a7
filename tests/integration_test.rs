use color_eyre::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use polars::prelude::ChunkAgg;
use reviewlens::error_display::user_message_from_report;
use reviewlens::schema::{PRODUCT_NAME, RATING};
use reviewlens::{analyze_file, AnalysisConfig, OpenOptions, OutputFormat, Report, Selection};
use std::io::Write;
use tempfile::TempDir;

mod common;

#[test]
fn test_analyze_csv_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_file(dir.path(), "reviews.csv", common::SAMPLE_CSV.as_bytes());

    let table = analyze_file(&path, &OpenOptions::new())?;
    assert_eq!(table.height(), 10);
    assert_eq!(table.floats(RATING).unwrap().sum(), Some(36.0));
    Ok(())
}

#[test]
fn test_analyze_gzip_file() -> Result<()> {
    let dir = TempDir::new()?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(common::SAMPLE_CSV.as_bytes())?;
    let path = common::write_file(dir.path(), "reviews.csv.gz", &encoder.finish()?);

    let table = analyze_file(&path, &OpenOptions::new())?;
    assert_eq!(table.height(), 10);
    assert_eq!(table.text(PRODUCT_NAME).unwrap().get(0), Some("Wayona Cable"));
    Ok(())
}

#[test]
fn test_analyze_tsv_file() -> Result<()> {
    let dir = TempDir::new()?;
    let tsv = "user\tproduct\tcomment\trating\nann\tGeneric Phone Stand\tsturdy 👍\t4.5\n";
    let path = common::write_file(dir.path(), "reviews.tsv", tsv.as_bytes());

    let table = analyze_file(&path, &OpenOptions::new())?;
    assert_eq!(table.text(PRODUCT_NAME).unwrap().get(0), Some("Generic Phone"));
    assert_eq!(table.floats(RATING).unwrap().get(0), Some(4.5));
    Ok(())
}

#[test]
fn test_missing_file_message() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");

    let err = analyze_file(&path, &OpenOptions::new()).unwrap_err();
    let message = user_message_from_report(&err, Some(&path));
    assert!(message.contains("absent.csv"), "{message}");
}

#[test]
fn test_empty_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "empty.csv", b"\n");
    assert!(analyze_file(&path, &OpenOptions::new()).is_err());
}

#[test]
fn test_export_clean_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("clean.csv");
    common::sample_table().write_csv(&out)?;

    let reloaded = analyze_file(&out, &OpenOptions::new())?;
    assert_eq!(reloaded.height(), 10);
    assert!(reloaded.has_column("clean_review"));
    assert_eq!(reloaded.floats(RATING).unwrap().sum(), Some(36.0));
    Ok(())
}

#[test]
fn test_report_json_shape() -> Result<()> {
    let table = common::sample_table();
    let report = Report::build(&table, &Selection::Overall, &AnalysisConfig::default())?;
    let json: serde_json::Value = serde_json::from_str(&report.render(OutputFormat::Json, true)?)?;

    assert_eq!(json["selection"], "Overall");
    assert_eq!(json["summary"]["status"], "available");
    assert_eq!(json["summary"]["data"]["review_count"], 10);
    assert_eq!(json["products"]["top_products"]["status"], "available");
    assert_eq!(json["timeline"]["data"][0]["label"], "5.0-24269");
    Ok(())
}

#[test]
fn test_report_text_for_user() -> Result<()> {
    let table = common::sample_table();
    let report = Report::build(&table, &Selection::User("dan".to_string()), &AnalysisConfig::default())?;
    let text = report.render(OutputFormat::Text, false)?;

    assert!(text.starts_with("Review analysis: dan"));
    assert!(text.contains("Reviews:          1"));
    assert!(!text.contains("Top products"));
    Ok(())
}
