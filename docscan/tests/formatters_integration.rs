//! Integration tests for exporting real scan results to files.

use std::sync::Arc;

use bson::doc;
use docscan::formatters::{FormatterConfig, OutputFormat, CSV_HEADER};
use docscan::scanner::{ScanOptions, Scanner};
use docscan::sources::InMemorySource;
use docscan::types::{ScanResult, ScanSummary};
use tempfile::TempDir;

async fn scanned() -> ScanResult {
    let source = InMemorySource::new()
        .with_cluster_name("cluster0")
        .with_collection(
            "shop",
            "orders",
            vec![
                doc! { "_id": 1, "total": 9.5, "customer": { "name": "Ada", "vip": true } },
                doc! { "_id": 2, "total": 12.0, "customer": { "name": "Alan" } },
            ],
        )
        .with_indexes("shop", "orders", ["_id_", "customer.name_1"]);

    Scanner::new(Arc::new(source), ScanOptions::default())
        .unwrap()
        .scan()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_json_export_reloads() {
    let result = scanned().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.json");

    OutputFormat::Json
        .formatter()
        .export_to_file(&result, &path)
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let reloaded: ScanResult = serde_json::from_str(&text).unwrap();
    assert_eq!(reloaded, result);
}

#[tokio::test]
async fn test_yaml_export_without_summary() {
    let result = scanned().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.yaml");

    OutputFormat::Yaml
        .formatter_with_config(FormatterConfig::default().with_summary(false))
        .export_to_file(&result, &path)
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("cluster_name: cluster0"));
    assert!(!text.contains("summary:"));

    let reloaded: ScanResult = serde_yaml::from_str(&text).unwrap();
    assert_eq!(reloaded.databases, result.databases);
    assert_eq!(reloaded.summary, ScanSummary::default());
}

#[tokio::test]
async fn test_csv_export_flattens_nested_fields() {
    let result = scanned().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.csv");

    OutputFormat::Csv
        .formatter()
        .export_to_file(&result, &path)
        .unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, CSV_HEADER);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let paths: Vec<&str> = rows.iter().map(|r| &r[4]).collect();
    assert_eq!(
        paths,
        vec!["_id", "customer", "customer.name", "customer.vip", "total"]
    );

    let vip = &rows[3];
    assert_eq!(&vip[0], "shop");
    assert_eq!(&vip[1], "orders");
    assert_eq!(&vip[2], "2");
    assert_eq!(&vip[5], "boolean");
    assert_eq!(&vip[6], "50.0");
    assert_eq!(&vip[7], "boolean:100.0%");
}

#[tokio::test]
async fn test_export_to_missing_directory_fails() {
    let result = scanned().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("schema.json");

    let err = OutputFormat::Json
        .formatter()
        .export_to_file(&result, &path)
        .unwrap_err();
    assert!(matches!(err, docscan::ScanError::Io(_)));
}
