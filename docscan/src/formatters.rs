//! Serialization of scan results.
//!
//! Three output formats are supported: pretty JSON, YAML, and a flattened CSV
//! with one row per field. Formatters are independent from the scanner; pick
//! one from an [`OutputFormat`] and hand it a [`ScanResult`].
//!
//! # Examples
//!
//! ```rust
//! use docscan::formatters::{OutputFormat, ScanFormatter};
//! use docscan::types::{ScanResult, ScanSummary};
//!
//! let result = ScanResult {
//!     cluster_name: "cluster0".to_string(),
//!     scan_timestamp: "2024-05-01T12:00:00Z".to_string(),
//!     databases: vec![],
//!     summary: ScanSummary::default(),
//! };
//!
//! let format: OutputFormat = "yaml".parse().unwrap();
//! let output = format.formatter().format(&result).unwrap();
//! assert!(output.contains("cluster_name: cluster0"));
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Result, ScanError};
use crate::types::{Collection, Field, ScanResult};

/// Output format of an exported scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Csv,
}

impl OutputFormat {
    /// Names accepted by [`FromStr`].
    pub fn valid_formats() -> &'static [&'static str] {
        &["json", "yaml", "csv"]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Csv => "csv",
        }
    }

    /// Creates the formatter for this format with the default configuration.
    pub fn formatter(&self) -> Box<dyn ScanFormatter> {
        self.formatter_with_config(FormatterConfig::default())
    }

    pub fn formatter_with_config(&self, config: FormatterConfig) -> Box<dyn ScanFormatter> {
        match self {
            Self::Json => Box::new(JsonFormatter::with_config(config)),
            Self::Yaml => Box::new(YamlFormatter::with_config(config)),
            Self::Csv => Box::new(CsvFormatter::new()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "csv" => Ok(Self::Csv),
            other => Err(ScanError::Configuration(format!(
                "unsupported format: {other} (valid formats: {})",
                Self::valid_formats().join(", ")
            ))),
        }
    }
}

/// Options shared by the document formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the scan summary block
    pub include_summary: bool,
    /// Pretty-print where the format supports it
    pub pretty: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            pretty: true,
        }
    }
}

impl FormatterConfig {
    /// Schema only: no summary, compact output.
    pub fn minimal() -> Self {
        Self {
            include_summary: false,
            pretty: false,
        }
    }

    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Converts a scan result into an output format.
///
/// # Examples
///
/// ```rust
/// use docscan::formatters::ScanFormatter;
/// use docscan::types::ScanResult;
///
/// struct CountFormatter;
///
/// impl ScanFormatter for CountFormatter {
///     fn format(&self, result: &ScanResult) -> docscan::Result<String> {
///         Ok(format!("{} databases", result.databases.len()))
///     }
/// }
/// ```
pub trait ScanFormatter: Send + Sync {
    fn format(&self, result: &ScanResult) -> Result<String>;

    /// Writes the formatted result to a writer.
    fn write_to(&self, result: &ScanResult, writer: &mut dyn Write) -> Result<()> {
        let output = self.format(result)?;
        writer.write_all(output.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Creates (or truncates) a file and writes the formatted result to it.
    fn export_to_file(&self, result: &ScanResult, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(result, &mut writer)?;
        info!(path = %path.display(), "exported scan result");
        Ok(())
    }
}

/// Drops the summary block when the configuration excludes it.
fn filter_result_for_config(
    result: &ScanResult,
    config: &FormatterConfig,
) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(result)?;
    if !config.include_summary {
        if let Some(object) = value.as_object_mut() {
            object.remove("summary");
        }
    }
    Ok(value)
}

/// Formats scan results as JSON, pretty-printed by default.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    config: FormatterConfig,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }
}

impl ScanFormatter for JsonFormatter {
    fn format(&self, result: &ScanResult) -> Result<String> {
        let value = filter_result_for_config(result, &self.config)?;
        let output = if self.config.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(output)
    }
}

/// Formats scan results as YAML.
#[derive(Debug, Clone, Default)]
pub struct YamlFormatter {
    config: FormatterConfig,
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ScanFormatter for YamlFormatter {
    fn format(&self, result: &ScanResult) -> Result<String> {
        let value = filter_result_for_config(result, &self.config)?;
        Ok(serde_yaml::to_string(&value)?)
    }
}

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 8] = [
    "Database",
    "Collection",
    "Document Count",
    "Avg Doc Size (bytes)",
    "Field Path",
    "Inferred Type",
    "Presence %",
    "Type Distribution",
];

/// Flattens scan results to CSV, one row per field.
///
/// Nested fields get their own rows under their full dotted path. Presence
/// and type frequencies are printed with one decimal.
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }

    fn write_fields<W: Write>(
        writer: &mut csv::Writer<W>,
        database: &str,
        collection: &Collection,
        fields: &[Field],
        prefix: Option<&str>,
    ) -> Result<()> {
        for field in fields {
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{}", field.path),
                None => field.path.clone(),
            };

            let distribution = field
                .types
                .iter()
                .map(|t| format!("{}:{:.1}%", t.type_name, t.frequency_percent))
                .collect::<Vec<_>>()
                .join(", ");

            writer.write_record([
                database,
                collection.name.as_str(),
                &collection.document_count.to_string(),
                &collection.average_doc_size_bytes.to_string(),
                &path,
                &field.inferred_type,
                &format!("{:.1}", field.presence_percent),
                &distribution,
            ])?;

            Self::write_fields(writer, database, collection, field.children(), Some(&path))?;
        }
        Ok(())
    }
}

impl ScanFormatter for CsvFormatter {
    fn format(&self, result: &ScanResult) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for database in &result.databases {
            for collection in &database.collections {
                Self::write_fields(
                    &mut writer,
                    &database.name,
                    collection,
                    &collection.fields,
                    None,
                )?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ScanError::Serialization(format!("failed to flush CSV: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| ScanError::Serialization(format!("CSV output is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Database, SamplingMethod, ScanSummary, TypeFrequency};

    fn field(path: &str, inferred: &str, presence: f64, types: &[(&str, f64)]) -> Field {
        Field {
            path: path.to_string(),
            types: types
                .iter()
                .map(|(t, f)| TypeFrequency {
                    type_name: t.to_string(),
                    frequency_percent: *f,
                })
                .collect(),
            inferred_type: inferred.to_string(),
            presence_percent: presence,
            nested_fields: None,
        }
    }

    fn create_test_result() -> ScanResult {
        let mut address = field("address", "object", 50.0, &[("object", 100.0)]);
        address.nested_fields = Some(vec![field("city", "string", 100.0, &[("string", 100.0)])]);

        ScanResult {
            cluster_name: "cluster0".to_string(),
            scan_timestamp: "2024-05-01T12:00:00Z".to_string(),
            databases: vec![Database {
                name: "shop".to_string(),
                size_bytes: 2048,
                collections: vec![Collection {
                    name: "users".to_string(),
                    document_count: 4,
                    average_doc_size_bytes: 87,
                    indexes: vec!["_id_".to_string()],
                    fields: vec![
                        field("_id", "int32", 100.0, &[("int32", 100.0)]),
                        address,
                        field("age", "mixed", 100.0, &[("int32", 66.67), ("string", 33.33)]),
                    ],
                    sampled_documents: 4,
                    sampling_method: SamplingMethod::Random,
                    schema_confidence: 72.22,
                    rare_fields: vec![],
                }],
            }],
            summary: ScanSummary {
                databases_scanned: 1,
                collections_scanned: 1,
                total_fields: 4,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(" yaml ".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("Csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(err.to_string().contains("json, yaml, csv"));
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter::new().format(&create_test_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["cluster_name"], "cluster0");
        let users = &value["databases"][0]["collections"][0];
        assert_eq!(users["fields"][1]["nested_fields"][0]["path"], "city");
        assert!(users["fields"][0].get("nested_fields").is_none());
        assert_eq!(users["fields"][2]["types"][0]["type"], "int32");
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_json_formatter_minimal_config() {
        let formatter = JsonFormatter::with_config(FormatterConfig::minimal());
        let output = formatter.format(&create_test_result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert!(value.get("summary").is_none());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_yaml_round_trip() {
        let result = create_test_result();
        let output = YamlFormatter::new().format(&result).unwrap();
        let parsed: ScanResult = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_csv_rows() {
        let output = CsvFormatter::new().format(&create_test_result()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "Database,Collection,Document Count,Avg Doc Size (bytes),Field Path,Inferred Type,Presence %,Type Distribution"
        );
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "shop,users,4,87,_id,int32,100.0,int32:100.0%");
        assert_eq!(lines[3], "shop,users,4,87,address.city,string,100.0,string:100.0%");
        assert_eq!(
            lines[4],
            "shop,users,4,87,age,mixed,100.0,\"int32:66.7%, string:33.3%\""
        );
    }

    #[test]
    fn test_write_to_buffer() {
        let mut buffer: Vec<u8> = Vec::new();
        OutputFormat::Json
            .formatter()
            .write_to(&create_test_result(), &mut buffer)
            .unwrap();
        assert!(String::from_utf8(buffer).unwrap().starts_with('{'));
    }
}
