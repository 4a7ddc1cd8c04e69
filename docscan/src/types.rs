//! Result types produced by a scan.
//!
//! A [`ScanResult`] is assembled once per scan and handed to the caller, which
//! owns it from then on. Databases and collections appear in the order their
//! workers completed, not in discovery or alphabetical order; sort explicitly
//! downstream if order matters.

use serde::{Deserialize, Serialize};

/// The complete output of one cluster scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub cluster_name: String,
    /// RFC 3339 timestamp (UTC) taken when the scan started.
    pub scan_timestamp: String,
    pub databases: Vec<Database>,
    #[serde(default)]
    pub summary: ScanSummary,
}

impl ScanResult {
    /// Returns true if no database or collection was lost to a failure.
    pub fn is_complete(&self) -> bool {
        self.summary.failures.is_empty()
    }

    /// Number of collections across all scanned databases.
    pub fn total_collections(&self) -> usize {
        self.databases.iter().map(|db| db.collections.len()).sum()
    }

    /// Number of fields across all collections, nested fields included.
    pub fn total_fields(&self) -> usize {
        self.databases
            .iter()
            .flat_map(|db| &db.collections)
            .map(|coll| count_fields(&coll.fields))
            .sum()
    }
}

/// A scanned database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub size_bytes: u64,
    pub collections: Vec<Collection>,
}

/// A scanned collection and its inferred schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    /// Estimated document count reported by the source.
    pub document_count: u64,
    pub average_doc_size_bytes: u64,
    pub indexes: Vec<String>,
    /// Top-level fields; nested fields hang off their parent.
    pub fields: Vec<Field>,
    /// Number of documents that were actually analyzed.
    pub sampled_documents: u64,
    pub sampling_method: SamplingMethod,
    pub schema_confidence: f64,
    pub rare_fields: Vec<String>,
}

/// A field descriptor within an inferred schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Path relative to the parent field (the full path for top-level fields).
    pub path: String,
    /// Observed types, most frequent first.
    pub types: Vec<TypeFrequency>,
    pub inferred_type: String,
    pub presence_percent: f64,
    /// Present only for fields observed holding embedded documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_fields: Option<Vec<Field>>,
}

impl Field {
    /// Returns the nested children, or an empty slice for leaf fields.
    pub fn children(&self) -> &[Field] {
        self.nested_fields.as_deref().unwrap_or(&[])
    }

    /// Looks up a direct child by its relative path.
    pub fn child(&self, path: &str) -> Option<&Field> {
        self.children().iter().find(|f| f.path == path)
    }

    /// Frequency of the most common type, or 0 if nothing was observed.
    pub fn dominant_frequency(&self) -> f64 {
        self.types.first().map_or(0.0, |t| t.frequency_percent)
    }
}

/// Share of a field's values that had a given type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeFrequency {
    #[serde(rename = "type")]
    pub type_name: String,
    pub frequency_percent: f64,
}

/// How the documents of a collection were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    /// Randomized sample drawn by the source.
    Random,
    /// First N documents in natural order, used when random sampling failed.
    FirstN,
}

impl std::fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::FirstN => write!(f, "first_n"),
        }
    }
}

/// Schema analysis of one collection's sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionAnalysis {
    pub fields: Vec<Field>,
    pub schema_confidence: f64,
    /// Top-level paths present in fewer than 5% of sampled documents.
    pub rare_fields: Vec<String>,
}

/// Counters describing how complete a scan was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub databases_scanned: usize,
    pub databases_failed: usize,
    pub collections_scanned: usize,
    pub collections_failed: usize,
    /// Collections skipped because their name starts with `_`.
    pub collections_skipped: usize,
    /// Non-critical lookups (counts, indexes, sizes) that fell back to defaults.
    pub degraded_operations: usize,
    /// Collections sampled in first-N mode after random sampling failed.
    pub first_n_fallbacks: usize,
    pub total_fields: usize,
    pub elapsed_ms: u64,
    pub failures: Vec<UnitFailure>,
}

/// A database or collection that was dropped from the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// `db` for databases, `db.collection` for collections.
    pub unit: String,
    pub kind: UnitKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Database,
    Collection,
}

/// Counts fields recursively, nested fields included.
pub fn count_fields(fields: &[Field]) -> usize {
    fields
        .iter()
        .map(|f| 1 + count_fields(f.children()))
        .sum()
}
