//! Schema analysis of sampled documents.
//!
//! The analysis runs in three steps over one collection's sample:
//!
//! 1. **Type classification** (`classifier`): every value is mapped to a
//!    structural [`TypeTag`] such as `int32`, `object` or `array`.
//! 2. **Field aggregation** (`aggregator`): documents are walked recursively and
//!    counts are collected per dotted path, with `[]` marking array elements.
//! 3. **Schema building** (`schema_builder`): the flat statistics become a tree
//!    of [`Field`](crate::types::Field)s with type distributions, presence and a
//!    schema confidence score.
//!
//! The `sampling` module decides how many documents to request in the first
//! place.
//!
//! ## Example
//!
//! ```rust
//! use bson::doc;
//! use docscan::analyzers::analyze_documents;
//!
//! let docs = vec![
//!     doc! { "_id": 1, "name": "Ada", "address": { "city": "London" } },
//!     doc! { "_id": 2, "name": "Grace", "tags": ["navy", "cobol"] },
//! ];
//!
//! let analysis = analyze_documents(&docs);
//! assert_eq!(analysis.fields[0].path, "_id");
//!
//! let address = analysis.fields.iter().find(|f| f.path == "address").unwrap();
//! assert_eq!(address.presence_percent, 50.0);
//! assert_eq!(address.child("city").unwrap().inferred_type, "string");
//! ```

pub mod aggregator;
pub mod classifier;
pub mod sampling;
pub mod schema_builder;

pub use aggregator::{FieldAggregator, FieldStat, ARRAY_MARKER};
pub use classifier::{classify, classify_value, TypeTag};
pub use sampling::{plan_sample_size, DEFAULT_MAX_DOCS};
pub use schema_builder::{infer_type, round2, schema_confidence, SchemaBuilder};

use bson::Document;

use crate::types::CollectionAnalysis;

/// Analyze a batch of documents into a field tree.
pub fn analyze_documents(documents: &[Document]) -> CollectionAnalysis {
    let aggregator = FieldAggregator::from_documents(documents);
    SchemaBuilder::new(&aggregator).build()
}
