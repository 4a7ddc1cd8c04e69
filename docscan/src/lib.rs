//! # docscan - Schema discovery for document databases
//!
//! docscan walks every user database and collection of a document store,
//! samples documents from each collection, and infers a schema from the
//! sample: the dotted paths that occur, the types observed at each path, how
//! often each path is present, and a confidence score for the collection as a
//! whole. Nothing is ever written to the scanned deployment.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use bson::doc;
//! use docscan::prelude::*;
//!
//! # async fn example() -> docscan::Result<()> {
//! let source = InMemorySource::new().with_collection(
//!     "shop",
//!     "users",
//!     vec![
//!         doc! { "_id": 1, "name": "Ada", "address": { "city": "London" } },
//!         doc! { "_id": 2, "name": "Grace", "age": 85 },
//!     ],
//! );
//!
//! let options = ScanOptions::builder("mongodb://localhost:27017")
//!     .max_docs(10_000)
//!     .concurrency(4)
//!     .build();
//!
//! let result = Scanner::new(Arc::new(source), options)?.scan().await?;
//! println!("{}", JsonFormatter::new().format(&result)?);
//! # Ok(())
//! # }
//! ```
//!
//! Against a live MongoDB deployment, enable the `mongodb` feature and use
//! `MongoSource::connect(uri)` as the source.
//!
//! ## Architecture
//!
//! - **`analyzers`**: type classification, per-path aggregation, schema tree
//!   construction and sample size planning. Pure and synchronous.
//! - **`sources`**: the [`DocumentSource`](sources::DocumentSource) trait and
//!   its in-memory and MongoDB implementations.
//! - **`scanner`**: concurrent orchestration with a scan-wide deadline,
//!   per-unit failure isolation and the [`ScanSummary`](types::ScanSummary).
//! - **`formatters`**: JSON, YAML and CSV export.
//! - **`logging`**: `tracing-subscriber` setup for binaries.
//!
//! ## Partial results
//!
//! A scan only fails outright when the source cannot list its databases. A
//! database or collection that fails is logged, listed in
//! `summary.failures` and omitted from the result; check
//! [`ScanResult::is_complete`](types::ScanResult::is_complete) before treating
//! a result as exhaustive.

pub mod analyzers;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod scanner;
pub mod sources;
pub mod types;
pub mod uri;

pub use error::{Result, ScanError};
