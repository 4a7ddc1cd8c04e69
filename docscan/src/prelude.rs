//! Prelude for commonly used types and traits in docscan.

pub use crate::analyzers::analyze_documents;
pub use crate::error::{Result, ScanError, SourceError, SourceResult};
pub use crate::formatters::{FormatterConfig, JsonFormatter, OutputFormat, ScanFormatter};
pub use crate::scanner::{ScanOptions, Scanner};
pub use crate::sources::{DocumentSource, InMemorySource, SampleMode};
pub use crate::types::{Collection, Database, Field, ScanResult, ScanSummary};

#[cfg(feature = "mongodb")]
pub use crate::sources::MongoSource;
