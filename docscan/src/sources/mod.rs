//! Document sources the scanner reads from.
//!
//! A [`DocumentSource`] exposes the handful of catalog and sampling
//! operations a schema scan needs. Two implementations ship with the crate:
//!
//! - [`InMemorySource`]: documents held in process, with failure injection.
//!   Used by tests and by embedders that already hold documents.
//! - `MongoSource` (feature `mongodb`): a live cluster through the official
//!   driver.

use std::fmt::{self, Debug};

use async_trait::async_trait;
use bson::Document;

use crate::error::SourceResult;

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

pub use memory::{InMemorySource, SourceOperation};
#[cfg(feature = "mongodb")]
pub use mongo::MongoSource;

/// How documents are drawn from a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleMode {
    /// A randomized sample computed by the source.
    Random,
    /// The first documents in natural order.
    FirstN,
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::FirstN => write!(f, "first_n"),
        }
    }
}

/// A backend holding databases of document collections.
///
/// Implementations must be safe to call concurrently: the scanner issues
/// requests for many databases and collections at once.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use bson::doc;
/// use docscan::sources::{DocumentSource, InMemorySource, SampleMode};
///
/// # tokio_test_block(async {
/// let source = InMemorySource::new()
///     .with_collection("shop", "orders", vec![doc! { "_id": 1, "total": 9.5 }]);
///
/// let dbs = source.list_databases().await.unwrap();
/// assert_eq!(dbs, vec!["shop".to_string()]);
///
/// let docs = source
///     .sample_documents("shop", "orders", 10, SampleMode::FirstN)
///     .await
///     .unwrap();
/// assert_eq!(docs.len(), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[async_trait]
pub trait DocumentSource: Debug + Send + Sync {
    /// Lists every database name. Failure here means the backend is unusable.
    async fn list_databases(&self) -> SourceResult<Vec<String>>;

    /// Lists the collection names of one database.
    async fn list_collections(&self, database: &str) -> SourceResult<Vec<String>>;

    /// Returns the estimated document count of a collection.
    async fn estimated_count(&self, database: &str, collection: &str) -> SourceResult<u64>;

    /// Returns the names of the indexes defined on a collection.
    async fn list_index_names(&self, database: &str, collection: &str)
        -> SourceResult<Vec<String>>;

    /// Returns up to `size` documents drawn with the given mode.
    async fn sample_documents(
        &self,
        database: &str,
        collection: &str,
        size: u64,
        mode: SampleMode,
    ) -> SourceResult<Vec<Document>>;

    /// Returns the data size of a database in bytes.
    async fn database_size_bytes(&self, database: &str) -> SourceResult<u64>;

    /// Returns the cluster name if the source knows it.
    fn cluster_name(&self) -> Option<String> {
        None
    }
}
