//! In-process document source.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bson::Document;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::{DocumentSource, SampleMode};
use crate::error::{SourceError, SourceResult};

/// Operations of [`DocumentSource`], used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOperation {
    ListDatabases,
    ListCollections,
    EstimatedCount,
    ListIndexNames,
    SampleRandom,
    SampleFirstN,
    DatabaseSize,
}

impl SourceOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListDatabases => "list_databases",
            Self::ListCollections => "list_collections",
            Self::EstimatedCount => "estimated_count",
            Self::ListIndexNames => "list_index_names",
            Self::SampleRandom => "sample_random",
            Self::SampleFirstN => "sample_first_n",
            Self::DatabaseSize => "database_size",
        }
    }

    fn for_mode(mode: SampleMode) -> Self {
        match mode {
            SampleMode::Random => Self::SampleRandom,
            SampleMode::FirstN => Self::SampleFirstN,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<String>,
    estimated_count: Option<u64>,
    sample_delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryDatabase {
    size_bytes: Option<u64>,
    collections: BTreeMap<String, MemoryCollection>,
}

/// A [`DocumentSource`] over documents held in memory.
///
/// Failures can be injected per operation and target. A target is the
/// database name for database-level operations and `db.collection` for
/// collection-level ones; `list_databases` failures use an empty target.
///
/// # Examples
///
/// ```rust
/// use bson::doc;
/// use docscan::sources::{InMemorySource, SourceOperation};
///
/// let source = InMemorySource::new()
///     .with_collection("shop", "orders", vec![doc! { "_id": 1 }])
///     .with_collection("shop", "carts", vec![doc! { "_id": 2 }])
///     .with_indexes("shop", "orders", ["_id_", "status_1"])
///     .with_failure(SourceOperation::SampleRandom, "shop.carts", "sampling disabled")
///     .with_failure(SourceOperation::SampleFirstN, "shop.carts", "cursor killed");
/// ```
#[derive(Debug, Default)]
pub struct InMemorySource {
    databases: BTreeMap<String, MemoryDatabase>,
    failures: HashMap<(SourceOperation, String), String>,
    unreachable: Option<String>,
    random_unsupported: bool,
    latency: Option<Duration>,
    cluster_name: Option<String>,
    in_flight_samples: AtomicUsize,
    max_in_flight_samples: AtomicUsize,
    calls: Mutex<Vec<(SourceOperation, String)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection, creating the database if needed.
    pub fn with_collection(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        documents: Vec<Document>,
    ) -> Self {
        self.collection_mut(database.into(), collection.into())
            .documents = documents;
        self
    }

    /// Adds a database without collections.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.databases.entry(database.into()).or_default();
        self
    }

    pub fn with_indexes<I, S>(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        indexes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collection_mut(database.into(), collection.into())
            .indexes = indexes.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the estimated count, which defaults to the number of stored documents.
    pub fn with_estimated_count(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        count: u64,
    ) -> Self {
        self.collection_mut(database.into(), collection.into())
            .estimated_count = Some(count);
        self
    }

    /// Overrides the database size, which defaults to the encoded size of its documents.
    pub fn with_database_size(mut self, database: impl Into<String>, size_bytes: u64) -> Self {
        self.databases.entry(database.into()).or_default().size_bytes = Some(size_bytes);
        self
    }

    /// Makes the given operation fail for the given target.
    pub fn with_failure(
        mut self,
        operation: SourceOperation,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.failures
            .insert((operation, target.into()), message.into());
        self
    }

    /// Makes `list_databases` fail as if the backend could not be reached.
    pub fn unreachable(mut self, message: impl Into<String>) -> Self {
        self.unreachable = Some(message.into());
        self
    }

    /// Rejects every random sample request.
    pub fn with_random_unsupported(mut self) -> Self {
        self.random_unsupported = true;
        self
    }

    /// Delays every operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delays sampling of one collection.
    pub fn with_sample_delay(
        mut self,
        database: impl Into<String>,
        collection: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.collection_mut(database.into(), collection.into())
            .sample_delay = Some(delay);
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    /// Highest number of sample requests that were in flight at once.
    pub fn max_concurrent_samples(&self) -> usize {
        self.max_in_flight_samples.load(Ordering::SeqCst)
    }

    /// Targets of every call made for the given operation, in call order.
    pub fn calls(&self, operation: SourceOperation) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls
                .iter()
                .filter(|(op, _)| *op == operation)
                .map(|(_, target)| target.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn collection_mut(&mut self, database: String, collection: String) -> &mut MemoryCollection {
        self.databases
            .entry(database)
            .or_default()
            .collections
            .entry(collection)
            .or_default()
    }

    async fn enter(&self, operation: SourceOperation, target: &str) -> SourceResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((operation, target.to_string()));
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.failures.get(&(operation, target.to_string())) {
            Some(message) => Err(SourceError::operation(operation.as_str(), message.clone())),
            None => Ok(()),
        }
    }

    fn database(&self, operation: SourceOperation, database: &str) -> SourceResult<&MemoryDatabase> {
        self.databases.get(database).ok_or_else(|| {
            SourceError::operation(operation.as_str(), format!("database {database} not found"))
        })
    }

    fn collection(
        &self,
        operation: SourceOperation,
        database: &str,
        collection: &str,
    ) -> SourceResult<&MemoryCollection> {
        self.database(operation, database)?
            .collections
            .get(collection)
            .ok_or_else(|| {
                SourceError::operation(
                    operation.as_str(),
                    format!("namespace {database}.{collection} not found"),
                )
            })
    }

    async fn draw(
        &self,
        database: &str,
        collection: &str,
        size: u64,
        mode: SampleMode,
    ) -> SourceResult<Vec<Document>> {
        let operation = SourceOperation::for_mode(mode);
        let target = format!("{database}.{collection}");
        self.enter(operation, &target).await?;

        if mode == SampleMode::Random && self.random_unsupported {
            return Err(SourceError::operation(
                operation.as_str(),
                "$sample is not supported",
            ));
        }

        let stored = self.collection(operation, database, collection)?;
        if let Some(delay) = stored.sample_delay {
            tokio::time::sleep(delay).await;
        }

        let limit = usize::try_from(size).unwrap_or(usize::MAX);
        Ok(match mode {
            SampleMode::Random => choose_random(&stored.documents, limit),
            SampleMode::FirstN => stored.documents.iter().take(limit).cloned().collect(),
        })
    }
}

/// Tracks in-flight sample requests, released on drop so cancelled requests count too.
struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn choose_random(documents: &[Document], limit: usize) -> Vec<Document> {
    documents
        .choose_multiple(&mut rand::rng(), limit)
        .cloned()
        .collect()
}

fn encoded_size(documents: &[Document]) -> SourceResult<u64> {
    documents.iter().try_fold(0u64, |total, doc| -> SourceResult<u64> {
        let bytes = bson::to_vec(doc).map_err(|e| {
            SourceError::operation(SourceOperation::DatabaseSize.as_str(), e.to_string())
        })?;
        Ok(total + bytes.len() as u64)
    })
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn list_databases(&self) -> SourceResult<Vec<String>> {
        if let Some(message) = &self.unreachable {
            return Err(SourceError::unreachable(message.clone()));
        }
        self.enter(SourceOperation::ListDatabases, "").await?;
        Ok(self.databases.keys().cloned().collect())
    }

    async fn list_collections(&self, database: &str) -> SourceResult<Vec<String>> {
        self.enter(SourceOperation::ListCollections, database).await?;
        Ok(self
            .database(SourceOperation::ListCollections, database)?
            .collections
            .keys()
            .cloned()
            .collect())
    }

    async fn estimated_count(&self, database: &str, collection: &str) -> SourceResult<u64> {
        let operation = SourceOperation::EstimatedCount;
        self.enter(operation, &format!("{database}.{collection}"))
            .await?;
        let stored = self.collection(operation, database, collection)?;
        Ok(stored
            .estimated_count
            .unwrap_or(stored.documents.len() as u64))
    }

    async fn list_index_names(
        &self,
        database: &str,
        collection: &str,
    ) -> SourceResult<Vec<String>> {
        let operation = SourceOperation::ListIndexNames;
        self.enter(operation, &format!("{database}.{collection}"))
            .await?;
        Ok(self
            .collection(operation, database, collection)?
            .indexes
            .clone())
    }

    async fn sample_documents(
        &self,
        database: &str,
        collection: &str,
        size: u64,
        mode: SampleMode,
    ) -> SourceResult<Vec<Document>> {
        let _guard = InFlight::enter(&self.in_flight_samples, &self.max_in_flight_samples);
        let result = self.draw(database, collection, size, mode).await;

        if let Ok(docs) = &result {
            debug!(database, collection, %mode, returned = docs.len(), "served sample");
        }
        result
    }

    async fn database_size_bytes(&self, database: &str) -> SourceResult<u64> {
        let operation = SourceOperation::DatabaseSize;
        self.enter(operation, database).await?;
        let stored = self.database(operation, database)?;
        match stored.size_bytes {
            Some(size) => Ok(size),
            None => stored
                .collections
                .values()
                .try_fold(0u64, |total, coll| -> SourceResult<u64> {
                    Ok(total + encoded_size(&coll.documents)?)
                }),
        }
    }

    fn cluster_name(&self) -> Option<String> {
        self.cluster_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn docs(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "_id": i, "n": i }).collect()
    }

    #[tokio::test]
    async fn test_catalog_listing() {
        let source = InMemorySource::new()
            .with_collection("b", "y", docs(1))
            .with_collection("a", "x", docs(1))
            .with_database("empty");

        assert_eq!(source.list_databases().await.unwrap(), vec!["a", "b", "empty"]);
        assert_eq!(source.list_collections("a").await.unwrap(), vec!["x"]);
        assert!(source.list_collections("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_n_preserves_order() {
        let source = InMemorySource::new().with_collection("db", "c", docs(10));
        let sample = source
            .sample_documents("db", "c", 3, SampleMode::FirstN)
            .await
            .unwrap();

        let ids: Vec<i32> = sample.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_random_sample_is_bounded_and_distinct() {
        let source = InMemorySource::new().with_collection("db", "c", docs(50));
        let sample = source
            .sample_documents("db", "c", 20, SampleMode::Random)
            .await
            .unwrap();

        assert_eq!(sample.len(), 20);
        let mut ids: Vec<i32> = sample.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_injected_failure_targets_one_collection() {
        let source = InMemorySource::new()
            .with_collection("db", "good", docs(2))
            .with_collection("db", "bad", docs(2))
            .with_failure(SourceOperation::ListIndexNames, "db.bad", "boom");

        assert!(source.list_index_names("db", "good").await.is_ok());
        let err = source.list_index_names("db", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "list_index_names failed: boom");
    }

    #[tokio::test]
    async fn test_random_unsupported_leaves_first_n_working() {
        let source = InMemorySource::new()
            .with_collection("db", "c", docs(5))
            .with_random_unsupported();

        assert!(source
            .sample_documents("db", "c", 5, SampleMode::Random)
            .await
            .is_err());
        assert_eq!(
            source
                .sample_documents("db", "c", 5, SampleMode::FirstN)
                .await
                .unwrap()
                .len(),
            5
        );
        assert_eq!(source.calls(SourceOperation::SampleRandom), vec!["db.c"]);
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let source = InMemorySource::new().unreachable("connection refused");
        let err = source.list_databases().await.unwrap_err();
        assert_eq!(err, SourceError::unreachable("connection refused"));
    }

    #[tokio::test]
    async fn test_counts_and_sizes() {
        let source = InMemorySource::new()
            .with_collection("db", "c", docs(3))
            .with_estimated_count("db", "c", 1_000)
            .with_database_size("sized", 4096);

        assert_eq!(source.estimated_count("db", "c").await.unwrap(), 1_000);
        assert_eq!(source.database_size_bytes("sized").await.unwrap(), 4096);
        assert!(source.database_size_bytes("db").await.unwrap() > 0);
        assert!(source.estimated_count("db", "missing").await.is_err());
    }
}
