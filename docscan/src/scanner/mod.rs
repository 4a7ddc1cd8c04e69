//! Cluster scan orchestration.
//!
//! A scan walks the catalog of a [`DocumentSource`] top-down:
//!
//! 1. list databases (failure aborts the scan with a connectivity error),
//! 2. drop the system databases and apply the allow-list,
//! 3. scan databases concurrently, each one listing its collections and
//!    scanning them concurrently in turn,
//! 4. assemble the [`ScanResult`] with its [`ScanSummary`].
//!
//! Failures below the database listing never abort the scan. A failed
//! database or collection is logged, recorded in the summary and left out of
//! the result. Failed auxiliary lookups (estimated count, index names,
//! database size) fall back to defaults and are counted as degraded.
//!
//! Every source call is bounded by one deadline and one cancellation token
//! per scan. Once either fires, the remaining calls fail fast and their units
//! are recorded as failures, auxiliary lookups included, so the result holds
//! whatever completed in time.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bson::doc;
//! use docscan::scanner::{ScanOptions, Scanner};
//! use docscan::sources::InMemorySource;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let source = InMemorySource::new()
//!     .with_collection("shop", "orders", vec![doc! { "_id": 1, "total": 12.5 }])
//!     .with_collection("admin", "system.users", vec![doc! { "_id": 1 }]);
//!
//! let scanner = Scanner::new(Arc::new(source), ScanOptions::default()).unwrap();
//! let result = scanner.scan().await.unwrap();
//!
//! assert_eq!(result.databases.len(), 1);
//! assert_eq!(result.databases[0].collections[0].name, "orders");
//! assert!(result.is_complete());
//! # });
//! ```

mod fanout;
mod filter;
mod guard;
mod options;

pub use fanout::{BoundedFanOut, FanOutResults};
pub use filter::{is_hidden_collection, is_system_database, DatabaseFilter, SYSTEM_DATABASES};
pub use guard::ScanGuard;
pub use options::{ScanOptions, ScanOptionsBuilder, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bson::Document;
use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::analyzers::{analyze_documents, plan_sample_size};
use crate::error::{Result, ScanError, SourceResult};
use crate::sources::{DocumentSource, SampleMode};
use crate::types::{
    Collection, Database, SamplingMethod, ScanResult, ScanSummary, UnitFailure, UnitKind,
};
use crate::uri::{extract_cluster_name, mask_uri, UNKNOWN_CLUSTER};

const WORKER_PANICKED: &str = "worker task panicked";

/// Scans every reachable database of a document source.
#[derive(Debug)]
pub struct Scanner {
    source: Arc<dyn DocumentSource>,
    options: ScanOptions,
    filter: DatabaseFilter,
    cancel: CancellationToken,
}

impl Scanner {
    /// Validates the options and creates a scanner.
    ///
    /// Fails with [`ScanError::Configuration`] if `concurrency` is zero or a
    /// database filter pattern is not a valid regex.
    pub fn new(source: Arc<dyn DocumentSource>, options: ScanOptions) -> Result<Self> {
        if options.concurrency == 0 {
            return Err(ScanError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let filter = DatabaseFilter::new(&options.db_filter)?;

        Ok(Self {
            source,
            options,
            filter,
            cancel: CancellationToken::new(),
        })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Token that aborts in-flight scans when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs a full scan.
    ///
    /// Returns an error only if the source cannot list its databases.
    /// Everything else degrades into a partial result described by
    /// [`ScanResult::summary`].
    #[instrument(skip(self), fields(target = %mask_uri(&self.options.target)))]
    pub async fn scan(&self) -> Result<ScanResult> {
        let started = std::time::Instant::now();
        let scan_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let guard = ScanGuard::new(self.options.timeout, self.cancel.child_token());

        let databases = guard
            .run("list_databases", self.source.list_databases())
            .await
            .map_err(|e| {
                ScanError::connectivity_with_source("failed to list databases", Box::new(e))
            })?;

        let listed = databases.len();
        let databases = self.filter.apply(databases);
        info!(
            listed,
            selected = databases.len(),
            "scanning databases"
        );

        let context = Arc::new(ScanContext {
            source: Arc::clone(&self.source),
            guard,
            max_docs: self.options.max_docs,
            concurrency: self.options.concurrency,
            stats: ScanStats::default(),
        });

        let fanout = BoundedFanOut::new(self.options.concurrency);
        let scanned = fanout
            .run(databases, |name| {
                let context = Arc::clone(&context);
                async move { context.scan_database(name).await }
            })
            .await;
        for name in scanned.panicked {
            context
                .stats
                .record_failure(name, UnitKind::Database, &WORKER_PANICKED)
                .await;
        }

        let mut summary = context.stats.snapshot().await;
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut result = ScanResult {
            cluster_name: self.cluster_name(),
            scan_timestamp,
            databases: scanned.completed,
            summary,
        };
        result.summary.total_fields = result.total_fields();

        info!(
            cluster = %result.cluster_name,
            databases = result.databases.len(),
            collections = result.total_collections(),
            fields = result.summary.total_fields,
            failures = result.summary.failures.len(),
            elapsed_ms = result.summary.elapsed_ms,
            "scan finished"
        );

        Ok(result)
    }

    fn cluster_name(&self) -> String {
        self.source
            .cluster_name()
            .or_else(|| extract_cluster_name(&self.options.target))
            .unwrap_or_else(|| UNKNOWN_CLUSTER.to_string())
    }
}

/// Counters shared by the workers of one scan.
#[derive(Debug, Default)]
struct ScanStats {
    databases_scanned: AtomicUsize,
    databases_failed: AtomicUsize,
    collections_scanned: AtomicUsize,
    collections_failed: AtomicUsize,
    collections_skipped: AtomicUsize,
    degraded_operations: AtomicUsize,
    first_n_fallbacks: AtomicUsize,
    failures: Mutex<Vec<UnitFailure>>,
}

impl ScanStats {
    async fn record_failure(&self, unit: String, kind: UnitKind, err: &(dyn fmt::Display + Sync)) {
        let counter = match kind {
            UnitKind::Database => &self.databases_failed,
            UnitKind::Collection => &self.collections_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.failures.lock().await.push(UnitFailure {
            unit,
            kind,
            message: err.to_string(),
        });
    }

    async fn snapshot(&self) -> ScanSummary {
        ScanSummary {
            databases_scanned: self.databases_scanned.load(Ordering::Relaxed),
            databases_failed: self.databases_failed.load(Ordering::Relaxed),
            collections_scanned: self.collections_scanned.load(Ordering::Relaxed),
            collections_failed: self.collections_failed.load(Ordering::Relaxed),
            collections_skipped: self.collections_skipped.load(Ordering::Relaxed),
            degraded_operations: self.degraded_operations.load(Ordering::Relaxed),
            first_n_fallbacks: self.first_n_fallbacks.load(Ordering::Relaxed),
            total_fields: 0,
            elapsed_ms: 0,
            failures: self.failures.lock().await.clone(),
        }
    }
}

/// State shared by the database and collection workers of one scan.
#[derive(Debug)]
struct ScanContext {
    source: Arc<dyn DocumentSource>,
    guard: ScanGuard,
    max_docs: u64,
    concurrency: usize,
    stats: ScanStats,
}

impl ScanContext {
    #[instrument(skip_all, fields(database = %name))]
    async fn scan_database(self: Arc<Self>, name: String) -> Option<Database> {
        let collections = match self
            .guard
            .run("list_collections", self.source.list_collections(&name))
            .await
        {
            Ok(collections) => collections,
            Err(e) => {
                error!(error = %e, "failed to scan database");
                self.stats
                    .record_failure(name, UnitKind::Database, &e)
                    .await;
                return None;
            }
        };

        let size = self
            .degradable(
                "database_size",
                &name,
                self.source.database_size_bytes(&name),
                0,
            )
            .await;
        let size_bytes = match size {
            Ok(size_bytes) => size_bytes,
            Err(e) => {
                error!(error = %e, "failed to scan database");
                self.stats
                    .record_failure(name, UnitKind::Database, &e)
                    .await;
                return None;
            }
        };

        let (hidden, visible): (Vec<String>, Vec<String>) = collections
            .into_iter()
            .partition(|c| is_hidden_collection(c));
        if !hidden.is_empty() {
            debug!(skipped = ?hidden, "skipping underscore collections");
            self.stats
                .collections_skipped
                .fetch_add(hidden.len(), Ordering::Relaxed);
        }

        let fanout = BoundedFanOut::new(self.concurrency);
        let scanned = fanout
            .run(visible, |collection| {
                let context = Arc::clone(&self);
                let database = name.clone();
                async move { context.scan_collection_unit(database, collection).await }
            })
            .await;
        for collection in scanned.panicked {
            self.stats
                .record_failure(
                    format!("{name}.{collection}"),
                    UnitKind::Collection,
                    &WORKER_PANICKED,
                )
                .await;
        }
        let collections = scanned.completed;

        self.stats.databases_scanned.fetch_add(1, Ordering::Relaxed);
        info!(collections = collections.len(), size_bytes, "scanned database");

        Some(Database {
            name,
            size_bytes,
            collections,
        })
    }

    async fn scan_collection_unit(
        self: Arc<Self>,
        database: String,
        collection: String,
    ) -> Option<Collection> {
        match self.scan_collection(&database, &collection).await {
            Ok(scanned) => {
                self.stats
                    .collections_scanned
                    .fetch_add(1, Ordering::Relaxed);
                Some(scanned)
            }
            Err(e) => {
                error!(%database, %collection, error = %e, "failed to scan collection");
                self.stats
                    .record_failure(format!("{database}.{collection}"), UnitKind::Collection, &e)
                    .await;
                None
            }
        }
    }

    #[instrument(skip(self))]
    async fn scan_collection(&self, database: &str, collection: &str) -> SourceResult<Collection> {
        let unit = format!("{database}.{collection}");

        let document_count = self
            .degradable(
                "estimated_count",
                &unit,
                self.source.estimated_count(database, collection),
                0,
            )
            .await?;

        let sample_size = plan_sample_size(document_count, self.max_docs);

        let indexes = self
            .degradable(
                "list_index_names",
                &unit,
                self.source.list_index_names(database, collection),
                Vec::new(),
            )
            .await?;

        let (documents, sampling_method) = self.sample(database, collection, sample_size).await?;
        debug!(
            sampled = documents.len(),
            requested = sample_size,
            method = %sampling_method,
            "sampled documents"
        );

        let analysis = analyze_documents(&documents);

        Ok(Collection {
            name: collection.to_string(),
            document_count,
            average_doc_size_bytes: average_encoded_size(&documents),
            indexes,
            fields: analysis.fields,
            sampled_documents: documents.len() as u64,
            sampling_method,
            schema_confidence: analysis.schema_confidence,
            rare_fields: analysis.rare_fields,
        })
    }

    /// Draws a random sample, falling back to the first documents when the
    /// source cannot sample randomly.
    async fn sample(
        &self,
        database: &str,
        collection: &str,
        size: u64,
    ) -> SourceResult<(Vec<Document>, SamplingMethod)> {
        if size == 0 {
            return Ok((Vec::new(), SamplingMethod::Random));
        }

        let random = self
            .guard
            .run(
                "sample_documents",
                self.source
                    .sample_documents(database, collection, size, SampleMode::Random),
            )
            .await;

        match random {
            Ok(documents) => Ok((documents, SamplingMethod::Random)),
            Err(e) if e.is_interrupted() => Err(e),
            Err(e) => {
                warn!(error = %e, "random sampling failed, reading first documents instead");
                let documents = self
                    .guard
                    .run(
                        "sample_documents",
                        self.source
                            .sample_documents(database, collection, size, SampleMode::FirstN),
                    )
                    .await?;
                self.stats.first_n_fallbacks.fetch_add(1, Ordering::Relaxed);
                Ok((documents, SamplingMethod::FirstN))
            }
        }
    }

    /// Runs a non-critical lookup, substituting `default` when the source
    /// fails. Deadline expiry and cancellation are returned as errors.
    async fn degradable<T, F>(
        &self,
        operation: &str,
        unit: &str,
        call: F,
        default: T,
    ) -> SourceResult<T>
    where
        F: std::future::Future<Output = SourceResult<T>>,
    {
        match self.guard.run(operation, call).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_interrupted() => Err(e),
            Err(e) => {
                warn!(unit, operation, error = %e, "lookup failed, using default");
                self.stats
                    .degraded_operations
                    .fetch_add(1, Ordering::Relaxed);
                Ok(default)
            }
        }
    }
}

/// Mean encoded BSON size of a batch, truncated. Zero for an empty batch.
fn average_encoded_size(documents: &[Document]) -> u64 {
    if documents.is_empty() {
        return 0;
    }

    let total: u64 = documents
        .iter()
        .filter_map(|doc| bson::to_vec(doc).ok())
        .map(|bytes| bytes.len() as u64)
        .sum();

    total / documents.len() as u64
}
