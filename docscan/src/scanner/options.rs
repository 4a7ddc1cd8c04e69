//! Scan configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analyzers::sampling::DEFAULT_MAX_DOCS;

/// Default bound on the whole scan.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default number of concurrent workers per nesting level.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Options controlling one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Connection string of the scanned deployment. Only used to derive the
    /// cluster name when the source does not report one.
    pub target: String,
    /// Deadline for the whole scan, measured from its start.
    pub timeout: Duration,
    /// Cap on documents sampled per collection. Zero selects the default.
    pub max_docs: u64,
    /// Regex allow-list for database names. Empty means every database.
    pub db_filter: Vec<String>,
    /// Concurrent workers per nesting level.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            target: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_docs: DEFAULT_MAX_DOCS,
            db_filter: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ScanOptions {
    /// Creates a builder starting from the defaults.
    pub fn builder(target: impl Into<String>) -> ScanOptionsBuilder {
        ScanOptionsBuilder {
            options: ScanOptions {
                target: target.into(),
                ..Default::default()
            },
        }
    }
}

/// Builder for [`ScanOptions`].
#[derive(Debug, Clone)]
pub struct ScanOptionsBuilder {
    options: ScanOptions,
}

impl ScanOptionsBuilder {
    /// Set the deadline for the whole scan
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set the per-collection sample cap
    pub fn max_docs(mut self, max_docs: u64) -> Self {
        self.options.max_docs = max_docs;
        self
    }

    /// Set the database allow-list patterns
    pub fn db_filter<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.db_filter = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of concurrent workers per level
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrency = concurrency;
        self
    }

    /// Build the ScanOptions
    pub fn build(self) -> ScanOptions {
        self.options
    }
}
