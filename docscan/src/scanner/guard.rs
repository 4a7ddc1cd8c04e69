//! Scan-wide deadline and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SourceError, SourceResult};

/// Upper bound used when a timeout is too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Deadline and cancellation shared by every source call of one scan.
#[derive(Debug, Clone)]
pub struct ScanGuard {
    deadline: Instant,
    cancel: CancellationToken,
}

impl ScanGuard {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { deadline, cancel }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs a source call, failing it if the scan is cancelled or the deadline passes first.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> SourceResult<T>
    where
        F: Future<Output = SourceResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled {
                operation: operation.to_string(),
            }),
            result = tokio::time::timeout_at(self.deadline, call) => {
                result.unwrap_or_else(|_| {
                    Err(SourceError::DeadlineExceeded {
                        operation: operation.to_string(),
                    })
                })
            }
        }
    }
}
