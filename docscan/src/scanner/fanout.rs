//! Bounded concurrent fan-out.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, Instrument};

/// Results of one [`BoundedFanOut::run`].
#[derive(Debug)]
pub struct FanOutResults<T> {
    /// Values returned by workers, in completion order.
    pub completed: Vec<T>,
    /// Labels of the items whose worker panicked.
    pub panicked: Vec<String>,
}

/// Runs one task per item with at most `limit` tasks doing work at once.
///
/// Tasks are spawned up front and wait on a shared semaphore. Results are
/// appended under a mutex as tasks finish, so the output is in completion
/// order. A task returning `None` contributes nothing. [`run`](Self::run)
/// returns only after every task has finished.
#[derive(Debug, Clone)]
pub struct BoundedFanOut {
    semaphore: Arc<Semaphore>,
}

impl BoundedFanOut {
    /// Creates a fan-out with the given bound. A bound of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    pub async fn run<I, F, Fut, T>(&self, items: I, worker: F) -> FanOutResults<T>
    where
        I: IntoIterator,
        I::Item: ToString,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Option<T>> + Send + 'static,
        T: Send + 'static,
    {
        let results = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();
        let mut labels = HashMap::new();

        for item in items {
            let semaphore = Arc::clone(&self.semaphore);
            let results = Arc::clone(&results);
            let label = item.to_string();
            let work = worker(item);

            let handle = tasks.spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    if let Some(value) = work.await {
                        results.lock().await.push(value);
                    }
                }
                .in_current_span(),
            );
            labels.insert(handle.id(), label);
        }

        let mut panicked = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                let label = labels.remove(&e.id()).unwrap_or_default();
                error!(item = %label, error = %e, "worker task panicked");
                panicked.push(label);
            }
        }

        let mut guard = results.lock().await;
        FanOutResults {
            completed: std::mem::take(&mut *guard),
            panicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_every_result() {
        let fanout = BoundedFanOut::new(3);
        let mut out = fanout
            .run(0..10, |i| async move { Some(i * 2) })
            .await
            .completed;
        out.sort_unstable();
        assert_eq!(out, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_none_results_are_dropped() {
        let fanout = BoundedFanOut::new(2);
        let mut out = fanout
            .run(0..6, |i| async move { (i % 2 == 0).then_some(i) })
            .await
            .completed;
        out.sort_unstable();
        assert_eq!(out, vec![0, 2, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bound_is_respected() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let fanout = BoundedFanOut::new(2);

        fanout
            .run(0..12, |_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Some(())
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let fanout = BoundedFanOut::new(4);
        let out = fanout.run(Vec::<u32>::new(), |i| async move { Some(i) }).await;
        assert!(out.completed.is_empty());
        assert!(out.panicked.is_empty());
    }

    #[tokio::test]
    async fn test_panicked_worker_is_reported() {
        let fanout = BoundedFanOut::new(2);
        let out = fanout
            .run(["orders", "broken", "carts"], |name| async move {
                if name == "broken" {
                    panic!("worker blew up");
                }
                Some(name)
            })
            .await;

        let mut completed = out.completed;
        completed.sort_unstable();
        assert_eq!(completed, vec!["carts", "orders"]);
        assert_eq!(out.panicked, vec!["broken".to_string()]);
    }
}
