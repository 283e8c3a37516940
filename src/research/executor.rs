//! Parallel group execution
//!
//! [`ParallelGroupExecutor`] runs a batch of independent futures, returns
//! their outcomes in submission order, and bounds the whole batch by one
//! deadline. Two backends share that contract:
//!
//! - [`ExecutionBackend::Tasks`] spawns tokio tasks; units still running at
//!   the deadline are aborted.
//! - [`ExecutionBackend::Threads`] drives each unit on a blocking-pool
//!   thread; units still running at the deadline are reported as timed out
//!   and left to finish on their own.
//!
//! A panicking unit never affects its siblings.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionBackend {
    Tasks,
    Threads,
}

/// Result of one submitted unit.
#[derive(Debug)]
pub enum UnitOutcome<T> {
    Completed(T),
    Panicked(String),
    TimedOut,
}

impl<T> UnitOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            UnitOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParallelGroupExecutor {
    backend: ExecutionBackend,
    timeout: Duration,
}

impl ParallelGroupExecutor {
    pub fn new(backend: ExecutionBackend, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every unit concurrently and wait for all of them or the deadline.
    pub async fn run<F, T>(&self, units: Vec<F>) -> Vec<UnitOutcome<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = Instant::now() + self.timeout;
        let handles: Vec<JoinHandle<T>> = match self.backend {
            ExecutionBackend::Tasks => units.into_iter().map(tokio::spawn).collect(),
            ExecutionBackend::Threads => {
                let runtime = tokio::runtime::Handle::current();
                units
                    .into_iter()
                    .map(|unit| {
                        let runtime = runtime.clone();
                        tokio::task::spawn_blocking(move || runtime.block_on(unit))
                    })
                    .collect()
            }
        };

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, mut handle) in handles.into_iter().enumerate() {
            let outcome = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(value)) => UnitOutcome::Completed(value),
                Ok(Err(e)) => UnitOutcome::Panicked(join_error_message(e)),
                Err(_) => {
                    tracing::warn!(unit = index, backend = ?self.backend, "Unit exceeded batch timeout");
                    // Blocking-pool threads cannot be interrupted; abort is a no-op there.
                    handle.abort();
                    UnitOutcome::TimedOut
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn join_error_message(error: JoinError) -> String {
    if error.is_panic() {
        panic_message(error.into_panic())
    } else {
        error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn delayed(ms: u64, value: usize) -> BoxFuture<'static, usize> {
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            value
        }
        .boxed()
    }

    async fn explode() -> usize {
        panic!("agent exploded")
    }

    fn values(outcomes: Vec<UnitOutcome<usize>>) -> Vec<Option<usize>> {
        outcomes.into_iter().map(UnitOutcome::completed).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn submission_order_is_kept() {
        for backend in [ExecutionBackend::Tasks, ExecutionBackend::Threads] {
            let executor = ParallelGroupExecutor::new(backend, Duration::from_secs(5));
            let out = executor
                .run(vec![delayed(60, 0), delayed(5, 1), delayed(30, 2)])
                .await;
            assert_eq!(values(out), vec![Some(0), Some(1), Some(2)], "{backend:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panic_is_isolated() {
        let executor = ParallelGroupExecutor::new(ExecutionBackend::Tasks, Duration::from_secs(5));
        let units: Vec<BoxFuture<'static, usize>> = vec![
            delayed(1, 0),
            explode().boxed(),
            delayed(1, 2),
        ];
        let out = executor.run(units).await;
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], UnitOutcome::Completed(0)));
        assert!(matches!(&out[1], UnitOutcome::Panicked(msg) if msg == "agent exploded"));
        assert!(matches!(out[2], UnitOutcome::Completed(2)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_units_time_out_and_tasks_are_cancelled() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let slow = async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            flag.store(true, Ordering::SeqCst);
            1
        }
        .boxed();

        let executor = ParallelGroupExecutor::new(ExecutionBackend::Tasks, Duration::from_millis(50));
        let out = executor.run(vec![delayed(1, 0), slow]).await;
        assert!(matches!(out[0], UnitOutcome::Completed(0)));
        assert!(matches!(out[1], UnitOutcome::TimedOut));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn thread_backend_reports_timeout_without_interrupting() {
        let executor = ParallelGroupExecutor::new(ExecutionBackend::Threads, Duration::from_millis(50));
        let out = executor.run(vec![delayed(200, 7)]).await;
        assert!(matches!(out[0], UnitOutcome::TimedOut));
    }

    #[tokio::test]
    async fn empty_batch() {
        let executor = ParallelGroupExecutor::new(ExecutionBackend::Tasks, Duration::from_secs(1));
        let out: Vec<UnitOutcome<usize>> = executor.run(Vec::<BoxFuture<'static, usize>>::new()).await;
        assert!(out.is_empty());
    }
}
