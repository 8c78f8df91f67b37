//! Fixed-size worker pool over an in-memory job queue.
//!
//! Used by number validation, message dispatch and template reconciliation.
//! Jobs are tagged with their input position, pushed onto a channel sized to
//! the batch, and drained by `size` workers. Workers finish out of order; the
//! pool writes each result into its own slot so the output always matches
//! input order.

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    size: usize,
}

/// Ten workers, the configured default for every pool.
impl Default for WorkerPool {
    fn default() -> Self {
        Self { size: 10 }
    }
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            bail!("worker pool size must be at least 1");
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `handler` once per job and return results in input order.
    ///
    /// The handler owns its failure reporting: whatever it returns for a job
    /// lands in that job's slot, and no job can abort its siblings. An empty
    /// batch returns immediately without spawning workers.
    pub async fn run<J, R, F, Fut>(&self, jobs: Vec<J>, handler: F) -> Result<Vec<R>>
    where
        J: Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let total = jobs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let (job_tx, job_rx) = mpsc::channel::<(usize, J)>(total);
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, R)>(total);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let handler = Arc::new(handler);

        let workers = self.size.min(total);
        debug!(jobs = total, workers, "Starting worker pool");

        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                loop {
                    // Lock is held only while pulling the next job.
                    let next = job_rx.lock().await.recv().await;
                    let Some((index, job)) = next else { break };
                    let result = handler(job).await;
                    if result_tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for (index, job) in jobs.into_iter().enumerate() {
            if job_tx.send((index, job)).await.is_err() {
                bail!("worker pool closed before all jobs were queued");
            }
        }
        drop(job_tx);

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        while let Some((index, result)) = result_rx.recv().await {
            slots[index] = Some(result);
        }

        let results: Vec<R> = slots.into_iter().flatten().collect();
        if results.len() != total {
            bail!(
                "worker pool lost {} of {} results",
                total - results.len(),
                total
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_size_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_spawns_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pool = WorkerPool::new(4).unwrap();

        let results: Vec<usize> = pool
            .run(Vec::<usize>::new(), move |n| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    n
                }
            })
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let pool = WorkerPool::new(10).unwrap();
        let jobs: Vec<u64> = (0..50).collect();

        // Earlier jobs sleep longer, so completion order is reversed.
        let results = pool
            .run(jobs, |n| async move {
                tokio::time::sleep(Duration::from_millis(50 - n)).await;
                n * 2
            })
            .await
            .unwrap();

        let expected: Vec<u64> = (0..50).map(|n| n * 2).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(3).unwrap();

        let (a, p) = (active.clone(), peak.clone());
        let results = pool
            .run((0..20).collect::<Vec<u32>>(), move |n| {
                let (active, peak) = (a.clone(), p.clone());
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    n
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
