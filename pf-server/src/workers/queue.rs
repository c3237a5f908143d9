//! Bounded-concurrency task queues.
//!
//! Pipeline stages are schedulable units of work distributed across two
//! queues: a GPU queue with concurrency exactly 1 (shared model
//! inference must never run concurrently) and a CPU queue for geometry
//! work. Submitters await their task's result over a oneshot channel;
//! the queue workers drain a shared mpsc receiver.

use pf_common::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

type QueuedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A named queue executing tasks on a fixed number of workers.
#[derive(Clone)]
pub struct TaskQueue {
    name: &'static str,
    tx: mpsc::Sender<QueuedTask>,
}

impl TaskQueue {
    /// Start `workers` worker tasks draining this queue.
    pub fn start(name: &'static str, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<QueuedTask>(256);
        let rx = Arc::new(Mutex::new(rx));
        for worker_idx in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only while dequeuing
                    let task = { rx.lock().await.recv().await };
                    match task {
                        Some(task) => task.await,
                        None => {
                            debug!(queue = name, worker_idx, "queue closed, worker exiting");
                            break;
                        }
                    }
                }
            });
        }
        Self { name, tx }
    }

    /// Submit a task and await its result.
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: QueuedTask = Box::pin(async move {
            let _ = done_tx.send(task.await);
        });
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Internal(format!("{} queue is closed", self.name)))?;
        done_rx
            .await
            .map_err(|_| Error::Internal(format!("{} queue dropped a task", self.name)))
    }

    /// Submit blocking work; it runs on the blocking thread pool but
    /// occupies one of this queue's slots for its whole duration.
    pub async fn run_blocking<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.run(async move {
            tokio::task::spawn_blocking(work)
                .await
                .map_err(|e| Error::Internal(format!("blocking task panicked: {e}")))
        })
        .await?
    }
}

/// The two scheduling lanes of the pipeline.
#[derive(Clone)]
pub struct Queues {
    /// Model inference; concurrency is exactly 1.
    pub gpu: TaskQueue,
    /// Geometry and image work.
    pub cpu: TaskQueue,
}

impl Queues {
    pub fn start(cpu_workers: usize) -> Self {
        Self {
            gpu: TaskQueue::start("gpu", 1),
            cpu: TaskQueue::start("cpu", cpu_workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tasks_return_their_results() {
        let queue = TaskQueue::start("test", 2);
        let mut handles = Vec::new();
        for i in 0..8usize {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue.run(async move { i * 2 }).await.unwrap()
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_worker_queue_never_overlaps() {
        let queue = TaskQueue::start("serial", 1);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let queue = queue.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                queue
                    .run(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn blocking_work_runs_off_the_runtime() {
        let queue = TaskQueue::start("blocking", 2);
        let sum = queue
            .run_blocking(|| (0..1000u64).sum::<u64>())
            .await
            .unwrap();
        assert_eq!(sum, 499500);
    }
}
