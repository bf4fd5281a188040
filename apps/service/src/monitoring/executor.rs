use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// How a [`BoundedExecutor`] caps parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// A fixed set of workers draining a queue that is closed once filled
    WorkerPool(usize),
    /// One task per item, each holding one of a fixed number of permits
    Permits(usize),
}

/// Runs a batch of async tasks with at most `limit()` in flight
///
/// Both shapes stop starting new items once `cancel` fires; items already
/// running are left to finish.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    concurrency: Concurrency,
}

impl BoundedExecutor {
    pub fn worker_pool(workers: usize) -> Self {
        Self { concurrency: Concurrency::WorkerPool(workers.max(1)) }
    }

    pub fn permits(max_in_flight: usize) -> Self {
        Self { concurrency: Concurrency::Permits(max_in_flight.max(1)) }
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub fn limit(&self) -> usize {
        match self.concurrency {
            Concurrency::WorkerPool(n) | Concurrency::Permits(n) => n,
        }
    }

    /// Run `task` over every item and collect the outputs of those that ran
    ///
    /// Output order follows completion, not input order.
    pub async fn run<T, O, F, Fut>(&self, items: Vec<T>, cancel: &CancellationToken, task: F) -> Vec<O>
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let task = Arc::new(task);
        match self.concurrency {
            Concurrency::WorkerPool(workers) => run_worker_pool(items, workers, cancel, task).await,
            Concurrency::Permits(permits) => run_with_permits(items, permits, cancel, task).await,
        }
    }
}

async fn run_worker_pool<T, O, F, Fut>(
    items: Vec<T>,
    workers: usize,
    cancel: &CancellationToken,
    task: Arc<F>,
) -> Vec<O>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let workers = workers.min(items.len());
    let (tx, rx) = mpsc::channel(items.len());
    for item in items {
        if tx.send(item).await.is_err() {
            break;
        }
    }
    // Closing the queue lets idle workers exit once it drains
    drop(tx);

    debug!("Starting {} workers", workers);

    let queue = Arc::new(Mutex::new(rx));
    let mut set = JoinSet::new();

    for worker_id in 1..=workers {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        let task = Arc::clone(&task);

        set.spawn(async move {
            let mut outputs = Vec::new();
            loop {
                if cancel.is_cancelled() {
                    debug!("Worker {} stopping: run cancelled", worker_id);
                    break;
                }

                let next = queue.lock().await.recv().await;
                let Some(item) = next else { break };
                outputs.push(task(item).await);
            }
            outputs
        });
    }

    let mut outputs = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(batch) => outputs.extend(batch),
            Err(e) => error!("Worker task failed: {}", e),
        }
    }
    outputs
}

async fn run_with_permits<T, O, F, Fut>(
    items: Vec<T>,
    permits: usize,
    cancel: &CancellationToken,
    task: Arc<F>,
) -> Vec<O>
where
    T: Send + 'static,
    O: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(permits));
    let mut set = JoinSet::new();

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let task = Arc::clone(&task);

        set.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                permit = semaphore.acquire_owned() => permit.ok()?,
            };
            let output = task(item).await;
            drop(permit);
            Some(output)
        });
    }

    let mut outputs = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => {}
            Err(e) => error!("Permit task failed: {}", e),
        }
    }
    outputs
}
