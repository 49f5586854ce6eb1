//! Bounded worker pool.
//!
//! A fixed number of long-lived tokio tasks pull work from one shared
//! bounded queue. Whichever worker is free picks up the next task, so at
//! most `workers` tasks ever execute at once; the rest wait in the queue.
//!
//! ```text
//!  submit() ──► [ bounded queue (workers × 2) ] ──► worker 0..N ──► task
//!                   blocks when full                 one task each
//! ```
//!
//! Completion is tracked two ways: each submission returns a
//! [`TaskHandle`] that can be joined individually, and
//! [`WorkerPool::wait_idle`] drains until every submitted task has
//! finished.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, Notify, mpsc, oneshot};
use tracing::{error, trace};

use crate::{HuginnError, Result};

type Task = BoxFuture<'static, ()>;

/// Queue slots per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Default worker count: available parallelism × 2.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

#[derive(Default)]
struct PoolState {
    /// Submitted but not yet finished.
    pending: AtomicUsize,
    /// Currently executing.
    active: AtomicUsize,
    idle: Notify,
}

/// Fixed-size pool of workers consuming a shared bounded queue.
///
/// Workers exit once the pool is dropped and the queue has drained.
pub struct WorkerPool {
    tx: mpsc::Sender<Task>,
    workers: usize,
    state: Arc<PoolState>,
}

impl WorkerPool {
    /// Spawn a pool with `workers` workers (at least one).
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<Task>(workers * QUEUE_SLOTS_PER_WORKER);
        let rx = Arc::new(Mutex::new(rx));
        let state = Arc::new(PoolState::default());

        for id in 0..workers {
            tokio::spawn(run_worker(id, Arc::clone(&rx), Arc::clone(&state)));
        }

        Self { tx, workers, state }
    }

    /// Pool sized with [`default_worker_count`].
    pub fn with_default_size() -> Self {
        Self::new(default_worker_count())
    }

    /// Configured number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Tasks executing right now.
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Tasks submitted and not yet finished (queued or executing).
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Queue a task. Waits only while the queue is full.
    pub async fn submit<F>(&self, task: F) -> Result<TaskHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let wrapped: Task = Box::pin(async move {
            task.await;
            let _ = done_tx.send(());
        });

        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(wrapped).await.is_err() {
            self.finish_one();
            return Err(HuginnError::Shutdown);
        }
        Ok(TaskHandle { done: done_rx })
    }

    /// Wait until every task submitted so far has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        finish_one(&self.state);
    }
}

fn finish_one(state: &PoolState) {
    if state.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
        state.idle.notify_waiters();
    }
}

async fn run_worker(id: usize, rx: Arc<Mutex<mpsc::Receiver<Task>>>, state: Arc<PoolState>) {
    loop {
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else {
            trace!(worker = id, "worker exiting");
            break;
        };

        state.active.fetch_add(1, Ordering::SeqCst);
        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            error!(worker = id, "worker task panicked");
        }
        state.active.fetch_sub(1, Ordering::SeqCst);
        finish_one(&state);
    }
}

/// Completion handle for one submitted task.
pub struct TaskHandle {
    done: oneshot::Receiver<()>,
}

impl TaskHandle {
    /// Wait for the task to finish.
    ///
    /// Errors with [`HuginnError::Shutdown`] if the task panicked or was
    /// dropped before running.
    pub async fn join(self) -> Result<()> {
        self.done.await.map_err(|_| HuginnError::Shutdown)
    }
}
