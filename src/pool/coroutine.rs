//! Default task pool backed by a tokio runtime
//!
//! The pool owns its runtime, so callers stay synchronous: the orchestrator
//! submits futures from its own thread and polls results with `query`.
//! A semaphore caps how many tasks run at once.

use crate::pool::{TaskFuture, TaskFailure, TaskId, TaskPool, TaskStatus};
use crate::PoolError;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

type TaskTable = Arc<Mutex<HashMap<TaskId, TaskStatus>>>;

/// Task pool running submitted futures on a private multi-thread runtime
pub struct CoroutinePool {
    name: String,
    max_concurrency: usize,
    tasks: TaskTable,
    semaphore: Arc<Semaphore>,
    runtime: Mutex<Option<Runtime>>,
    /// Work submitted before `start`
    queued: Mutex<Vec<(TaskId, TaskFuture)>>,
    counter: AtomicU64,
    closed: AtomicBool,
}

impl CoroutinePool {
    /// Creates a pool that runs at most `max_concurrency` tasks at a time
    ///
    /// The runtime is not built until [`TaskPool::start`] is called.
    pub fn new(name: impl Into<String>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            name: name.into(),
            max_concurrency,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            runtime: Mutex::new(None),
            queued: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.name, n)
    }

    fn spawn(&self, runtime: &Runtime, id: TaskId, task: TaskFuture) {
        let tasks = Arc::clone(&self.tasks);
        let semaphore = Arc::clone(&self.semaphore);

        runtime.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => match AssertUnwindSafe(task).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => Err(TaskFailure::Panicked(panic_message(panic.as_ref()))),
                },
                Err(_) => Err(TaskFailure::Cancelled),
            };

            let mut table = lock(&tasks);
            // A task cancelled by `close` keeps its cancellation.
            if let Some(slot) = table.get_mut(&id) {
                if !slot.is_terminal() {
                    tracing::trace!("Task {} finished", id);
                    *slot = outcome.into();
                }
            }
        });
    }
}

impl TaskPool for CoroutinePool {
    fn start(&self) -> Result<(), PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let mut runtime = lock(&self.runtime);
        if runtime.is_some() {
            return Ok(());
        }

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(self.max_concurrency);

        let built = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name(format!("{}-worker", self.name))
            .enable_all()
            .build()
            .map_err(|e| PoolError::Runtime(e.to_string()))?;

        let queued: Vec<_> = lock(&self.queued).drain(..).collect();
        tracing::debug!(
            "Starting pool {} with {} workers, {} queued tasks",
            self.name,
            workers.max(1),
            queued.len()
        );
        for (id, task) in queued {
            self.spawn(&built, id, task);
        }

        *runtime = Some(built);
        Ok(())
    }

    fn submit(&self, name: Option<String>, task: TaskFuture) -> Result<TaskId, PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let id = TaskId::new(name.unwrap_or_else(|| self.next_name()));
        {
            let mut table = lock(&self.tasks);
            if table.contains_key(&id) {
                return Err(PoolError::DuplicateTask(id.to_string()));
            }
            table.insert(id.clone(), TaskStatus::NotFinished);
        }

        let runtime = lock(&self.runtime);
        match runtime.as_ref() {
            Some(runtime) => self.spawn(runtime, id.clone(), task),
            None => lock(&self.queued).push((id.clone(), task)),
        }

        Ok(id)
    }

    fn query(&self, id: &TaskId) -> TaskStatus {
        lock(&self.tasks)
            .get(id)
            .cloned()
            .unwrap_or_else(|| TaskStatus::NotSucceeded(TaskFailure::Unknown(id.to_string())))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.semaphore.close();
        if let Some(runtime) = lock(&self.runtime).take() {
            runtime.shutdown_background();
        }
        lock(&self.queued).clear();

        let mut cancelled = 0;
        for status in lock(&self.tasks).values_mut() {
            if !status.is_terminal() {
                *status = TaskStatus::NotSucceeded(TaskFailure::Cancelled);
                cancelled += 1;
            }
        }

        tracing::debug!("Closed pool {} ({} tasks cancelled)", self.name, cancelled);
    }

    fn is_started(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && lock(&self.runtime).is_some()
    }

    fn pending_count(&self) -> usize {
        lock(&self.tasks)
            .values()
            .filter(|status| !status.is_terminal())
            .count()
    }
}

impl Drop for CoroutinePool {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
