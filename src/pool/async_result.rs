//! Lazy handle over a task submitted to a pool

use crate::pool::{TaskFailure, TaskId, TaskOutcome, TaskPool, TaskStatus};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Sleep between two queries while blocking in [`AsyncResult::get`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pending result of a pool task
///
/// Created when a page submits a fetch. The first `get` blocks the calling
/// thread until the pool reports a terminal status and caches it; every later
/// call, on this handle or any clone of it, returns the cached value without
/// touching the pool again.
#[derive(Clone)]
pub struct AsyncResult {
    pool: Arc<dyn TaskPool>,
    id: TaskId,
    timeout: Option<Duration>,
    cache: Arc<OnceLock<TaskOutcome>>,
}

impl AsyncResult {
    pub fn new(pool: Arc<dyn TaskPool>, id: TaskId) -> Self {
        Self {
            pool,
            id,
            timeout: None,
            cache: Arc::new(OnceLock::new()),
        }
    }

    /// Bounds how long `get` may block
    ///
    /// Without a timeout `get` waits as long as the task runs.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Blocks until the task is terminal and returns its outcome
    ///
    /// Must be called from the orchestrating thread, never from inside a pool
    /// worker. An expired timeout resolves the handle to `Err(TimedOut)`.
    pub fn get(&self) -> &TaskOutcome {
        if let Some(outcome) = self.cache.get() {
            return outcome;
        }

        let started = Instant::now();
        let outcome = loop {
            if let Some(outcome) = self.pool.query(&self.id).into_outcome() {
                break outcome;
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    tracing::warn!("Gave up waiting for task {} after {:?}", self.id, limit);
                    break Err(TaskFailure::TimedOut);
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        self.cache.get_or_init(|| outcome)
    }

    /// Returns the cached outcome without blocking
    pub fn peek(&self) -> Option<&TaskOutcome> {
        self.cache.get()
    }

    /// Current status: the cached outcome if resolved, else one pool query
    pub fn status(&self) -> TaskStatus {
        match self.cache.get() {
            Some(outcome) => outcome.clone().into(),
            None => self.pool.query(&self.id),
        }
    }

    /// Returns true while the pool still reports the task as unfinished
    pub fn is_pending(&self) -> bool {
        !self.status().is_terminal()
    }
}

impl fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("id", &self.id)
            .field("resolved", &self.cache.get())
            .finish()
    }
}

impl PartialEq for AsyncResult {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
