//! Task pool module
//!
//! The pool is the only place where fetch work actually runs. Pages submit
//! named units of work and get an opaque [`TaskId`] back; consumers later
//! query the pool, usually through an [`AsyncResult`].
//!
//! # Components
//!
//! - `TaskPool`: the submit/query/start/close contract
//! - `CoroutinePool`: the default pool, backed by a tokio runtime
//! - `AsyncResult`: a lazy, caching handle over one submitted task

mod async_result;
mod coroutine;

pub use async_result::{AsyncResult, POLL_INTERVAL};
pub use coroutine::CoroutinePool;

use crate::PoolError;
use futures::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;

/// Value produced by a successfully finished task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Decoded page body
    Text(String),

    /// Raw response body
    Bytes(Vec<u8>),

    /// A file written to disk by a download task
    Saved(PathBuf),
}

impl Payload {
    /// Returns the payload as text if it can be decoded as UTF-8
    ///
    /// Saved files are read back from disk.
    pub fn to_text(&self) -> std::io::Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Bytes(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Self::Saved(path) => std::fs::read_to_string(path),
        }
    }
}

/// Why a task did not succeed
///
/// Failures are values, not errors: they are stored on the task and handed
/// to whoever resolves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// Server answered with a non-success status
    Http { status: u16 },

    /// Connection, TLS or body transfer problem
    Network(String),

    /// Local filesystem problem while persisting a download
    Io(String),

    /// The task panicked inside the pool
    Panicked(String),

    /// The pool closed before the task finished
    Cancelled,

    /// A caller-imposed wait limit expired
    TimedOut,

    /// The pool has no record of this task
    Unknown(String),
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status } => write!(f, "web error: {}", status),
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Panicked(e) => write!(f, "task panicked: {}", e),
            Self::Cancelled => write!(f, "task cancelled"),
            Self::TimedOut => write!(f, "timed out waiting for task"),
            Self::Unknown(name) => write!(f, "unknown task: {}", name),
        }
    }
}

/// Terminal value of a task
pub type TaskOutcome = Result<Payload, TaskFailure>;

/// A unit of work accepted by [`TaskPool::submit`]
pub type TaskFuture = BoxFuture<'static, TaskOutcome>;

/// Name of a submitted task, unique within its pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-blocking view of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    NotFinished,
    NotSucceeded(TaskFailure),
    Finished(Payload),
}

impl TaskStatus {
    /// Returns true once the task has a terminal value
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotFinished)
    }

    /// Converts a terminal status into its outcome
    pub fn into_outcome(self) -> Option<TaskOutcome> {
        match self {
            Self::NotFinished => None,
            Self::NotSucceeded(failure) => Some(Err(failure)),
            Self::Finished(payload) => Some(Ok(payload)),
        }
    }
}

impl From<TaskOutcome> for TaskStatus {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            Ok(payload) => Self::Finished(payload),
            Err(failure) => Self::NotSucceeded(failure),
        }
    }
}

/// Concurrency collaborator shared by every page of an orchestrator
///
/// Implementations run submitted futures concurrently while the caller keeps
/// walking the page graph on its own thread. `query` must never block.
pub trait TaskPool: Send + Sync {
    /// Starts executing submitted work
    fn start(&self) -> Result<(), PoolError>;

    /// Submits a unit of work, returning the name it can be queried under
    ///
    /// `name` of `None` lets the pool generate one.
    fn submit(&self, name: Option<String>, task: TaskFuture) -> Result<TaskId, PoolError>;

    /// Reports the current status of a task without blocking
    fn query(&self, id: &TaskId) -> TaskStatus;

    /// Stops the pool; unfinished tasks become `NotSucceeded(Cancelled)`
    fn close(&self);

    /// Returns true between `start` and `close`
    fn is_started(&self) -> bool;

    /// Number of submitted tasks still running or queued
    fn pending_count(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod testing;
