//! Deterministic pool used by unit tests
//!
//! Submitted work runs to completion inside `submit`, so tests can inspect
//! results without timing. Scripted tasks report `NotFinished` for a fixed
//! number of queries before turning terminal.

use crate::pool::{TaskFuture, TaskId, TaskPool, TaskStatus};
use crate::PoolError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

struct Scripted {
    remaining: usize,
    status: TaskStatus,
}

pub(crate) struct ScriptedPool {
    runtime: tokio::runtime::Runtime,
    tasks: Mutex<HashMap<TaskId, Scripted>>,
    submitted: Mutex<Vec<TaskId>>,
    queries: AtomicUsize,
    started: AtomicBool,
    closed: AtomicBool,
}

impl ScriptedPool {
    pub(crate) fn new() -> Self {
        Self {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime"),
            tasks: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Registers a task that stays unfinished for `polls` queries
    pub(crate) fn script(&self, name: &str, polls: usize, status: TaskStatus) -> TaskId {
        let id = TaskId::new(name);
        self.tasks.lock().unwrap().insert(
            id.clone(),
            Scripted {
                remaining: polls,
                status,
            },
        );
        id
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted(&self) -> Vec<TaskId> {
        self.submitted.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TaskPool for ScriptedPool {
    fn start(&self) -> Result<(), PoolError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn submit(&self, name: Option<String>, task: TaskFuture) -> Result<TaskId, PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        let mut submitted = self.submitted.lock().unwrap();
        let id = TaskId::new(name.unwrap_or_else(|| format!("task-{}", submitted.len())));
        let status: TaskStatus = self.runtime.block_on(task).into();
        self.tasks.lock().unwrap().insert(
            id.clone(),
            Scripted {
                remaining: 0,
                status,
            },
        );
        submitted.push(id.clone());
        Ok(id)
    }

    fn query(&self, id: &TaskId) -> TaskStatus {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get_mut(id) {
            Some(task) if task.remaining > 0 => {
                task.remaining -= 1;
                TaskStatus::NotFinished
            }
            Some(task) => task.status.clone(),
            None => TaskStatus::NotSucceeded(crate::pool::TaskFailure::Unknown(id.to_string())),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    fn pending_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| !t.status.is_terminal() || t.remaining > 0)
            .count()
    }
}
