//! Sumi-Weave: a declarative page-graph scraper
//!
//! This crate drives a forest of page nodes. Fetch-type nodes turn URLs into
//! tasks on a shared concurrent pool, extract nodes resolve those tasks lazily
//! and query the returned HTML, and the orchestrator walks the graph
//! depth-first, feeding every node's result into its children.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod page;
pub mod pool;
pub mod state;

use thiserror::Error;

/// Main error type for Sumi-Weave operations
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Page name '{name}' already used under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("Parent page not found: {0}")]
    UnknownParent(String),

    #[error("Page '{page}' has no input: it reads its parent's result and none was supplied")]
    MissingInput { page: String },

    #[error("Page '{page}' is not attached to an orchestrator")]
    Detached { page: String },

    #[error("Invalid page '{page}': {message}")]
    InvalidNode { page: String, message: String },

    #[error("Extract node needs a query expression or a predicate")]
    EmptyQuery,

    #[error("Invalid query expression '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    #[error("Invalid state transition for '{page}': {from} -> {to}")]
    InvalidTransition {
        page: String,
        from: state::NodeState,
        to: state::NodeState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in plan: {0}")]
    InvalidUrl(String),

    #[error("Page '{page}' names unknown parent '{parent}'")]
    UnknownParent { page: String, parent: String },
}

/// Task pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Task pool is closed")]
    Closed,

    #[error("Task name already in use: {0}")]
    DuplicateTask(String),

    #[error("Failed to build runtime: {0}")]
    Runtime(String),
}

/// Result type alias for Sumi-Weave operations
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::PlanConfig;
pub use orchestrator::{Orchestrator, OrchestratorSettings, ResultTree, Results};
pub use page::{Bucket, Item, Page, PageKind};
pub use pool::{AsyncResult, CoroutinePool, Payload, TaskFailure, TaskPool, TaskStatus};
pub use state::{DedupRecords, NodeState};
