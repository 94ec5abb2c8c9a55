//! Configuration module for Sumi-Weave
//!
//! This module handles loading, parsing, and validating TOML crawl plans and
//! turning them into a populated orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use sumi_weave::config::{build_orchestrator, load_plan};
//! use std::path::Path;
//!
//! let (plan, _hash) = load_plan(Path::new("plan.toml")).unwrap();
//! let mut orchestrator = build_orchestrator(&plan).unwrap();
//! let results = orchestrator.run().unwrap();
//! println!("{} root pages", results.len());
//! ```

mod builder;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    DelayConfig, HttpSection, OrchestratorConfig, OutputMode, PageEntry, PageKindConfig,
    PlanConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{load_plan, parse_plan, plan_hash};

pub use builder::{build_orchestrator, populate, settings_from_plan};
