//! State module for tracking a run
//!
//! # Components
//!
//! - `NodeState`: Tracks where each page is in its perform cycle
//! - `DedupRecords`: Orchestrator-wide set of URLs already submitted

mod node_state;
mod records;

// Re-export main types
pub use node_state::NodeState;
pub use records::DedupRecords;
