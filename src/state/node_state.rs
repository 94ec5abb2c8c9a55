//! Lifecycle of a page node during a run
//!
//! `unstarted → (gated by before hook) → parsing → postprocessing → done`,
//! with `skipped` when the before hook declines and `failed` when parse or
//! postprocess returns an error.
use std::fmt;

/// Represents where a page is in its perform cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    // ===== Initial State =====
    /// Page has not been performed in this run
    Unstarted,

    // ===== Active States =====
    /// `parse` is running
    Parsing,

    /// `postprocess` is running
    Postprocessing,

    // ===== Terminal States =====
    /// Page was performed; children may run
    Done,

    /// Before hook declined; the page and its children were not performed
    Skipped,

    /// Parse or postprocess returned an error
    Failed,
}

impl NodeState {
    /// Returns true if the page will not change state again this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped | Self::Failed)
    }

    /// Returns true while parse or postprocess is in progress
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Parsing | Self::Postprocessing)
    }

    /// Checks whether moving to `next` is a legal step
    ///
    /// Terminal states may restart at `Parsing`, since a page can be
    /// performed again without a reset.
    pub fn can_transition_to(&self, next: NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, next),
            (Unstarted, Parsing)
                | (Unstarted, Skipped)
                | (Parsing, Postprocessing)
                | (Parsing, Failed)
                | (Postprocessing, Done)
                | (Postprocessing, Failed)
                | (Done, Parsing)
                | (Done, Skipped)
                | (Skipped, Parsing)
                | (Skipped, Skipped)
                | (Failed, Parsing)
                | (Failed, Skipped)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Parsing => "parsing",
            Self::Postprocessing => "postprocessing",
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible node states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Unstarted,
            Self::Parsing,
            Self::Postprocessing,
            Self::Done,
            Self::Skipped,
            Self::Failed,
        ]
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::Unstarted
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
