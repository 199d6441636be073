//! Sorter configuration.
//!
//! Every field has a default, so an empty file (or `SortConfig::default()`)
//! gives the standard two-pass behaviour.

use serde::{Deserialize, Serialize};

/// Id of the synthetic start element that feeds every start event.
pub const GLOBAL_START_ID: &str = "#####Global-Start#####";

/// What back-patching does when a straight-line element has more than one
/// predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredecessorPolicy {
    /// Abort the sort with `SortError::NonUniquePredecessor`.
    #[default]
    Fail,
    /// End the walk at that element and keep the edges recorded so far.
    StopWalk,
}

/// Options for [`crate::sort::TopologicalSorter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Extend detected backward edges through straight-line predecessors
    /// during the discovery pass.
    pub backpatch: bool,
    /// Id given to the synthetic start element. Must not match a real id.
    pub sentinel_id: String,
    pub predecessor_policy: PredecessorPolicy,
    /// Fail with `SortError::DidNotConverge` if the ordering pass still
    /// finds loops after the discovery pass rewrote the diagram.
    pub require_convergence: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            backpatch: true,
            sentinel_id: GLOBAL_START_ID.to_string(),
            predecessor_policy: PredecessorPolicy::Fail,
            require_convergence: false,
        }
    }
}
