//! Loopsort Core -- cycle-breaking topological ordering for process diagrams.
//!
//! Given a diagram of events, activities and gateways connected by flows,
//! some of which form loops, this crate produces an element order suitable
//! for incremental layout placement and rewrites the diagram so that every
//! loop-closing flow is marked as a backward link.
//!
//! # Two-Pass Sort
//!
//! Constructing a [`sort::TopologicalSorter`] runs two passes over a region:
//!
//! 1. **Discovery** -- Eliminate free elements; when stuck, break the loop at
//!    a join that already lost a predecessor. Back-patch each backward edge
//!    through straight-line predecessors, then rewrite the diagram so each
//!    backward flow becomes a direct `target -> source` link.
//! 2. **Ordering** -- Run elimination again over the rewritten diagram. Its
//!    order is the result.
//!
//! ```rust,ignore
//! let mut diagram = Diagram::new();
//! // ... add elements and flows ...
//! let sorter = TopologicalSorter::new(&mut diagram, None)?;
//! for element in sorter.sorted_elements() {
//!     place(element);
//! }
//! ```
//!
//! # Key Types
//!
//! - [`layout::LayoutGraph`] -- What the sorter needs from a diagram model.
//! - [`diagram::Diagram`] -- Bundled slot-arena diagram model.
//! - [`sort::TopologicalSorter`] -- The two-pass sorter.
//! - [`sort::SortableElement`] -- Per-pass working copy of one element.
//! - [`sort::BackwardEdge`] -- A loop-closing edge and the flow it resolved to.
//! - [`config::SortConfig`] -- Sorter options.
//! - [`snapshot`] -- Versioned bitcode snapshots for rolling back a rewrite.

pub mod config;
pub mod diagram;
pub mod id;
pub mod layout;
pub mod snapshot;
pub mod sort;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
