//! Cycle-breaking topological sort over diagram regions.
//!
//! [`TopologicalSorter`] wraps each element of a region in a
//! [`SortableElement`], repeatedly places every element whose predecessors
//! are all placed, and, when none is free, breaks the loop at a join that
//! has already lost a predecessor. Each broken link becomes a
//! [`BackwardEdge`], which is written back to the diagram as a reversed
//! link.

pub mod backward;
pub mod element;
pub mod sorter;

pub use backward::BackwardEdge;
pub use element::SortableElement;
pub use sorter::{PassKind, PassReport, SortError, SortReport, TopologicalSorter, verify_acyclic};
