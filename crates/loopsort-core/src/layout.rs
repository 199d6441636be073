//! The seam between the sorter and a diagram model.
//!
//! The sorter never owns the diagram. It reads elements, their join/split
//! capabilities and their neighbours through [`LayoutGraph`]. Breaking a
//! loop detaches a flow from its endpoints and adds a direct
//! element-to-element link in the opposite direction. A later sort that
//! finds such a direct link pointing backwards restores the flow instead.
//!
//! [`crate::diagram::Diagram`] is the bundled implementation. Callers with
//! their own model implement the trait on it (or on a thin wrapper).

use std::fmt::Debug;

/// Read access to a diagram region plus the adjacency edits the loop
/// rewrite needs.
///
/// `scope` selects the region: `None` is the top level, `Some(e)` the
/// direct children of container element `e` (a sub-process or pool).
pub trait LayoutGraph {
    /// Handle to an element. Must be cheap to copy.
    type Element: Copy + Eq + Debug;
    /// Handle to a concrete flow object.
    type Flow: Copy + Eq + Debug;

    /// Designated start elements of the region.
    fn start_elements(&self, scope: Option<Self::Element>) -> Vec<Self::Element>;

    /// Direct children of `scope`; these are the elements being sorted.
    fn children_of(&self, scope: Option<Self::Element>) -> Vec<Self::Element>;

    /// Stable string id of an element.
    fn element_id(&self, element: Self::Element) -> &str;

    /// Human-readable element type. Only used in log output.
    fn element_type(&self, element: Self::Element) -> &str;

    /// Look up an element by its string id.
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// True if several real flows merge at this element.
    fn is_join(&self, element: Self::Element) -> bool;

    /// True if several real flows diverge from this element.
    fn is_split(&self, element: Self::Element) -> bool;

    /// Elements with a link into `element`, in link order, without duplicates.
    fn preceding(&self, element: Self::Element) -> Vec<Self::Element>;

    /// Elements `element` links to, in link order, without duplicates.
    fn following(&self, element: Self::Element) -> Vec<Self::Element>;

    /// All flow objects of the region.
    fn flows(&self, scope: Option<Self::Element>) -> Vec<Self::Flow>;

    /// True if the flow's own incoming side holds `source` and its outgoing
    /// side holds `target`. Detaching a flow does not change this.
    fn flow_connects(&self, flow: Self::Flow, source: Self::Element, target: Self::Element)
    -> bool;

    /// Remove `flow` from the outgoing links of `source` and the incoming
    /// links of `target`. The flow object itself stays in the diagram.
    fn detach_flow(&mut self, flow: Self::Flow, source: Self::Element, target: Self::Element);

    /// Link `from` directly to `to`. Adding an existing link is a no-op.
    fn add_direct_link(&mut self, from: Self::Element, to: Self::Element);

    /// True if `flow` was detached by an earlier rewrite and not restored.
    fn is_detached(&self, flow: Self::Flow) -> bool;

    /// Undo an earlier reversal of `flow`, which runs `source -> target`:
    /// reattach it to both endpoints and drop the direct `target -> source`
    /// link, unless another detached flow `source -> target` still needs it.
    fn restore_flow(&mut self, flow: Self::Flow, source: Self::Element, target: Self::Element);
}
