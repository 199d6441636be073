use std::collections::BTreeSet;

/// A per-pass working copy of one element, reduced to what the sort needs.
///
/// The link sets are independent of the diagram: eliminating and reversing
/// links here never touches the real adjacency. `BTreeSet` keeps iteration
/// lexicographic by id, which makes every tie-break reproducible.
#[derive(Debug, Clone)]
pub struct SortableElement<E> {
    /// The real element, or `None` for the synthetic start element.
    element: Option<E>,
    id: String,
    element_type: String,
    join: bool,
    incoming: BTreeSet<String>,
    outgoing: BTreeSet<String>,
    /// Incoming count at creation. Never updated.
    old_in_count: usize,
}

impl<E: Copy> SortableElement<E> {
    pub fn new(
        element: Option<E>,
        id: impl Into<String>,
        element_type: impl Into<String>,
        join: bool,
        incoming: BTreeSet<String>,
        outgoing: BTreeSet<String>,
    ) -> Self {
        let old_in_count = incoming.len();
        Self {
            element,
            id: id.into(),
            element_type: element_type.into(),
            join,
            incoming,
            outgoing,
            old_in_count,
        }
    }

    /// The synthetic start element: no real counterpart, no incoming links,
    /// one outgoing link per start element.
    pub fn synthetic(id: impl Into<String>, starts: impl IntoIterator<Item = String>) -> Self {
        Self::new(
            None,
            id,
            "GlobalStart",
            false,
            BTreeSet::new(),
            starts.into_iter().collect(),
        )
    }

    pub fn element(&self) -> Option<E> {
        self.element
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn is_join(&self) -> bool {
        self.join
    }

    pub fn old_in_count(&self) -> usize {
        self.old_in_count
    }

    pub fn incoming(&self) -> &BTreeSet<String> {
        &self.incoming
    }

    pub fn outgoing(&self) -> &BTreeSet<String> {
        &self.outgoing
    }

    /// True once every predecessor has been placed.
    pub fn is_free(&self) -> bool {
        self.incoming.is_empty()
    }

    /// A join that lost at least one predecessor but is still not free sits
    /// on a loop.
    pub fn is_loop_entry_candidate(&self) -> bool {
        self.join && self.incoming.len() < self.old_in_count
    }

    /// Mark the predecessor `id` as placed. No-op if it is not a predecessor.
    pub fn remove_incoming_link_from(&mut self, id: &str) {
        self.incoming.remove(id);
    }

    /// Turn the incoming link from `id` into an outgoing link to `id`.
    pub fn reverse_incoming_link_from(&mut self, id: &str) {
        self.remove_incoming_link_from(id);
        self.outgoing.insert(id.to_string());
    }

    /// Turn the outgoing link to `id` into an incoming link from `id`.
    pub fn reverse_outgoing_link_to(&mut self, id: &str) {
        self.outgoing.remove(id);
        self.incoming.insert(id.to_string());
    }

    /// Drop a link to itself from both sets.
    pub fn drop_self_link(&mut self) {
        self.incoming.remove(&self.id);
        self.outgoing.remove(&self.id);
    }
}
