use crate::id::{ElementId, FlowId};
use crate::layout::LayoutGraph;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while building or editing a diagram.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("duplicate element id: {0}")]
    DuplicateId(String),
    #[error("element not found: {0:?}")]
    ElementNotFound(ElementId),
    #[error("flow not found: {0:?}")]
    FlowNotFound(FlowId),
}

// ---------------------------------------------------------------------------
// Element and flow kinds
// ---------------------------------------------------------------------------

/// Gateway flavours. The sorter only cares about join/split structure, so
/// these are carried for callers and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    EventBased,
    Complex,
}

/// What a diagram element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    StartEvent,
    EndEvent,
    IntermediateEvent,
    Task,
    SubProcess,
    Gateway(GatewayKind),
}

impl ElementKind {
    /// Short type name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::StartEvent => "StartEvent",
            ElementKind::EndEvent => "EndEvent",
            ElementKind::IntermediateEvent => "IntermediateEvent",
            ElementKind::Task => "Task",
            ElementKind::SubProcess => "SubProcess",
            ElementKind::Gateway(GatewayKind::Exclusive) => "ExclusiveGateway",
            ElementKind::Gateway(GatewayKind::Parallel) => "ParallelGateway",
            ElementKind::Gateway(GatewayKind::Inclusive) => "InclusiveGateway",
            ElementKind::Gateway(GatewayKind::EventBased) => "EventBasedGateway",
            ElementKind::Gateway(GatewayKind::Complex) => "ComplexGateway",
        }
    }

    pub fn is_gateway(&self) -> bool {
        matches!(self, ElementKind::Gateway(_))
    }
}

/// What a flow carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    #[default]
    Sequence,
    Message,
    Association,
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// One entry in an element's link list.
///
/// Regular connections go through a flow. Loop rewriting replaces a flow
/// link with a direct link to the element on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Link {
    Flow(FlowId),
    Direct(ElementId),
}

/// Link lists and flow counts for a single element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Adjacency {
    incoming: Vec<Link>,
    outgoing: Vec<Link>,
    /// Flows ending here, attached or not. Detaching leaves it unchanged.
    inflows: usize,
    /// Flows starting here, attached or not.
    outflows: usize,
}

/// Per-element data stored in the diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementData {
    /// Stable id, unique within the diagram.
    pub id: String,
    pub kind: ElementKind,
    /// Containing sub-process or pool. `None` for top-level elements.
    pub parent: Option<ElementId>,
}

/// Per-flow data stored in the diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowData {
    /// Source element.
    pub from: ElementId,
    /// Target element.
    pub to: ElementId,
    pub kind: FlowKind,
    pub label: Option<String>,
}

// ---------------------------------------------------------------------------
// Diagram
// ---------------------------------------------------------------------------

/// A process diagram: elements, flows between them, and per-element link
/// lists.
///
/// Adjacency lives in a `SecondaryMap` keyed by `ElementId` so it stays in
/// step with the primary `elements` SlotMap. Flows are never dropped by
/// loop rewriting, only detached from the link lists, so a flow keeps its
/// id and endpoints for later serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagram {
    elements: SlotMap<ElementId, ElementData>,
    flows: SlotMap<FlowId, FlowData>,
    adjacency: SecondaryMap<ElementId, Adjacency>,
    index: HashMap<String, ElementId>,
}

impl Diagram {
    /// Create a new, empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Add a top-level element. Ids must be unique across the diagram.
    pub fn add_element(
        &mut self,
        id: impl Into<String>,
        kind: ElementKind,
    ) -> Result<ElementId, DiagramError> {
        self.insert_element(id.into(), kind, None)
    }

    /// Add an element inside a container element.
    pub fn add_child_element(
        &mut self,
        parent: ElementId,
        id: impl Into<String>,
        kind: ElementKind,
    ) -> Result<ElementId, DiagramError> {
        if !self.elements.contains_key(parent) {
            return Err(DiagramError::ElementNotFound(parent));
        }
        self.insert_element(id.into(), kind, Some(parent))
    }

    fn insert_element(
        &mut self,
        id: String,
        kind: ElementKind,
        parent: Option<ElementId>,
    ) -> Result<ElementId, DiagramError> {
        if self.index.contains_key(&id) {
            return Err(DiagramError::DuplicateId(id));
        }
        let element = self.elements.insert(ElementData {
            id: id.clone(),
            kind,
            parent,
        });
        self.adjacency.insert(element, Adjacency::default());
        self.index.insert(id, element);
        Ok(element)
    }

    /// Connect two elements with a sequence flow.
    pub fn connect(&mut self, from: ElementId, to: ElementId) -> Result<FlowId, DiagramError> {
        self.connect_with(from, to, FlowKind::Sequence, None)
    }

    /// Connect two elements with a flow of the given kind and optional label.
    pub fn connect_with(
        &mut self,
        from: ElementId,
        to: ElementId,
        kind: FlowKind,
        label: Option<String>,
    ) -> Result<FlowId, DiagramError> {
        for element in [from, to] {
            if !self.elements.contains_key(element) {
                return Err(DiagramError::ElementNotFound(element));
            }
        }

        let flow = self.flows.insert(FlowData {
            from,
            to,
            kind,
            label,
        });

        if let Some(adj) = self.adjacency.get_mut(from) {
            adj.outgoing.push(Link::Flow(flow));
            adj.outflows += 1;
        }
        if let Some(adj) = self.adjacency.get_mut(to) {
            adj.incoming.push(Link::Flow(flow));
            adj.inflows += 1;
        }

        Ok(flow)
    }

    /// Remove a flow entirely, attached or detached. Removing a reversed
    /// flow also removes the direct link its reversal added.
    pub fn disconnect(&mut self, flow: FlowId) -> Result<FlowData, DiagramError> {
        let reversed = self.is_reversed(flow);
        let data = self
            .flows
            .remove(flow)
            .ok_or(DiagramError::FlowNotFound(flow))?;
        if reversed {
            self.drop_reversal_link(data.from, data.to);
        }

        if let Some(adj) = self.adjacency.get_mut(data.from) {
            adj.outgoing.retain(|&l| l != Link::Flow(flow));
            adj.outflows -= 1;
        }
        if let Some(adj) = self.adjacency.get_mut(data.to) {
            adj.incoming.retain(|&l| l != Link::Flow(flow));
            adj.inflows -= 1;
        }
        Ok(data)
    }

    /// Remove an element together with every flow and direct link touching it.
    /// Children of a removed container become top-level elements.
    pub fn remove_element(&mut self, element: ElementId) -> Result<ElementData, DiagramError> {
        if !self.elements.contains_key(element) {
            return Err(DiagramError::ElementNotFound(element));
        }

        let touching: Vec<FlowId> = self
            .flows
            .iter()
            .filter(|(_, f)| f.from == element || f.to == element)
            .map(|(fid, _)| fid)
            .collect();
        for flow in touching {
            self.disconnect(flow)?;
        }

        for (_, adj) in self.adjacency.iter_mut() {
            adj.incoming.retain(|&l| l != Link::Direct(element));
            adj.outgoing.retain(|&l| l != Link::Direct(element));
        }
        for (_, data) in self.elements.iter_mut() {
            if data.parent == Some(element) {
                data.parent = None;
            }
        }

        self.adjacency.remove(element);
        let data = self
            .elements
            .remove(element)
            .ok_or(DiagramError::ElementNotFound(element))?;
        self.index.remove(&data.id);
        Ok(data)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get the element data for a given element.
    pub fn element(&self, element: ElementId) -> Option<&ElementData> {
        self.elements.get(element)
    }

    /// Get the flow data for a given flow.
    pub fn flow(&self, flow: FlowId) -> Option<&FlowData> {
        self.flows.get(flow)
    }

    /// Find an element by its string id.
    pub fn lookup(&self, id: &str) -> Option<ElementId> {
        self.index.get(id).copied()
    }

    /// String id of an element, or `""` if it does not exist.
    pub fn id_of(&self, element: ElementId) -> &str {
        self.elements
            .get(element)
            .map(|e| e.id.as_str())
            .unwrap_or("")
    }

    /// Current incoming links of an element.
    pub fn incoming_links(&self, element: ElementId) -> &[Link] {
        self.adjacency
            .get(element)
            .map(|adj| adj.incoming.as_slice())
            .unwrap_or(&[])
    }

    /// Current outgoing links of an element.
    pub fn outgoing_links(&self, element: ElementId) -> &[Link] {
        self.adjacency
            .get(element)
            .map(|adj| adj.outgoing.as_slice())
            .unwrap_or(&[])
    }

    /// Number of flows ending at an element, including detached ones.
    pub fn inflow_count(&self, element: ElementId) -> usize {
        self.adjacency.get(element).map_or(0, |adj| adj.inflows)
    }

    /// Number of flows starting at an element, including detached ones.
    pub fn outflow_count(&self, element: ElementId) -> usize {
        self.adjacency.get(element).map_or(0, |adj| adj.outflows)
    }

    /// True if the flow was detached by loop rewriting.
    pub fn is_reversed(&self, flow: FlowId) -> bool {
        match self.flows.get(flow) {
            Some(data) => !self.outgoing_links(data.from).contains(&Link::Flow(flow)),
            None => false,
        }
    }

    /// Flows detached by loop rewriting, in flow order.
    pub fn reversed_flows(&self) -> Vec<FlowId> {
        self.flows
            .keys()
            .filter(|&flow| self.is_reversed(flow))
            .collect()
    }

    /// Total number of elements in the diagram.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Total number of flows in the diagram.
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Iterate over all elements and their data.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &ElementData)> {
        self.elements.iter()
    }

    /// Iterate over all flows and their data.
    pub fn flows_iter(&self) -> impl Iterator<Item = (FlowId, &FlowData)> {
        self.flows.iter()
    }

    /// Drop the direct `to -> from` link left by reversing a `from -> to`
    /// flow, unless another reversed `from -> to` flow still stands behind it.
    fn drop_reversal_link(&mut self, from: ElementId, to: ElementId) {
        let still_reversed = self
            .flows
            .iter()
            .any(|(fid, f)| f.from == from && f.to == to && self.is_reversed(fid));
        if still_reversed {
            return;
        }
        if let Some(adj) = self.adjacency.get_mut(to) {
            adj.outgoing.retain(|&l| l != Link::Direct(from));
        }
        if let Some(adj) = self.adjacency.get_mut(from) {
            adj.incoming.retain(|&l| l != Link::Direct(to));
        }
    }

    fn parent_of(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element).and_then(|e| e.parent)
    }

    /// Resolve a link list to distinct neighbour elements, keeping order.
    fn neighbours(&self, links: &[Link], incoming: bool) -> Vec<ElementId> {
        let mut out: Vec<ElementId> = Vec::with_capacity(links.len());
        for link in links {
            let neighbour = match *link {
                Link::Flow(flow) => match self.flows.get(flow) {
                    Some(data) if incoming => data.from,
                    Some(data) => data.to,
                    None => continue,
                },
                Link::Direct(element) => element,
            };
            if !out.contains(&neighbour) {
                out.push(neighbour);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// LayoutGraph
// ---------------------------------------------------------------------------

impl LayoutGraph for Diagram {
    type Element = ElementId;
    type Flow = FlowId;

    fn start_elements(&self, scope: Option<ElementId>) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.parent == scope && e.kind == ElementKind::StartEvent)
            .map(|(eid, _)| eid)
            .collect()
    }

    fn children_of(&self, scope: Option<ElementId>) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|(_, e)| e.parent == scope)
            .map(|(eid, _)| eid)
            .collect()
    }

    fn element_id(&self, element: ElementId) -> &str {
        self.id_of(element)
    }

    fn element_type(&self, element: ElementId) -> &str {
        self.elements
            .get(element)
            .map(|e| e.kind.name())
            .unwrap_or("")
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.lookup(id)
    }

    fn is_join(&self, element: ElementId) -> bool {
        self.inflow_count(element) > 1
    }

    fn is_split(&self, element: ElementId) -> bool {
        self.outflow_count(element) > 1
    }

    fn preceding(&self, element: ElementId) -> Vec<ElementId> {
        self.neighbours(self.incoming_links(element), true)
    }

    fn following(&self, element: ElementId) -> Vec<ElementId> {
        self.neighbours(self.outgoing_links(element), false)
    }

    fn flows(&self, scope: Option<ElementId>) -> Vec<FlowId> {
        self.flows
            .iter()
            .filter(|(_, f)| self.parent_of(f.from) == scope || self.parent_of(f.to) == scope)
            .map(|(fid, _)| fid)
            .collect()
    }

    fn flow_connects(&self, flow: FlowId, source: ElementId, target: ElementId) -> bool {
        self.flows
            .get(flow)
            .is_some_and(|f| f.from == source && f.to == target)
    }

    fn detach_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        if let Some(adj) = self.adjacency.get_mut(source) {
            adj.outgoing.retain(|&l| l != Link::Flow(flow));
        }
        if let Some(adj) = self.adjacency.get_mut(target) {
            adj.incoming.retain(|&l| l != Link::Flow(flow));
        }
    }

    fn add_direct_link(&mut self, from: ElementId, to: ElementId) {
        if !self.elements.contains_key(from) || !self.elements.contains_key(to) {
            return;
        }
        if let Some(adj) = self.adjacency.get_mut(from)
            && !adj.outgoing.contains(&Link::Direct(to))
        {
            adj.outgoing.push(Link::Direct(to));
        }
        if let Some(adj) = self.adjacency.get_mut(to)
            && !adj.incoming.contains(&Link::Direct(from))
        {
            adj.incoming.push(Link::Direct(from));
        }
    }

    fn is_detached(&self, flow: FlowId) -> bool {
        self.is_reversed(flow)
    }

    fn restore_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        if !self.flow_connects(flow, source, target) {
            return;
        }
        if let Some(adj) = self.adjacency.get_mut(source)
            && !adj.outgoing.contains(&Link::Flow(flow))
        {
            adj.outgoing.push(Link::Flow(flow));
        }
        if let Some(adj) = self.adjacency.get_mut(target)
            && !adj.incoming.contains(&Link::Flow(flow))
        {
            adj.incoming.push(Link::Flow(flow));
        }
        self.drop_reversal_link(source, target);
    }
}
