//! Serde data file structs for diagram fixtures.
//!
//! A diagram file lists elements and the flows between them by string id.
//! It is deserialized from RON, JSON or TOML and then resolved into a
//! [`loopsort_core::diagram::Diagram`] by the loader.

use loopsort_core::diagram::{ElementKind, FlowKind, GatewayKind};
use serde::Deserialize;

// ===========================================================================
// Diagram
// ===========================================================================

/// Top-level diagram file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagramData {
    #[serde(default)]
    pub elements: Vec<ElementEntry>,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
}

// ===========================================================================
// Elements
// ===========================================================================

/// An element definition. A `parent`, when given, must name an element
/// declared earlier in the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementEntry {
    pub id: String,
    pub kind: ElementKindData,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Element kinds as written in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKindData {
    StartEvent,
    EndEvent,
    IntermediateEvent,
    Task,
    SubProcess,
    ExclusiveGateway,
    ParallelGateway,
    InclusiveGateway,
    EventBasedGateway,
    ComplexGateway,
}

impl From<ElementKindData> for ElementKind {
    fn from(kind: ElementKindData) -> Self {
        match kind {
            ElementKindData::StartEvent => ElementKind::StartEvent,
            ElementKindData::EndEvent => ElementKind::EndEvent,
            ElementKindData::IntermediateEvent => ElementKind::IntermediateEvent,
            ElementKindData::Task => ElementKind::Task,
            ElementKindData::SubProcess => ElementKind::SubProcess,
            ElementKindData::ExclusiveGateway => ElementKind::Gateway(GatewayKind::Exclusive),
            ElementKindData::ParallelGateway => ElementKind::Gateway(GatewayKind::Parallel),
            ElementKindData::InclusiveGateway => ElementKind::Gateway(GatewayKind::Inclusive),
            ElementKindData::EventBasedGateway => ElementKind::Gateway(GatewayKind::EventBased),
            ElementKindData::ComplexGateway => ElementKind::Gateway(GatewayKind::Complex),
        }
    }
}

// ===========================================================================
// Flows
// ===========================================================================

/// A flow between two declared elements.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowEntry {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: FlowKindData,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKindData {
    #[default]
    Sequence,
    Message,
    Association,
}

impl From<FlowKindData> for FlowKind {
    fn from(kind: FlowKindData) -> Self {
        match kind {
            FlowKindData::Sequence => FlowKind::Sequence,
            FlowKindData::Message => FlowKind::Message,
            FlowKindData::Association => FlowKind::Association,
        }
    }
}
