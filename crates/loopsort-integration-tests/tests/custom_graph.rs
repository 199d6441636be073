//! The sorter driven through caller-supplied `LayoutGraph` implementations.
//!
//! Each wrapper delegates to a [`Diagram`] and overrides one behaviour:
//! gateway-only joins and splits, an adjacency that ignores edits, or a
//! region that reports no flow objects.

use std::path::Path;

use loopsort_core::config::{PredecessorPolicy, SortConfig};
use loopsort_core::diagram::{Diagram, ElementKind};
use loopsort_core::id::{ElementId, FlowId};
use loopsort_core::layout::LayoutGraph;
use loopsort_core::sort::{SortError, TopologicalSorter};
use loopsort_core::test_utils::*;
use loopsort_data::load_config;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Implement `LayoutGraph` for a `Diagram` newtype: read methods delegate
/// to `self.0`, the rest are supplied in the braces.
macro_rules! delegate_layout {
    ($wrapper:ty { $($overrides:tt)* }) => {
        impl LayoutGraph for $wrapper {
            type Element = ElementId;
            type Flow = FlowId;

            fn start_elements(&self, scope: Option<ElementId>) -> Vec<ElementId> {
                self.0.start_elements(scope)
            }
            fn children_of(&self, scope: Option<ElementId>) -> Vec<ElementId> {
                self.0.children_of(scope)
            }
            fn element_id(&self, element: ElementId) -> &str {
                self.0.element_id(element)
            }
            fn element_type(&self, element: ElementId) -> &str {
                self.0.element_type(element)
            }
            fn element_by_id(&self, id: &str) -> Option<ElementId> {
                self.0.element_by_id(id)
            }
            fn preceding(&self, element: ElementId) -> Vec<ElementId> {
                self.0.preceding(element)
            }
            fn following(&self, element: ElementId) -> Vec<ElementId> {
                self.0.following(element)
            }
            fn flow_connects(&self, flow: FlowId, source: ElementId, target: ElementId) -> bool {
                self.0.flow_connects(flow, source, target)
            }
            fn is_detached(&self, flow: FlowId) -> bool {
                self.0.is_detached(flow)
            }
            $($overrides)*
        }
    };
}

// ===========================================================================
// Gateway semantics: only gateways join or split
// ===========================================================================

struct GatewaySemantics(Diagram);

impl GatewaySemantics {
    fn is_gateway(&self, element: ElementId) -> bool {
        self.0
            .element(element)
            .is_some_and(|e| e.kind.is_gateway())
    }
}

delegate_layout!(GatewaySemantics {
    fn is_join(&self, element: ElementId) -> bool {
        self.is_gateway(element) && self.0.inflow_count(element) > 1
    }
    fn is_split(&self, element: ElementId) -> bool {
        self.is_gateway(element) && self.0.outflow_count(element) > 1
    }
    fn flows(&self, scope: Option<ElementId>) -> Vec<FlowId> {
        self.0.flows(scope)
    }
    fn detach_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        self.0.detach_flow(flow, source, target)
    }
    fn add_direct_link(&mut self, from: ElementId, to: ElementId) {
        self.0.add_direct_link(from, to)
    }
    fn restore_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        self.0.restore_flow(flow, source, target)
    }
});

/// A loop closed by a task `B` that a second start event `C` also feeds.
/// With gateway-only joins, `B` is straight-line but has two predecessors.
fn merged_task_loop() -> GatewaySemantics {
    GatewaySemantics(build_diagram(
        &[
            ("start", ElementKind::StartEvent),
            ("C", ElementKind::StartEvent),
            ("J", xor()),
            ("A", ElementKind::Task),
            ("B", ElementKind::Task),
        ],
        &[
            ("start", "J"),
            ("J", "A"),
            ("A", "B"),
            ("B", "J"),
            ("C", "B"),
        ],
    ))
}

#[test]
fn ambiguous_walk_fails_by_default() {
    init_logger();
    let mut graph = merged_task_loop();
    let result = TopologicalSorter::new(&mut graph, None);

    match result {
        Err(SortError::NonUniquePredecessor { element, count }) => {
            assert_eq!(element, "B");
            assert_eq!(count, 2);
        }
        Err(other) => panic!("expected NonUniquePredecessor, got {other}"),
        Ok(_) => panic!("expected NonUniquePredecessor, got an order"),
    }
    assert!(graph.0.reversed_flows().is_empty());
}

#[test]
fn stop_walk_policy_keeps_detected_edge() {
    init_logger();
    let mut graph = merged_task_loop();
    let config = SortConfig {
        predecessor_policy: PredecessorPolicy::StopWalk,
        ..SortConfig::default()
    };
    let sorter = TopologicalSorter::with_config(&mut graph, None, &config).unwrap();

    assert_eq!(
        edge_pairs(sorter.discovered_edges()),
        vec![("B".to_string(), "J".to_string())]
    );
    assert_eq!(
        ids(&graph.0, sorter.sorted_elements()),
        vec!["C", "start", "J", "A", "B"]
    );
    assert!(sorter.residual_edges().is_empty());
}

#[test]
fn stop_walk_policy_from_config_file() {
    init_logger();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/stop_walk.ron");
    let config = load_config(&path).unwrap();
    assert_eq!(config.predecessor_policy, PredecessorPolicy::StopWalk);
    assert!(config.require_convergence);

    let mut graph = merged_task_loop();
    let sorter = TopologicalSorter::with_config(&mut graph, None, &config).unwrap();
    assert_eq!(sorter.sorted_elements().len(), 5);
}

// ===========================================================================
// Frozen adjacency: edits are ignored
// ===========================================================================

struct FrozenAdjacency(Diagram);

delegate_layout!(FrozenAdjacency {
    fn is_join(&self, element: ElementId) -> bool {
        self.0.is_join(element)
    }
    fn is_split(&self, element: ElementId) -> bool {
        self.0.is_split(element)
    }
    fn flows(&self, scope: Option<ElementId>) -> Vec<FlowId> {
        self.0.flows(scope)
    }
    fn detach_flow(&mut self, _flow: FlowId, _source: ElementId, _target: ElementId) {}
    fn add_direct_link(&mut self, _from: ElementId, _to: ElementId) {}
    fn restore_flow(&mut self, _flow: FlowId, _source: ElementId, _target: ElementId) {}
});

#[test]
fn ordering_pass_breaks_loops_the_rewrite_missed() {
    init_logger();
    let mut graph = FrozenAdjacency(review_loop());
    let sorter = TopologicalSorter::new(&mut graph, None).unwrap();

    assert_eq!(
        edge_pairs(sorter.residual_edges()),
        vec![("split".to_string(), "join".to_string())]
    );
    assert_eq!(sorter.report().ordering.loops_broken, 1);
    assert_eq!(
        ids(&graph.0, sorter.sorted_elements()),
        vec!["start", "join", "draft", "review", "split", "end"]
    );
}

#[test]
fn require_convergence_rejects_residual_loops() {
    init_logger();
    let mut graph = FrozenAdjacency(review_loop());
    let config = SortConfig {
        require_convergence: true,
        ..SortConfig::default()
    };
    let result = TopologicalSorter::with_config(&mut graph, None, &config);
    assert!(matches!(
        result,
        Err(SortError::DidNotConverge { residual: 1 })
    ));
}

// ===========================================================================
// No flow objects: the rewrite cannot resolve anything
// ===========================================================================

struct NoFlows(Diagram);

delegate_layout!(NoFlows {
    fn is_join(&self, element: ElementId) -> bool {
        self.0.is_join(element)
    }
    fn is_split(&self, element: ElementId) -> bool {
        self.0.is_split(element)
    }
    fn flows(&self, _scope: Option<ElementId>) -> Vec<FlowId> {
        Vec::new()
    }
    fn detach_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        self.0.detach_flow(flow, source, target)
    }
    fn add_direct_link(&mut self, from: ElementId, to: ElementId) {
        self.0.add_direct_link(from, to)
    }
    fn restore_flow(&mut self, flow: FlowId, source: ElementId, target: ElementId) {
        self.0.restore_flow(flow, source, target)
    }
});

#[test]
fn unresolvable_backward_edge_leaves_graph_untouched() {
    init_logger();
    let mut graph = NoFlows(straight_line_loop());
    let result = TopologicalSorter::new(&mut graph, None);

    match result {
        Err(SortError::MissingFlow { from, to }) => {
            assert_eq!((from.as_str(), to.as_str()), ("y", "join"));
        }
        Err(other) => panic!("expected MissingFlow, got {other}"),
        Ok(_) => panic!("expected MissingFlow, got an order"),
    }

    let diagram = &graph.0;
    assert!(diagram.reversed_flows().is_empty());
    let join = diagram.lookup("join").unwrap();
    let y = diagram.lookup("y").unwrap();
    assert_eq!(diagram.preceding(join).len(), 2);
    assert!(diagram.following(y).contains(&join));
}

#[test]
fn acyclic_region_needs_no_flows() {
    init_logger();
    let mut graph = NoFlows(chain(3));
    let sorter = TopologicalSorter::new(&mut graph, None).unwrap();
    assert_eq!(
        ids(&graph.0, sorter.sorted_elements()),
        vec!["start", "t1", "t2", "t3"]
    );
}
