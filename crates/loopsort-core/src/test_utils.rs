//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::diagram::{Diagram, ElementKind, GatewayKind};
use crate::id::ElementId;
use crate::sort::BackwardEdge;

// ===========================================================================
// Builders
// ===========================================================================

/// Build a top-level diagram from `(id, kind)` pairs and `(from, to)` flows.
///
/// Panics on duplicate or unknown ids.
pub fn build_diagram(elements: &[(&str, ElementKind)], flows: &[(&str, &str)]) -> Diagram {
    let mut diagram = Diagram::new();
    for &(id, kind) in elements {
        diagram.add_element(id, kind).unwrap();
    }
    for &(from, to) in flows {
        let from = diagram.lookup(from).unwrap();
        let to = diagram.lookup(to).unwrap();
        diagram.connect(from, to).unwrap();
    }
    diagram
}

pub fn xor() -> ElementKind {
    ElementKind::Gateway(GatewayKind::Exclusive)
}

/// `start -> t1 -> ... -> tn`.
pub fn chain(n: usize) -> Diagram {
    let mut diagram = Diagram::new();
    let mut previous = diagram.add_element("start", ElementKind::StartEvent).unwrap();
    for i in 1..=n {
        let task = diagram.add_element(format!("t{i}"), ElementKind::Task).unwrap();
        diagram.connect(previous, task).unwrap();
        previous = task;
    }
    diagram
}

/// `start -> split -> {left, right} -> merge -> end`: a join with no loop.
pub fn diamond() -> Diagram {
    build_diagram(
        &[
            ("start", ElementKind::StartEvent),
            ("split", ElementKind::Gateway(GatewayKind::Parallel)),
            ("left", ElementKind::Task),
            ("right", ElementKind::Task),
            ("merge", ElementKind::Gateway(GatewayKind::Parallel)),
            ("end", ElementKind::EndEvent),
        ],
        &[
            ("start", "split"),
            ("split", "left"),
            ("split", "right"),
            ("left", "merge"),
            ("right", "merge"),
            ("merge", "end"),
        ],
    )
}

/// `Start -> A -> B -> C -> B`: B is a join, C closes the loop.
pub fn simple_loop() -> Diagram {
    build_diagram(
        &[
            ("Start", ElementKind::StartEvent),
            ("A", ElementKind::Task),
            ("B", ElementKind::Task),
            ("C", ElementKind::Task),
        ],
        &[("Start", "A"), ("A", "B"), ("B", "C"), ("C", "B")],
    )
}

/// A rework loop: `start -> join -> draft -> review -> split`, with the
/// split going back to the join or on to `end`.
pub fn review_loop() -> Diagram {
    build_diagram(
        &[
            ("start", ElementKind::StartEvent),
            ("join", xor()),
            ("draft", ElementKind::Task),
            ("review", ElementKind::Task),
            ("split", xor()),
            ("end", ElementKind::EndEvent),
        ],
        &[
            ("start", "join"),
            ("join", "draft"),
            ("draft", "review"),
            ("review", "split"),
            ("split", "join"),
            ("split", "end"),
        ],
    )
}

/// A loop whose body is a straight line after the split:
/// `split -> x -> y -> join`, with `join -> split` and `split -> end`.
pub fn straight_line_loop() -> Diagram {
    build_diagram(
        &[
            ("start", ElementKind::StartEvent),
            ("join", xor()),
            ("split", xor()),
            ("x", ElementKind::Task),
            ("y", ElementKind::Task),
            ("end", ElementKind::EndEvent),
        ],
        &[
            ("start", "join"),
            ("join", "split"),
            ("split", "x"),
            ("x", "y"),
            ("y", "join"),
            ("split", "end"),
        ],
    )
}

/// `rungs` review loops in series, each with `body` tasks between its join
/// and split. Ids are zero-padded so lexicographic order follows the chain.
pub fn looped_ladder(rungs: usize, body: usize) -> Diagram {
    let mut diagram = Diagram::new();
    let mut previous = diagram.add_element("start", ElementKind::StartEvent).unwrap();
    for r in 0..rungs {
        let join = diagram.add_element(format!("r{r:04}-a-join"), xor()).unwrap();
        diagram.connect(previous, join).unwrap();
        let mut tail = join;
        for b in 0..body {
            let task = diagram
                .add_element(format!("r{r:04}-b{b:04}"), ElementKind::Task)
                .unwrap();
            diagram.connect(tail, task).unwrap();
            tail = task;
        }
        let split = diagram.add_element(format!("r{r:04}-c-split"), xor()).unwrap();
        diagram.connect(tail, split).unwrap();
        diagram.connect(split, join).unwrap();
        previous = split;
    }
    let end = diagram.add_element("zz-end", ElementKind::EndEvent).unwrap();
    diagram.connect(previous, end).unwrap();
    diagram
}

// ===========================================================================
// Inspection
// ===========================================================================

/// String ids of elements, in the given order.
pub fn ids<'a>(diagram: &Diagram, order: impl IntoIterator<Item = &'a ElementId>) -> Vec<String> {
    order
        .into_iter()
        .map(|&e| diagram.id_of(e).to_string())
        .collect()
}

/// `(source, target)` pairs of backward edges, in record order.
pub fn edge_pairs<F: Copy>(edges: &[BackwardEdge<F>]) -> Vec<(String, String)> {
    edges
        .iter()
        .map(|e| (e.source().to_string(), e.target().to_string()))
        .collect()
}

/// Position of `id` in an id list. Panics if absent.
pub fn position(order: &[String], id: &str) -> usize {
    order.iter().position(|x| x == id).unwrap()
}
