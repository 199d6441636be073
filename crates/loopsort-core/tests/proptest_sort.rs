//! Property-based tests for the two-pass sorter.
//!
//! Uses proptest to generate random acyclic diagrams and random looped
//! diagrams (a backbone with back flows), then checks that the order covers
//! every element, respects flow direction and is reproducible.

use std::collections::{BTreeSet, HashMap, HashSet};

use loopsort_core::config::SortConfig;
use loopsort_core::diagram::{Diagram, ElementKind};
use loopsort_core::sort::{TopologicalSorter, verify_acyclic};
use loopsort_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn node_id(i: usize) -> String {
    format!("n{i:03}")
}

/// Build a diagram with `n` elements and the given `(from, to)` index flows.
/// Elements without incoming flows are start events.
fn diagram_from_indices(n: usize, flows: &[(usize, usize)]) -> Diagram {
    let targets: HashSet<usize> = flows.iter().map(|&(_, to)| to).collect();
    let mut diagram = Diagram::new();
    let elements: Vec<_> = (0..n)
        .map(|i| {
            let kind = if targets.contains(&i) {
                ElementKind::Task
            } else {
                ElementKind::StartEvent
            };
            diagram.add_element(node_id(i), kind).unwrap()
        })
        .collect();
    for &(from, to) in flows {
        diagram.connect(elements[from], elements[to]).unwrap();
    }
    diagram
}

/// Random DAG: every flow goes from a lower to a higher index.
fn arb_dag(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec((0..n, 0..n), 0..n * 2).prop_map(move |pairs| {
            let flows: BTreeSet<(usize, usize)> = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect();
            (n, flows.into_iter().collect())
        })
    })
}

/// Random looped diagram: a backbone `0 -> 1 -> ... -> n-1` plus at least
/// one distinct back flow `j -> i` with `1 <= i < j`.
fn arb_looped(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (3..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec((1..n - 1, 0..n), 1..=n).prop_map(move |pairs| {
            let back: BTreeSet<(usize, usize)> = pairs
                .into_iter()
                .map(|(i, d)| (i + 1 + d % (n - 1 - i), i))
                .collect();
            let mut flows: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
            flows.extend(back);
            (n, flows)
        })
    })
}

fn positions(order: &[String]) -> HashMap<&str, usize> {
    order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect()
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Acyclic input: every flow points forward in the order and nothing is
    /// reversed.
    #[test]
    fn dag_order_respects_flows((n, flows) in arb_dag(40)) {
        let mut diagram = diagram_from_indices(n, &flows);
        let sorter = TopologicalSorter::new(&mut diagram, None).unwrap();
        let order = ids(&diagram, sorter.sorted_elements());

        prop_assert_eq!(order.len(), n);
        prop_assert!(sorter.discovered_edges().is_empty());
        let pos = positions(&order);
        for &(from, to) in &flows {
            prop_assert!(pos[node_id(from).as_str()] < pos[node_id(to).as_str()],
                "flow {} -> {} placed backwards", from, to);
        }
    }

    /// Looped input: every element is placed exactly once.
    #[test]
    fn looped_sort_places_every_element_once((n, flows) in arb_looped(40)) {
        let mut diagram = diagram_from_indices(n, &flows);
        let sorter = TopologicalSorter::new(&mut diagram, None).unwrap();
        let order = ids(&diagram, sorter.sorted_elements());

        prop_assert_eq!(order.len(), n);
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), n);
        prop_assert!(!sorter.discovered_edges().is_empty());
    }

    /// Two sorts of identical input agree on order and backward edges.
    #[test]
    fn looped_sort_is_deterministic((n, flows) in arb_looped(30)) {
        let mut first = diagram_from_indices(n, &flows);
        let mut second = diagram_from_indices(n, &flows);
        let a = TopologicalSorter::new(&mut first, None).unwrap();
        let b = TopologicalSorter::new(&mut second, None).unwrap();

        prop_assert_eq!(ids(&first, a.sorted_elements()), ids(&second, b.sorted_elements()));
        prop_assert_eq!(edge_pairs(a.discovered_edges()), edge_pairs(b.discovered_edges()));
    }

    /// After one rewrite no loop is left: the ordering pass broke nothing
    /// and a fresh elimination never gets stuck.
    #[test]
    fn rewrite_leaves_no_loops((n, flows) in arb_looped(40)) {
        let mut diagram = diagram_from_indices(n, &flows);
        let sorter = TopologicalSorter::new(&mut diagram, None).unwrap();

        prop_assert!(sorter.residual_edges().is_empty());
        prop_assert!(verify_acyclic(&diagram, None, &SortConfig::default()).unwrap());
    }

    /// Attached flows point forward in the final order, reversed flows point
    /// backward.
    #[test]
    fn reversed_flows_point_backward((n, flows) in arb_looped(40)) {
        let mut diagram = diagram_from_indices(n, &flows);
        let sorter = TopologicalSorter::new(&mut diagram, None).unwrap();
        let order = ids(&diagram, sorter.sorted_elements());
        let pos = positions(&order);

        for (flow, data) in diagram.flows_iter() {
            let from = pos[diagram.id_of(data.from)];
            let to = pos[diagram.id_of(data.to)];
            if diagram.is_reversed(flow) {
                prop_assert!(to < from);
            } else {
                prop_assert!(from < to);
            }
        }
    }
}
