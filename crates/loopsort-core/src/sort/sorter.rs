use super::backward::BackwardEdge;
use super::element::SortableElement;
use crate::config::{PredecessorPolicy, SortConfig};
use crate::id::SortKey;
use crate::layout::LayoutGraph;
use log::{debug, trace};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a sort.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// Stuck with no join that lost a predecessor: a loop without a join,
    /// or elements unreachable from every start element.
    #[error("{pass} pass: no loop entry point among {remaining} unsorted elements")]
    NoLoopEntryPoint { pass: PassKind, remaining: usize },
    /// A backward edge names two elements joined neither by an attached
    /// flow `from -> to` nor by a detached flow `to -> from` of the region.
    /// The diagram is left untouched by the failing rewrite.
    #[error("no flow connects {from} to {to}")]
    MissingFlow { from: String, to: String },
    #[error("element {element} has {count} predecessors, back-patching needs exactly one")]
    NonUniquePredecessor { element: String, count: usize },
    #[error("sentinel id {0:?} collides with a diagram element")]
    SentinelCollision(String),
    #[error("ordering pass still broke {residual} loop edges")]
    DidNotConverge { residual: usize },
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Which pass of a sort an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Pass 1: finds loops, back-patches and rewrites the diagram.
    Discovery,
    /// Pass 2: produces the order handed to callers.
    Ordering,
    /// Read-only elimination used by [`verify_acyclic`].
    Verify,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Discovery => write!(f, "discovery"),
            PassKind::Ordering => write!(f, "ordering"),
            PassKind::Verify => write!(f, "verify"),
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Real elements placed (the synthetic start is not counted).
    pub emitted: usize,
    /// Elimination rounds that placed at least one element.
    pub rounds: usize,
    /// Times the pass got stuck and broke a loop.
    pub loops_broken: usize,
    /// Backward edges recorded while breaking loops.
    pub backward_edges: usize,
    /// Extra backward edges added by back-patching.
    pub backpatched: usize,
    /// Backward edges resolved by restoring a flow an earlier sort reversed.
    pub restored: usize,
}

/// Counters for both passes of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortReport {
    pub discovery: PassReport,
    pub ordering: PassReport,
}

// ---------------------------------------------------------------------------
// Working state of one pass
// ---------------------------------------------------------------------------

/// The disposable working copy for one pass.
///
/// Sortable elements live in a slot arena and are found by id through a
/// `BTreeMap`, so every scan runs in ascending id order. The synthetic
/// start element exists only here; it never reaches the caller's graph and
/// is stripped from the order in [`Pass::finish`]. A pass that fails is
/// simply dropped.
struct Pass<E> {
    kind: PassKind,
    arena: SlotMap<SortKey, SortableElement<E>>,
    index: BTreeMap<String, SortKey>,
    order: Vec<Option<E>>,
    report: PassReport,
}

impl<E: Copy> Pass<E> {
    fn new(kind: PassKind) -> Self {
        Self {
            kind,
            arena: SlotMap::with_key(),
            index: BTreeMap::new(),
            order: Vec::new(),
            report: PassReport::default(),
        }
    }

    /// Wrap the direct children of `scope` plus a synthetic start element
    /// feeding every start element of the region.
    fn build<G>(
        graph: &G,
        scope: Option<E>,
        config: &SortConfig,
        kind: PassKind,
    ) -> Result<Self, SortError>
    where
        G: LayoutGraph<Element = E>,
    {
        let sentinel = config.sentinel_id.as_str();
        if graph.element_by_id(sentinel).is_some() {
            return Err(SortError::SentinelCollision(sentinel.to_string()));
        }

        let children = graph.children_of(scope);
        let region: BTreeSet<&str> = children.iter().map(|&c| graph.element_id(c)).collect();
        let starts: BTreeSet<String> = graph
            .start_elements(scope)
            .into_iter()
            .map(|s| graph.element_id(s))
            .filter(|id| region.contains(id))
            .map(str::to_string)
            .collect();

        let in_region = |elements: Vec<E>| -> BTreeSet<String> {
            elements
                .into_iter()
                .map(|e| graph.element_id(e))
                .filter(|id| region.contains(id))
                .map(str::to_string)
                .collect()
        };

        let mut pass = Self::new(kind);
        pass.insert(SortableElement::synthetic(sentinel, starts.iter().cloned()));

        for &child in &children {
            let id = graph.element_id(child);
            let mut incoming = in_region(graph.preceding(child));
            if starts.contains(id) {
                incoming.insert(sentinel.to_string());
            }
            let outgoing = in_region(graph.following(child));
            pass.insert(SortableElement::new(
                Some(child),
                id,
                graph.element_type(child),
                graph.is_join(child),
                incoming,
                outgoing,
            ));
        }

        debug!(
            "{kind} pass: {} elements, {} joins, {} start elements",
            children.len(),
            pass.arena.values().filter(|e| e.is_join()).count(),
            starts.len()
        );
        Ok(pass)
    }

    fn insert(&mut self, element: SortableElement<E>) {
        let id = element.id().to_string();
        let key = self.arena.insert(element);
        if let Some(replaced) = self.index.insert(id, key) {
            self.arena.remove(replaced);
        }
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Place every currently free element, in ascending id order, and
    /// release their successors. Returns false if nothing was free.
    fn emit_free_round(&mut self) -> bool {
        let free: Vec<SortKey> = self
            .index
            .values()
            .copied()
            .filter(|&k| self.arena.get(k).is_some_and(|e| e.is_free()))
            .collect();
        if free.is_empty() {
            return false;
        }

        self.report.rounds += 1;
        for key in free {
            let Some(element) = self.arena.remove(key) else {
                continue;
            };
            self.index.remove(element.id());
            for next in element.outgoing() {
                if let Some(&nk) = self.index.get(next)
                    && let Some(successor) = self.arena.get_mut(nk)
                {
                    successor.remove_incoming_link_from(element.id());
                }
            }
            trace!(
                "{} pass: placed {} ({})",
                self.kind,
                element.id(),
                element.element_type()
            );
            self.order.push(element.element());
        }
        true
    }

    /// The smallest-id join that has lost a predecessor but is not free.
    fn loop_entry_point(&self) -> Result<SortKey, SortError> {
        self.index
            .values()
            .copied()
            .find(|&k| {
                self.arena
                    .get(k)
                    .is_some_and(|e| e.is_loop_entry_candidate())
            })
            .ok_or(SortError::NoLoopEntryPoint {
                pass: self.kind,
                remaining: self.index.len(),
            })
    }

    /// Reverse every remaining incoming link of the loop entry point and
    /// record each as a backward edge. The entry point is free afterwards.
    fn break_loop<F: Copy>(&mut self, entry: SortKey, records: &mut Vec<BackwardEdge<F>>) {
        let Some(join) = self.arena.get(entry) else {
            return;
        };
        let join_id = join.id().to_string();
        let sources: Vec<String> = join.incoming().iter().cloned().collect();
        debug!(
            "{} pass: breaking loop at {} ({} backward links)",
            self.kind,
            join_id,
            sources.len()
        );
        self.report.loops_broken += 1;

        for source in sources {
            let self_loop = source == join_id;
            if let Some(join) = self.arena.get_mut(entry) {
                if self_loop {
                    join.drop_self_link();
                } else {
                    join.reverse_incoming_link_from(&source);
                }
            }
            if !self_loop
                && let Some(&sk) = self.index.get(&source)
                && let Some(element) = self.arena.get_mut(sk)
            {
                element.reverse_outgoing_link_to(&join_id);
            }
            records.push(BackwardEdge::new(source, join_id.clone()));
            self.report.backward_edges += 1;
        }
    }

    /// Hand back the real elements in placement order.
    fn finish(mut self) -> (VecDeque<E>, PassReport) {
        let order: VecDeque<E> = self.order.drain(..).flatten().collect();
        self.report.emitted = order.len();
        (order, self.report)
    }
}

// ---------------------------------------------------------------------------
// Back-patching and rewriting
// ---------------------------------------------------------------------------

/// Extend each backward edge through straight-line predecessors up to the
/// nearest join or split.
///
/// Each walk keeps a visited set seeded with the record's endpoints, so it
/// ends when it would come back onto the loop it started from.
fn backpatch<G: LayoutGraph>(
    graph: &G,
    records: Vec<BackwardEdge<G::Flow>>,
    policy: PredecessorPolicy,
) -> Result<Vec<BackwardEdge<G::Flow>>, SortError> {
    let mut patched = records.clone();

    for record in &records {
        let Some(mut current) = graph.element_by_id(record.source()) else {
            continue;
        };
        let mut visited: HashSet<String> =
            HashSet::from([record.source().to_string(), record.target().to_string()]);

        while !(graph.is_join(current) || graph.is_split(current)) {
            let predecessors = graph.preceding(current);
            let predecessor = match predecessors.as_slice() {
                [] => break,
                [only] => *only,
                many => match policy {
                    PredecessorPolicy::Fail => {
                        return Err(SortError::NonUniquePredecessor {
                            element: graph.element_id(current).to_string(),
                            count: many.len(),
                        });
                    }
                    PredecessorPolicy::StopWalk => {
                        debug!(
                            "back-patch walk stopped at {}: {} predecessors",
                            graph.element_id(current),
                            many.len()
                        );
                        break;
                    }
                },
            };

            let predecessor_id = graph.element_id(predecessor);
            if !visited.insert(predecessor_id.to_string()) {
                break;
            }
            trace!(
                "back-patching {} -> {}",
                predecessor_id,
                graph.element_id(current)
            );
            patched.push(BackwardEdge::new(predecessor_id, graph.element_id(current)));
            current = predecessor;
        }
    }

    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(patched.len());
    patched.retain(|r| seen.insert((r.source().to_string(), r.target().to_string())));
    Ok(patched)
}

/// How one backward edge is applied to the real graph.
#[derive(Clone, Copy)]
struct Resolved<E, F> {
    source: E,
    target: E,
    flow: F,
    /// `flow` runs `target -> source` and was reversed by an earlier sort.
    restore: bool,
}

/// First candidate no earlier record claimed, else the first candidate.
fn pick_flow<E, F: Copy + Eq>(candidates: &[F], resolved: &[Resolved<E, F>]) -> Option<F> {
    candidates
        .iter()
        .copied()
        .find(|f| !resolved.iter().any(|r| r.flow == *f))
        .or_else(|| candidates.first().copied())
}

/// Apply backward edges to the real graph.
///
/// A record over an attached `source -> target` flow detaches it and links
/// target back to source. A record over a direct link left by an earlier
/// reversal restores the detached `target -> source` flow instead.
///
/// Every record is resolved before anything is edited, so a missing flow
/// leaves the graph as it was. A record prefers a flow no earlier record
/// of this rewrite has claimed.
fn rewrite<G: LayoutGraph>(
    graph: &mut G,
    scope: Option<G::Element>,
    records: &mut [BackwardEdge<G::Flow>],
) -> Result<(), SortError> {
    if records.is_empty() {
        return Ok(());
    }

    let flows = graph.flows(scope);
    let mut resolved: Vec<Resolved<G::Element, G::Flow>> = Vec::with_capacity(records.len());

    for record in records.iter() {
        let missing = || SortError::MissingFlow {
            from: record.source().to_string(),
            to: record.target().to_string(),
        };
        let source = graph.element_by_id(record.source()).ok_or_else(missing)?;
        let target = graph.element_by_id(record.target()).ok_or_else(missing)?;

        let forward: Vec<G::Flow> = flows
            .iter()
            .copied()
            .filter(|&f| graph.flow_connects(f, source, target) && !graph.is_detached(f))
            .collect();
        if let Some(flow) = pick_flow(&forward, &resolved) {
            resolved.push(Resolved {
                source,
                target,
                flow,
                restore: false,
            });
            continue;
        }

        let reversed: Vec<G::Flow> = flows
            .iter()
            .copied()
            .filter(|&f| graph.flow_connects(f, target, source) && graph.is_detached(f))
            .collect();
        let flow = pick_flow(&reversed, &resolved).ok_or_else(missing)?;
        resolved.push(Resolved {
            source,
            target,
            flow,
            restore: true,
        });
    }

    for (record, r) in records.iter_mut().zip(&resolved) {
        if r.restore {
            record.resolve_by_restoring(r.flow);
            graph.restore_flow(r.flow, r.target, r.source);
            debug!("restored {} -> {}", record.target(), record.source());
            continue;
        }
        record.resolve(r.flow);
        graph.detach_flow(r.flow, r.source, r.target);
        // A self-loop has nothing to point back to.
        if r.source != r.target {
            graph.add_direct_link(r.target, r.source);
        }
        debug!("reversed {} -> {}", record.source(), record.target());
    }
    Ok(())
}

fn run_pass<G: LayoutGraph>(
    graph: &mut G,
    scope: Option<G::Element>,
    config: &SortConfig,
    kind: PassKind,
) -> Result<(VecDeque<G::Element>, Vec<BackwardEdge<G::Flow>>, PassReport), SortError> {
    let mut pass = Pass::build(&*graph, scope, config, kind)?;
    let mut records: Vec<BackwardEdge<G::Flow>> = Vec::new();

    while !pass.is_empty() {
        if !pass.emit_free_round() {
            let entry = pass.loop_entry_point()?;
            pass.break_loop(entry, &mut records);
        }
    }

    if kind == PassKind::Discovery && config.backpatch && !records.is_empty() {
        let detected = records.len();
        records = backpatch(&*graph, records, config.predecessor_policy)?;
        pass.report.backpatched = records.len().saturating_sub(detected);
    }

    if kind == PassKind::Ordering && config.require_convergence && !records.is_empty() {
        return Err(SortError::DidNotConverge {
            residual: records.len(),
        });
    }

    rewrite(graph, scope, &mut records)?;
    pass.report.restored = records.iter().filter(|r| r.is_restored()).count();

    let (order, report) = pass.finish();
    debug!(
        "{kind} pass: {} placed in {} rounds, {} backward edges",
        report.emitted,
        report.rounds,
        records.len()
    );
    Ok((order, records, report))
}

// ---------------------------------------------------------------------------
// TopologicalSorter
// ---------------------------------------------------------------------------

/// Orders the elements of a diagram region for incremental layout, breaking
/// every loop by reclassifying its closing edges as backward edges.
///
/// Construction runs two passes. The discovery pass breaks loops,
/// back-patches the backward edges and rewrites the diagram so each one
/// becomes a direct `target -> source` link. The ordering pass then runs
/// on the rewritten diagram and its order is what [`sorted_elements`]
/// returns.
///
/// The rewrite edits the caller's graph in place. Do not run two sorters
/// over the same graph at once.
///
/// [`sorted_elements`]: TopologicalSorter::sorted_elements
pub struct TopologicalSorter<G: LayoutGraph> {
    sorted: VecDeque<G::Element>,
    discovered: Vec<BackwardEdge<G::Flow>>,
    residual: Vec<BackwardEdge<G::Flow>>,
    report: SortReport,
}

impl<G: LayoutGraph> TopologicalSorter<G> {
    /// Sort the region `scope` of `graph` with the default configuration.
    pub fn new(graph: &mut G, scope: Option<G::Element>) -> Result<Self, SortError> {
        Self::with_config(graph, scope, &SortConfig::default())
    }

    /// Sort the region `scope` of `graph`.
    pub fn with_config(
        graph: &mut G,
        scope: Option<G::Element>,
        config: &SortConfig,
    ) -> Result<Self, SortError> {
        let (_, discovered, discovery) = run_pass(graph, scope, config, PassKind::Discovery)?;
        let (sorted, residual, ordering) = run_pass(graph, scope, config, PassKind::Ordering)?;

        if !residual.is_empty() {
            debug!(
                "ordering pass broke {} more loop edges after rewrite",
                residual.len()
            );
        }

        Ok(Self {
            sorted,
            discovered,
            residual,
            report: SortReport {
                discovery,
                ordering,
            },
        })
    }

    /// Elements in final order, without the synthetic start element.
    pub fn sorted_elements(&self) -> &VecDeque<G::Element> {
        &self.sorted
    }

    /// Take the order out of the sorter.
    pub fn into_sorted(self) -> VecDeque<G::Element> {
        self.sorted
    }

    /// Backward edges of the discovery pass, resolved to their flows.
    pub fn discovered_edges(&self) -> &[BackwardEdge<G::Flow>] {
        &self.discovered
    }

    /// Backward edges the ordering pass still had to break. Empty when the
    /// first rewrite removed every loop.
    pub fn residual_edges(&self) -> &[BackwardEdge<G::Flow>] {
        &self.residual
    }

    pub fn report(&self) -> &SortReport {
        &self.report
    }
}

/// Run elimination alone over a region, without breaking loops or touching
/// the graph. Returns true if every element could be placed.
pub fn verify_acyclic<G: LayoutGraph>(
    graph: &G,
    scope: Option<G::Element>,
    config: &SortConfig,
) -> Result<bool, SortError> {
    let mut pass = Pass::build(graph, scope, config, PassKind::Verify)?;
    while !pass.is_empty() {
        if !pass.emit_free_round() {
            debug!("verify pass: stuck with {} elements", pass.index.len());
            return Ok(false);
        }
    }
    Ok(true)
}
