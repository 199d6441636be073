/// A loop-closing edge found while sorting: the link `source -> target` is
/// treated as pointing backwards.
///
/// Created with ids only; `flow` is filled in when the record is resolved
/// against the real diagram during rewriting. Usually that flow runs
/// `source -> target` and gets reversed. If the link was a direct link left
/// by an earlier reversal, the flow runs `target -> source` and is restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackwardEdge<F> {
    source: String,
    target: String,
    flow: Option<F>,
    restored: bool,
}

impl<F: Copy> BackwardEdge<F> {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            flow: None,
            restored: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The concrete flow this record resolved to, once rewritten.
    pub fn flow(&self) -> Option<F> {
        self.flow
    }

    pub(crate) fn resolve(&mut self, flow: F) {
        self.flow = Some(flow);
    }

    pub(crate) fn resolve_by_restoring(&mut self, flow: F) {
        self.flow = Some(flow);
        self.restored = true;
    }

    /// True if rewriting undid an earlier reversal instead of reversing a
    /// flow.
    pub fn is_restored(&self) -> bool {
        self.restored
    }
}
