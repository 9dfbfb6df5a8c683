//! One call tree: an arena of nodes plus the cursor state machine.
//!
//! The cursor is the node most recently entered and not yet returned
//! from; it is always reachable from the root by parent links and sits
//! at the root exactly when no call is open. `on_call` descends
//! (creating or reusing a child), `on_return` ascends, and both do O(1)
//! amortized work since the hook fires on every interpreted call.

use super::node::{NodeId, TraceNode};
use crate::hook::HookEventKind;
use log::warn;

/// Arena index of the root node in every tree.
pub const ROOT: NodeId = 0;

/// Presentation order applied to children during the self-time pass.
///
/// Sorting never affects later merges, only how views list children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// By accumulated total time, descending
    #[default]
    TotalTime,
    /// By self time, descending
    SelfTime,
    /// First-discovery order, untouched
    Arrival,
}

/// A call tree for one frame or one whole session.
#[derive(Debug, Clone)]
pub struct TraceTree {
    nodes: Vec<TraceNode>,
    cursor: NodeId,
}

impl TraceTree {
    /// An empty tree holding only an unstamped root.
    pub fn new() -> Self {
        Self {
            nodes: vec![TraceNode::root()],
            cursor: ROOT,
        }
    }

    /// Reset to a single root, stamp its pseudo-invocation bracket, and
    /// park the cursor there. Called before a tree starts receiving
    /// events and whenever the root bracket needs restarting.
    pub fn init(&mut self, now: f64, mem_kb: f32) {
        self.nodes.clear();
        self.nodes.push(TraceNode::root());
        self.cursor = ROOT;
        self.nodes[ROOT].fake_begin_invoke(now, mem_kb);
    }

    /// Descend into a call site: reuse the cursor's child for this id or
    /// create one, record the entry, and move the cursor onto it.
    pub fn on_call(
        &mut self,
        id: &str,
        name: &str,
        kind: HookEventKind,
        now: f64,
        mem_kb: f32,
    ) -> NodeId {
        let cur = self.cursor;
        let child = match self.nodes[cur].child(id) {
            Some(existing) => existing,
            None => {
                let created = self.nodes.len();
                self.nodes.push(TraceNode::new(Some(cur), id, name, kind));
                self.nodes[cur].add_child(id, created);
                created
            }
        };
        self.nodes[child].begin_invoke(now, mem_kb);
        self.cursor = child;
        child
    }

    /// Close the open call at the cursor and ascend to its parent.
    ///
    /// A return while the cursor is at the root means the event stream
    /// lost a call somewhere; it is logged and ignored so a corrupted
    /// hook stream never takes the monitored program down.
    pub fn on_return(&mut self, now: f64, mem_kb: f32) {
        if self.cursor == ROOT {
            warn!("return event with no open call; keeping cursor at root");
            return;
        }
        let node = &mut self.nodes[self.cursor];
        if node.call_count == 0 {
            warn!("closing call site {} that was never entered", node.id);
        }
        node.end_invoke(now, mem_kb);
        self.cursor = node.parent.unwrap_or(ROOT);
    }

    /// Accumulate the root bracket up to `now`; see
    /// [`TraceNode::fake_end_invoke`].
    pub fn fake_end_invoke(&mut self, now: f64, mem_kb: f32) {
        self.nodes[ROOT].fake_end_invoke(now, mem_kb);
    }

    /// Depth-first post-order pass computing every node's self time
    /// (`total_time` minus the children's totals) and average, then
    /// ordering children for presentation.
    pub fn count_self_time(&mut self, sort: SortMode) {
        self.count_node(ROOT, sort);
    }

    fn count_node(&mut self, id: NodeId, sort: SortMode) {
        let mut child_total = 0.0;
        for i in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[i];
            self.count_node(child, sort);
            child_total += self.nodes[child].total_time;
        }
        let node = &mut self.nodes[id];
        node.self_time = node.total_time - child_total;
        node.average = if node.call_count > 0 {
            node.total_time / f64::from(node.call_count)
        } else {
            0.0
        };
        self.sort_children_of(id, sort);
    }

    /// Reorder one node's children; presentation only.
    pub fn sort_children_of(&mut self, id: NodeId, sort: SortMode) {
        if sort == SortMode::Arrival {
            return;
        }
        let mut kids = std::mem::take(&mut self.nodes[id].children);
        match sort {
            SortMode::TotalTime => kids.sort_by(|a, b| {
                self.nodes[*b]
                    .total_time
                    .total_cmp(&self.nodes[*a].total_time)
            }),
            SortMode::SelfTime => kids.sort_by(|a, b| {
                self.nodes[*b].self_time.total_cmp(&self.nodes[*a].self_time)
            }),
            SortMode::Arrival => {}
        }
        self.nodes[id].children = kids;
    }

    /// Build the cross-call statistics view: every occurrence of a call
    /// site anywhere in this tree folds into one child of the view's
    /// root, keyed by id. The live tree is not mutated.
    pub fn statisticize(&self) -> TraceTree {
        let mut out = TraceTree::new();
        self.fold_into(&mut out);
        out
    }

    /// Fold this tree's sites into an existing statistics tree.
    ///
    /// Calling this for several trees merges whole sessions: a site
    /// called in each tree ends up as one node carrying the summed
    /// counters.
    pub fn fold_into(&self, out: &mut TraceTree) {
        let mut pending: Vec<NodeId> = self.nodes[ROOT].children.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let node = &self.nodes[id];
            out.merge_site(node);
            pending.extend(node.children.iter().rev().copied());
        }
    }

    /// Merge one call-site record into this tree's root level: existing
    /// entry accumulates, unseen id is cloned in, and the root absorbs
    /// the record's totals either way.
    pub fn merge_site(&mut self, other: &TraceNode) {
        match self.nodes[ROOT].child(&other.id) {
            Some(existing) => self.nodes[existing].accumulate(other),
            None => {
                let created = self.nodes.len();
                self.nodes.push(other.stat_copy(Some(ROOT)));
                let key = self.nodes[created].id.clone();
                self.nodes[ROOT].add_child(&key, created);
            }
        }
        self.nodes[ROOT].absorb_totals(other);
    }

    pub fn root(&self) -> &TraceNode {
        &self.nodes[ROOT]
    }

    /// Direct arena access; `id` must come from this tree.
    pub fn node(&self, id: NodeId) -> &TraceNode {
        &self.nodes[id]
    }

    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &TraceNode> {
        self.nodes[id].children.iter().map(move |&c| &self.nodes[c])
    }

    /// Node the next call will attach under; the root iff no call is open.
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Arena-level constructor for deserialization: append a node under
    /// an existing parent, wiring both link directions.
    pub(crate) fn push_child(&mut self, parent: NodeId, node: TraceNode) -> NodeId {
        let created = self.nodes.len();
        let key = node.id.clone();
        self.nodes.push(node);
        self.nodes[created].parent = Some(parent);
        self.nodes[parent].add_child(&key, created);
        created
    }

    /// Arena-level constructor for deserialization: install the root.
    pub(crate) fn from_root(mut root: TraceNode) -> Self {
        root.parent = None;
        Self {
            nodes: vec![root],
            cursor: ROOT,
        }
    }
}

impl Default for TraceTree {
    fn default() -> Self {
        Self::new()
    }
}
