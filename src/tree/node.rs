//! A single call-site record in the trace tree.
//!
//! Nodes live in an arena owned by their [`TraceTree`](super::TraceTree);
//! `parent` and `children` are indices into that arena, so the tree has
//! no ownership cycles and ascending on return is O(1).

use crate::hook::HookEventKind;
use crate::utils::config::{ANONYMOUS_NAME, ROOT_NODE_ID};
use std::collections::HashMap;

/// Index of a node inside its owning tree's arena.
pub type NodeId = usize;

/// One call site as observed under one parent.
///
/// Repeated and recursive calls to the same site under the same parent
/// accumulate into a single node (merge-on-id); `children` keeps
/// first-discovery order and `child_ids` is the O(1) lookup index over
/// it. The two are always in lock-step.
#[derive(Debug, Clone)]
pub struct TraceNode {
    /// Stable call-site id: `"<source>:<start>~<end> <name>"`
    pub id: String,

    /// Display name; the anonymous sentinel when unresolvable
    pub name: String,

    /// Hook event that created the node; `None` only for the root
    pub event: Option<HookEventKind>,

    /// Number of times this site was entered
    pub call_count: u32,

    /// Timestamp (ms) of the most recent entry; transient, only
    /// meaningful while an invocation is open
    pub call_time: f64,

    /// Accumulated wall-clock time including children (ms)
    pub total_time: f64,

    /// Time excluding children (ms); valid only after a
    /// `count_self_time` pass
    pub self_time: f64,

    /// `total_time / call_count`; computed alongside self time
    pub average: f64,

    /// Heap sample (KB) taken at entry; transient
    pub mem_at_call: f32,

    /// Accumulated positive heap deltas (KB) while this site was active
    pub allocated_kb: f32,

    /// Accumulated negative heap deltas (KB), stored as a magnitude
    pub freed_kb: f32,

    /// Enclosing node; `None` for the root
    pub parent: Option<NodeId>,

    /// Child nodes in first-discovery order
    pub children: Vec<NodeId>,

    /// Id -> child index; rebuilt (not persisted) on deserialization
    child_ids: HashMap<String, NodeId>,
}

impl TraceNode {
    pub fn new(parent: Option<NodeId>, id: &str, name: &str, event: HookEventKind) -> Self {
        Self {
            id: id.to_string(),
            name: if name.is_empty() {
                ANONYMOUS_NAME.to_string()
            } else {
                name.to_string()
            },
            event: Some(event),
            call_count: 0,
            call_time: 0.0,
            total_time: 0.0,
            self_time: 0.0,
            average: 0.0,
            mem_at_call: 0.0,
            allocated_kb: 0.0,
            freed_kb: 0.0,
            parent,
            children: Vec::new(),
            child_ids: HashMap::new(),
        }
    }

    /// The pseudo call site at the top of a tree.
    pub fn root() -> Self {
        Self {
            id: ROOT_NODE_ID.to_string(),
            name: ROOT_NODE_ID.to_string(),
            event: None,
            call_count: 0,
            call_time: 0.0,
            total_time: 0.0,
            self_time: 0.0,
            average: 0.0,
            mem_at_call: 0.0,
            allocated_kb: 0.0,
            freed_kb: 0.0,
            parent: None,
            children: Vec::new(),
            child_ids: HashMap::new(),
        }
    }

    /// O(1) lookup of an existing child for a call-site id.
    pub fn child(&self, id: &str) -> Option<NodeId> {
        self.child_ids.get(id).copied()
    }

    /// Register a child node. The caller checks [`child`](Self::child)
    /// first; one child per distinct id under a given parent.
    pub fn add_child(&mut self, id: &str, child: NodeId) {
        debug_assert!(
            !self.child_ids.contains_key(id),
            "duplicate child id {id} under {}",
            self.id
        );
        self.children.push(child);
        self.child_ids.insert(id.to_string(), child);
    }

    /// Record an entry into this call site.
    pub fn begin_invoke(&mut self, now: f64, mem_kb: f32) {
        self.call_time = now;
        self.mem_at_call = mem_kb;
        self.call_count += 1;
    }

    /// Record the matching exit; returns the event that created the node
    /// so the caller can decide the next transition.
    pub fn end_invoke(&mut self, now: f64, mem_kb: f32) -> Option<HookEventKind> {
        self.total_time += now - self.call_time;
        self.apply_mem_delta(mem_kb - self.mem_at_call);
        self.event
    }

    /// Open the root's pseudo-invocation bracket.
    ///
    /// Only the root uses this: it bounds "whole frame" or "whole
    /// session" timing without a matching hook event.
    pub fn fake_begin_invoke(&mut self, now: f64, mem_kb: f32) {
        self.call_time = now;
        self.mem_at_call = mem_kb;
    }

    /// Accumulate the span since the last (fake) stamp and re-stamp.
    ///
    /// Safe to call every tick: each call measures only the incremental
    /// span since the previous one.
    pub fn fake_end_invoke(&mut self, now: f64, mem_kb: f32) {
        self.total_time += now - self.call_time;
        self.call_time = now;
        self.apply_mem_delta(mem_kb - self.mem_at_call);
        self.mem_at_call = mem_kb;
    }

    fn apply_mem_delta(&mut self, delta_kb: f32) {
        if delta_kb > 0.0 {
            self.allocated_kb += delta_kb;
        } else {
            self.freed_kb += -delta_kb;
        }
    }

    /// Fold another record for the same call site into this one.
    pub fn accumulate(&mut self, other: &TraceNode) {
        self.self_time += other.self_time;
        self.total_time += other.total_time;
        self.allocated_kb += other.allocated_kb;
        self.freed_kb += other.freed_kb;
        self.call_count += other.call_count;
    }

    /// Absorb another node's totals without adopting it as a child; the
    /// statistics root tracks session-wide sums this way.
    pub fn absorb_totals(&mut self, other: &TraceNode) {
        self.total_time += other.total_time;
        self.allocated_kb += other.allocated_kb;
        self.freed_kb += other.freed_kb;
    }

    /// Copy of this node's identity and counters without its children,
    /// used when a merge target has no entry for the id yet.
    pub fn stat_copy(&self, parent: Option<NodeId>) -> TraceNode {
        TraceNode {
            id: self.id.clone(),
            name: self.name.clone(),
            event: self.event,
            call_count: self.call_count,
            call_time: self.call_time,
            total_time: self.total_time,
            self_time: self.self_time,
            average: self.average,
            mem_at_call: self.mem_at_call,
            allocated_kb: self.allocated_kb,
            freed_kb: self.freed_kb,
            parent,
            children: Vec::new(),
            child_ids: HashMap::new(),
        }
    }

    /// Rebuild a node from its persisted record. Links and the child
    /// index are wired by the tree as children are appended.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_record(
        id: String,
        name: String,
        event: Option<HookEventKind>,
        call_count: u32,
        total_time: f64,
        self_time: f64,
        allocated_kb: f32,
        freed_kb: f32,
    ) -> Self {
        Self {
            id,
            name,
            event,
            call_count,
            call_time: 0.0,
            total_time,
            self_time,
            average: if call_count > 0 {
                total_time / f64::from(call_count)
            } else {
                0.0
            },
            mem_at_call: 0.0,
            allocated_kb,
            freed_kb,
            parent: None,
            children: Vec::new(),
            child_ids: HashMap::new(),
        }
    }

    /// Clear all fields for node reuse.
    pub fn reset(&mut self) {
        self.id.clear();
        self.name.clear();
        self.event = None;
        self.call_count = 0;
        self.call_time = 0.0;
        self.total_time = 0.0;
        self.self_time = 0.0;
        self.average = 0.0;
        self.mem_at_call = 0.0;
        self.allocated_kb = 0.0;
        self.freed_kb = 0.0;
        self.parent = None;
        self.children.clear();
        self.child_ids.clear();
    }
}
