//! Build collapsed stack format from a recorded trace tree.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! The weight is a node's self time in microseconds, so the rendered
//! frame widths reflect where time was actually spent rather than
//! double-counting parents. Run a self-time pass on the tree first.

use crate::tree::{NodeId, TraceTree};
use log::debug;
use std::collections::HashMap;

/// A single collapsed stack entry
#[derive(Debug, Clone)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated display names
    pub stack: String,

    /// Self time of the deepest frame, in microseconds
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }
}

/// Walk a tree into collapsed stacks, one entry per unique path with a
/// nonzero self time, sorted by weight descending.
pub fn build_collapsed_stacks(tree: &TraceTree) -> Vec<CollapsedStack> {
    let mut stack_map: HashMap<String, u64> = HashMap::new();

    for &child in &tree.root().children {
        walk(tree, child, "", &mut stack_map);
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();
    stacks.sort_by(|a, b| b.weight.cmp(&a.weight));

    debug!("Built {} unique collapsed stacks", stacks.len());
    stacks
}

fn walk(tree: &TraceTree, id: NodeId, prefix: &str, stack_map: &mut HashMap<String, u64>) {
    let node = tree.node(id);
    let stack = if prefix.is_empty() {
        node.name.clone()
    } else {
        format!("{};{}", prefix, node.name)
    };

    let weight = (node.self_time.max(0.0) * 1000.0).round() as u64;
    if weight > 0 {
        *stack_map.entry(stack.clone()).or_insert(0) += weight;
    }

    for &child in &node.children {
        walk(tree, child, &stack, stack_map);
    }
}
