//! The trace-tree engine: call-site nodes and the tree-cursor state
//! machine that turns a flat call/return event stream into a call tree.

pub mod node;
pub mod tree;

pub use node::{NodeId, TraceNode};
pub use tree::{SortMode, TraceTree, ROOT};
