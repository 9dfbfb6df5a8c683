//! Output writers for recorded traces.
//!
//! This module handles persisting and exporting trace data:
//! - Binary trace archives (the native save format)
//! - Collapsed stacks for flamegraph generation
//! - JSON summaries for external tooling

pub mod binary;
pub mod collapse;
pub mod json;

pub use binary::{
    default_trace_path, load_archive, read_archive, save_archive, write_archive, TraceArchive,
};
pub use collapse::{build_collapsed_stacks, CollapsedStack};
pub use json::{build_summary, read_summary, write_summary, SiteSummary, TraceSummary};
