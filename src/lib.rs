//! Script Trace Monitor
//!
//! Hook-driven call-stack profiling for embedded scripting runtimes.
//!
//! The host interpreter reports call/return events through its debug-hook
//! facility; this crate turns that flat event stream into a call tree with
//! per-site timing and memory accounting, keeps per-frame history or
//! cumulative statistics, and persists traces to a compact binary archive.
//!
//! This crate provides the core implementation for the `script-trace`
//! CLI tool, which inspects saved archives and renders flamegraphs.

pub mod commands;
pub mod flamegraph;
pub mod hook;
pub mod monitor;
pub mod output;
pub mod tree;
pub mod utils;
