//! The event-driven controller sitting between the host's debug hook
//! and the trace trees: depth accounting, pruning, coroutine remapping,
//! per-frame rotation, and the profiling lifecycle.

pub mod monitor;
pub mod state;

pub use monitor::TraceMonitor;
pub use state::{AllocStats, MonitorMode, MonitorState};
