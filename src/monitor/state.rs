//! Lifecycle and mode types for the monitor.

use std::fmt;

/// How recorded events are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorMode {
    /// One archived tree per external tick
    #[default]
    PerFrame,
    /// A single ever-growing tree for the whole session
    Total,
    /// Like `Total`, but views fold every occurrence of a call site
    /// into one merged node
    Statistics,
}

impl MonitorMode {
    /// Numeric code used in serialized archives and console commands
    pub fn wire_code(self) -> i32 {
        match self {
            MonitorMode::PerFrame => 0,
            MonitorMode::Total => 1,
            MonitorMode::Statistics => 2,
        }
    }

    pub fn from_wire_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MonitorMode::PerFrame),
            1 => Some(MonitorMode::Total),
            2 => Some(MonitorMode::Statistics),
            _ => None,
        }
    }
}

impl fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MonitorMode::PerFrame => "PerFrame",
            MonitorMode::Total => "Total",
            MonitorMode::Statistics => "Statistics",
        };
        f.write_str(label)
    }
}

/// Operational state of the monitor.
///
/// One enum instead of combinable flags, so a paused-but-never-started
/// monitor (and friends) cannot be expressed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    /// No target attached, nothing recording
    #[default]
    Idle,
    /// `start` was issued before the target had a live interpreter;
    /// retried on every tick
    WaitingForStart,
    /// Hook attached, events recording
    Running,
    /// Hook detached, accumulated state preserved, resumable
    Paused,
}

/// Byte counters fed by the host's allocator interceptor.
///
/// Session-scoped on the monitor; not consumed by the tree engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocStats {
    pub allocated_bytes: u64,
    pub freed_bytes: u64,
}

impl AllocStats {
    pub fn record_alloc(&mut self, bytes: u64) {
        self.allocated_bytes += bytes;
    }

    pub fn record_free(&mut self, bytes: u64) {
        self.freed_bytes += bytes;
    }

    pub fn reset(&mut self) {
        *self = AllocStats::default();
    }
}
