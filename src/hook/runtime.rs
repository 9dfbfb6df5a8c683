//! Host-side collaborator traits: hook registration, call-site
//! resolution, heap sampling, and the clock.

use super::events::{CoroutineId, EventMask, SiteHandle};
use crate::utils::config::ANONYMOUS_NAME;
use std::time::Instant;

/// Resolved description of a call site.
///
/// Produced by the host's debug-info query for a raw [`SiteHandle`].
#[derive(Debug, Clone)]
pub struct SiteInfo {
    /// Source file or chunk the function was defined in
    pub source: String,
    /// First line of the function definition
    pub line_start: i32,
    /// Last line of the function definition
    pub line_end: i32,
    /// Function name, if the host could resolve one
    pub name: Option<String>,
}

impl SiteInfo {
    /// Stable call-site id: `"<source>:<start>~<end> <name>"`.
    ///
    /// Identical for every invocation of the same function, so repeated
    /// and recursive calls merge into one tree node per parent.
    pub fn id_string(&self) -> String {
        format!(
            "{}:{}~{} {}",
            self.source,
            self.line_start,
            self.line_end,
            self.display_name()
        )
    }

    /// Name to show in views; falls back to the anonymous sentinel.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }
}

/// The interpreter integration the monitor drives.
///
/// One value of this trait stands for one profiling target (a session
/// holding an interpreter instance). All methods must be non-blocking;
/// they run on the interpreter's own thread, inside the hook.
pub trait ScriptRuntime {
    /// Does this session currently have a live interpreter attached?
    fn is_ready(&self) -> bool;

    /// Attach the debug hook for the given event mask.
    fn register_hook(&mut self, mask: EventMask);

    /// Detach the debug hook.
    fn deregister_hook(&mut self);

    /// Current interpreter heap size in kilobytes.
    fn heap_kb(&self) -> f32;

    /// Resolve a raw call-site handle to its debug info.
    ///
    /// Assumed expensive; the monitor memoizes results per handle.
    fn resolve_site(&self, site: SiteHandle) -> SiteInfo;

    /// Is this call site a context-switch boundary (a suspend point)?
    ///
    /// A call to such a site on a secondary stack suspends it, and the
    /// matching return resumes it, so the event polarity is inverted
    /// there. The default recognizes the conventional `yield` name;
    /// hosts with other conventions override this.
    fn is_switch_point(&self, info: &SiteInfo) -> bool {
        info.name.as_deref() == Some("yield")
    }

    /// Did this secondary context terminate with an error?
    ///
    /// A poisoned coroutine never delivers return events for its open
    /// frames; the monitor unwinds one level on its behalf.
    fn context_failed(&self, _co: CoroutineId) -> bool {
        false
    }
}

/// Monotonic millisecond-resolution time source.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}
