//! Raw debug-hook event model.

/// Kind of debug-hook notification, as reported by the interpreter.
///
/// The wire codes match the numbering hosts conventionally use for their
/// hook events and are stable across archive versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEventKind {
    /// Execution entered a call site
    Call,
    /// Execution left a call site
    Return,
    /// Execution moved to a new source line
    Line,
    /// Instruction-count checkpoint
    Count,
    /// A call that reuses the caller's stack frame
    TailCall,
}

impl HookEventKind {
    /// Numeric code used in serialized archives
    pub fn wire_code(self) -> i32 {
        match self {
            HookEventKind::Call => 0,
            HookEventKind::Return => 1,
            HookEventKind::Line => 2,
            HookEventKind::Count => 3,
            HookEventKind::TailCall => 4,
        }
    }

    /// Inverse of [`wire_code`](Self::wire_code); `None` for unknown codes
    pub fn from_wire_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(HookEventKind::Call),
            1 => Some(HookEventKind::Return),
            2 => Some(HookEventKind::Line),
            3 => Some(HookEventKind::Count),
            4 => Some(HookEventKind::TailCall),
            _ => None,
        }
    }
}

/// Which hook notifications the host should deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(u8);

impl EventMask {
    pub const CALL: EventMask = EventMask(1 << 0);
    pub const RETURN: EventMask = EventMask(1 << 1);
    pub const LINE: EventMask = EventMask(1 << 2);
    pub const COUNT: EventMask = EventMask(1 << 3);

    pub const fn empty() -> Self {
        EventMask(0)
    }

    pub const fn union(self, other: EventMask) -> Self {
        EventMask(self.0 | other.0)
    }

    pub fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for EventMask {
    /// Call and return only: the tree engine needs nothing else.
    fn default() -> Self {
        EventMask::CALL.union(EventMask::RETURN)
    }
}

impl std::ops::BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        self.union(rhs)
    }
}

/// Opaque handle identifying a function value inside the interpreter.
///
/// Stable for the lifetime of the monitored session; resolving it to a
/// readable call site is expensive, so the monitor memoizes per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiteHandle(pub u64);

/// Opaque handle identifying a secondary execution context (coroutine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroutineId(pub u64);

/// Which logical call stack an event was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecContext {
    /// The interpreter's main thread of execution
    Primary,
    /// A resumable secondary stack
    Coroutine(CoroutineId),
}

/// One raw notification from the host's debug hook.
#[derive(Debug, Clone, Copy)]
pub struct HookEvent {
    pub kind: HookEventKind,
    pub site: SiteHandle,
    pub context: ExecContext,
}

impl HookEvent {
    pub fn new(kind: HookEventKind, site: SiteHandle) -> Self {
        Self {
            kind,
            site,
            context: ExecContext::Primary,
        }
    }

    pub fn on_coroutine(mut self, co: CoroutineId) -> Self {
        self.context = ExecContext::Coroutine(co);
        self
    }
}
