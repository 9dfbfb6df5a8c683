//! Contracts between the profiler core and the host interpreter.
//!
//! The monitor never talks to a concrete interpreter. The host supplies
//! an implementation of [`ScriptRuntime`] (hook registration, heap
//! sampling, call-site resolution) and forwards raw debug-hook events as
//! [`HookEvent`] values. Timing comes from a [`Clock`] so tests can drive
//! it manually.

pub mod events;
pub mod runtime;

pub use events::{CoroutineId, EventMask, ExecContext, HookEvent, HookEventKind, SiteHandle};
pub use runtime::{Clock, ScriptRuntime, SiteInfo, SystemClock};
