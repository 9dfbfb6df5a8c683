//! Shared test fixtures: a scriptable fake runtime and a hand-driven
//! clock.

#![allow(dead_code)]

use script_trace_monitor::hook::{
    Clock, CoroutineId, EventMask, HookEvent, HookEventKind, ScriptRuntime, SiteHandle, SiteInfo,
};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Clock whose time only moves when the test says so.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// In-memory interpreter stand-in.
pub struct FakeRuntime {
    pub ready: bool,
    pub hooked: bool,
    pub heap_kb: f32,
    sites: HashMap<u64, SiteInfo>,
    failed: HashSet<u64>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            ready: true,
            hooked: false,
            heap_kb: 0.0,
            sites: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub fn not_ready() -> Self {
        let mut rt = Self::new();
        rt.ready = false;
        rt
    }

    /// Register a named site for a handle.
    pub fn with_site(mut self, handle: u64, name: &str) -> Self {
        self.sites.insert(
            handle,
            SiteInfo {
                source: "test.lua".to_string(),
                line_start: handle as i32,
                line_end: handle as i32 + 1,
                name: Some(name.to_string()),
            },
        );
        self
    }

    pub fn mark_failed(&mut self, co: u64) {
        self.failed.insert(co);
    }
}

impl ScriptRuntime for FakeRuntime {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn register_hook(&mut self, _mask: EventMask) {
        self.hooked = true;
    }

    fn deregister_hook(&mut self) {
        self.hooked = false;
    }

    fn heap_kb(&self) -> f32 {
        self.heap_kb
    }

    fn resolve_site(&self, site: SiteHandle) -> SiteInfo {
        self.sites.get(&site.0).cloned().unwrap_or_else(|| SiteInfo {
            source: "test.lua".to_string(),
            line_start: site.0 as i32,
            line_end: site.0 as i32 + 1,
            name: Some(format!("fn{}", site.0)),
        })
    }

    fn context_failed(&self, co: CoroutineId) -> bool {
        self.failed.contains(&co.0)
    }
}

pub fn call(site: u64) -> HookEvent {
    HookEvent::new(HookEventKind::Call, SiteHandle(site))
}

pub fn ret(site: u64) -> HookEvent {
    HookEvent::new(HookEventKind::Return, SiteHandle(site))
}

pub fn co_call(site: u64, co: u64) -> HookEvent {
    call(site).on_coroutine(CoroutineId(co))
}

pub fn co_ret(site: u64, co: u64) -> HookEvent {
    ret(site).on_coroutine(CoroutineId(co))
}
