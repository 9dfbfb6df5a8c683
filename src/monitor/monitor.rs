//! The monitor: turns raw hook events into trace trees and owns the
//! profiling lifecycle.
//!
//! Everything here runs on the interpreter's own thread. Hook handling
//! is bounded-time and never propagates errors; a malformed event
//! stream degrades the trace, not the monitored program.
//!
//! Coroutine handling tracks a single remapped boundary at a time (one
//! suspended secondary context). Nested suspensions are a known
//! limitation: the slot holds only the innermost context.

use super::state::{AllocStats, MonitorMode, MonitorState};
use crate::hook::{
    Clock, CoroutineId, EventMask, ExecContext, HookEvent, HookEventKind, ScriptRuntime,
    SiteHandle, SiteInfo, SystemClock,
};
use crate::output::binary::{default_trace_path, save_archive, TraceArchive};
use crate::tree::{SortMode, TraceTree, ROOT};
use crate::utils::config::DEFAULT_MAX_DEPTH;
use crate::utils::error::SerialError;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Memoized resolution of one raw call-site handle.
struct CallSite {
    id: String,
    info: SiteInfo,
}

/// The event-driven profiling controller.
///
/// Generic over the clock so tests can drive timestamps by hand; hosts
/// use the default [`SystemClock`].
pub struct TraceMonitor<C: Clock = SystemClock> {
    clock: C,
    mask: EventMask,
    mode: MonitorMode,
    sort: SortMode,
    state: MonitorState,

    /// Stack depth as observed through the hook stream; counts events
    /// beyond `max_depth` too, so unwinding stays correct
    depth: u32,
    /// Depth at which the currently open pruned subtree began; 0 = not
    /// pruning
    prune_depth: u32,
    max_depth: u32,
    pruned_sites: HashSet<String>,

    sites: HashMap<SiteHandle, CallSite>,
    running_coroutine: Option<CoroutineId>,

    current: TraceTree,
    frames: Vec<TraceTree>,
    /// Selected frame; `frames.len()` means "follow the latest"
    cur_frame: usize,
    stats_view: Option<TraceTree>,

    alloc: AllocStats,
}

impl TraceMonitor<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl Default for TraceMonitor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TraceMonitor<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            mask: EventMask::default(),
            mode: MonitorMode::default(),
            sort: SortMode::default(),
            state: MonitorState::Idle,
            depth: 0,
            prune_depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            pruned_sites: HashSet::new(),
            sites: HashMap::new(),
            running_coroutine: None,
            current: TraceTree::new(),
            frames: Vec::new(),
            cur_frame: 0,
            stats_view: None,
            alloc: AllocStats::default(),
        }
    }

    // ---- configuration ----------------------------------------------

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MonitorMode) {
        self.mode = mode;
    }

    pub fn set_sort_mode(&mut self, sort: SortMode) {
        self.sort = sort;
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Zero is rejected: a ceiling of zero would record nothing at all.
    pub fn set_max_depth(&mut self, depth: u32) {
        if depth == 0 {
            warn!("ignoring max depth of 0");
            return;
        }
        self.max_depth = depth;
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    // ---- lifecycle --------------------------------------------------

    /// Begin profiling against a target. If the target has no live
    /// interpreter yet, the monitor waits and retries on every tick.
    pub fn start<R: ScriptRuntime>(&mut self, rt: &mut R) {
        match self.state {
            MonitorState::Running => {}
            MonitorState::Paused => self.resume(rt),
            MonitorState::Idle | MonitorState::WaitingForStart => {
                if rt.is_ready() {
                    self.attach(rt);
                } else {
                    info!("profile start deferred; waiting for interpreter");
                    self.state = MonitorState::WaitingForStart;
                }
            }
        }
    }

    /// Detach and stop recording. Accumulated trees stay readable until
    /// [`clear`](Self::clear).
    pub fn stop<R: ScriptRuntime>(&mut self, rt: &mut R) {
        if self.state == MonitorState::Running {
            rt.deregister_hook();
        }
        if self.state != MonitorState::Idle {
            info!("profile stop");
        }
        self.state = MonitorState::Idle;
    }

    /// Detach the hook but keep all state, ready to resume.
    pub fn pause<R: ScriptRuntime>(&mut self, rt: &mut R) {
        if self.state == MonitorState::Running {
            rt.deregister_hook();
            self.state = MonitorState::Paused;
            info!("profile pause");
        }
    }

    pub fn resume<R: ScriptRuntime>(&mut self, rt: &mut R) {
        if self.state == MonitorState::Paused {
            rt.register_hook(self.mask);
            self.state = MonitorState::Running;
            info!("profile resume");
        }
    }

    /// Hard reset: stop and drop every accumulated tree, counter, and
    /// cache.
    pub fn clear<R: ScriptRuntime>(&mut self, rt: &mut R) {
        self.stop(rt);
        self.depth = 0;
        self.prune_depth = 0;
        self.pruned_sites.clear();
        self.sites.clear();
        self.running_coroutine = None;
        self.current = TraceTree::new();
        self.frames.clear();
        self.cur_frame = 0;
        self.stats_view = None;
        self.alloc.reset();
    }

    fn attach<R: ScriptRuntime>(&mut self, rt: &mut R) {
        rt.register_hook(self.mask);
        let now = self.clock.now_ms();
        let mem = rt.heap_kb();
        self.current.init(now, mem);
        self.depth = 0;
        self.prune_depth = 0;
        self.running_coroutine = None;
        self.alloc.reset();
        self.state = MonitorState::Running;
        info!("profile start");
    }

    // ---- event handling ---------------------------------------------

    /// Entry point for the host's hook callback.
    pub fn on_event<R: ScriptRuntime>(&mut self, rt: &mut R, event: HookEvent) {
        if self.state != MonitorState::Running {
            return;
        }
        match self.remap_context(rt, &event) {
            HookEventKind::Call => self.handle_call(rt, event.site),
            HookEventKind::Return => self.handle_return(rt),
            // line/count/tail-call notifications carry no stack motion
            _ => {}
        }
    }

    /// Scheduler tick: closes the root bracket, rotates per-frame
    /// snapshots, and finishes deferred starts.
    pub fn on_tick<R: ScriptRuntime>(&mut self, rt: &mut R, _delta_time: f32) {
        match self.state {
            MonitorState::Running => {
                if !rt.is_ready() {
                    warn!("interpreter went away; stopping profile");
                    self.stop(rt);
                    return;
                }
                let now = self.clock.now_ms();
                let mem = rt.heap_kb();
                self.current.fake_end_invoke(now, mem);
                if self.mode == MonitorMode::PerFrame {
                    self.rotate_frame(now, mem);
                }
            }
            MonitorState::WaitingForStart => {
                if rt.is_ready() {
                    self.attach(rt);
                }
            }
            MonitorState::Idle | MonitorState::Paused => {}
        }
    }

    /// Elide the subtree under a call site from the next time it is
    /// entered. Ancestors keep accounting the pruned duration.
    pub fn mark_pruned(&mut self, site_id: &str) {
        self.pruned_sites.insert(site_id.to_string());
    }

    /// Events observed on a secondary stack invert polarity at a
    /// context-switch boundary: the suspending call is really a return
    /// and the resuming return is really a call. One boundary is
    /// tracked at a time.
    fn remap_context<R: ScriptRuntime>(&mut self, rt: &mut R, event: &HookEvent) -> HookEventKind {
        match event.context {
            ExecContext::Primary => {
                if let Some(co) = self.running_coroutine.take() {
                    if rt.context_failed(co) {
                        // the coroutine died with a frame still open
                        warn!("secondary context failed; unwinding one level");
                        self.handle_return(rt);
                    }
                }
                event.kind
            }
            ExecContext::Coroutine(co) => {
                self.running_coroutine = Some(co);
                let site = Self::resolve_memoized(&mut self.sites, rt, event.site);
                if rt.is_switch_point(&site.info) {
                    match event.kind {
                        HookEventKind::Call => HookEventKind::Return,
                        HookEventKind::Return => HookEventKind::Call,
                        other => other,
                    }
                } else {
                    event.kind
                }
            }
        }
    }

    fn handle_call<R: ScriptRuntime>(&mut self, rt: &mut R, site: SiteHandle) {
        if self.depth < self.max_depth {
            let entry = Self::resolve_memoized(&mut self.sites, rt, site);
            if self.prune_depth == 0 && self.pruned_sites.contains(&entry.id) {
                self.prune_depth = self.depth + 1;
                debug!("pruning subtree under {}", entry.id);
            }
            if self.prune_depth == 0 {
                let now = self.clock.now_ms();
                let mem = rt.heap_kb();
                self.current.on_call(
                    &entry.id,
                    entry.info.display_name(),
                    HookEventKind::Call,
                    now,
                    mem,
                );
            }
        }
        self.depth += 1;
    }

    fn handle_return<R: ScriptRuntime>(&mut self, rt: &mut R) {
        if self.depth <= self.max_depth && self.prune_depth == 0 {
            let now = self.clock.now_ms();
            let mem = rt.heap_kb();
            self.current.on_return(now, mem);
        }
        self.depth = self.depth.saturating_sub(1);
        if self.depth < self.prune_depth {
            self.prune_depth = 0;
        }
    }

    fn resolve_memoized<'a, R: ScriptRuntime>(
        cache: &'a mut HashMap<SiteHandle, CallSite>,
        rt: &R,
        site: SiteHandle,
    ) -> &'a CallSite {
        cache.entry(site).or_insert_with(|| {
            let info = rt.resolve_site(site);
            CallSite {
                id: info.id_string(),
                info,
            }
        })
    }

    // ---- frame rotation and views -----------------------------------

    fn rotate_frame(&mut self, now: f64, mem_kb: f32) {
        if self.current.root().children.is_empty() {
            // empty frame: restart the bracket instead of archiving it
            self.current.init(now, mem_kb);
            return;
        }
        self.current.count_self_time(self.sort);
        let mut fresh = TraceTree::new();
        fresh.init(now, mem_kb);
        let done = std::mem::replace(&mut self.current, fresh);
        let follow = self.cur_frame >= self.frames.len();
        self.frames.push(done);
        if follow {
            self.cur_frame = self.frames.len();
        }
    }

    /// The tree a consumer should look at right now, or `None` while no
    /// data exists.
    ///
    /// PerFrame serves an archived frame (explicit index, else the
    /// selected one); Total serves the live tree after a self-time
    /// pass; Statistics serves the merged cross-call view.
    pub fn root(&mut self, frame: Option<usize>) -> Option<&TraceTree> {
        match self.mode {
            MonitorMode::PerFrame => {
                if self.frames.is_empty() {
                    return None;
                }
                let last = self.frames.len() - 1;
                let selected = if self.cur_frame < self.frames.len() {
                    self.cur_frame
                } else {
                    last
                };
                let index = frame.unwrap_or(selected).min(last);
                self.frames.get(index)
            }
            MonitorMode::Total => {
                if self.current.node_count() <= 1 {
                    return None;
                }
                self.current.count_self_time(self.sort);
                Some(&self.current)
            }
            MonitorMode::Statistics => {
                if self.current.node_count() <= 1 {
                    return None;
                }
                self.current.count_self_time(self.sort);
                let mut stats = self.current.statisticize();
                stats.sort_children_of(ROOT, self.sort);
                self.stats_view = Some(stats);
                self.stats_view.as_ref()
            }
        }
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn cur_frame_index(&self) -> usize {
        self.cur_frame
    }

    /// Select a frame for [`root`](Self::root); out-of-range selections
    /// mean "follow the latest frame".
    pub fn set_cur_frame_index(&mut self, index: usize) {
        self.cur_frame = if index < self.frames.len() {
            index
        } else {
            self.frames.len()
        };
    }

    // ---- allocator interceptor --------------------------------------

    pub fn on_alloc(&mut self, bytes: u64) {
        self.alloc.record_alloc(bytes);
    }

    pub fn on_free(&mut self, bytes: u64) {
        self.alloc.record_free(bytes);
    }

    pub fn alloc_stats(&self) -> AllocStats {
        self.alloc
    }

    // ---- persistence ------------------------------------------------

    /// Snapshot the recorded trees for serialization. PerFrame archives
    /// the frame history; the other modes archive the live tree after a
    /// self-time pass.
    pub fn snapshot(&mut self) -> TraceArchive {
        let trees = match self.mode {
            MonitorMode::PerFrame => self.frames.clone(),
            MonitorMode::Total | MonitorMode::Statistics => {
                self.current.count_self_time(self.sort);
                vec![self.current.clone()]
            }
        };
        TraceArchive {
            mode: self.mode,
            trees,
        }
    }

    /// Serialize to `path`, or to the default timestamped path for
    /// `app_name` when no path is given. Returns the path written.
    pub fn save(&mut self, path: Option<&Path>, app_name: &str) -> Result<PathBuf, SerialError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_trace_path(app_name));
        let archive = self.snapshot();
        save_archive(&archive, &path)?;
        Ok(path)
    }

    /// Install a fully-parsed archive for offline inspection. Replaces
    /// the mode and trees; nothing is installed on a failed read, since
    /// the caller only gets an archive once parsing succeeded.
    pub fn load_archive(&mut self, archive: TraceArchive) {
        self.mode = archive.mode;
        match archive.mode {
            MonitorMode::PerFrame => {
                self.frames = archive.trees;
                self.cur_frame = self.frames.len();
            }
            MonitorMode::Total | MonitorMode::Statistics => {
                self.current = archive.trees.into_iter().next().unwrap_or_default();
            }
        }
    }
}
