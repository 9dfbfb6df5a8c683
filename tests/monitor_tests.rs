//! Monitor behavior: lifecycle, depth ceiling, pruning, coroutine
//! remapping, frame rotation, and views.

mod common;

use common::{call, co_call, co_ret, ret, FakeRuntime, ManualClock};
use pretty_assertions::assert_eq;
use script_trace_monitor::monitor::{MonitorMode, MonitorState, TraceMonitor};
use script_trace_monitor::tree::{SortMode, ROOT};

fn running_monitor(
    mode: MonitorMode,
    rt: &mut FakeRuntime,
) -> (TraceMonitor<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let mut monitor = TraceMonitor::with_clock(clock.clone());
    monitor.set_mode(mode);
    monitor.start(rt);
    (monitor, clock)
}

#[test]
fn start_registers_hook_and_runs() {
    let mut rt = FakeRuntime::new();
    let (monitor, _clock) = running_monitor(MonitorMode::Total, &mut rt);

    assert_eq!(monitor.state(), MonitorState::Running);
    assert!(rt.hooked);
}

#[test]
fn start_without_interpreter_waits_for_tick() {
    let mut rt = FakeRuntime::not_ready();
    let clock = ManualClock::new();
    let mut monitor = TraceMonitor::with_clock(clock.clone());

    monitor.start(&mut rt);
    assert_eq!(monitor.state(), MonitorState::WaitingForStart);
    assert!(!rt.hooked);

    monitor.on_tick(&mut rt, 0.016);
    assert_eq!(monitor.state(), MonitorState::WaitingForStart);

    rt.ready = true;
    monitor.on_tick(&mut rt, 0.016);
    assert_eq!(monitor.state(), MonitorState::Running);
    assert!(rt.hooked);
}

#[test]
fn lost_interpreter_stops_on_tick() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, _clock) = running_monitor(MonitorMode::Total, &mut rt);

    rt.ready = false;
    monitor.on_tick(&mut rt, 0.016);

    assert_eq!(monitor.state(), MonitorState::Idle);
    assert!(!rt.hooked);
}

#[test]
fn pause_keeps_state_and_resume_continues() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(2.0);
    monitor.on_event(&mut rt, ret(1));

    monitor.pause(&mut rt);
    assert_eq!(monitor.state(), MonitorState::Paused);
    assert!(!rt.hooked);

    // events while paused are dropped
    monitor.on_event(&mut rt, call(2));

    monitor.resume(&mut rt);
    assert_eq!(monitor.state(), MonitorState::Running);
    assert!(rt.hooked);

    let view = monitor.root(None).unwrap();
    assert_eq!(view.root().children.len(), 1);
    let fn1 = view.children_of(ROOT).next().unwrap();
    assert_eq!(fn1.name, "fn1");
    assert_eq!(fn1.total_time, 2.0);
}

#[test]
fn root_reports_no_data_before_recording() {
    let mut rt = FakeRuntime::new();
    let clock = ManualClock::new();
    let mut monitor: TraceMonitor<ManualClock> = TraceMonitor::with_clock(clock);

    assert!(monitor.root(None).is_none());

    monitor.set_mode(MonitorMode::Total);
    monitor.start(&mut rt);
    assert!(monitor.root(None).is_none());
}

#[test]
fn depth_ceiling_truncates_but_unwinds_correctly() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);
    monitor.set_max_depth(2);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    monitor.on_event(&mut rt, call(2));
    monitor.on_event(&mut rt, call(3)); // beyond the ceiling
    clock.set(1.0);
    monitor.on_event(&mut rt, ret(3));
    clock.set(2.0);
    monitor.on_event(&mut rt, ret(2));
    clock.set(3.0);
    monitor.on_event(&mut rt, ret(1));

    // a fresh call is recorded again after the unwind
    clock.set(3.0);
    monitor.on_event(&mut rt, call(4));
    clock.set(4.0);
    monitor.on_event(&mut rt, ret(4));

    let view = monitor.root(None).unwrap();
    assert_eq!(view.cursor(), ROOT);
    let names: Vec<&str> = view.children_of(ROOT).map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["fn1", "fn4"]);
    let fn1_id = view.root().children[0];
    let fn2 = view.children_of(fn1_id).next().unwrap();
    assert_eq!(fn2.name, "fn2");
    assert!(fn2.children.is_empty());
}

#[test]
fn pruned_subtree_is_elided_but_ancestors_keep_time() {
    let mut rt = FakeRuntime::new().with_site(2, "noisy");
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);
    monitor.mark_pruned("test.lua:2~3 noisy");

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(1.0);
    monitor.on_event(&mut rt, call(2)); // pruned from here down
    monitor.on_event(&mut rt, call(3));
    clock.set(4.0);
    monitor.on_event(&mut rt, ret(3));
    monitor.on_event(&mut rt, ret(2));
    clock.set(5.0);
    monitor.on_event(&mut rt, ret(1));

    // pruning cleared: later calls record again
    monitor.on_event(&mut rt, call(4));
    clock.set(6.0);
    monitor.on_event(&mut rt, ret(4));

    let view = monitor.root(None).unwrap();
    let fn1_id = view.root().children[0];
    let fn1 = view.node(fn1_id);
    assert_eq!(fn1.name, "fn1");
    // full span including the pruned subtree
    assert_eq!(fn1.total_time, 5.0);
    assert!(fn1.children.is_empty());

    let names: Vec<&str> = view.children_of(ROOT).map(|n| n.name.as_str()).collect();
    assert!(names.contains(&"fn4"));
}

#[test]
fn per_frame_rotation_archives_and_discards_empty_frames() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::PerFrame, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(5.0);
    monitor.on_event(&mut rt, ret(1));
    monitor.on_tick(&mut rt, 0.016);
    assert_eq!(monitor.total_frames(), 1);

    // a frame with no calls is discarded, not archived
    clock.set(10.0);
    monitor.on_tick(&mut rt, 0.016);
    assert_eq!(monitor.total_frames(), 1);

    clock.set(11.0);
    monitor.on_event(&mut rt, call(2));
    clock.set(12.0);
    monitor.on_event(&mut rt, ret(2));
    monitor.on_tick(&mut rt, 0.016);
    assert_eq!(monitor.total_frames(), 2);

    // latest frame is served by default
    let latest = monitor.root(None).unwrap();
    assert_eq!(latest.children_of(ROOT).next().unwrap().name, "fn2");
}

#[test]
fn frame_selection_pins_and_follows() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::PerFrame, &mut rt);

    for (frame, site) in [(0u64, 1u64), (1, 2), (2, 3)] {
        clock.set(frame as f64 * 10.0);
        monitor.on_event(&mut rt, call(site));
        clock.set(frame as f64 * 10.0 + 1.0);
        monitor.on_event(&mut rt, ret(site));
        monitor.on_tick(&mut rt, 0.016);
    }
    assert_eq!(monitor.total_frames(), 3);

    monitor.set_cur_frame_index(0);
    assert_eq!(
        monitor.root(None).unwrap().children_of(ROOT).next().unwrap().name,
        "fn1"
    );

    // explicit index wins over the selection
    assert_eq!(
        monitor.root(Some(1)).unwrap().children_of(ROOT).next().unwrap().name,
        "fn2"
    );

    // out-of-range selection means follow the latest
    monitor.set_cur_frame_index(99);
    assert_eq!(
        monitor.root(None).unwrap().children_of(ROOT).next().unwrap().name,
        "fn3"
    );
}

#[test]
fn statistics_view_merges_recursive_calls() {
    let mut rt = FakeRuntime::new().with_site(7, "fib");
    let (mut monitor, clock) = running_monitor(MonitorMode::Statistics, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(7));
    clock.set(1.0);
    monitor.on_event(&mut rt, call(7)); // recursive
    clock.set(2.0);
    monitor.on_event(&mut rt, ret(7));
    clock.set(4.0);
    monitor.on_event(&mut rt, ret(7));

    let view = monitor.root(None).unwrap();
    assert_eq!(view.root().children.len(), 1);
    let fib = view.children_of(ROOT).next().unwrap();
    assert_eq!(fib.call_count, 2);
    assert_eq!(fib.total_time, 5.0);
}

#[test]
fn coroutine_switch_points_flip_event_polarity() {
    let mut rt = FakeRuntime::new()
        .with_site(10, "body")
        .with_site(11, "yield");
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1)); // primary frame
    clock.set(1.0);
    monitor.on_event(&mut rt, co_call(10, 1)); // coroutine body starts
    clock.set(3.0);
    monitor.on_event(&mut rt, co_call(11, 1)); // yield: suspend, acts as return
    clock.set(4.0);
    monitor.on_event(&mut rt, co_ret(11, 1)); // yield returns: resume, acts as call
    clock.set(6.0);
    monitor.on_event(&mut rt, co_ret(10, 1)); // body finishes
    clock.set(7.0);
    monitor.on_event(&mut rt, ret(1));

    let view = monitor.root(None).unwrap();
    assert_eq!(view.cursor(), ROOT);

    let fn1_id = view.root().children[0];
    let names: Vec<&str> = view.children_of(fn1_id).map(|n| n.name.as_str()).collect();
    // suspended span is closed at the yield; the resumed span is the
    // re-entered node keyed by the switch point's site
    assert_eq!(names, ["body", "yield"]);

    let body = view.children_of(fn1_id).next().unwrap();
    assert_eq!(body.total_time, 2.0);
}

#[test]
fn failed_coroutine_unwinds_one_level() {
    let mut rt = FakeRuntime::new().with_site(10, "body");
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(1.0);
    monitor.on_event(&mut rt, co_call(10, 5)); // coroutine body starts
    rt.mark_failed(5);
    clock.set(3.0);
    monitor.on_event(&mut rt, ret(1)); // primary event notices the death

    let view = monitor.root(None).unwrap();
    assert_eq!(view.cursor(), ROOT);
    let fn1_id = view.root().children[0];
    let body = view.children_of(fn1_id).next().unwrap();
    // closed by the synthesized unwind, not left dangling
    assert_eq!(body.total_time, 2.0);
}

#[test]
fn clear_resets_everything() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(1.0);
    monitor.on_event(&mut rt, ret(1));
    monitor.on_alloc(4096);
    monitor.on_free(1024);

    monitor.clear(&mut rt);

    assert_eq!(monitor.state(), MonitorState::Idle);
    assert!(!rt.hooked);
    assert!(monitor.root(None).is_none());
    assert_eq!(monitor.total_frames(), 0);
    assert_eq!(monitor.alloc_stats().allocated_bytes, 0);
    assert_eq!(monitor.alloc_stats().freed_bytes, 0);
}

#[test]
fn alloc_tally_accumulates_per_session() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, _clock) = running_monitor(MonitorMode::Total, &mut rt);

    monitor.on_alloc(4096);
    monitor.on_alloc(1000);
    monitor.on_free(96);

    let stats = monitor.alloc_stats();
    assert_eq!(stats.allocated_bytes, 5096);
    assert_eq!(stats.freed_bytes, 96);
}

#[test]
fn sort_mode_orders_view_children() {
    let mut rt = FakeRuntime::new();
    let (mut monitor, clock) = running_monitor(MonitorMode::Total, &mut rt);
    monitor.set_sort_mode(SortMode::TotalTime);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(1.0);
    monitor.on_event(&mut rt, ret(1));
    monitor.on_event(&mut rt, call(2));
    clock.set(9.0);
    monitor.on_event(&mut rt, ret(2));

    let view = monitor.root(None).unwrap();
    let names: Vec<&str> = view.children_of(ROOT).map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["fn2", "fn1"]);
}
