//! From recorded events to a rendered flamegraph.

mod common;

use common::{call, ret, FakeRuntime, ManualClock};
use script_trace_monitor::flamegraph::{generate_flamegraph, FlamegraphConfig};
use script_trace_monitor::monitor::{MonitorMode, TraceMonitor};
use script_trace_monitor::output::build_collapsed_stacks;
use script_trace_monitor::utils::error::FlamegraphError;

#[test]
fn recorded_trace_renders_to_svg() {
    let clock = ManualClock::new();
    let mut rt = FakeRuntime::new().with_site(1, "update").with_site(2, "physics");
    let mut monitor = TraceMonitor::with_clock(clock.clone());
    monitor.set_mode(MonitorMode::Total);
    monitor.start(&mut rt);

    clock.set(0.0);
    monitor.on_event(&mut rt, call(1));
    clock.set(2.0);
    monitor.on_event(&mut rt, call(2));
    clock.set(7.0);
    monitor.on_event(&mut rt, ret(2));
    clock.set(8.0);
    monitor.on_event(&mut rt, ret(1));

    let view = monitor.root(None).unwrap();
    let stacks = build_collapsed_stacks(view);
    assert_eq!(stacks.len(), 2);
    assert_eq!(stacks[0].stack, "update;physics");
    assert_eq!(stacks[0].weight, 5000);
    assert_eq!(stacks[1].stack, "update");
    assert_eq!(stacks[1].weight, 3000);

    let config = FlamegraphConfig::new().with_title("tick profile");
    let svg = generate_flamegraph(&stacks, Some(&config)).unwrap();

    assert!(svg.contains("tick profile"));
    assert!(svg.contains("update"));
    assert!(svg.contains("physics"));
}

#[test]
fn empty_trace_cannot_render() {
    let result = generate_flamegraph(&[], None);
    assert!(matches!(result, Err(FlamegraphError::EmptyStacks)));
}
