//! The console control surface.
//!
//! One host-side command with positional arguments drives the whole
//! profiling lifecycle; parsing and dispatch live here.

pub mod control;

pub use control::{dispatch_control, parse_control, ControlAction, ControlCommand};
