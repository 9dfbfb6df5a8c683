//! Flamegraph generation using the inferno library.
//!
//! This module converts collapsed stacks into interactive SVG
//! flamegraphs. Frame widths come from self time, so the picture shows
//! where the interpreter actually spent its milliseconds.

pub mod generator;

pub use generator::{generate_flamegraph, write_svg, FlamegraphConfig};
