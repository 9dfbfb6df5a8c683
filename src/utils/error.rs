//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and
//! the command layer. Anomalies on the hook hot path are never surfaced
//! as errors; they are logged and swallowed so the monitored program
//! keeps running.

use thiserror::Error;

/// Errors that can occur reading or writing binary trace archives
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt trace data: {0}")]
    Corrupt(String),

    #[error("Unknown monitor mode: {0}")]
    UnknownMode(i32),
}

/// Errors that can occur during JSON summary output
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Failed to generate flamegraph: {0}")]
    GenerationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from the console control surface
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid {what} argument: {value}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("No profiling sessions registered")]
    NoSessions,
}
