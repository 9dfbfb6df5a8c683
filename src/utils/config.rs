//! Configuration and constants shared across the crate.

/// Current JSON summary schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Display name used when the host cannot resolve a function name
pub const ANONYMOUS_NAME: &str = "anonymous";

/// Id and display name of the pseudo call site at the top of every tree
pub const ROOT_NODE_ID: &str = "Root";

/// Default call-stack depth ceiling for recording
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// File extension for serialized trace archives
pub const TRACE_FILE_SUFFIX: &str = ".strace";

/// Timestamp layout in default archive file names
pub const TRACE_FILE_STAMP: &str = "%Y%m%d_%H%M%S";
