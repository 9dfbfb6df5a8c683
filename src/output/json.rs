//! JSON summary export.
//!
//! A versioned, human-diffable digest of a recorded trace for external
//! tooling; the binary archive remains the lossless native format.

use crate::monitor::MonitorMode;
use crate::tree::{TraceTree, ROOT};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::ExportError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Top-level summary structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Schema version for compatibility checking
    pub version: String,

    /// Aggregation mode the trace was recorded under
    pub mode: String,

    /// Number of archived frames (0 outside per-frame mode)
    pub total_frames: usize,

    /// Hottest call sites, ranked by total time
    pub sites: Vec<SiteSummary>,

    /// Timestamp when the summary was generated
    pub generated_at: String,
}

/// One call site row in the summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub call_count: u32,
    pub total_ms: f64,
    pub self_ms: f64,
    pub average_ms: f64,
    pub allocated_kb: f32,
    pub freed_kb: f32,
}

/// Build a summary from a tree view.
///
/// Rows come from the view root's direct children, so pass a statistics
/// view when whole-program rows are wanted rather than entry points.
pub fn build_summary(
    tree: &TraceTree,
    mode: MonitorMode,
    total_frames: usize,
    top_n: usize,
) -> TraceSummary {
    let mut sites: Vec<SiteSummary> = tree
        .children_of(ROOT)
        .map(|node| SiteSummary {
            id: node.id.clone(),
            name: node.name.clone(),
            call_count: node.call_count,
            total_ms: node.total_time,
            self_ms: node.self_time,
            average_ms: node.average,
            allocated_kb: node.allocated_kb,
            freed_kb: node.freed_kb,
        })
        .collect();
    sites.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms));
    sites.truncate(top_n);

    TraceSummary {
        version: SCHEMA_VERSION.to_string(),
        mode: mode.to_string(),
        total_frames,
        sites,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Write a summary to a JSON file with pretty printing
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `summary` - Summary data to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `ExportError::WriteFailed` - I/O error during write
/// * `ExportError::SerializationFailed` - JSON serialization error
/// * `ExportError::InvalidPath` - Path cannot be created or is invalid
pub fn write_summary(
    summary: &TraceSummary,
    output_path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let output_path = output_path.as_ref();

    info!("Writing summary to: {}", output_path.display());
    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                ExportError::InvalidPath(format!("Cannot create directory {}: {e}", parent.display()))
            })?;
        }
    }

    let file = File::create(output_path).map_err(ExportError::WriteFailed)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, summary).map_err(ExportError::SerializationFailed)?;

    Ok(())
}

/// Read a summary back from a JSON file
///
/// **Public** - useful for validation, diffing, and testing
pub fn read_summary(input_path: impl AsRef<Path>) -> Result<TraceSummary, ExportError> {
    let input_path = input_path.as_ref();

    debug!("Reading summary from: {}", input_path.display());

    let file = File::open(input_path).map_err(ExportError::WriteFailed)?;
    let summary: TraceSummary =
        serde_json::from_reader(file).map_err(ExportError::SerializationFailed)?;

    debug!("Summary loaded: version {}, mode {}", summary.version, summary.mode);
    Ok(summary)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), ExportError> {
    if path.as_os_str().is_empty() {
        return Err(ExportError::InvalidPath("Path is empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(ExportError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}
