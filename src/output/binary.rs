//! Binary trace archive reader/writer.
//!
//! Host-independent layout, all integers and floats little-endian:
//!
//! ```text
//! int32 mode                      // 0=PerFrame, 1=Total, 2=Statistics
//! if mode == PerFrame:
//!   int32 treeCount, then treeCount trees
//! else:
//!   one tree
//! tree := depth-first pre-order node dump:
//!   string id, string name        // string = int32 byte length + UTF-8
//!   int32 eventKind               // -1 for the root
//!   int32 callCount
//!   float64 totalTime, float64 selfTime
//!   float32 allocatedKb, float32 freedKb
//!   int32 childCount, then the children recursively
//! ```
//!
//! The child index, parent links, and cursor are runtime-only and are
//! rebuilt on read. A failed read surfaces an error and installs
//! nothing.

use crate::hook::HookEventKind;
use crate::monitor::MonitorMode;
use crate::tree::{NodeId, TraceNode, TraceTree, ROOT};
use crate::utils::config::{TRACE_FILE_STAMP, TRACE_FILE_SUFFIX};
use crate::utils::error::SerialError;
use chrono::Local;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Upper bound on a persisted string, as a corruption tripwire
const MAX_STRING_BYTES: i32 = 1 << 20;

/// Upper bound on one node's child count, same purpose
const MAX_CHILDREN: i32 = 1 << 20;

/// A set of serialized trees plus the mode they were recorded under.
#[derive(Debug, Clone)]
pub struct TraceArchive {
    pub mode: MonitorMode,
    pub trees: Vec<TraceTree>,
}

/// Serialize an archive to a writer.
pub fn write_archive<W: Write>(w: &mut W, archive: &TraceArchive) -> Result<(), SerialError> {
    write_i32(w, archive.mode.wire_code())?;
    match archive.mode {
        MonitorMode::PerFrame => {
            write_i32(w, archive.trees.len() as i32)?;
            for tree in &archive.trees {
                write_tree(w, tree)?;
            }
        }
        MonitorMode::Total | MonitorMode::Statistics => match archive.trees.first() {
            Some(tree) => write_tree(w, tree)?,
            None => write_tree(w, &TraceTree::new())?,
        },
    }
    Ok(())
}

/// Parse an archive from a reader.
///
/// Truncated or malformed input yields an error; no partial trees
/// escape this function.
pub fn read_archive<R: Read>(r: &mut R) -> Result<TraceArchive, SerialError> {
    let mode_code = read_i32(r)?;
    let mode = MonitorMode::from_wire_code(mode_code).ok_or(SerialError::UnknownMode(mode_code))?;

    let trees = match mode {
        MonitorMode::PerFrame => {
            let count = read_i32(r)?;
            if !(0..=MAX_CHILDREN).contains(&count) {
                return Err(SerialError::Corrupt(format!("tree count {count}")));
            }
            let mut trees = Vec::with_capacity(count as usize);
            for _ in 0..count {
                trees.push(read_tree(r)?);
            }
            trees
        }
        MonitorMode::Total | MonitorMode::Statistics => vec![read_tree(r)?],
    };

    Ok(TraceArchive { mode, trees })
}

/// Write an archive to a file, creating parent directories as needed.
pub fn save_archive(archive: &TraceArchive, path: &Path) -> Result<(), SerialError> {
    info!("Writing trace archive to: {}", path.display());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_archive(&mut writer, archive)?;
    writer.flush()?;
    Ok(())
}

/// Read an archive back from a file.
pub fn load_archive(path: &Path) -> Result<TraceArchive, SerialError> {
    debug!("Reading trace archive from: {}", path.display());
    let file = File::open(path)?;
    read_archive(&mut BufReader::new(file))
}

/// Default archive path: `<app><YYYYmmdd_HHMMSS><suffix>` in the
/// working directory.
pub fn default_trace_path(app_name: &str) -> PathBuf {
    let stamp = Local::now().format(TRACE_FILE_STAMP);
    PathBuf::from(format!("{app_name}{stamp}{TRACE_FILE_SUFFIX}"))
}

fn write_tree<W: Write>(w: &mut W, tree: &TraceTree) -> Result<(), SerialError> {
    write_node(w, tree, ROOT)
}

fn write_node<W: Write>(w: &mut W, tree: &TraceTree, id: NodeId) -> Result<(), SerialError> {
    let node = tree.node(id);
    write_string(w, &node.id)?;
    write_string(w, &node.name)?;
    write_i32(w, node.event.map_or(-1, HookEventKind::wire_code))?;
    write_i32(w, node.call_count as i32)?;
    write_f64(w, node.total_time)?;
    write_f64(w, node.self_time)?;
    write_f32(w, node.allocated_kb)?;
    write_f32(w, node.freed_kb)?;
    write_i32(w, node.children.len() as i32)?;
    for &child in &node.children {
        write_node(w, tree, child)?;
    }
    Ok(())
}

fn read_tree<R: Read>(r: &mut R) -> Result<TraceTree, SerialError> {
    let (root, child_count) = read_node_record(r)?;
    let mut tree = TraceTree::from_root(root);
    for _ in 0..child_count {
        read_subtree(r, &mut tree, ROOT)?;
    }
    Ok(tree)
}

fn read_subtree<R: Read>(r: &mut R, tree: &mut TraceTree, parent: NodeId) -> Result<(), SerialError> {
    let (node, child_count) = read_node_record(r)?;
    let id = tree.push_child(parent, node);
    for _ in 0..child_count {
        read_subtree(r, tree, id)?;
    }
    Ok(())
}

fn read_node_record<R: Read>(r: &mut R) -> Result<(TraceNode, i32), SerialError> {
    let id = read_string(r)?;
    let name = read_string(r)?;

    let event_code = read_i32(r)?;
    let event = if event_code == -1 {
        None
    } else {
        Some(
            HookEventKind::from_wire_code(event_code)
                .ok_or_else(|| SerialError::Corrupt(format!("event kind {event_code}")))?,
        )
    };

    let call_count = read_i32(r)?;
    if call_count < 0 {
        return Err(SerialError::Corrupt(format!("call count {call_count}")));
    }
    let total_time = read_f64(r)?;
    let self_time = read_f64(r)?;
    let allocated_kb = read_f32(r)?;
    let freed_kb = read_f32(r)?;
    let child_count = read_i32(r)?;
    if !(0..=MAX_CHILDREN).contains(&child_count) {
        return Err(SerialError::Corrupt(format!("child count {child_count}")));
    }

    let node = TraceNode::from_record(
        id,
        name,
        event,
        call_count as u32,
        total_time,
        self_time,
        allocated_kb,
        freed_kb,
    );
    Ok((node, child_count))
}

fn write_i32<W: Write>(w: &mut W, v: i32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_f32<W: Write>(w: &mut W, v: f32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_f64<W: Write>(w: &mut W, v: f64) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_string<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    write_i32(w, s.len() as i32)?;
    w.write_all(s.as_bytes())
}

fn read_i32<R: Read>(r: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> std::io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> std::io::Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_string<R: Read>(r: &mut R) -> Result<String, SerialError> {
    let len = read_i32(r)?;
    if !(0..=MAX_STRING_BYTES).contains(&len) {
        return Err(SerialError::Corrupt(format!("string length {len}")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| SerialError::Corrupt("invalid UTF-8".to_string()))
}
