//! Parsing and dispatch for the host console command.
//!
//! Shape: `<start|stop|pause|resume> [mode] [depth] [session]`, where
//! mode is 0=PerFrame / 1=Total / 2=Statistics, depth defaults to 10,
//! and session is an index into the host's session registry (default
//! 0). The non-start actions take only the session index.

use crate::hook::{Clock, ScriptRuntime};
use crate::monitor::{MonitorMode, TraceMonitor};
use crate::utils::config::DEFAULT_MAX_DEPTH;
use crate::utils::error::CommandError;
use anyhow::{Context, Result};
use log::{error, info, warn};

/// What the command asks the monitor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Pause,
    Resume,
}

/// A parsed console command.
#[derive(Debug, Clone)]
pub struct ControlCommand {
    pub action: ControlAction,
    /// Mode to switch to before starting; `None` keeps the current one
    pub mode: Option<MonitorMode>,
    pub max_depth: u32,
    pub session: usize,
}

/// Parse the positional argument list of the console command.
///
/// Bad numbers are rejected with a diagnostic; a negative or zero
/// depth is normalized to the default rather than refused.
pub fn parse_control(args: &[String]) -> Result<ControlCommand, CommandError> {
    let action = match args.first() {
        None => return Err(CommandError::Empty),
        Some(word) => match word.to_lowercase().as_str() {
            "start" => ControlAction::Start,
            "stop" => ControlAction::Stop,
            "pause" => ControlAction::Pause,
            "resume" => ControlAction::Resume,
            other => return Err(CommandError::UnknownAction(other.to_string())),
        },
    };

    if action != ControlAction::Start {
        let session = parse_index(args.get(1), "session")?;
        return Ok(ControlCommand {
            action,
            mode: None,
            max_depth: DEFAULT_MAX_DEPTH,
            session,
        });
    }

    let mode = match args.get(1) {
        None => None,
        Some(raw) => {
            let value: i32 = raw
                .parse()
                .map_err(|_| CommandError::InvalidNumber {
                    what: "mode",
                    value: raw.clone(),
                })?;
            if value < 0 {
                None
            } else {
                Some(
                    MonitorMode::from_wire_code(value).ok_or(CommandError::InvalidNumber {
                        what: "mode",
                        value: raw.clone(),
                    })?,
                )
            }
        }
    };

    let max_depth = match args.get(2) {
        None => DEFAULT_MAX_DEPTH,
        Some(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| CommandError::InvalidNumber {
                    what: "depth",
                    value: raw.clone(),
                })?;
            if value <= 0 {
                warn!("depth {value} out of range, using {DEFAULT_MAX_DEPTH}");
                DEFAULT_MAX_DEPTH
            } else {
                value as u32
            }
        }
    };

    let session = parse_index(args.get(3), "session")?;

    Ok(ControlCommand {
        action: ControlAction::Start,
        mode,
        max_depth,
        session,
    })
}

fn parse_index(raw: Option<&String>, what: &'static str) -> Result<usize, CommandError> {
    match raw {
        None => Ok(0),
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|_| CommandError::InvalidNumber {
                what,
                value: raw.clone(),
            })?;
            Ok(value.max(0) as usize)
        }
    }
}

/// Apply a parsed command against the host's session registry.
///
/// The session index is clamped into range; an empty registry is an
/// error and a no-op. `stop` also serializes the trace to the default
/// timestamped path for `app_name`.
pub fn dispatch_control<C: Clock, R: ScriptRuntime>(
    monitor: &mut TraceMonitor<C>,
    sessions: &mut [R],
    command: &ControlCommand,
    app_name: &str,
) -> Result<()> {
    if sessions.is_empty() {
        error!("control command with no sessions registered");
        return Err(CommandError::NoSessions.into());
    }
    let index = command.session.min(sessions.len() - 1);
    if index != command.session {
        warn!("session index {} out of range, using {index}", command.session);
    }
    let rt = &mut sessions[index];

    match command.action {
        ControlAction::Start => {
            if let Some(mode) = command.mode {
                monitor.set_mode(mode);
            }
            monitor.set_max_depth(command.max_depth);
            info!(
                "control start: mode={} depth={} session={index}",
                monitor.mode(),
                monitor.max_depth()
            );
            monitor.start(rt);
        }
        ControlAction::Stop => {
            monitor.stop(rt);
            let path = monitor
                .save(None, app_name)
                .context("Failed to save trace on stop")?;
            info!("trace saved to {}", path.display());
        }
        ControlAction::Pause => monitor.pause(rt),
        ControlAction::Resume => monitor.resume(rt),
    }

    Ok(())
}
