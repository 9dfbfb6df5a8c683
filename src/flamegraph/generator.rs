//! SVG flamegraph generation from collapsed stacks.

use crate::output::collapse::CollapsedStack;
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{from_lines, Options};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Script Trace Profile".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Generate an SVG flamegraph from collapsed stacks
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let mut options = Options::default();
    options.title = config.title.clone();
    options.image_width = Some(config.width);
    options.count_name = "us".to_string();

    let lines: Vec<String> = stacks
        .iter()
        .map(|s| format!("{} {}", s.stack, s.weight))
        .collect();

    let mut svg = Vec::new();
    from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::GenerationFailed(e.to_string()))?;

    let svg = String::from_utf8(svg)
        .map_err(|e| FlamegraphError::GenerationFailed(e.to_string()))?;

    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Write SVG content to a file, creating parent directories as needed
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), FlamegraphError> {
    let output_path = output_path.as_ref();

    info!("Writing SVG to: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(svg_content.as_bytes())?;
    writer.flush()?;

    Ok(())
}
