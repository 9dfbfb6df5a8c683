//! Script Trace CLI
//!
//! Inspection tooling for saved trace archives: hot-site tables,
//! flamegraphs, JSON summaries, and archive validation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::path::PathBuf;

use script_trace_monitor::flamegraph::{generate_flamegraph, write_svg, FlamegraphConfig};
use script_trace_monitor::monitor::MonitorMode;
use script_trace_monitor::output::{
    build_collapsed_stacks, build_summary, load_archive, write_summary, TraceArchive,
};
use script_trace_monitor::tree::{SortMode, TraceTree, ROOT};
use script_trace_monitor::utils::config::SCHEMA_VERSION;

/// Script Trace - call-stack profiling for embedded scripting runtimes
#[derive(Parser, Debug)]
#[command(name = "script-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the hottest call sites of a saved trace
    View {
        /// Path to a trace archive
        #[arg(short, long)]
        file: PathBuf,

        /// Frame index for per-frame archives (default: last)
        #[arg(long)]
        frame: Option<usize>,

        /// Number of rows to print
        #[arg(long, default_value = "20")]
        top: usize,

        /// Row ordering
        #[arg(long, value_enum, default_value_t = SortArg::Total)]
        sort: SortArg,
    },

    /// Render a saved trace as an SVG flamegraph
    Flamegraph {
        /// Path to a trace archive
        #[arg(short, long)]
        file: PathBuf,

        /// Output path for the SVG
        #[arg(short, long, default_value = "flamegraph.svg")]
        output: PathBuf,

        /// Frame index for per-frame archives (default: last)
        #[arg(long)]
        frame: Option<usize>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,
    },

    /// Export a JSON summary of a saved trace
    Export {
        /// Path to a trace archive
        #[arg(short, long)]
        file: PathBuf,

        /// Output path for the JSON summary
        #[arg(short, long, default_value = "summary.json")]
        output: PathBuf,

        /// Frame index for per-frame archives (default: last)
        #[arg(long)]
        frame: Option<usize>,

        /// Number of sites to include
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Validate a trace archive file
    Validate {
        /// Path to a trace archive
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

/// Row ordering for the view command
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    /// By total time, descending
    Total,
    /// By self time, descending
    SelfTime,
    /// First-discovery order
    Arrival,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Total => SortMode::TotalTime,
            SortArg::SelfTime => SortMode::SelfTime,
            SortArg::Arrival => SortMode::Arrival,
        }
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::View {
            file,
            frame,
            top,
            sort,
        } => view_archive(file, frame, top, sort.into())?,

        Commands::Flamegraph {
            file,
            output,
            frame,
            title,
            width,
        } => render_flamegraph(file, output, frame, title, width)?,

        Commands::Export {
            file,
            output,
            frame,
            top,
        } => export_summary(file, output, frame, top)?,

        Commands::Validate { file } => validate_archive(file)?,

        Commands::Version => display_version(),
    }

    Ok(())
}

/// Pick the tree a command should operate on: the requested frame of a
/// per-frame archive, or the single session tree otherwise.
fn select_tree(archive: &TraceArchive, frame: Option<usize>) -> Result<TraceTree> {
    if archive.trees.is_empty() {
        bail!("archive contains no trees");
    }
    let index = match archive.mode {
        MonitorMode::PerFrame => {
            let last = archive.trees.len() - 1;
            frame.unwrap_or(last).min(last)
        }
        MonitorMode::Total | MonitorMode::Statistics => 0,
    };
    Ok(archive.trees[index].clone())
}

fn view_archive(file: PathBuf, frame: Option<usize>, top: usize, sort: SortMode) -> Result<()> {
    let archive = load_archive(&file)
        .with_context(|| format!("Failed to load archive {}", file.display()))?;

    let mut tree = select_tree(&archive, frame)?;
    tree.count_self_time(sort);
    let mut view = tree.statisticize();
    view.sort_children_of(ROOT, sort);

    println!("Trace: {} ({} mode, {} tree(s))", file.display(), archive.mode, archive.trees.len());
    println!(
        "{:<44} {:>8} {:>12} {:>12} {:>12}",
        "Call Site", "Calls", "Total (ms)", "Self (ms)", "Alloc (KB)"
    );

    for node in view.children_of(ROOT).take(top) {
        let id = if node.id.len() > 44 {
            format!("...{}", &node.id[node.id.len() - 41..])
        } else {
            node.id.clone()
        };
        println!(
            "{:<44} {:>8} {:>12.3} {:>12.3} {:>12.1}",
            id, node.call_count, node.total_time, node.self_time, node.allocated_kb
        );
    }

    Ok(())
}

fn render_flamegraph(
    file: PathBuf,
    output: PathBuf,
    frame: Option<usize>,
    title: Option<String>,
    width: usize,
) -> Result<()> {
    let archive = load_archive(&file)
        .with_context(|| format!("Failed to load archive {}", file.display()))?;

    let mut tree = select_tree(&archive, frame)?;
    tree.count_self_time(SortMode::TotalTime);

    let stacks = build_collapsed_stacks(&tree);

    let mut config = FlamegraphConfig::new().with_width(width);
    if let Some(title) = title {
        config = config.with_title(title);
    }

    let svg = generate_flamegraph(&stacks, Some(&config))
        .context("Failed to generate flamegraph")?;
    write_svg(&svg, &output).context("Failed to write flamegraph")?;

    println!("Flamegraph written to {}", output.display());
    Ok(())
}

fn export_summary(file: PathBuf, output: PathBuf, frame: Option<usize>, top: usize) -> Result<()> {
    let archive = load_archive(&file)
        .with_context(|| format!("Failed to load archive {}", file.display()))?;

    let mut tree = select_tree(&archive, frame)?;
    tree.count_self_time(SortMode::TotalTime);
    let mut view = tree.statisticize();
    view.sort_children_of(ROOT, SortMode::TotalTime);

    let summary = build_summary(&view, archive.mode, archive.trees.len(), top);
    write_summary(&summary, &output).context("Failed to write summary")?;

    println!("Summary written to {}", output.display());
    Ok(())
}

/// Validate a trace archive file
fn validate_archive(file: PathBuf) -> Result<()> {
    println!("Validating archive: {}", file.display());

    let archive = load_archive(&file)
        .with_context(|| format!("Failed to load archive {}", file.display()))?;

    let node_count: usize = archive.trees.iter().map(TraceTree::node_count).sum();

    println!("✓ Valid trace archive");
    println!("  Mode: {}", archive.mode);
    println!("  Trees: {}", archive.trees.len());
    println!("  Nodes: {node_count}");

    Ok(())
}

/// Display version information
fn display_version() {
    println!("Script Trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Summary Schema: v{SCHEMA_VERSION}");
    println!();
    println!("Call-stack profiling for embedded scripting runtimes.");
}
