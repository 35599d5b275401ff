//! Glide CLI: edit, analyze, preview, and export auto-zoom projects.
//!
//! Usage:
//!   glide init <NAME>            Create a new project
//!   glide info <PATH>            Show project information
//!   glide validate <PATH>        Validate a project bundle
//!   glide keyframe add|remove    Edit manual keyframes
//!   glide region add|resize|remove
//!   glide analyze <PATH>         Generate zoom regions from clicks or motion
//!   glide trajectory <PATH>      Print the compiled camera trajectory
//!   glide preview <PATH>         Simulate playback or write a snapshot
//!   glide export <PATH>          Export a project to video
//!   glide check                  Check for external tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "glide",
    about = "Automatic pan and zoom for screen recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Output width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Output height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Output frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Screen recording to copy into the project
        #[arg(long)]
        source: Option<PathBuf>,

        /// Input event stream (JSONL) to copy into the project
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project bundle
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Add or remove manual keyframes
    Keyframe {
        #[command(subcommand)]
        action: KeyframeAction,
    },

    /// Add, resize, or remove zoom regions
    Region {
        #[command(subcommand)]
        action: RegionAction,
    },

    /// Replace generated zoom content with a fresh auto-zoom pass
    Analyze {
        /// Path to the project directory
        path: PathBuf,

        /// Skip motion analysis of the source recording
        #[arg(long)]
        no_motion: bool,

        /// Zoom factor for click regions (clamped to [2.0, 2.5])
        #[arg(long)]
        focus_zoom: Option<f64>,

        /// Length of each click region (seconds)
        #[arg(long)]
        region_secs: Option<f64>,
    },

    /// Print the compiled camera trajectory
    Trajectory {
        /// Path to the project directory
        path: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Also sample the trajectory at this rate (frames per second)
        #[arg(long)]
        sample_fps: Option<f64>,
    },

    /// Simulate live playback, or render a single preview frame
    Preview {
        /// Path to the project directory
        path: PathBuf,

        /// Playback time to preview (seconds)
        #[arg(long, default_value = "0.0")]
        at: f64,

        /// How long to simulate playback from `--at` (seconds)
        #[arg(long, default_value = "2.0")]
        duration: f64,

        /// Write the composited frame at `--at` to this PNG instead
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Export a project to video
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path (directory for png-sequence)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: mp4-h264, mp4-h265, gif, webm, png-sequence
        #[arg(long)]
        format: Option<String>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Check for external tools
    Check,
}

#[derive(Subcommand)]
enum KeyframeAction {
    /// Add a keyframe
    Add {
        /// Path to the project directory
        path: PathBuf,

        /// Time (seconds)
        #[arg(long)]
        time: f64,

        /// Zoom factor (>= 1)
        #[arg(long, default_value = "1.0")]
        zoom: f64,

        /// Horizontal center, percent of width
        #[arg(long, default_value = "50.0")]
        x: f64,

        /// Vertical center, percent of height
        #[arg(long, default_value = "50.0")]
        y: f64,

        /// Easing for the segment arriving at this keyframe: linear|ease-in-out
        #[arg(long)]
        easing: Option<String>,
    },

    /// Remove a keyframe by id
    Remove {
        /// Path to the project directory
        path: PathBuf,

        /// Keyframe id
        id: String,
    },
}

#[derive(Subcommand)]
enum RegionAction {
    /// Add a zoom region
    Add {
        /// Path to the project directory
        path: PathBuf,

        /// Start time (seconds)
        #[arg(long)]
        start: f64,

        /// End time (seconds)
        #[arg(long)]
        end: f64,

        /// Zoom factor held during the region
        #[arg(long, default_value = "2.0")]
        zoom: f64,

        /// Anchor, percent of width
        #[arg(long, default_value = "50.0")]
        x: f64,

        /// Anchor, percent of height
        #[arg(long, default_value = "50.0")]
        y: f64,
    },

    /// Move a region's start and end
    Resize {
        /// Path to the project directory
        path: PathBuf,

        /// Region id
        id: String,

        /// New start time (seconds)
        #[arg(long)]
        start: f64,

        /// New end time (seconds)
        #[arg(long)]
        end: f64,
    },

    /// Remove a region by id
    Remove {
        /// Path to the project directory
        path: PathBuf,

        /// Region id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = glide_common::config::AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    glide_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            width,
            height,
            fps,
            source,
            events,
        } => commands::init::run(name, output, width, height, fps, source, events),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Keyframe { action } => match action {
            KeyframeAction::Add {
                path,
                time,
                zoom,
                x,
                y,
                easing,
            } => commands::edit::add_keyframe(path, time, zoom, x, y, easing),
            KeyframeAction::Remove { path, id } => commands::edit::remove_keyframe(path, id),
        },
        Commands::Region { action } => match action {
            RegionAction::Add {
                path,
                start,
                end,
                zoom,
                x,
                y,
            } => commands::edit::add_region(path, start, end, zoom, x, y),
            RegionAction::Resize {
                path,
                id,
                start,
                end,
            } => commands::edit::resize_region(path, id, start, end),
            RegionAction::Remove { path, id } => commands::edit::remove_region(path, id),
        },
        Commands::Analyze {
            path,
            no_motion,
            focus_zoom,
            region_secs,
        } => commands::analyze::run(path, &config, no_motion, focus_zoom, region_secs),
        Commands::Trajectory {
            path,
            json,
            sample_fps,
        } => commands::trajectory::run(path, json, sample_fps),
        Commands::Preview {
            path,
            at,
            duration,
            snapshot,
        } => commands::preview::run(path, &config, at, duration, snapshot),
        Commands::Export {
            path,
            output,
            format,
            width,
            height,
            fps,
        } => commands::export::run(path, output, format, width, height, fps).await,
        Commands::Check => commands::check::run(),
    }
}
