//! Preview a project without exporting it.
//!
//! Without `--snapshot` the live preview loop is driven by a simulated display
//! clock and the smoothed camera is printed as it chases the trajectory. With
//! `--snapshot` one composited frame is written as PNG.

use std::path::PathBuf;

use glide_common::clock::FrameClock;
use glide_common::config::AppConfig;
use glide_processing_core::cursor::CursorTrack;
use glide_processing_core::source::VideoSource;
use glide_processing_core::trajectory::compile_timeline;
use glide_project_model::project::LoadedProject;
use glide_render_engine::media::FfmpegVideoSource;
use glide_render_engine::preview::{PlaybackState, PreviewOptions, PreviewSession};

/// Rows printed per simulated second of playback.
const ROWS_PER_SEC: f64 = 10.0;

pub fn run(
    path: PathBuf,
    config: &AppConfig,
    at: f64,
    duration: f64,
    snapshot: Option<PathBuf>,
) -> anyhow::Result<()> {
    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let events = project
        .load_events()
        .map_err(|e| anyhow::anyhow!("Failed to load events: {e}"))?;

    let trajectory = compile_timeline(&project.timeline, &events);
    let options = PreviewOptions {
        width: config.preview.width,
        height: config.preview.height,
        refresh_hz: config.preview.refresh_hz,
        style: project.project.canvas.clone(),
        easing_profile: project.project.export.easing_profile,
        ..PreviewOptions::default()
    };

    match snapshot {
        Some(output) => {
            let source_path = project
                .source_path()
                .ok_or_else(|| anyhow::anyhow!("Project has no source recording"))?;
            let source = FfmpegVideoSource::open(&source_path)
                .map_err(|e| anyhow::anyhow!("Failed to open source: {e}"))?;
            let source: Box<dyn VideoSource> = Box::new(source);

            let mut session = PreviewSession::new(
                trajectory,
                CursorTrack::from_events(&events),
                Some(source),
                options,
            );
            let frame = session
                .scrub(at)
                .map_err(|e| anyhow::anyhow!("Preview failed: {e}"))?
                .ok_or_else(|| anyhow::anyhow!("Nothing to preview"))?;
            let image = frame
                .image
                .ok_or_else(|| anyhow::anyhow!("Frame at {at:.2}s could not be composited"))?;
            image
                .save(&output)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;

            println!(
                "Snapshot at {:.2}s: zoom {:.2} at ({:.1}%, {:.1}%)",
                frame.state.time, frame.state.pose.zoom, frame.state.pose.x, frame.state.pose.y
            );
            println!("  Written: {}", output.display());
        }
        None => simulate_playback(
            PreviewSession::new(trajectory, CursorTrack::from_events(&events), None, options),
            config.preview.refresh_hz,
            at,
            duration,
        )?,
    }

    Ok(())
}

fn simulate_playback(
    mut session: PreviewSession,
    refresh_hz: u32,
    at: f64,
    duration: f64,
) -> anyhow::Result<()> {
    session.scrub(at)?;
    session.play();

    let interval_ns = 1_000_000_000 / u64::from(refresh_hz.max(1));
    let end_ns = FrameClock::secs_to_ns(duration.max(0.0));
    let print_every = FrameClock::secs_to_ns(1.0 / ROWS_PER_SEC);

    println!(
        "Simulating {:.1}s of playback from {:.2}s at {}Hz",
        duration,
        session.playhead(),
        refresh_hz
    );
    println!("  {:>8}  {:>6} {:>7} {:>7}  transform", "time", "zoom", "x", "y");

    let mut now_ns = 0u64;
    let mut next_print = 0u64;
    while now_ns <= end_ns {
        if let Some(frame) = session.tick(now_ns)? {
            if now_ns >= next_print {
                let pose = frame.state.pose;
                println!(
                    "  {:>7.3}s  {:>6.3} {:>6.2}% {:>6.2}%  {}",
                    frame.state.time,
                    pose.zoom,
                    pose.x,
                    pose.y,
                    frame.transform.css_transform()
                );
                next_print += print_every;
            }
        }
        if session.state() != PlaybackState::Playing {
            println!("  Reached the end at {:.2}s", session.playhead());
            break;
        }
        now_ns += interval_ns;
    }

    session.stop();
    Ok(())
}
