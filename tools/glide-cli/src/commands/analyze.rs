//! Run auto-zoom synthesis on a project.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use glide_common::config::AppConfig;
use glide_processing_core::source::VideoSource;
use glide_render_engine::media::FfmpegVideoSource;
use glide_studio::EditorSession;

pub fn run(
    path: PathBuf,
    config: &AppConfig,
    no_motion: bool,
    focus_zoom: Option<f64>,
    region_secs: Option<f64>,
) -> anyhow::Result<()> {
    println!("Analyzing project at: {}", path.display());

    let mut config = config.clone();
    if let Some(zoom) = focus_zoom {
        config.auto_zoom.focus_zoom = zoom;
    }
    if let Some(secs) = region_secs {
        config.auto_zoom.region_duration_secs = secs;
    }

    let mut session = EditorSession::open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?
        .with_app_config(&config);

    println!("  Events: {}", session.events().len());

    // Motion analysis only runs when there are no clicks, but the source is
    // opened up front so a missing decoder is reported early.
    let mut source = if no_motion {
        None
    } else {
        match session.project().source_path() {
            Some(source_path) if source_path.exists() => {
                match FfmpegVideoSource::open(&source_path) {
                    Ok(source) => Some(source),
                    Err(e) => {
                        tracing::warn!("Motion analysis unavailable: {e}");
                        None
                    }
                }
            }
            _ => None,
        }
    };

    let cancel = AtomicBool::new(false);
    let outcome = session
        .run_auto_zoom(
            source.as_mut().map(|s| s as &mut dyn VideoSource),
            &cancel,
        )
        .map_err(|e| anyhow::anyhow!("Auto-zoom failed: {e}"))?;

    println!("  Strategy: {}", outcome.strategy.as_str());
    println!(
        "  Generated: {} regions, {} keyframes",
        outcome.regions.len(),
        outcome.keyframes.len()
    );
    for region in &outcome.regions {
        println!(
            "    {} {:>7.2}s-{:<7.2}s zoom {:.2} at ({:.1}%, {:.1}%)",
            region.id,
            region.start_time,
            region.end_time,
            region.target_zoom,
            region.anchor_x,
            region.anchor_y
        );
    }

    session
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;
    println!(
        "\nTimeline saved. Compiled trajectory has {} keyframes.",
        session.trajectory().len()
    );

    Ok(())
}
