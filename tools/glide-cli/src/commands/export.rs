//! Export a project to video.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glide_project_model::project::{ExportFormat, LoadedProject};
use glide_render_engine::export::{
    default_output_path, export_project, ExportArtifact, ExportProgress, ProgressCallback,
};

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let mut project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let config = &mut project.project.export;
    if let Some(format) = format {
        config.format = format.parse::<ExportFormat>().map_err(|e| {
            anyhow::anyhow!("{e}. Use: mp4-h264, mp4-h265, gif, webm, png-sequence")
        })?;
    }
    if let Some(width) = width {
        config.width = width;
    }
    if let Some(height) = height {
        config.height = height;
    }
    if let Some(fps) = fps {
        config.fps = fps;
    }

    let output_path = output.unwrap_or_else(|| default_output_path(&project));
    let config = &project.project.export;

    println!("  Output: {}", output_path.display());
    println!("  Format: {:?}", config.format);
    println!(
        "  Resolution: {}x{} @ {}fps",
        config.width, config.height, config.fps
    );

    let stop = Arc::new(AtomicBool::new(false));
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing the frames already rendered");
            ctrl_c_stop.store(true, Ordering::SeqCst);
        }
    });

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    match export_project(&project, output_path, stop, Some(progress_cb)).await {
        Ok(report) => {
            println!();
            if report.stopped_early {
                println!(
                    "Export stopped after {}/{} frames.",
                    report.frames_written, report.total_frames
                );
            }
            match report.artifact {
                ExportArtifact::File { path, bytes } => {
                    println!("Export complete: {} ({bytes} bytes)", path.display());
                }
                ExportArtifact::Frames { dir, count } => {
                    println!("Export complete: {count} frames in {}", dir.display());
                }
                ExportArtifact::InMemory { frames } => {
                    println!("Export complete: {} frames", frames.len());
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("\nExport failed: {e}");
            Err(e.into())
        }
    }
}
