//! Print the compiled camera trajectory.

use std::path::PathBuf;

use glide_processing_core::camera_preview::{simulate_camera_motion, CameraMotionFrame};
use glide_processing_core::interpolate::{Interpolator, RenderMode};
use glide_processing_core::trajectory::compile_timeline;
use glide_project_model::pose::Keyframe;
use glide_project_model::project::LoadedProject;
use serde::Serialize;

#[derive(Serialize)]
struct TrajectoryDump<'a> {
    keyframes: &'a [Keyframe],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samples: Vec<SampleRow>,
}

#[derive(Serialize)]
struct SampleRow {
    time: f64,
    zoom: f64,
    x: f64,
    y: f64,
    transform: String,
}

impl From<&CameraMotionFrame> for SampleRow {
    fn from(frame: &CameraMotionFrame) -> Self {
        Self {
            time: frame.time_secs,
            zoom: frame.pose.zoom,
            x: frame.pose.x,
            y: frame.pose.y,
            transform: frame.transform.css_transform(),
        }
    }
}

pub fn run(path: PathBuf, json: bool, sample_fps: Option<f64>) -> anyhow::Result<()> {
    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let events = project
        .load_events()
        .map_err(|e| anyhow::anyhow!("Failed to load events: {e}"))?;

    let trajectory = compile_timeline(&project.timeline, &events);

    let samples: Vec<SampleRow> = match sample_fps {
        Some(fps) => {
            let interpolator =
                Interpolator::for_mode(project.project.export.easing_profile, RenderMode::Export);
            let duration = project
                .project
                .source
                .as_ref()
                .map(|s| s.duration_secs)
                .unwrap_or_else(|| trajectory.end_time());
            simulate_camera_motion(&trajectory, &interpolator, duration, fps)
                .iter()
                .map(SampleRow::from)
                .collect()
        }
        None => vec![],
    };

    if json {
        let dump = TrajectoryDump {
            keyframes: trajectory.keyframes(),
            samples,
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("Compiled trajectory ({} keyframes):", trajectory.len());
    println!("  {:<20} {:>8} {:>6} {:>7} {:>7}  easing", "id", "time", "zoom", "x", "y");
    for kf in trajectory.keyframes() {
        let easing = match kf.easing {
            Some(easing) => format!("{easing:?}"),
            None => "-".to_string(),
        };
        println!(
            "  {:<20} {:>8.3} {:>6.2} {:>6.1}% {:>6.1}%  {}",
            kf.id, kf.time, kf.zoom, kf.x, kf.y, easing
        );
    }

    if !samples.is_empty() {
        println!();
        println!("Samples:");
        for row in &samples {
            println!(
                "  {:>8.3}s zoom {:.3} at ({:.2}%, {:.2}%)  {}",
                row.time, row.zoom, row.x, row.y, row.transform
            );
        }
    }

    Ok(())
}
