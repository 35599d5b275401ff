use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use glide_common::error::{GlideError, GlideResult};
use glide_processing_core::source::FrameSequenceSource;
use glide_project_model::pose::{Easing, Keyframe, Pose};
use glide_project_model::project::ExportConfig;
use glide_project_model::style::{CanvasStyle, CropPolicy};
use glide_project_model::timeline::EffectiveTrajectory;
use glide_render_engine::export::{
    export_trajectory, ExportArtifact, ExportJob, ExportProgress, ExportStage, FrameSink,
    MemorySink, ProgressCallback,
};
use image::{Rgba, RgbaImage};

/// One second at 10 fps; frame `i` has red channel `i * 20`.
fn numbered_source() -> Box<FrameSequenceSource> {
    Box::new(
        FrameSequenceSource::generate(10, 16, 16, 10, |i, frame| {
            for pixel in frame.pixels_mut() {
                *pixel = Rgba([i as u8 * 20, 0, 0, 255]);
            }
        })
        .unwrap(),
    )
}

fn plain_job(trajectory: EffectiveTrajectory) -> ExportJob {
    ExportJob {
        style: CanvasStyle::plain(),
        ..ExportJob::new(trajectory, ExportConfig::new(16, 16, 10))
    }
}

fn frames_of(artifact: ExportArtifact) -> Vec<(f64, RgbaImage)> {
    match artifact {
        ExportArtifact::InMemory { frames } => frames,
        other => panic!("expected in-memory frames, got {other:?}"),
    }
}

#[tokio::test]
async fn export_renders_every_frame_in_time_order() {
    let report = export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        plain_job(EffectiveTrajectory::identity()),
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.frames_written, 10);
    assert_eq!(report.total_frames, 10);
    assert!(!report.stopped_early);

    let frames = frames_of(report.artifact);
    assert_eq!(frames.len(), 10);
    for pair in frames.windows(2) {
        assert!(pair[1].0 > pair[0].0);
    }
    for (i, (_, image)) in frames.iter().enumerate() {
        assert_eq!(image.get_pixel(8, 8)[0], i as u8 * 20);
    }
}

#[tokio::test]
async fn stop_flag_still_finalizes_sink() {
    let report = export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        plain_job(EffectiveTrajectory::identity()),
        Arc::new(AtomicBool::new(true)),
        None,
    )
    .await
    .unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.frames_written, 0);
    assert!(frames_of(report.artifact).is_empty());
}

#[tokio::test]
async fn export_is_deterministic() {
    let trajectory = EffectiveTrajectory::from_sorted(vec![
        Keyframe::start(),
        Keyframe::new("kf-1", 0.6, Pose::new(2.0, 25.0, 75.0), Some(Easing::EaseInOut)),
    ]);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let report = export_trajectory(
            numbered_source(),
            Box::new(MemorySink::new()),
            plain_job(trajectory.clone()),
            Arc::new(AtomicBool::new(false)),
            None,
        )
        .await
        .unwrap();
        runs.push(frames_of(report.artifact));
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn partial_export_covers_requested_span() {
    let job = ExportJob {
        start_secs: Some(0.5),
        end_secs: Some(0.75),
        ..plain_job(EffectiveTrajectory::identity())
    };
    let report = export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        job,
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .await
    .unwrap();

    let frames = frames_of(report.artifact);
    assert_eq!(frames.len(), 3);
    assert!((frames[0].0 - 0.5).abs() < 1e-9);
    assert_eq!(frames[0].1.get_pixel(8, 8)[0], 100);
}

#[tokio::test]
async fn partial_export_stops_before_span_end() {
    let job = ExportJob {
        start_secs: Some(0.1),
        end_secs: Some(0.4),
        ..plain_job(EffectiveTrajectory::identity())
    };
    let report = export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        job,
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.total_frames, 3);
    let frames = frames_of(report.artifact);
    let reds: Vec<u8> = frames.iter().map(|(_, f)| f.get_pixel(8, 8)[0]).collect();
    assert_eq!(reds, vec![20, 40, 60]);
    assert!(frames.iter().all(|(t, _)| *t < 0.4));
}

#[tokio::test]
async fn progress_runs_from_preparing_to_complete() {
    let seen: Arc<Mutex<Vec<ExportProgress>>> = Arc::default();
    let sink_seen = seen.clone();
    let callback: ProgressCallback = Box::new(move |p: ExportProgress| {
        if let Ok(mut seen) = sink_seen.lock() {
            seen.push(p);
        }
    });

    export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        plain_job(EffectiveTrajectory::identity()),
        Arc::new(AtomicBool::new(false)),
        Some(callback),
    )
    .await
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first().unwrap().stage, ExportStage::Preparing);
    assert_eq!(seen.last().unwrap().stage, ExportStage::Complete);
    assert!(seen.iter().any(|p| p.stage == ExportStage::Finalizing));

    let rendered: Vec<u64> = seen
        .iter()
        .filter(|p| p.stage == ExportStage::Rendering)
        .map(|p| p.frames_rendered)
        .collect();
    assert_eq!(rendered, (1..=10).collect::<Vec<_>>());

    let json = serde_json::to_string(&seen[1]).unwrap();
    assert!(json.contains("\"stage\":\"rendering\""));
}

#[tokio::test]
async fn rejected_crop_aborts_export_with_failure() {
    let trajectory = EffectiveTrajectory::from_sorted(vec![Keyframe::new(
        "start",
        0.0,
        Pose::new(3.0, 100.0, 100.0),
        None,
    )]);
    let job = ExportJob {
        style: CanvasStyle {
            crop_policy: CropPolicy::Reject,
            ..CanvasStyle::plain()
        },
        ..plain_job(trajectory)
    };

    let stages: Arc<Mutex<Vec<ExportStage>>> = Arc::default();
    let recorder = stages.clone();
    let result = export_trajectory(
        numbered_source(),
        Box::new(MemorySink::new()),
        job,
        Arc::new(AtomicBool::new(false)),
        Some(Box::new(move |p: ExportProgress| {
            if let Ok(mut stages) = recorder.lock() {
                stages.push(p.stage);
            }
        })),
    )
    .await;

    assert!(matches!(result, Err(GlideError::Render { .. })));
    assert_eq!(stages.lock().unwrap().last(), Some(&ExportStage::Failed));
}

struct FailingSink {
    accepted: usize,
}

impl FrameSink for FailingSink {
    fn push(&mut self, _frame: &RgbaImage, time: f64) -> GlideResult<()> {
        if self.accepted == 3 {
            return Err(GlideError::render(format!("disk full at {time}")));
        }
        self.accepted += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> GlideResult<ExportArtifact> {
        Ok(ExportArtifact::InMemory { frames: vec![] })
    }
}

#[tokio::test]
async fn sink_failure_is_reported() {
    let seen: Arc<Mutex<Vec<ExportProgress>>> = Arc::default();
    let recorder = seen.clone();
    let result = export_trajectory(
        numbered_source(),
        Box::new(FailingSink { accepted: 0 }),
        plain_job(EffectiveTrajectory::identity()),
        Arc::new(AtomicBool::new(false)),
        Some(Box::new(move |p: ExportProgress| {
            if let Ok(mut seen) = recorder.lock() {
                seen.push(p);
            }
        })),
    )
    .await;

    match result {
        Err(err) => assert!(err.to_string().contains("disk full")),
        Ok(report) => panic!("export should fail, wrote {}", report.frames_written),
    }
    let seen = seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.stage, ExportStage::Failed);
    assert_eq!(last.frames_rendered, 3);
    assert!(!seen.iter().any(|p| p.stage == ExportStage::Complete));
}
