//! Export pipeline.
//!
//! A producer walks the source on a fixed frame grid, samples the camera with
//! [`DeterministicSample`] and composites each frame. A single consumer owns
//! the [`FrameSink`] and receives frames over a bounded channel, strictly in
//! increasing time order. The sink is finalized when the source runs out or
//! the stop flag is raised.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glide_common::clock::FrameClock;
use glide_common::error::{GlideError, GlideResult};
use glide_processing_core::cursor::CursorTrack;
use glide_processing_core::interpolate::{Interpolator, RenderMode};
use glide_processing_core::pose_source::{DeterministicSample, PoseSource};
use glide_processing_core::source::{SeekGuard, VideoSource};
use glide_processing_core::trajectory::compile_timeline;
use glide_project_model::project::{ExportConfig, ExportFormat, LoadedProject};
use glide_project_model::style::CanvasStyle;
use glide_project_model::timeline::EffectiveTrajectory;
use image::RgbaImage;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::compositor::Compositor;
use crate::media::{FfmpegSink, FfmpegVideoSource};

/// Frames buffered between the producer and the sink.
const CHANNEL_CAPACITY: usize = 8;

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames handed to the sink so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// What a finalized sink produced.
#[derive(Debug, Clone)]
pub enum ExportArtifact {
    /// An encoded file.
    File { path: PathBuf, bytes: u64 },
    /// A directory of numbered images.
    Frames { dir: PathBuf, count: u64 },
    /// Frames kept in memory, with their presentation times.
    InMemory { frames: Vec<(f64, RgbaImage)> },
}

/// Consumer end of the export pipeline.
///
/// Frames arrive in strictly increasing time order. `finalize` is called
/// exactly once, after the last frame, including after an early stop.
pub trait FrameSink: Send {
    fn push(&mut self, frame: &RgbaImage, time: f64) -> GlideResult<()>;

    fn finalize(self: Box<Self>) -> GlideResult<ExportArtifact>;
}

/// Collects frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<(f64, RgbaImage)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn push(&mut self, frame: &RgbaImage, time: f64) -> GlideResult<()> {
        self.frames.push((time, frame.clone()));
        Ok(())
    }

    fn finalize(self: Box<Self>) -> GlideResult<ExportArtifact> {
        Ok(ExportArtifact::InMemory {
            frames: self.frames,
        })
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    count: u64,
}

impl PngSequenceSink {
    pub fn create(dir: impl Into<PathBuf>) -> GlideResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, count: 0 })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for PngSequenceSink {
    fn push(&mut self, frame: &RgbaImage, _time: f64) -> GlideResult<()> {
        frame.save(self.frame_path(self.count))?;
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> GlideResult<ExportArtifact> {
        Ok(ExportArtifact::Frames {
            dir: self.dir,
            count: self.count,
        })
    }
}

/// Open the sink matching an export format.
pub fn open_sink(config: &ExportConfig, output: &Path) -> GlideResult<Box<dyn FrameSink>> {
    match config.format {
        ExportFormat::PngSequence => Ok(Box::new(PngSequenceSink::create(output)?)),
        _ => Ok(Box::new(FfmpegSink::spawn(config, output)?)),
    }
}

/// Everything the producer needs besides the source and the sink.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub trajectory: EffectiveTrajectory,
    pub cursor: CursorTrack,
    pub style: CanvasStyle,
    pub config: ExportConfig,

    /// Start time offset (for partial exports).
    pub start_secs: Option<f64>,

    /// End time (for partial exports).
    pub end_secs: Option<f64>,
}

impl ExportJob {
    pub fn new(trajectory: EffectiveTrajectory, config: ExportConfig) -> Self {
        Self {
            trajectory,
            cursor: CursorTrack::default(),
            style: CanvasStyle::default(),
            config,
            start_secs: None,
            end_secs: None,
        }
    }

    /// The `[start, end)` span to render, clipped to the source.
    fn span(&self, source_duration: f64) -> (f64, f64) {
        let start = self.start_secs.unwrap_or(0.0).clamp(0.0, source_duration);
        let end = self
            .end_secs
            .unwrap_or(source_duration)
            .clamp(start, source_duration);
        (start, end)
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub artifact: ExportArtifact,
    pub frames_written: u64,
    pub total_frames: u64,
    /// The stop flag ended production before the source did.
    pub stopped_early: bool,
}

struct RenderedFrame {
    time: f64,
    image: RgbaImage,
}

/// Render `job` from `source` into `sink`.
///
/// Raising `stop` ends production after the current frame; the frames
/// already rendered are still flushed and the sink is finalized.
pub async fn export_trajectory(
    source: Box<dyn VideoSource>,
    sink: Box<dyn FrameSink>,
    job: ExportJob,
    stop: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
) -> GlideResult<ExportReport> {
    let (start, end) = job.span(source.duration());
    let clock = FrameClock::new(job.config.fps, end - start);
    let total_frames = clock.total_frames();

    tracing::info!(
        format = ?job.config.format,
        width = job.config.width,
        height = job.config.height,
        fps = clock.fps(),
        total_frames,
        "Starting export"
    );
    if let Some(cb) = &progress {
        cb(ExportProgress {
            progress: 0.0,
            frames_rendered: 0,
            total_frames,
            eta_secs: 0.0,
            stage: ExportStage::Preparing,
        });
    }

    let (tx, rx) = mpsc::channel::<RenderedFrame>(CHANNEL_CAPACITY);

    let producer_stop = stop.clone();
    let producer = tokio::task::spawn_blocking(move || {
        produce_frames(source, job, clock, start, tx, &producer_stop)
    });
    let consumer =
        tokio::task::spawn_blocking(move || consume_frames(sink, rx, total_frames, progress));

    let (produced, consumed) = tokio::join!(producer, consumer);
    let produced = produced.map_err(|e| GlideError::render(format!("Export producer panicked: {e}")))?;
    let consumed = consumed.map_err(|e| GlideError::render(format!("Export consumer panicked: {e}")))?;

    // A sink failure closes the channel, which the producer only sees as an
    // early hang-up, so the sink's error is reported first. The consumer has
    // already sent the failed progress.
    let (artifact, frames_written, progress) = match consumed {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "Export sink failed");
            return Err(err);
        }
    };
    let stopped_early = match produced {
        Ok(stopped) => stopped,
        Err(err) => {
            if let Some(cb) = &progress {
                cb(failed_report(frames_written, total_frames));
            }
            tracing::error!(error = %err, frames_written, "Export failed");
            return Err(err);
        }
    };

    if let Some(cb) = &progress {
        cb(ExportProgress {
            progress: 1.0,
            frames_rendered: frames_written,
            total_frames,
            eta_secs: 0.0,
            stage: ExportStage::Complete,
        });
    }
    tracing::info!(frames_written, stopped_early, "Export finished");

    Ok(ExportReport {
        artifact,
        frames_written,
        total_frames,
        stopped_early,
    })
}

/// Returns whether production stopped before the end of the span.
fn produce_frames(
    mut source: Box<dyn VideoSource>,
    job: ExportJob,
    clock: FrameClock,
    start: f64,
    tx: mpsc::Sender<RenderedFrame>,
    stop: &AtomicBool,
) -> GlideResult<bool> {
    let interpolator = Interpolator::for_mode(job.config.easing_profile, RenderMode::Export);
    let mut poses = DeterministicSample::new(interpolator, job.cursor);
    let mut compositor = Compositor::new(job.style);
    let mut source = SeekGuard::new(&mut *source);

    for (index, offset) in clock.times() {
        if stop.load(Ordering::Relaxed) {
            tracing::info!(frame = index, "Export stopped");
            return Ok(true);
        }

        let time = start + offset;
        source.seek(time)?;
        let pixels = source.read_frame()?;
        let state = poses.frame_at(&job.trajectory, time);
        let image = compositor.render(&pixels, &state, job.config.width, job.config.height)?;

        if tx.blocking_send(RenderedFrame { time, image }).is_err() {
            // consumer is gone; its own error is reported
            return Ok(true);
        }
    }
    Ok(false)
}

type ConsumerOutcome = (ExportArtifact, u64, Option<ProgressCallback>);

fn consume_frames(
    sink: Box<dyn FrameSink>,
    rx: mpsc::Receiver<RenderedFrame>,
    total_frames: u64,
    progress: Option<ProgressCallback>,
) -> GlideResult<ConsumerOutcome> {
    let mut written = 0u64;
    match write_frames(sink, rx, total_frames, progress.as_ref(), &mut written) {
        Ok(artifact) => Ok((artifact, written, progress)),
        Err(err) => {
            if let Some(cb) = &progress {
                cb(failed_report(written, total_frames));
            }
            Err(err)
        }
    }
}

fn write_frames(
    mut sink: Box<dyn FrameSink>,
    mut rx: mpsc::Receiver<RenderedFrame>,
    total_frames: u64,
    progress: Option<&ProgressCallback>,
    written: &mut u64,
) -> GlideResult<ExportArtifact> {
    let started = Instant::now();
    let mut last_time: Option<f64> = None;

    while let Some(frame) = rx.blocking_recv() {
        if let Some(last) = last_time {
            if frame.time <= last {
                return Err(GlideError::render(format!(
                    "Frame at {:.4}s arrived after {:.4}s",
                    frame.time, last
                )));
            }
        }
        sink.push(&frame.image, frame.time)?;
        last_time = Some(frame.time);
        *written += 1;

        if let Some(cb) = progress {
            cb(progress_report(*written, total_frames, started.elapsed().as_secs_f64()));
        }
    }

    if let Some(cb) = progress {
        cb(ExportProgress {
            progress: *written as f64 / total_frames.max(1) as f64,
            frames_rendered: *written,
            total_frames,
            eta_secs: 0.0,
            stage: ExportStage::Finalizing,
        });
    }
    sink.finalize()
}

fn failed_report(frames_rendered: u64, total_frames: u64) -> ExportProgress {
    ExportProgress {
        progress: frames_rendered as f64 / total_frames.max(1) as f64,
        frames_rendered,
        total_frames,
        eta_secs: 0.0,
        stage: ExportStage::Failed,
    }
}

fn progress_report(frames_rendered: u64, total_frames: u64, elapsed_secs: f64) -> ExportProgress {
    let progress = if total_frames == 0 {
        1.0
    } else {
        (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0)
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress,
        frames_rendered,
        total_frames,
        eta_secs,
        stage: ExportStage::Rendering,
    }
}

/// Export a project bundle using its own export settings.
///
/// This is the main entry point for rendering from disk.
pub async fn export_project(
    project: &LoadedProject,
    output: PathBuf,
    stop: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
) -> GlideResult<ExportReport> {
    let source_path = project
        .source_path()
        .ok_or_else(|| GlideError::project("Project has no source recording"))?;
    if !source_path.exists() {
        return Err(GlideError::FileNotFound { path: source_path });
    }

    let events = project
        .load_events()
        .map_err(|e| GlideError::project(e.to_string()))?;
    let trajectory = compile_timeline(&project.timeline, &events);
    let config = project.project.export.clone();

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut source = FfmpegVideoSource::open(&source_path)?;
    source.set_decode_fps(config.fps);
    let sink = open_sink(&config, &output)?;

    let job = ExportJob {
        trajectory,
        cursor: CursorTrack::from_events(&events),
        style: project.project.canvas.clone(),
        config,
        start_secs: None,
        end_secs: None,
    };

    tracing::info!(
        source = %source_path.display(),
        output = %output.display(),
        "Exporting project"
    );
    export_trajectory(Box::new(source), sink, job, stop, progress).await
}

/// Default output path inside the project's `exports/` directory.
pub fn default_output_path(project: &LoadedProject) -> PathBuf {
    let config = &project.project.export;
    let stem = format!(
        "{}-{}x{}",
        sanitize_file_stem(&project.project.name),
        config.width,
        config.height
    );
    match config.format.extension() {
        Some(ext) => project.exports_dir().join(format!("{stem}.{ext}")),
        None => project.exports_dir().join(stem),
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "export".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_report_eta() {
        let report = progress_report(25, 100, 5.0);
        assert_eq!(report.progress, 0.25);
        assert!((report.eta_secs - 15.0).abs() < 1e-9);
        assert_eq!(report.stage, ExportStage::Rendering);
    }

    #[test]
    fn test_progress_report_empty_export() {
        let report = progress_report(0, 0, 0.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.eta_secs, 0.0);
    }

    #[test]
    fn test_span_is_clipped_to_source() {
        let mut job = ExportJob::new(EffectiveTrajectory::identity(), ExportConfig::new(8, 8, 10));
        assert_eq!(job.span(4.0), (0.0, 4.0));

        job.start_secs = Some(1.0);
        job.end_secs = Some(9.0);
        assert_eq!(job.span(4.0), (1.0, 4.0));

        job.start_secs = Some(3.0);
        job.end_secs = Some(2.0);
        assert_eq!(job.span(4.0), (3.0, 3.0));
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("My Demo/1"), "My_Demo_1");
        assert_eq!(sanitize_file_stem(""), "export");
    }

    #[test]
    fn test_png_sequence_sink_numbers_frames() {
        let dir = std::env::temp_dir().join(format!("glide_png_sink_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut sink = Box::new(PngSequenceSink::create(&dir).unwrap());
        let frame = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        sink.push(&frame, 0.0).unwrap();
        sink.push(&frame, 0.1).unwrap();
        assert!(sink.frame_path(1).exists());

        match sink.finalize().unwrap() {
            ExportArtifact::Frames { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected artifact {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
