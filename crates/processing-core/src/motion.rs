//! Motion-fallback auto-zoom: frame-difference analysis of the source video.
//!
//! Used when a recording has no usable event stream. Best effort only.
//!
//! # Algorithm
//!
//! 1. **Sample** the source every `sample_interval_secs`.
//! 2. **Diff** consecutive samples on a strided pixel grid; a pixel changed
//!    when its mean channel difference exceeds `pixel_threshold`.
//! 3. **Classify** by the changed bounding box:
//!    - fewer than `min_changed_pixels` changes → still
//!    - box area below `large_area_fraction` → cursor-sized motion
//!    - otherwise → scene change (scroll, window switch)
//! 4. **Emit** keyframes: follow the cursor centroid at `follow_zoom`, zoom to
//!    `dwell_zoom` after `dwell_samples` still samples, and return to neutral
//!    on a scene change while zoomed.

use std::sync::atomic::{AtomicBool, Ordering};

use glide_common::error::{GlideError, GlideResult};
use glide_project_model::pose::{Easing, Keyframe, Point2D, Pose};
use image::RgbaImage;

use crate::source::{SeekGuard, VideoSource};

/// Tunables for motion analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Seconds between sampled frames.
    pub sample_interval_secs: f64,
    /// Sample every Nth pixel in each direction.
    pub stride: u32,
    /// Mean absolute RGB difference above which a pixel counts as changed.
    pub pixel_threshold: u8,
    /// Fewer changed samples than this counts as no change.
    pub min_changed_pixels: usize,
    /// Bounding-box fraction of the frame at or above which a change is a
    /// scene transition.
    pub large_area_fraction: f64,
    /// Consecutive still samples needed to zoom in.
    pub dwell_samples: usize,
    /// Zoom used while following cursor-sized motion.
    pub follow_zoom: f64,
    /// Zoom used on a dwell.
    pub dwell_zoom: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 0.5,
            stride: 4,
            pixel_threshold: 24,
            min_changed_pixels: 3,
            large_area_fraction: 0.15,
            dwell_samples: 2,
            follow_zoom: 1.25,
            dwell_zoom: 2.0,
        }
    }
}

/// Result of differencing two frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffMask {
    /// Number of sampled pixels that changed.
    pub changed: usize,
    /// Number of pixels sampled.
    pub sampled: usize,
    /// Changed bounding box in pixels, `(min_x, min_y, max_x, max_y)` inclusive.
    pub bounds: Option<(u32, u32, u32, u32)>,
    /// Mean position of changed pixels, in percent of the frame.
    pub centroid: Option<Point2D>,
    /// Bounding-box area as a fraction of the frame area.
    pub area_fraction: f64,
}

/// What a diff looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionClass {
    Still,
    Cursor { centroid: Point2D },
    Scene,
}

/// One analyzed sample, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub time: f64,
    pub class: MotionClass,
    pub changed: usize,
    pub area_fraction: f64,
}

/// Output of a completed analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionAnalysis {
    pub keyframes: Vec<Keyframe>,
    pub samples: Vec<MotionSample>,
}

/// Difference two equally sized frames on a strided grid.
pub fn diff_frames(a: &RgbaImage, b: &RgbaImage, stride: u32, threshold: u8) -> DiffMask {
    let (width, height) = a.dimensions();
    let stride = stride.max(1);
    let mut changed = 0usize;
    let mut sampled = 0usize;
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);

    if b.dimensions() == (width, height) {
        for y in (0..height).step_by(stride as usize) {
            for x in (0..width).step_by(stride as usize) {
                sampled += 1;
                let pa = a.get_pixel(x, y);
                let pb = b.get_pixel(x, y);
                let diff: u32 = (0..3).map(|c| pa[c].abs_diff(pb[c]) as u32).sum();
                if diff / 3 <= threshold as u32 {
                    continue;
                }
                changed += 1;
                sum_x += x as f64;
                sum_y += y as f64;
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
    }

    let frame_area = (width as f64 * height as f64).max(1.0);
    let area_fraction = bounds
        .map(|(x0, y0, x1, y1)| {
            // a single sample stands for a stride x stride cell
            let w = (x1 - x0 + stride) as f64;
            let h = (y1 - y0 + stride) as f64;
            (w * h / frame_area).min(1.0)
        })
        .unwrap_or(0.0);

    let centroid = (changed > 0).then(|| {
        Point2D::new(
            (sum_x / changed as f64 / width.max(1) as f64 * 100.0).clamp(0.0, 100.0),
            (sum_y / changed as f64 / height.max(1) as f64 * 100.0).clamp(0.0, 100.0),
        )
    });

    DiffMask {
        changed,
        sampled,
        bounds,
        centroid,
        area_fraction,
    }
}

/// Classify a diff under `config`.
pub fn classify(mask: &DiffMask, config: &MotionConfig) -> MotionClass {
    if mask.changed < config.min_changed_pixels.max(1) {
        return MotionClass::Still;
    }
    match mask.centroid {
        Some(centroid) if mask.area_fraction < config.large_area_fraction => {
            MotionClass::Cursor { centroid }
        }
        _ => MotionClass::Scene,
    }
}

/// Keyframe emission state machine, fed one classified sample at a time.
#[derive(Debug, Clone)]
struct MotionTracker {
    current_zoom: f64,
    last_centroid: Option<Point2D>,
    still_streak: usize,
    keyframes: Vec<Keyframe>,
}

impl MotionTracker {
    fn new() -> Self {
        Self {
            current_zoom: 1.0,
            last_centroid: None,
            still_streak: 0,
            keyframes: Vec::new(),
        }
    }

    fn emit(&mut self, time: f64, pose: Pose, easing: Easing) {
        let id = format!("auto-kf-{}", self.keyframes.len() + 1);
        self.keyframes.push(Keyframe::new(id, time, pose, Some(easing)));
        self.current_zoom = pose.zoom;
    }

    fn observe(&mut self, time: f64, class: MotionClass, config: &MotionConfig) {
        match class {
            MotionClass::Cursor { centroid } => {
                self.still_streak = 0;
                self.last_centroid = Some(centroid);
                self.emit(
                    time,
                    Pose::new(config.follow_zoom, centroid.x, centroid.y),
                    Easing::Linear,
                );
            }
            MotionClass::Still => {
                self.still_streak += 1;
                if self.still_streak >= config.dwell_samples.max(1)
                    && self.current_zoom < config.dwell_zoom
                {
                    if let Some(centroid) = self.last_centroid {
                        self.emit(
                            time,
                            Pose::new(config.dwell_zoom, centroid.x, centroid.y),
                            Easing::EaseInOut,
                        );
                    }
                }
            }
            MotionClass::Scene => {
                self.still_streak = 0;
                if self.current_zoom > 1.0 {
                    self.emit(time, Pose::NEUTRAL, Easing::EaseInOut);
                }
            }
        }
    }
}

/// Scan the source and derive keyframes.
///
/// The source position is restored on every exit path. When `cancel` is set
/// the scan stops at the next sample, partial keyframes are discarded, and a
/// `Cancelled` error is returned.
pub fn analyze_motion<S: VideoSource + ?Sized>(
    source: &mut S,
    config: &MotionConfig,
    cancel: &AtomicBool,
) -> GlideResult<MotionAnalysis> {
    let interval = config.sample_interval_secs;
    if !(interval.is_finite() && interval > 0.0) {
        return Err(GlideError::processing(format!(
            "invalid motion sample interval {interval}"
        )));
    }

    let mut source = SeekGuard::new(source);
    let duration = source.duration();
    let mut tracker = MotionTracker::new();
    let mut samples = Vec::new();
    let mut previous: Option<RgbaImage> = None;

    let mut index = 0u64;
    loop {
        let time = index as f64 * interval;
        if time >= duration {
            break;
        }
        if cancel.load(Ordering::Relaxed) {
            tracing::warn!(
                at_secs = time,
                partial_keyframes = tracker.keyframes.len(),
                "Motion analysis cancelled"
            );
            return Err(GlideError::cancelled("motion analysis"));
        }

        source.seek(time)?;
        let frame = source.read_frame()?;
        if let Some(prev) = &previous {
            let mask = diff_frames(prev, &frame, config.stride, config.pixel_threshold);
            let class = classify(&mask, config);
            tracker.observe(time, class, config);
            samples.push(MotionSample {
                time,
                class,
                changed: mask.changed,
                area_fraction: mask.area_fraction,
            });
        }
        previous = Some(frame);
        index += 1;
    }

    tracing::info!(
        samples = samples.len(),
        keyframes = tracker.keyframes.len(),
        "Motion analysis complete"
    );

    Ok(MotionAnalysis {
        keyframes: tracker.keyframes,
        samples,
    })
}
