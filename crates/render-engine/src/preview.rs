//! Live preview loop.
//!
//! The host calls [`PreviewSession::tick`] once per display refresh. While
//! playing, the playhead follows the wall clock and the camera is damped by
//! [`SmoothedLive`]. While paused, scrubbing and edits render synchronously
//! so the result is visible before the next input is handled.

use glide_common::clock::{FrameClock, RateController};
use glide_common::error::GlideResult;
use glide_processing_core::camera_preview::ViewTransform;
use glide_processing_core::cursor::CursorTrack;
use glide_processing_core::interpolate::{Interpolator, RenderMode};
use glide_processing_core::pose_source::{FrameState, PoseSource, SmoothedLive};
use glide_processing_core::smoothing::SmoothingConfig;
use glide_processing_core::source::VideoSource;
use glide_project_model::project::EasingProfile;
use glide_project_model::style::CanvasStyle;
use glide_project_model::timeline::EffectiveTrajectory;
use image::RgbaImage;

use crate::compositor::Compositor;

/// Playback state of a preview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    /// Torn down. Ticks are ignored until `play` is called again.
    Stopped,
}

/// One rendered preview step.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub state: FrameState,
    /// Pose as a view transform, for clients that scale the video element
    /// instead of drawing pixels.
    pub transform: ViewTransform,
    /// Composited pixels, when the session has a source to draw from.
    pub image: Option<RgbaImage>,
}

/// Preview canvas and pacing settings.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub refresh_hz: u32,
    pub style: CanvasStyle,
    pub smoothing: SmoothingConfig,
    pub easing_profile: EasingProfile,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            refresh_hz: 60,
            style: CanvasStyle::default(),
            smoothing: SmoothingConfig::default(),
            easing_profile: EasingProfile::default(),
        }
    }
}

pub struct PreviewSession {
    source: Option<Box<dyn VideoSource>>,
    compositor: Compositor,
    pose_source: SmoothedLive,
    rate: RateController,
    trajectory: EffectiveTrajectory,
    state: PlaybackState,
    playhead: f64,
    duration: f64,
    /// Wall clock and playhead at the moment playback (re)started.
    anchor: Option<(u64, f64)>,
    /// Most recent decoded source frame, held when the source runs dry at the end.
    last_pixels: Option<RgbaImage>,
    width: u32,
    height: u32,
}

impl PreviewSession {
    /// Create a paused session at `t = 0`.
    ///
    /// Without a source only poses and view transforms are produced. The
    /// duration comes from the source when there is one, otherwise from the
    /// trajectory's last keyframe.
    pub fn new(
        trajectory: EffectiveTrajectory,
        cursor: CursorTrack,
        source: Option<Box<dyn VideoSource>>,
        options: PreviewOptions,
    ) -> Self {
        let duration = source
            .as_ref()
            .map(|s| s.duration())
            .unwrap_or_else(|| trajectory.end_time());
        let interpolator = Interpolator::for_mode(options.easing_profile, RenderMode::Preview);

        Self {
            source,
            compositor: Compositor::new(options.style),
            pose_source: SmoothedLive::new(interpolator, cursor, options.smoothing),
            rate: RateController::new(options.refresh_hz),
            trajectory,
            state: PlaybackState::Paused,
            playhead: 0.0,
            duration: duration.max(0.0),
            anchor: None,
            last_pixels: None,
            width: options.width,
            height: options.height,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn trajectory(&self) -> &EffectiveTrajectory {
        &self.trajectory
    }

    pub fn play(&mut self) {
        if self.state == PlaybackState::Stopped {
            self.pose_source.reset();
        }
        if self.playhead >= self.duration {
            self.playhead = 0.0;
        }
        self.state = PlaybackState::Playing;
        self.anchor = None;
        self.rate.reset();
        tracing::debug!(playhead = self.playhead, "Preview playing");
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.anchor = None;
            tracing::debug!(playhead = self.playhead, "Preview paused");
        }
    }

    /// Cancel the loop. Further ticks do nothing.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.anchor = None;
        self.pose_source.reset();
        tracing::debug!("Preview stopped");
    }

    /// Advance one display refresh.
    ///
    /// Returns `None` when not playing or when the refresh interval has not
    /// elapsed yet. A frame the compositor cannot draw is skipped with a
    /// warning; source errors are returned. Reaching the end pauses the
    /// session even when the final decode fails, and a source with no frame
    /// at its duration shows the last frame it did decode.
    pub fn tick(&mut self, now_ns: u64) -> GlideResult<Option<PreviewFrame>> {
        if self.state != PlaybackState::Playing || !self.rate.should_tick(now_ns) {
            return Ok(None);
        }

        let (anchor_ns, anchor_time) = *self.anchor.get_or_insert((now_ns, self.playhead));
        let elapsed = FrameClock::ns_to_secs(now_ns.saturating_sub(anchor_ns));
        let time = (anchor_time + elapsed).min(self.duration);
        self.playhead = time;

        if time >= self.duration {
            self.state = PlaybackState::Paused;
            self.anchor = None;
            tracing::debug!("Preview reached the end of the source");
        }
        self.render(time, false)
    }

    /// Jump to `time` and render it immediately, without damping.
    pub fn scrub(&mut self, time: f64) -> GlideResult<Option<PreviewFrame>> {
        if self.state == PlaybackState::Stopped {
            return Ok(None);
        }
        self.playhead = time.clamp(0.0, self.duration);
        self.anchor = None;
        self.render(self.playhead, true)
    }

    /// Swap in a recompiled trajectory.
    ///
    /// When paused, the current playhead is re-rendered right away. While
    /// playing, the next tick picks up the change.
    pub fn on_edit(&mut self, trajectory: EffectiveTrajectory) -> GlideResult<Option<PreviewFrame>> {
        self.trajectory = trajectory;
        if self.source.is_none() {
            self.duration = self.duration.max(self.trajectory.end_time());
        }
        match self.state {
            PlaybackState::Paused => self.render(self.playhead, true),
            PlaybackState::Playing | PlaybackState::Stopped => Ok(None),
        }
    }

    /// Replace the canvas style. Paused sessions re-render immediately.
    pub fn set_style(&mut self, style: CanvasStyle) -> GlideResult<Option<PreviewFrame>> {
        self.compositor.set_style(style);
        match self.state {
            PlaybackState::Paused => self.render(self.playhead, true),
            PlaybackState::Playing | PlaybackState::Stopped => Ok(None),
        }
    }

    fn render(&mut self, time: f64, snap: bool) -> GlideResult<Option<PreviewFrame>> {
        let state = if snap {
            self.pose_source.snap_to(&self.trajectory, time)
        } else {
            self.pose_source.frame_at(&self.trajectory, time)
        };
        let transform = ViewTransform::from_pose(&state.pose);

        let image = match self.source.as_mut() {
            Some(source) => {
                match source.seek(time).and_then(|()| source.read_frame()) {
                    Ok(pixels) => self.last_pixels = Some(pixels),
                    Err(err) if time >= self.duration && self.last_pixels.is_some() => {
                        tracing::debug!(time, error = %err, "Holding last decoded frame");
                    }
                    Err(err) => return Err(err),
                }
                let Some(pixels) = self.last_pixels.as_ref() else {
                    return Ok(None);
                };
                match self.compositor.render(pixels, &state, self.width, self.height) {
                    Ok(image) => Some(image),
                    Err(err) => {
                        tracing::warn!(time, error = %err, "Skipping preview frame");
                        return Ok(None);
                    }
                }
            }
            None => None,
        };

        Ok(Some(PreviewFrame {
            state,
            transform,
            image,
        }))
    }
}
