//! Pose sources: how a rendering path turns time into a camera pose.
//!
//! Export uses [`DeterministicSample`], a pure function of time. The live
//! preview uses [`SmoothedLive`], which damps the same interpolated target
//! and therefore depends on the frames rendered before it.

use glide_project_model::pose::{Point2D, Pose};
use glide_project_model::timeline::EffectiveTrajectory;

use crate::cursor::CursorTrack;
use crate::interpolate::Interpolator;
use crate::smoothing::{step_camera, step_cursor, SmoothingConfig, VirtualCamera, VirtualCursor};

/// Everything the compositor needs about one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub time: f64,
    pub pose: Pose,
    /// Cursor position in source percent, if the recording has one.
    pub cursor: Option<Point2D>,
}

/// Produces the camera pose and cursor position for successive frames.
pub trait PoseSource {
    /// State for the frame at `time`.
    fn frame_at(&mut self, trajectory: &EffectiveTrajectory, time: f64) -> FrameState;

    /// Discard any history so the next frame lands exactly on its target.
    fn reset(&mut self) {}

    /// Whether `frame_at` is a pure function of its arguments.
    fn is_deterministic(&self) -> bool;
}

/// Interpolated pose with no history. Used for export.
#[derive(Debug, Clone, Default)]
pub struct DeterministicSample {
    interpolator: Interpolator,
    cursor: CursorTrack,
}

impl DeterministicSample {
    pub fn new(interpolator: Interpolator, cursor: CursorTrack) -> Self {
        Self {
            interpolator,
            cursor,
        }
    }
}

impl PoseSource for DeterministicSample {
    fn frame_at(&mut self, trajectory: &EffectiveTrajectory, time: f64) -> FrameState {
        FrameState {
            time,
            pose: self.interpolator.sample(trajectory, time),
            cursor: self.cursor.position_at(time),
        }
    }

    fn is_deterministic(&self) -> bool {
        true
    }
}

/// Interpolated pose passed through the exponential damping filter.
#[derive(Debug, Clone, Default)]
pub struct SmoothedLive {
    interpolator: Interpolator,
    cursor_track: CursorTrack,
    config: SmoothingConfig,
    camera: Option<VirtualCamera>,
    cursor: Option<VirtualCursor>,
}

impl SmoothedLive {
    pub fn new(interpolator: Interpolator, cursor_track: CursorTrack, config: SmoothingConfig) -> Self {
        Self {
            interpolator,
            cursor_track,
            config,
            camera: None,
            cursor: None,
        }
    }

    pub fn camera(&self) -> Option<VirtualCamera> {
        self.camera
    }

    pub fn cursor(&self) -> Option<VirtualCursor> {
        self.cursor
    }

    /// Jump the filter state onto the targets at `time`.
    ///
    /// Scrubbing is an instantaneous jump, not an animated transition.
    pub fn snap_to(&mut self, trajectory: &EffectiveTrajectory, time: f64) -> FrameState {
        let pose = self.interpolator.sample(trajectory, time);
        let raw_cursor = self.cursor_track.position_at(time);
        self.camera = Some(VirtualCamera::at(pose));
        self.cursor = raw_cursor.map(VirtualCursor::at);
        FrameState {
            time,
            pose,
            cursor: raw_cursor,
        }
    }
}

impl PoseSource for SmoothedLive {
    fn frame_at(&mut self, trajectory: &EffectiveTrajectory, time: f64) -> FrameState {
        let target = self.interpolator.sample(trajectory, time);
        let camera = match self.camera {
            Some(camera) => step_camera(camera, target, &self.config),
            None => VirtualCamera::at(target),
        };
        self.camera = Some(camera);

        let cursor = match (self.cursor, self.cursor_track.position_at(time)) {
            (Some(state), Some(raw)) => Some(step_cursor(state, raw, &self.config)),
            (None, Some(raw)) => Some(VirtualCursor::at(raw)),
            (_, None) => None,
        };
        self.cursor = cursor;

        FrameState {
            time,
            pose: camera.pose(),
            cursor: cursor.map(|c| c.point()),
        }
    }

    fn reset(&mut self) {
        self.camera = None;
        self.cursor = None;
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use glide_project_model::event::InputEvent;
    use glide_project_model::pose::{Easing, Keyframe};

    use super::*;

    fn trajectory() -> EffectiveTrajectory {
        EffectiveTrajectory::from_sorted(vec![
            Keyframe::start(),
            Keyframe::new("kf-1", 2.0, Pose::new(2.0, 80.0, 20.0), Some(Easing::EaseInOut)),
        ])
    }

    #[test]
    fn test_deterministic_sample_ignores_history() {
        let trajectory = trajectory();
        let mut source = DeterministicSample::default();
        let a = source.frame_at(&trajectory, 1.0);
        source.frame_at(&trajectory, 1.9);
        let b = source.frame_at(&trajectory, 1.0);
        assert_eq!(a, b);
        assert!(source.is_deterministic());
    }

    #[test]
    fn test_smoothed_live_lags_behind_target() {
        let trajectory = trajectory();
        let mut live = SmoothedLive::default();
        let first = live.frame_at(&trajectory, 0.0);
        assert_eq!(first.pose, Pose::NEUTRAL);

        let later = live.frame_at(&trajectory, 2.0);
        assert!(later.pose.zoom > 1.0);
        assert!(later.pose.zoom < 2.0);
        assert!(!live.is_deterministic());
    }

    #[test]
    fn test_reset_and_snap_land_on_target() {
        let trajectory = trajectory();
        let mut live = SmoothedLive::default();
        live.frame_at(&trajectory, 0.0);

        live.reset();
        let frame = live.frame_at(&trajectory, 2.0);
        assert_eq!(frame.pose, Pose::new(2.0, 80.0, 20.0));

        live.frame_at(&trajectory, 0.0);
        let snapped = live.snap_to(&trajectory, 1.0);
        assert_eq!(snapped.pose, sample_exact(&trajectory, 1.0));
        assert_eq!(live.camera().unwrap().pose(), snapped.pose);
    }

    #[test]
    fn test_cursor_is_damped_in_preview_only() {
        let trajectory = trajectory();
        let track = CursorTrack::from_events(&[
            InputEvent::pointer_move(0.0, 0.0, 0.0),
            InputEvent::pointer_move(1.0, 100.0, 100.0),
        ]);

        let mut export = DeterministicSample::new(Interpolator::default(), track.clone());
        assert_eq!(
            export.frame_at(&trajectory, 1.0).cursor,
            Some(Point2D::new(100.0, 100.0))
        );

        let mut live = SmoothedLive::new(Interpolator::default(), track, SmoothingConfig::default());
        live.frame_at(&trajectory, 0.0);
        let cursor = live.frame_at(&trajectory, 1.0).cursor.unwrap();
        assert!((cursor.x - 20.0).abs() < 1e-9);
    }

    fn sample_exact(trajectory: &EffectiveTrajectory, t: f64) -> Pose {
        crate::interpolate::sample(trajectory, t)
    }
}
