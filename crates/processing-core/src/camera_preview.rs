//! Camera motion preview helpers.
//!
//! Generates CSS-like transform samples so UI clients can preview camera
//! movement by transforming the source element instead of rendering pixels.

use glide_project_model::pose::Pose;
use glide_project_model::timeline::EffectiveTrajectory;

use crate::interpolate::Interpolator;

/// A pose expressed as a view transform with a top-left origin.
///
/// Scaling the source by `scale` and then translating by the percentages puts
/// the pose's focus point at the center of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x_percent: f64,
    pub translate_y_percent: f64,
}

impl ViewTransform {
    pub fn from_pose(pose: &Pose) -> Self {
        let scale = pose.zoom.max(1.0);
        Self {
            scale,
            translate_x_percent: (0.5 - scale * pose.x / 100.0) * 100.0,
            translate_y_percent: (0.5 - scale * pose.y / 100.0) * 100.0,
        }
    }

    pub fn identity() -> Self {
        Self::from_pose(&Pose::NEUTRAL)
    }

    pub fn css_transform(&self) -> String {
        format!(
            "translate({:.3}%, {:.3}%) scale({:.4})",
            self.translate_x_percent, self.translate_y_percent, self.scale
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMotionFrame {
    pub time_secs: f64,
    pub pose: Pose,
    pub transform: ViewTransform,
}

/// Simulate frame-by-frame camera transforms from a trajectory.
pub fn simulate_camera_motion(
    trajectory: &EffectiveTrajectory,
    interpolator: &Interpolator,
    duration_secs: f64,
    sample_rate_fps: f64,
) -> Vec<CameraMotionFrame> {
    let sample_rate_fps = sample_rate_fps.max(1.0);
    let duration_secs = duration_secs.max(0.0);
    let count = (duration_secs * sample_rate_fps).floor() as u64;

    (0..=count)
        .map(|i| {
            let t = i as f64 / sample_rate_fps;
            let pose = interpolator.sample(trajectory, t);
            CameraMotionFrame {
                time_secs: t,
                pose,
                transform: ViewTransform::from_pose(&pose),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use glide_project_model::pose::{Easing, Keyframe};

    use super::*;

    #[test]
    fn preview_generates_frames() {
        let trajectory = EffectiveTrajectory::from_sorted(vec![
            Keyframe::start(),
            Keyframe::new("kf-1", 2.0, Pose::new(2.0, 25.0, 25.0), Some(Easing::Linear)),
        ]);

        let frames = simulate_camera_motion(&trajectory, &Interpolator::default(), 2.0, 10.0);
        assert_eq!(frames.len(), 21);
        assert!((frames[0].transform.scale - 1.0).abs() < 1e-9);
        assert!((frames.last().unwrap().transform.scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn neutral_pose_is_identity_transform() {
        let t = ViewTransform::identity();
        assert_eq!(t.scale, 1.0);
        assert!(t.translate_x_percent.abs() < 1e-12);
        assert!(t.translate_y_percent.abs() < 1e-12);
    }

    #[test]
    fn zoomed_pose_centers_focus_point() {
        let t = ViewTransform::from_pose(&Pose::new(2.0, 25.0, 75.0));
        // focus (0.25, 0.75) scaled by 2 lands at (0.5, 1.5); shift by (0, -1)
        assert!((t.translate_x_percent - 0.0).abs() < 1e-9);
        assert!((t.translate_y_percent + 100.0).abs() < 1e-9);
    }

    #[test]
    fn css_transform_string_is_stable() {
        let transform = ViewTransform {
            scale: 1.5,
            translate_x_percent: -12.345,
            translate_y_percent: -9.876,
        };
        let css = transform.css_transform();
        assert_eq!(css, "translate(-12.345%, -9.876%) scale(1.5000)");
    }
}
