//! Camera pose, keyframe, and zoom-region types.
//!
//! A pose is `(zoom, x%, y%)`: `zoom = 1` shows the whole source frame and
//! `(x, y)` is the point of the source the camera is centered on.

use serde::{Deserialize, Serialize};

/// Id of the keyframe pinned at `t = 0`. It can never be deleted.
pub const START_KEYFRAME_ID: &str = "start";

/// Camera state at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Zoom factor, `>= 1`.
    pub zoom: f64,
    /// Horizontal center, percent of source width.
    pub x: f64,
    /// Vertical center, percent of source height.
    pub y: f64,
}

impl Pose {
    /// Identity camera: no zoom, centered.
    pub const NEUTRAL: Pose = Pose {
        zoom: 1.0,
        x: 50.0,
        y: 50.0,
    };

    pub fn new(zoom: f64, x: f64, y: f64) -> Self {
        Self { zoom, x, y }
    }

    /// Whether every component is inside its documented range.
    pub fn is_valid(&self) -> bool {
        self.zoom.is_finite()
            && self.zoom >= 1.0
            && (0.0..=100.0).contains(&self.x)
            && (0.0..=100.0).contains(&self.y)
    }

    /// Component-wise linear interpolation. `t` is not clamped.
    pub fn lerp(a: &Pose, b: &Pose, t: f64) -> Pose {
        Pose {
            zoom: a.zoom + (b.zoom - a.zoom) * t,
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    /// Approximate equality with a per-component tolerance.
    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        (self.zoom - other.zoom).abs() <= tolerance
            && (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Easing named on a keyframe; shapes the segment that ends at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    EaseInOut,
}

/// A fully specified camera pose pinned to an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Stable identifier.
    pub id: String,
    /// Seconds since recording start.
    pub time: f64,
    pub zoom: f64,
    pub x: f64,
    pub y: f64,
    /// Easing for the segment arriving at this keyframe. `None` defers to the
    /// interpolator's configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
}

impl Keyframe {
    pub fn new(id: impl Into<String>, time: f64, pose: Pose, easing: Option<Easing>) -> Self {
        Self {
            id: id.into(),
            time,
            zoom: pose.zoom,
            x: pose.x,
            y: pose.y,
            easing,
        }
    }

    /// The neutral `start` keyframe at `t = 0`.
    pub fn start() -> Self {
        Self::new(START_KEYFRAME_ID, 0.0, Pose::NEUTRAL, None)
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.zoom, self.x, self.y)
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.zoom = pose.zoom;
        self.x = pose.x;
        self.y = pose.y;
    }

    pub fn is_start(&self) -> bool {
        self.id == START_KEYFRAME_ID
    }
}

/// "Stay zoomed on an anchor from `start_time` to `end_time`."
///
/// Regions are compiled into keyframes; they are never interpolated directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomRegion {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub target_zoom: f64,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

impl ZoomRegion {
    pub fn new(
        id: impl Into<String>,
        start_time: f64,
        end_time: f64,
        target_zoom: f64,
        anchor_x: f64,
        anchor_y: f64,
    ) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            target_zoom,
            anchor_x,
            anchor_y,
        }
    }

    /// The zoomed pose held for the region.
    pub fn focus_pose(&self) -> Pose {
        Pose::new(self.target_zoom, self.anchor_x, self.anchor_y)
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// `0 <= start < end`, and the focus pose is valid.
    pub fn is_valid(&self) -> bool {
        self.start_time >= 0.0 && self.start_time < self.end_time && self.focus_pose().is_valid()
    }
}

/// A 2D point in percent coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_pose_is_valid() {
        assert!(Pose::NEUTRAL.is_valid());
        assert!(!Pose::new(0.5, 50.0, 50.0).is_valid());
        assert!(!Pose::new(2.0, 120.0, 50.0).is_valid());
        assert!(!Pose::new(f64::NAN, 50.0, 50.0).is_valid());
    }

    #[test]
    fn test_pose_lerp_midpoint() {
        let a = Pose::NEUTRAL;
        let b = Pose::new(2.0, 80.0, 20.0);
        let mid = Pose::lerp(&a, &b, 0.5);
        assert!(mid.approx_eq(&Pose::new(1.5, 65.0, 35.0), 1e-12));
    }

    #[test]
    fn test_easing_serializes_kebab_case() {
        let json = serde_json::to_string(&Easing::EaseInOut).unwrap();
        assert_eq!(json, "\"ease-in-out\"");
    }

    #[test]
    fn test_keyframe_without_easing_omits_field() {
        let kf = Keyframe::start();
        let json = serde_json::to_string(&kf).unwrap();
        assert!(!json.contains("easing"));
        let parsed: Keyframe = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_start());
        assert_eq!(parsed.pose(), Pose::NEUTRAL);
    }

    #[test]
    fn test_region_validity() {
        assert!(ZoomRegion::new("r", 5.0, 8.0, 2.0, 30.0, 70.0).is_valid());
        assert!(!ZoomRegion::new("r", 8.0, 5.0, 2.0, 30.0, 70.0).is_valid());
        assert!(!ZoomRegion::new("r", 5.0, 5.0, 2.0, 30.0, 70.0).is_valid());
        assert!(!ZoomRegion::new("r", 1.0, 2.0, 0.9, 30.0, 70.0).is_valid());
    }

    #[test]
    fn test_point2d_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }
}
