//! Exponential damping for the live preview.
//!
//! The filter state is a plain value. Callers own it and thread it through
//! [`step_camera`] / [`step_cursor`] once per rendered preview frame. Export
//! never runs this filter.

use glide_project_model::pose::{Point2D, Pose};

/// Damping factors and snap thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingConfig {
    /// Fraction of the remaining camera position distance covered per frame.
    pub position_factor: f64,
    /// Fraction of the remaining zoom distance covered per frame.
    pub zoom_factor: f64,
    /// Fraction of the remaining cursor distance covered per frame.
    pub cursor_factor: f64,
    /// Position deltas below this (percent) snap to the target.
    pub position_snap: f64,
    /// Zoom deltas below this snap to the target.
    pub zoom_snap: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            position_factor: 0.05,
            zoom_factor: 0.08,
            cursor_factor: 0.20,
            position_snap: 0.01,
            zoom_snap: 0.001,
        }
    }
}

/// Damped camera state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualCamera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl VirtualCamera {
    /// A camera resting exactly on `pose`.
    pub fn at(pose: Pose) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            zoom: pose.zoom,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.zoom, self.x, self.y)
    }
}

/// Damped cursor state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualCursor {
    pub x: f64,
    pub y: f64,
}

impl VirtualCursor {
    pub fn at(point: Point2D) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// `a + (b - a) * f`
pub fn lerp(a: f64, b: f64, f: f64) -> f64 {
    a + (b - a) * f
}

/// Advance the camera one frame toward `target`.
pub fn step_camera(camera: VirtualCamera, target: Pose, config: &SmoothingConfig) -> VirtualCamera {
    let mut x = lerp(camera.x, target.x, config.position_factor);
    let mut y = lerp(camera.y, target.y, config.position_factor);
    let mut zoom = lerp(camera.zoom, target.zoom, config.zoom_factor);

    if (target.x - x).abs() < config.position_snap && (target.y - y).abs() < config.position_snap
    {
        x = target.x;
        y = target.y;
    }
    if (target.zoom - zoom).abs() < config.zoom_snap {
        zoom = target.zoom;
    }

    VirtualCamera { x, y, zoom }
}

/// Advance the cursor one frame toward the raw cursor position.
pub fn step_cursor(cursor: VirtualCursor, raw: Point2D, config: &SmoothingConfig) -> VirtualCursor {
    let mut x = lerp(cursor.x, raw.x, config.cursor_factor);
    let mut y = lerp(cursor.y, raw.y, config.cursor_factor);

    if (raw.x - x).abs() < config.position_snap && (raw.y - y).abs() < config.position_snap {
        x = raw.x;
        y = raw.y;
    }

    VirtualCursor { x, y }
}
