//! Keyframe interpolation and the easing table.
//!
//! `sample` is a pure function of `(trajectory, t)`: export calls it directly
//! and the live preview feeds its output into the smoothing filter.

use glide_project_model::pose::{Easing, Keyframe, Pose};
use glide_project_model::project::EasingProfile;
use glide_project_model::timeline::EffectiveTrajectory;
use serde::{Deserialize, Serialize};

/// Concrete easing curves. Every call site resolves keyframe easing names to
/// one of these through an [`Interpolator`] so preview and export agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingCurve {
    Linear,
    EaseInOutCubic,
    EaseInOutQuad,
}

impl EasingCurve {
    /// Map progress in `[0, 1]` to eased progress in `[0, 1]`.
    pub fn apply(self, p: f64) -> f64 {
        match self {
            EasingCurve::Linear => p,
            EasingCurve::EaseInOutCubic => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    (p - 1.0) * (2.0 * p - 2.0) * (2.0 * p - 2.0) + 1.0
                }
            }
            EasingCurve::EaseInOutQuad => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    -1.0 + (4.0 - 2.0 * p) * p
                }
            }
        }
    }
}

/// Which rendering path is asking for a pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Preview,
    Export,
}

/// Resolve a keyframe easing name to a curve under a profile.
pub fn curve_for(easing: Easing, profile: EasingProfile, mode: RenderMode) -> EasingCurve {
    match (easing, profile, mode) {
        (Easing::Linear, _, _) => EasingCurve::Linear,
        (Easing::EaseInOut, EasingProfile::LegacyQuadExport, RenderMode::Export) => {
            EasingCurve::EaseInOutQuad
        }
        (Easing::EaseInOut, _, _) => EasingCurve::EaseInOutCubic,
    }
}

/// Samples an [`EffectiveTrajectory`] at arbitrary times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    /// Easing used when the arriving keyframe names none.
    pub default_easing: Easing,
    /// Curve that `ease-in-out` resolves to.
    pub ease_in_out: EasingCurve,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self {
            default_easing: Easing::EaseInOut,
            ease_in_out: EasingCurve::EaseInOutCubic,
        }
    }
}

impl Interpolator {
    /// Interpolator for a rendering path under the given profile.
    pub fn for_mode(profile: EasingProfile, mode: RenderMode) -> Self {
        Self {
            ease_in_out: curve_for(Easing::EaseInOut, profile, mode),
            ..Self::default()
        }
    }

    pub fn with_default_easing(mut self, easing: Easing) -> Self {
        self.default_easing = easing;
        self
    }

    fn curve(&self, easing: Option<Easing>) -> EasingCurve {
        match easing.unwrap_or(self.default_easing) {
            Easing::Linear => EasingCurve::Linear,
            Easing::EaseInOut => self.ease_in_out,
        }
    }

    /// Pose at time `t`.
    pub fn sample(&self, trajectory: &EffectiveTrajectory, t: f64) -> Pose {
        self.sample_keyframes(trajectory.keyframes(), t)
    }

    /// Pose at time `t` over keyframes sorted ascending by time.
    ///
    /// Holds the first pose before the first keyframe and the last pose at or
    /// after the last one. An empty slice yields the neutral pose.
    pub fn sample_keyframes(&self, keyframes: &[Keyframe], t: f64) -> Pose {
        let (Some(first), Some(last)) = (keyframes.first(), keyframes.last()) else {
            return Pose::NEUTRAL;
        };

        let next = keyframes.partition_point(|kf| kf.time <= t);
        if next == 0 {
            return first.pose();
        }
        if next >= keyframes.len() {
            return last.pose();
        }

        let k1 = &keyframes[next - 1];
        let k2 = &keyframes[next];
        let span = k2.time - k1.time;
        let progress = if span > 0.0 {
            ((t - k1.time) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = self.curve(k2.easing).apply(progress);
        Pose::lerp(&k1.pose(), &k2.pose(), eased)
    }
}

/// Sample with the canonical interpolator.
pub fn sample(trajectory: &EffectiveTrajectory, t: f64) -> Pose {
    Interpolator::default().sample(trajectory, t)
}
