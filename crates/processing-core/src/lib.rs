//! Glide Processing Core: the temporal camera engine
//!
//! Turns authored camera decisions and recorded input into a continuous
//! camera trajectory:
//! - **Trajectory:** Compile manual keyframes + zoom regions into a sorted, debounced sequence
//! - **Interpolation:** Sample the trajectory at any time through a shared easing table
//! - **Smoothing:** Exponential damping for the live preview only
//! - **Pose sources:** Deterministic (export) and smoothed (preview) rendering modes
//! - **Auto-Zoom:** Click-driven regions, or frame-difference keyframes as a fallback
//!
//! Everything here is computation over data. The only I/O seam is the
//! [`VideoSource`] trait used by motion analysis.

pub mod auto_zoom;
pub mod camera_preview;
pub mod cursor;
pub mod interpolate;
pub mod motion;
pub mod pose_source;
pub mod smoothing;
pub mod source;
pub mod trajectory;

pub use auto_zoom::{AutoZoomSynthesizer, EventZoomConfig, SynthesisOutcome, SynthesisStrategy};
pub use camera_preview::ViewTransform;
pub use cursor::CursorTrack;
pub use interpolate::{EasingCurve, Interpolator, RenderMode};
pub use motion::MotionConfig;
pub use pose_source::{DeterministicSample, FrameState, PoseSource, SmoothedLive};
pub use smoothing::SmoothingConfig;
pub use source::{FrameSequenceSource, SeekGuard, VideoSource};
pub use trajectory::{compile, compile_timeline, CompileConfig};
