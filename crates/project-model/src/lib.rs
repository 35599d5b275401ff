//! Glide Project Model
//!
//! Defines the core data contracts for Glide projects:
//! - **Events:** Timestamped pointer/key events from the recording session
//! - **Pose / Keyframe / ZoomRegion:** Camera authoring primitives
//! - **Timeline:** Manual keyframes and zoom regions, plus the derived trajectory type
//! - **Style:** Background, floating frame, and crop policy used by the compositor
//! - **Project:** Top-level metadata, source reference, and export configuration
//!
//! Positions are percentages in `[0, 100]` of the captured frame and times
//! are seconds relative to recording start.

pub mod event;
pub mod pose;
pub mod project;
pub mod style;
pub mod timeline;

pub use event::*;
pub use pose::*;
pub use project::*;
pub use style::*;
pub use timeline::*;
