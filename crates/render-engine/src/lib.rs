//! Glide Render Engine
//!
//! Turns a source recording and a camera trajectory into pixels, both for the
//! live preview and for export.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source video ──┐
//!                ├── PoseSource (smoothed preview / deterministic export)
//! trajectory ────┘         │
//!                          ├── Compositor: background, floating frame,
//! canvas style ────────────┘   source crop, cursor dot
//!                                        │
//!                    ┌───────────────────┴───────────────┐
//!                    ▼                                   ▼
//!             PreviewSession                      export producer
//!          (one frame per refresh)                       │ bounded channel
//!                                                        ▼
//!                                             FrameSink (ffmpeg / png / memory)
//! ```

pub mod compositor;
pub mod export;
pub mod media;
pub mod preview;

pub use compositor::{render_frame, source_crop, Compositor, CropRect, RenderError};
pub use export::*;
pub use media::{FfmpegSink, FfmpegVideoSource};
pub use preview::{PlaybackState, PreviewFrame, PreviewOptions, PreviewSession};
