//! Source video contract.
//!
//! The engine only needs to seek, read the current frame, and know the
//! duration. Decoding lives behind this trait (see the render engine's ffmpeg
//! source); [`FrameSequenceSource`] serves in-memory frames for tests and
//! synthetic input.

use std::ops::{Deref, DerefMut};

use glide_common::error::{GlideError, GlideResult};
use image::RgbaImage;

/// A seekable source of RGBA frames keyed by seconds.
pub trait VideoSource: Send {
    /// Frame size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Total duration in seconds.
    fn duration(&self) -> f64;

    /// Current read position in seconds.
    fn position(&self) -> f64;

    /// Move the read position. Blocks until the seek has completed.
    fn seek(&mut self, time: f64) -> GlideResult<()>;

    /// Decode the frame at the current position.
    fn read_frame(&mut self) -> GlideResult<RgbaImage>;
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn position(&self) -> f64 {
        (**self).position()
    }

    fn seek(&mut self, time: f64) -> GlideResult<()> {
        (**self).seek(time)
    }

    fn read_frame(&mut self) -> GlideResult<RgbaImage> {
        (**self).read_frame()
    }
}

/// Restores a source's read position when dropped.
///
/// Wraps the source for the duration of a scan so every exit path, including
/// errors and cancellation, puts the position back.
pub struct SeekGuard<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
    original: f64,
}

impl<'a, S: VideoSource + ?Sized> SeekGuard<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        let original = source.position();
        Self { source, original }
    }

    /// Position that will be restored.
    pub fn original_position(&self) -> f64 {
        self.original
    }
}

impl<S: VideoSource + ?Sized> Deref for SeekGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> DerefMut for SeekGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: VideoSource + ?Sized> Drop for SeekGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.source.seek(self.original) {
            tracing::warn!(
                error = %err,
                position = self.original,
                "Failed to restore source position"
            );
        }
    }
}

/// In-memory frames at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct FrameSequenceSource {
    frames: Vec<RgbaImage>,
    fps: u32,
    position: f64,
}

impl FrameSequenceSource {
    /// All frames must share the dimensions of the first one.
    pub fn new(frames: Vec<RgbaImage>, fps: u32) -> GlideResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| GlideError::media("frame sequence is empty"))?;
        let size = first.dimensions();
        if frames.iter().any(|f| f.dimensions() != size) {
            return Err(GlideError::media("frame sequence has mixed dimensions"));
        }
        Ok(Self {
            frames,
            fps: fps.max(1),
            position: 0.0,
        })
    }

    /// Solid-colored frames produced by `paint(index, frame)`.
    pub fn generate(
        count: usize,
        width: u32,
        height: u32,
        fps: u32,
        mut paint: impl FnMut(usize, &mut RgbaImage),
    ) -> GlideResult<Self> {
        let frames = (0..count)
            .map(|i| {
                let mut frame = RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
                paint(i, &mut frame);
                frame
            })
            .collect();
        Self::new(frames, fps)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn index_at(&self, time: f64) -> usize {
        let index = (time.max(0.0) * self.fps as f64 + 1e-9).floor() as usize;
        index.min(self.frames.len().saturating_sub(1))
    }
}

impl VideoSource for FrameSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((0, 0))
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps as f64
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, time: f64) -> GlideResult<()> {
        if !time.is_finite() {
            return Err(GlideError::media(format!("cannot seek to {time}")));
        }
        self.position = time.clamp(0.0, self.duration());
        Ok(())
    }

    fn read_frame(&mut self) -> GlideResult<RgbaImage> {
        self.frames
            .get(self.index_at(self.position))
            .cloned()
            .ok_or_else(|| GlideError::media("frame sequence is empty"))
    }
}
