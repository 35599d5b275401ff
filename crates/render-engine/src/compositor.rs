//! Frame compositor: background, floating frame, zoomed source, cursor.
//!
//! Every preview and export frame goes through [`Compositor::render`]:
//!
//! 1. fill the destination with the background
//! 2. draw the floating frame's drop shadow
//! 3. clip to the rounded floating frame
//! 4. compute the source crop for the pose ([`source_crop`], unclamped)
//! 5. apply the crop policy and draw the crop scaled to fill the frame
//! 6. draw the cursor dot, if enabled

use glide_common::error::GlideError;
use glide_processing_core::pose_source::FrameState;
use glide_project_model::pose::{Point2D, Pose};
use glide_project_model::style::{Background, CanvasStyle, Color, CropPolicy};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

/// Rectangle in source pixels. May extend past the source edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// Whether the rectangle lies inside a `width x height` source.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= width as f64 + EPS
            && self.y + self.height <= height as f64 + EPS
    }

    /// Translate the rectangle inside the source. A rectangle larger than
    /// the source along an axis is centered on that axis instead.
    pub fn clamped_to(&self, width: u32, height: u32) -> CropRect {
        let clamp_axis = |pos: f64, len: f64, extent: f64| {
            if len >= extent {
                (extent - len) / 2.0
            } else {
                pos.clamp(0.0, extent - len)
            }
        };
        CropRect {
            x: clamp_axis(self.x, self.width, width as f64),
            y: clamp_axis(self.y, self.height, height as f64),
            ..*self
        }
    }
}

/// Source crop for a pose: `W / zoom` by `H / zoom`, centered on `(x%, y%)`.
/// No clamping is applied.
pub fn source_crop(pose: &Pose, width: u32, height: u32) -> CropRect {
    let zoom = pose.zoom.max(f64::MIN_POSITIVE);
    let crop_w = width as f64 / zoom;
    let crop_h = height as f64 / zoom;
    CropRect {
        x: pose.x / 100.0 * width as f64 - crop_w / 2.0,
        y: pose.y / 100.0 * height as f64 - crop_h / 2.0,
        width: crop_w,
        height: crop_h,
    }
}

/// The floating frame in destination pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

impl FrameRect {
    /// Centered frame covering `scale` of the destination in each direction.
    pub fn centered(dest_width: u32, dest_height: u32, scale: f64, radius: f64) -> Self {
        let width = dest_width as f64 * scale;
        let height = dest_height as f64 * scale;
        Self {
            x: (dest_width as f64 - width) / 2.0,
            y: (dest_height as f64 - height) / 2.0,
            width,
            height,
            radius: radius.clamp(0.0, width.min(height) / 2.0),
        }
    }

    /// Signed distance from a point to the rounded rectangle edge, negative
    /// inside.
    pub fn signed_distance(&self, px: f64, py: f64) -> f64 {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let qx = (px - (self.x + half_w)).abs() - (half_w - self.radius);
        let qy = (py - (self.y + half_h)).abs() - (half_h - self.radius);
        let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
        outside + qx.max(qy).min(0.0) - self.radius
    }

    /// Anti-aliased coverage of the pixel centered at `(px, py)`.
    pub fn coverage(&self, px: f64, py: f64) -> f64 {
        (0.5 - self.signed_distance(px, py)).clamp(0.0, 1.0)
    }
}

/// Errors that abort a single frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("cannot draw into a {width}x{height} canvas")]
    EmptyCanvas { width: u32, height: u32 },

    #[error("source frame is empty")]
    EmptySource,

    #[error("crop {crop:?} leaves the {width}x{height} source")]
    CropOutOfBounds {
        crop: CropRect,
        width: u32,
        height: u32,
    },
}

impl From<RenderError> for GlideError {
    fn from(err: RenderError) -> Self {
        GlideError::render(err.to_string())
    }
}

/// Renders frames with a fixed style.
///
/// The background and shadow depend only on the style and canvas size, so
/// they are drawn once per size and reused.
#[derive(Debug, Clone)]
pub struct Compositor {
    style: CanvasStyle,
    base: Option<RgbaImage>,
}

impl Compositor {
    pub fn new(style: CanvasStyle) -> Self {
        Self { style, base: None }
    }

    pub fn style(&self) -> &CanvasStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: CanvasStyle) {
        self.style = style;
        self.base = None;
    }

    /// The floating frame for a destination size.
    pub fn frame_rect(&self, dest_width: u32, dest_height: u32) -> FrameRect {
        FrameRect::centered(
            dest_width,
            dest_height,
            self.style.clamped_frame_scale(),
            self.style.corner_radius,
        )
    }

    /// Composite one frame.
    pub fn render(
        &mut self,
        source: &RgbaImage,
        state: &FrameState,
        dest_width: u32,
        dest_height: u32,
    ) -> Result<RgbaImage, RenderError> {
        if dest_width == 0 || dest_height == 0 {
            return Err(RenderError::EmptyCanvas {
                width: dest_width,
                height: dest_height,
            });
        }
        let (src_w, src_h) = source.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(RenderError::EmptySource);
        }

        let crop = source_crop(&state.pose, src_w, src_h);
        let crop = match self.style.crop_policy {
            CropPolicy::Letterbox => crop,
            CropPolicy::Clamp => crop.clamped_to(src_w, src_h),
            CropPolicy::Reject if crop.is_within(src_w, src_h) => crop,
            CropPolicy::Reject => {
                return Err(RenderError::CropOutOfBounds {
                    crop,
                    width: src_w,
                    height: src_h,
                })
            }
        };

        let frame = self.frame_rect(dest_width, dest_height);
        let mut canvas = self.base_layer(dest_width, dest_height, &frame).clone();
        draw_source(&mut canvas, source, &crop, &frame);

        if self.style.cursor.visible {
            if let Some(cursor) = state.cursor {
                self.draw_cursor(&mut canvas, cursor, &crop, &frame, src_w, src_h, state.pose.zoom);
            }
        }

        Ok(canvas)
    }

    fn base_layer(&mut self, width: u32, height: u32, frame: &FrameRect) -> &RgbaImage {
        let stale = self
            .base
            .as_ref()
            .map(|img| img.dimensions() != (width, height))
            .unwrap_or(true);
        if stale {
            let mut base = fill_background(&self.style.background, width, height);
            draw_shadow(&mut base, frame, &self.style);
            self.base = Some(base);
        }
        self.base.get_or_insert_with(|| RgbaImage::new(width, height))
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_cursor(
        &self,
        canvas: &mut RgbaImage,
        cursor: Point2D,
        crop: &CropRect,
        frame: &FrameRect,
        src_w: u32,
        src_h: u32,
        zoom: f64,
    ) {
        let u = (cursor.x / 100.0 * src_w as f64 - crop.x) / crop.width;
        let v = (cursor.y / 100.0 * src_h as f64 - crop.y) / crop.height;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return;
        }
        let cx = frame.x + u * frame.width;
        let cy = frame.y + v * frame.height;
        if frame.coverage(cx, cy) <= 0.0 {
            return;
        }
        let radius = (self.style.cursor.radius * zoom.max(1.0)).round().max(1.0) as i32;
        draw_filled_circle_mut(
            canvas,
            (cx.round() as i32, cy.round() as i32),
            radius,
            Rgba(self.style.cursor.color.to_array()),
        );
    }
}

/// Render a single frame with a one-off compositor.
pub fn render_frame(
    source: &RgbaImage,
    pose: Pose,
    cursor: Option<Point2D>,
    dest_width: u32,
    dest_height: u32,
    style: &CanvasStyle,
) -> Result<RgbaImage, RenderError> {
    let state = FrameState {
        time: 0.0,
        pose,
        cursor,
    };
    Compositor::new(style.clone()).render(source, &state, dest_width, dest_height)
}

fn fill_background(background: &Background, width: u32, height: u32) -> RgbaImage {
    match background {
        Background::Solid { color } => RgbaImage::from_pixel(width, height, Rgba(color.to_array())),
        Background::LinearGradient {
            from,
            to,
            angle_deg,
        } => {
            let (dy, dx) = angle_deg.to_radians().sin_cos();
            let extent = (dx.abs() * width as f64 + dy.abs() * height as f64).max(1.0);
            let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
            RgbaImage::from_fn(width, height, |x, y| {
                let px = x as f64 + 0.5 - cx;
                let py = y as f64 + 0.5 - cy;
                let t = (px * dx + py * dy) / extent + 0.5;
                Rgba(from.mix(to, t).to_array())
            })
        }
    }
}

fn draw_shadow(canvas: &mut RgbaImage, frame: &FrameRect, style: &CanvasStyle) {
    let intensity = style.shadow.intensity.clamp(0.0, 1.0);
    if intensity <= 0.0 {
        return;
    }
    let blur = style.shadow.blur.max(1.0);
    let shadow = FrameRect {
        y: frame.y + style.shadow.offset_y,
        ..*frame
    };
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let d = shadow.signed_distance(x as f64 + 0.5, y as f64 + 0.5);
        if d >= blur {
            continue;
        }
        let falloff = if d <= 0.0 { 1.0 } else { 1.0 - d / blur };
        let alpha = (intensity * falloff * falloff * 255.0).round() as u8;
        *pixel = composite_over(*pixel, Rgba([0, 0, 0, alpha]));
    }
}

fn draw_source(canvas: &mut RgbaImage, source: &RgbaImage, crop: &CropRect, frame: &FrameRect) {
    let (src_w, src_h) = source.dimensions();
    let x0 = frame.x.floor().max(0.0) as u32;
    let y0 = frame.y.floor().max(0.0) as u32;
    let x1 = ((frame.x + frame.width).ceil() as u32).min(canvas.width());
    let y1 = ((frame.y + frame.height).ceil() as u32).min(canvas.height());
    let scale_x = crop.width / frame.width.max(f64::MIN_POSITIVE);
    let scale_y = crop.height / frame.height.max(f64::MIN_POSITIVE);
    let letterbox = Color::BLACK;

    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;
            let coverage = frame.coverage(px, py);
            if coverage <= 0.0 {
                continue;
            }

            let sx = crop.x + (px - frame.x) * scale_x;
            let sy = crop.y + (py - frame.y) * scale_y;
            let mut sampled = if sx < 0.0 || sy < 0.0 || sx > src_w as f64 || sy > src_h as f64 {
                Rgba(letterbox.to_array())
            } else {
                let opaque = sample_bilinear(source, sx - 0.5, sy - 0.5);
                composite_over(Rgba(letterbox.to_array()), opaque)
            };
            sampled[3] = (coverage * 255.0).round() as u8;

            let dst = canvas.get_pixel_mut(x, y);
            *dst = composite_over(*dst, sampled);
        }
    }
}

/// Bilinear sample at fractional pixel coordinates, clamping at the edges.
pub fn sample_bilinear(image: &RgbaImage, fx: f64, fy: f64) -> Rgba<u8> {
    let (w, h) = image.dimensions();
    let x0 = fx.floor() as i64;
    let y0 = fy.floor() as i64;
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let clamp_x = |x: i64| x.clamp(0, w as i64 - 1) as u32;
    let clamp_y = |y: i64| y.clamp(0, h as i64 - 1) as u32;

    let p00 = image.get_pixel(clamp_x(x0), clamp_y(y0));
    let p10 = image.get_pixel(clamp_x(x0 + 1), clamp_y(y0));
    let p01 = image.get_pixel(clamp_x(x0), clamp_y(y0 + 1));
    let p11 = image.get_pixel(clamp_x(x0 + 1), clamp_y(y0 + 1));

    let lerp = |a: u8, b: u8, t: f64| a as f64 + (b as f64 - a as f64) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(p00[c], p10[c], tx);
        let bottom = lerp(p01[c], p11[c], tx);
        out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Alpha-composite `src` over `dst`.
fn composite_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    let inv_sa = 255 - sa;
    Rgba([
        ((src[0] as u32 * sa + dst[0] as u32 * inv_sa) / 255) as u8,
        ((src[1] as u32 * sa + dst[1] as u32 * inv_sa) / 255) as u8,
        ((src[2] as u32 * sa + dst[2] as u32 * inv_sa) / 255) as u8,
        (sa + dst[3] as u32 * inv_sa / 255).min(255) as u8,
    ])
}
