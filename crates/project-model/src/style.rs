//! Canvas styling used by the compositor.
//!
//! A styled frame is a background fill, a centered rounded "floating frame"
//! with a drop shadow, and the zoomed source drawn inside it.

use serde::{Deserialize, Serialize};

/// RGBA color serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let digits = hex.trim().trim_start_matches('#');
        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| format!("invalid color '{hex}'"))
        };
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            8 => Ok(Self::rgba(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
                channel(&digits[6..8])?,
            )),
            _ => Err(format!("invalid color '{hex}'")),
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Channel-wise linear mix, `t` clamped to `[0, 1]`.
    pub fn mix(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgba(
            lerp(self.r, other.r),
            lerp(self.g, other.g),
            lerp(self.b, other.b),
            lerp(self.a, other.a),
        )
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Destination fill drawn behind the floating frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Background {
    Solid { color: Color },
    /// Two-stop linear gradient. `angle_deg = 0` runs left to right,
    /// `90` runs top to bottom.
    LinearGradient {
        from: Color,
        to: Color,
        #[serde(default)]
        angle_deg: f64,
    },
}

impl Default for Background {
    fn default() -> Self {
        Background::Solid {
            color: Color::rgb(0x1a, 0x1a, 0x1a),
        }
    }
}

/// Drop shadow under the floating frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowStyle {
    /// Opacity multiplier in `[0, 1]`; `0` disables the shadow.
    pub intensity: f64,
    /// Blur falloff distance in output pixels.
    pub blur: f64,
    /// Vertical offset in output pixels.
    pub offset_y: f64,
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            intensity: 0.6,
            blur: 24.0,
            offset_y: 8.0,
        }
    }
}

/// What the compositor does with crop rectangles that leave the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropPolicy {
    /// Sample outside the source as opaque black inside the frame.
    #[default]
    Letterbox,
    /// Translate the crop so it lies inside the source where possible.
    Clamp,
    /// Refuse to render the frame.
    Reject,
}

/// Synthetic cursor drawn over the composited source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorStyle {
    pub visible: bool,
    /// Radius in output pixels at zoom 1. Scales with zoom.
    pub radius: f64,
    pub color: Color,
}

impl Default for CursorStyle {
    fn default() -> Self {
        Self {
            visible: false,
            radius: 6.0,
            color: Color::rgba(255, 255, 255, 230),
        }
    }
}

/// Full compositor style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasStyle {
    pub background: Background,
    /// Floating frame size as a fraction of the destination, `[0.5, 1.0]`.
    pub frame_scale: f64,
    /// Rounded corner radius in output pixels.
    pub corner_radius: f64,
    pub shadow: ShadowStyle,
    pub crop_policy: CropPolicy,
    pub cursor: CursorStyle,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background: Background::default(),
            frame_scale: 0.85,
            corner_radius: 20.0,
            shadow: ShadowStyle::default(),
            crop_policy: CropPolicy::default(),
            cursor: CursorStyle::default(),
        }
    }
}

impl CanvasStyle {
    /// Edge-to-edge source with no frame decoration.
    pub fn plain() -> Self {
        Self {
            frame_scale: 1.0,
            corner_radius: 0.0,
            shadow: ShadowStyle {
                intensity: 0.0,
                ..ShadowStyle::default()
            },
            ..Self::default()
        }
    }

    /// Frame scale clamped into the supported range.
    pub fn clamped_frame_scale(&self) -> f64 {
        if self.frame_scale.is_finite() {
            self.frame_scale.clamp(0.5, 1.0)
        } else {
            1.0
        }
    }
}
