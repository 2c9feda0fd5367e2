//! HSL and RGB color types with the standard conversion formulas.
//!
//! Units: hue in degrees, saturation and lightness in percent (0..100),
//! [`Rgb`] channels in 0..255 (kept as `f32` so they can be smoothed),
//! [`Rgba`] channels and alpha in 0..1 for gradient stops.

use crate::math::{clamp, clamp01, lerp, wrap_degrees};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    #[inline]
    pub const fn new(h: f32, s: f32, l: f32) -> Self { Self { h, s, l } }

    /// Hue wrapped into [0, 360), saturation and lightness clamped to [0, 100].
    #[inline]
    pub fn normalized(self) -> Self {
        Self { h: wrap_degrees(self.h), s: clamp(self.s, 0.0, 100.0), l: clamp(self.l, 0.0, 100.0) }
    }

    #[inline]
    pub fn to_rgb(self) -> Rgb { hsl_to_rgb(self) }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self { Self { r, g, b } }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self { r: lerp(self.r, other.r, t), g: lerp(self.g, other.g, t), b: lerp(self.b, other.b, t) }
    }

    #[inline]
    pub fn to_rgba(self, a: f32) -> Rgba {
        Rgba::new(self.r / 255.0, self.g / 255.0, self.b / 255.0, a)
    }

    #[inline]
    pub fn to_hsl(self) -> Hsl { rgb_to_hsl(self) }
}

/// Straight (non-premultiplied) color with alpha, every channel in [0, 1].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self { Self { r, g, b, a } }

    /// From 8-bit channels and a unit alpha, e.g. `Rgba::rgb8(210, 230, 255, 0.92)`.
    #[inline]
    pub fn rgb8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0, clamp01(a))
    }

    /// From a packed `0xRRGGBB`, opaque.
    #[inline]
    pub fn hex(rgb: u32) -> Self {
        let [_, r, g, b] = rgb.to_be_bytes();
        Self::rgb8(r, g, b, 1.0)
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self { Self { a: clamp01(a), ..self } }

    /// 8-bit channels, rounded and clamped.
    #[inline]
    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |c: f32| (clamp01(c) * 255.0 + 0.5) as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

/// Piecewise channel helper: `p`/`q` from lightness and saturation, `t` the shifted hue in turns.
#[inline]
pub fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = if t < 0.0 { t + 1.0 } else if t > 1.0 { t - 1.0 } else { t };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let Hsl { h, s, l } = hsl.normalized();
    let (h, s, l) = (h / 360.0, s / 100.0, l / 100.0);
    if s <= 0.0 {
        let v = l * 255.0;
        return Rgb::new(v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    Rgb::new(
        hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0,
        hue_to_rgb(p, q, h) * 255.0,
        hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0,
    )
}

pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let r = clamp01(rgb.r / 255.0);
    let g = clamp01(rgb.g / 255.0);
    let b = clamp01(rgb.b / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) * 0.5;
    let d = max - min;
    if d <= 0.0 {
        return Hsl::new(0.0, 0.0, l * 100.0);
    }
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    Hsl::new(h * 60.0, s * 100.0, l * 100.0)
}
