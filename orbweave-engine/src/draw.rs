//! Draw-list types and the backend seam.
//!
//! A frame is an ordered, back-to-front list of [`Layer`]s. The engine never touches
//! pixels; a [`DrawBackend`] (canvas adapter, SVG writer, FFI host) consumes the list.

use orbweave_core::color::Rgba;
use orbweave_core::glam::Vec2;
use serde::Serialize;
use thiserror::Error;

use crate::clock::FrameTiming;
use crate::envelope::Envelopes;
use crate::state::BlobId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Screen,
    Multiply,
    Plus,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position along the gradient, `[0, 1]`.
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fill {
    Solid { color: Rgba },
    Radial { center: Vec2, radius: f32, stops: Vec<GradientStop> },
    /// Conic gradient around `center`, starting at `start_angle` radians.
    Sweep { center: Vec2, start_angle: f32, stops: Vec<GradientStop> },
}

impl Fill {
    pub fn stops(&self) -> &[GradientStop] {
        match self {
            Self::Solid { .. } => &[],
            Self::Radial { stops, .. } | Self::Sweep { stops, .. } => stops,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outline {
    /// Closed path; the last point repeats the first.
    Path { points: Vec<Vec2> },
    Circle { center: Vec2, radius: f32 },
}

impl Outline {
    pub fn points(&self) -> &[Vec2] {
        match self {
            Self::Path { points } => points,
            Self::Circle { .. } => &[],
        }
    }
}

/// What a layer depicts. Hosts may use it to pick blur radii.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "blob", rename_all = "snake_case")]
pub enum LayerKind {
    Halo,
    Glow,
    Satellite(BlobId),
    Body,
    InnerShadow,
    CoreCool,
    CoreWarm,
    RimCool,
    RimWarm,
    Specular,
    Sparkle,
    Bloom,
    Vignette,
    /// Faint colored sector along one blob's edge.
    Whisper(BlobId),
    Ripple,
    CausticCool,
    CausticWarm,
    CausticBloom,
    Speck,
}

impl LayerKind {
    /// Small stable code for C hosts.
    pub fn code(self) -> u32 {
        match self {
            Self::Halo => 0,
            Self::Glow => 1,
            Self::Satellite(_) => 2,
            Self::Body => 3,
            Self::InnerShadow => 4,
            Self::CoreCool => 5,
            Self::CoreWarm => 6,
            Self::RimCool => 7,
            Self::RimWarm => 8,
            Self::Specular => 9,
            Self::Sparkle => 10,
            Self::Bloom => 11,
            Self::Vignette => 12,
            Self::Whisper(_) => 13,
            Self::Ripple => 14,
            Self::CausticCool => 15,
            Self::CausticWarm => 16,
            Self::CausticBloom => 17,
            Self::Speck => 18,
        }
    }

    /// Blob a per-blob layer belongs to.
    pub fn blob(self) -> Option<BlobId> {
        match self {
            Self::Satellite(id) | Self::Whisper(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub outline: Outline,
    pub fill: Fill,
    pub blend: BlendMode,
    /// Whole-layer opacity, `[0, 1]`.
    pub opacity: f32,
    /// Stroke the outline with this width instead of filling it.
    pub stroke: Option<f32>,
}

/// Viewport in pixels. Both sides are at least 1.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        let side = |v: f32| if v.is_finite() { v.max(1.0) } else { 1.0 };
        Self { width: side(width), height: side(height) }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    #[inline]
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// Everything one frame hands to the backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameOutput {
    pub timing: FrameTiming,
    pub viewport: Viewport,
    pub envelopes: Envelopes,
    pub background: Rgba,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("drawing surface unavailable")]
    SurfaceLost,
    #[error("backend rejected frame: {0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Consumer of finished frames.
pub trait DrawBackend {
    fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError>;
}

impl<B: DrawBackend + ?Sized> DrawBackend for &mut B {
    fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError> {
        (**self).draw(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_has_minimum_size() {
        let v = Viewport::new(0.0, -20.0);
        assert_eq!((v.width, v.height), (1.0, 1.0));
        let v = Viewport::new(f32::NAN, 300.0);
        assert_eq!(v.width, 1.0);
        assert_eq!(Viewport::new(400.0, 300.0).min_side(), 300.0);
        assert_eq!(Viewport::new(400.0, 300.0).center(), Vec2::new(200.0, 150.0));
    }

    #[test]
    fn layer_serializes_with_tags() {
        let layer = Layer {
            kind: LayerKind::Satellite(BlobId(3)),
            outline: Outline::Circle { center: Vec2::new(1.0, 2.0), radius: 3.0 },
            fill: Fill::Solid { color: Rgba::WHITE },
            blend: BlendMode::Screen,
            opacity: 0.5,
            stroke: None,
        };
        let json = serde_json::to_value(&layer).expect("json");
        assert_eq!(json["kind"]["kind"], "satellite");
        assert_eq!(json["kind"]["blob"], 3);
        assert_eq!(json["outline"]["type"], "circle");
        assert_eq!(json["blend"], "screen");
    }

    #[test]
    fn layer_codes_are_distinct() {
        let kinds = [
            LayerKind::Halo,
            LayerKind::Glow,
            LayerKind::Satellite(BlobId(2)),
            LayerKind::Body,
            LayerKind::InnerShadow,
            LayerKind::CoreCool,
            LayerKind::CoreWarm,
            LayerKind::RimCool,
            LayerKind::RimWarm,
            LayerKind::Specular,
            LayerKind::Sparkle,
            LayerKind::Bloom,
            LayerKind::Vignette,
            LayerKind::Whisper(BlobId(0)),
            LayerKind::Ripple,
            LayerKind::CausticCool,
            LayerKind::CausticWarm,
            LayerKind::CausticBloom,
            LayerKind::Speck,
        ];
        let mut codes: Vec<u32> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert_eq!(LayerKind::Whisper(BlobId(4)).blob(), Some(BlobId(4)));
        assert_eq!(LayerKind::Speck.blob(), None);
    }
}
