//! Presets: every tunable of the engine as data.
//!
//! A [`Preset`] describes the blob set (body, optional glow, satellites) and all timing,
//! color, placement and layer tuning. Visual variants are presets, not code paths.
//! Presets round-trip through TOML; missing fields fall back to the `siri` defaults.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::ClockTuning;
use crate::envelope::{AmplitudeScale, EnvelopeSet, EnvelopeSource};
use crate::detail::{DetailTuning, MAX_SPECKS};
use crate::layers::LayerToggles;
use crate::motion::OrbTuning;
use crate::palette::{default_palette, ColorTuning, PaletteSlot};
use crate::placement::{OrbitParams, PlacementTuning, RepulsionTuning};
use crate::shape::{Anisotropy, Breathing, Harmonic, ShapeParams};
use crate::state::BlobId;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("unknown preset `{0}`")]
    Unknown(String),
    #[error("preset parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("preset serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{id}: {samples} angle samples, need at least 3")]
    TooFewSamples { id: BlobId, samples: usize },
    #[error("{id}: size must be positive, got {size}")]
    NonPositiveSize { id: BlobId, size: f32 },
    #[error("{0} is used by more than one blob")]
    DuplicateId(BlobId),
    #[error("{id}: palette slot {slot} out of range (palette has {len})")]
    PaletteSlot { id: BlobId, slot: usize, len: usize },
    #[error("palette is empty")]
    EmptyPalette,
    #[error("invalid `{field}`: {value}")]
    InvalidTuning { field: &'static str, value: f32 },
    #[error("the main envelope cannot be sourced from itself")]
    SelfSourcedMain,
}

/// Spline settings for the two outline variants.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineTuning {
    pub body_tension: f32,
    pub satellite_tension: f32,
    /// Sub-steps per segment.
    pub steps: usize,
}

impl Default for SplineTuning {
    fn default() -> Self {
        Self { body_tension: 0.6, satellite_tension: 0.44, steps: 8 }
    }
}

/// Constant configuration of one blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub id: BlobId,
    /// Unit-interval seed for phases and noise.
    pub seed: f32,
    /// Base radius relative to the orb radius.
    pub size: f32,
    pub palette_slot: usize,
    pub shape: ShapeParams,
    pub orbit: OrbitParams,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            id: BlobId(0),
            seed: 0.0,
            size: 1.0,
            palette_slot: 0,
            shape: ShapeParams::default(),
            orbit: OrbitParams::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub name: String,
    pub amplitude_scale: AmplitudeScale,
    pub clock: ClockTuning,
    pub orb: OrbTuning,
    pub envelopes: EnvelopeSet,
    pub color: ColorTuning,
    pub placement: PlacementTuning,
    pub spline: SplineTuning,
    pub palette: Vec<PaletteSlot>,
    /// Direction toward the light in screen space; normalized on use.
    pub light_direction: [f32; 2],
    pub layers: LayerToggles,
    pub detail: DetailTuning,
    pub body: BlobConfig,
    pub glow: Option<BlobConfig>,
    pub satellites: Vec<BlobConfig>,
}

impl Default for Preset {
    fn default() -> Self {
        Self::siri()
    }
}

fn satellite(id: u16, seed: f32, size: f32, slot: usize, speed: f32, harmonics: Vec<Harmonic>) -> BlobConfig {
    BlobConfig {
        id: BlobId(id),
        seed,
        size,
        palette_slot: slot,
        shape: ShapeParams {
            samples: 72,
            time_scale: 1.0,
            harmonics,
            global_drift: 0.0,
            noise_amount: 0.03,
            amplitude_gain: 0.12,
            breathing: Breathing { frequency: 0.55 + seed * 0.4, amplitude: 0.035, phase: seed * 4.0 },
            aniso: Anisotropy { stretch: 0.07, shear: 0.06, rate: 0.3 + seed * 0.1, spin: 0.08, tau: 2.0 },
            edge_alpha: 0.04,
        },
        orbit: OrbitParams {
            rotation_speed: 0.4 + seed * 0.5,
            orbit_speed: speed,
            time_scale: 0.15 + seed * 0.08,
            depth: 0.4,
        },
    }
}

impl Preset {
    /// Calm default: a glossy body, faint glow and four slow satellites.
    pub fn siri() -> Self {
        let body = BlobConfig {
            id: BlobId(0),
            seed: 0.11,
            size: 0.98,
            palette_slot: 3,
            shape: ShapeParams {
                samples: 128,
                time_scale: 0.8,
                harmonics: vec![
                    Harmonic::new(1.2, 0.0052, 0.4, 0.0),
                    Harmonic::new(1.8, 0.0023, 0.55, 0.3),
                    Harmonic::new(2.3, 0.0015, 0.75, 0.7),
                ],
                global_drift: 0.03,
                noise_amount: 0.004,
                amplitude_gain: 0.6,
                edge_alpha: 0.04,
                ..ShapeParams::default()
            },
            orbit: OrbitParams::default(),
        };
        let glow = BlobConfig {
            id: BlobId(1),
            seed: 0.53,
            size: 1.35,
            palette_slot: 0,
            shape: ShapeParams {
                samples: 96,
                time_scale: 0.06,
                harmonics: vec![
                    Harmonic::new(2.1, 0.012, 0.7, 0.0),
                    Harmonic::new(3.7, 0.008, 1.1, 0.4),
                    Harmonic::new(6.2, 0.006, 1.5, 0.8),
                ],
                global_drift: 0.03,
                noise_amount: 0.01,
                amplitude_gain: 0.3,
                edge_alpha: 0.04,
                ..ShapeParams::default()
            },
            orbit: OrbitParams::default(),
        };
        let waves = |a: f32| {
            vec![
                Harmonic::new(0.65, a, 0.075, 0.0),
                Harmonic::new(1.25, a * 0.23, -0.03, 0.25),
                Harmonic::new(2.4, a * 0.3, 0.21, 0.5),
            ]
        };
        Self {
            name: "siri".into(),
            amplitude_scale: AmplitudeScale::Unit,
            clock: ClockTuning::default(),
            orb: OrbTuning::default(),
            envelopes: EnvelopeSet::default(),
            color: ColorTuning::default(),
            placement: PlacementTuning::default(),
            spline: SplineTuning::default(),
            palette: default_palette(),
            light_direction: [-0.68, -0.60],
            layers: LayerToggles::default(),
            detail: DetailTuning::default(),
            body,
            glow: Some(glow),
            satellites: vec![
                satellite(2, 0.13, 0.34, 0, 0.05, waves(0.035)),
                satellite(3, 0.37, 0.30, 1, 0.07, waves(0.04)),
                satellite(4, 0.61, 0.28, 2, 0.06, waves(0.035)),
                satellite(5, 0.84, 0.26, 4, 0.08, waves(0.045)),
            ],
        }
    }

    /// Looser "cloud" look: five satellites with twice the deformation, repulsion on.
    pub fn cloud() -> Self {
        let mut p = Self::siri();
        p.name = "cloud".into();
        if let Some(glow) = p.glow.as_mut() {
            glow.size = 1.45;
            glow.shape.noise_amount = 0.02;
        }
        p.spline.satellite_tension = 0.3;
        p.placement.repulsion = RepulsionTuning { enabled: true, ..RepulsionTuning::default() };
        p.placement.orbit_fraction = 0.7;
        p.satellites.push(satellite(6, 0.95, 0.24, 3, 0.09, Vec::new()));
        for s in &mut p.satellites {
            s.shape.harmonics = vec![
                Harmonic::new(0.65, 0.08, 0.075, 0.0),
                Harmonic::new(1.25, 0.03, -0.05, 0.25),
                Harmonic::new(2.4, 0.02, 0.21, 0.5),
                Harmonic::new(3.3, 0.012, -0.33, 0.75),
            ];
            s.shape.noise_amount = 0.06;
            s.shape.breathing.amplitude = 0.06;
            s.size *= 1.1;
        }
        p
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["siri", "cloud"]
    }

    pub fn named(name: &str) -> Result<Self, PresetError> {
        match name.to_ascii_lowercase().as_str() {
            "siri" | "default" => Ok(Self::siri()),
            "cloud" => Ok(Self::cloud()),
            _ => Err(PresetError::Unknown(name.to_string())),
        }
    }

    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, PresetError> {
        let p: Self = toml::from_str(s)?;
        p.validate()?;
        Ok(p)
    }

    pub fn to_toml_string(&self) -> Result<String, PresetError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Body, glow, then satellites.
    pub fn blobs(&self) -> impl Iterator<Item = &BlobConfig> {
        std::iter::once(&self.body).chain(self.glow.iter()).chain(self.satellites.iter())
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        if self.palette.is_empty() {
            return Err(PresetError::EmptyPalette);
        }

        let mut seen = BTreeSet::new();
        for b in self.blobs() {
            if !seen.insert(b.id) {
                return Err(PresetError::DuplicateId(b.id));
            }
            if b.shape.samples < 3 {
                return Err(PresetError::TooFewSamples { id: b.id, samples: b.shape.samples });
            }
            if !(b.size > 0.0) || !b.size.is_finite() {
                return Err(PresetError::NonPositiveSize { id: b.id, size: b.size });
            }
            if b.palette_slot >= self.palette.len() {
                return Err(PresetError::PaletteSlot { id: b.id, slot: b.palette_slot, len: self.palette.len() });
            }
        }

        let positive = [
            ("clock.max_dt", self.clock.max_dt),
            ("orb.radius_fraction", self.orb.radius_fraction),
            ("orb.breath_period", self.orb.breath_period),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(PresetError::InvalidTuning { field, value });
            }
        }
        let s = self.clock.dt_smoothing;
        if !(s > 0.0 && s <= 1.0) {
            return Err(PresetError::InvalidTuning { field: "clock.dt_smoothing", value: s });
        }
        let [lx, ly] = self.light_direction;
        if !(lx.is_finite() && ly.is_finite()) || lx * lx + ly * ly < 1e-6 {
            return Err(PresetError::InvalidTuning { field: "light_direction", value: lx.hypot(ly) });
        }
        if self.spline.steps == 0 {
            return Err(PresetError::InvalidTuning { field: "spline.steps", value: 0.0 });
        }
        for (field, value) in [
            ("spline.body_tension", self.spline.body_tension),
            ("spline.satellite_tension", self.spline.satellite_tension),
        ] {
            if !value.is_finite() {
                return Err(PresetError::InvalidTuning { field, value });
            }
        }
        let d = &self.detail;
        if d.speck_count > MAX_SPECKS {
            return Err(PresetError::InvalidTuning { field: "detail.speck_count", value: d.speck_count as f32 });
        }
        for (field, value) in [
            ("detail.twinkle_rate", d.twinkle_rate),
            ("detail.twinkle_boost", d.twinkle_boost),
            ("detail.twinkle_decay", d.twinkle_decay),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(PresetError::InvalidTuning { field, value });
            }
        }
        for (field, value) in [
            ("detail.speck_speed", d.speck_speed),
            ("detail.ripple_speed", d.ripple_speed),
            ("detail.caustic_speed", d.caustic_speed),
            ("detail.caustic_scroll", d.caustic_scroll),
        ] {
            if !value.is_finite() {
                return Err(PresetError::InvalidTuning { field, value });
            }
        }
        if self.envelopes.main.source == EnvelopeSource::Main {
            return Err(PresetError::SelfSourcedMain);
        }
        Ok(())
    }
}
