//! Orbweave engine: the animated voice orb, frame by frame.
//!
//! Crate layout:
//! - [`clock`]     : frame clock and the single smoothed delta per frame
//! - [`envelope`]  : amplitude normalization and the named attack/release envelopes
//! - [`motion`]    : orb radius pulsation, breathing, spin and rim phase
//! - [`shape`]     : body and satellite outline synthesis
//! - [`palette`]   : rate-limited HSL color per blob
//! - [`placement`] : pseudo-3D orbits of the satellites
//! - [`detail`]    : speck twinkles, ripple and caustic accumulators
//! - [`layers`]    : back-to-front draw list
//! - [`draw`]      : layer types and the [`DrawBackend`] seam
//! - [`state`]     : explicit per-blob smoothing registers
//! - [`preset`]    : all tuning as data, TOML in and out
//! - [`composer`]  : Running/Stopped state machine driving it all
//!
//! The engine never draws pixels; a backend receives a [`FrameOutput`] per tick.

pub mod clock;
pub mod composer;
pub mod detail;
pub mod draw;
pub mod envelope;
pub mod layers;
pub mod motion;
pub mod palette;
pub mod placement;
pub mod preset;
pub mod shape;
pub mod state;

pub use orbweave_core;

pub use composer::{Composer, FrameStatus, RunState};
pub use detail::DetailTuning;
pub use draw::{BackendError, BlendMode, DrawBackend, Fill, FrameOutput, GradientStop, Layer, LayerKind, Outline, Viewport};
pub use envelope::{AmplitudeScale, Envelopes};
pub use preset::{BlobConfig, Preset, PresetError};
pub use state::{BlobId, EngineState};
