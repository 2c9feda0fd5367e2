#![cfg_attr(not(feature = "std"), no_std)]
//! Orbweave Core: no_std-ready math primitives for the voice-orb engine.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `micromath`: approximate math backend for small targets
//! - `fast-math`: polynomial sine/cosine for the outline hot path
//! - `serde`    : serialize color and smoother types
//!
//! Modules
//! - [`math`]   : math backend, clamp/smoothstep/lerp, `exp_slew`, rate limiting
//! - [`slew`]   : stateful smoothers (asymmetric slew, EMA, linear rate limit)
//! - [`noise`]  : seeded Perlin noise in `[0, 1]`
//! - [`spline`] : closed cardinal splines over `glam::Vec2` rings
//! - [`color`]  : HSL/RGB types and conversions
//!
//! Only [`spline`] allocates (the outline it returns); everything else is plain values.

extern crate alloc;

pub mod color;
pub mod math;
pub mod noise;
pub mod slew;
pub mod spline;

pub use glam;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::color::{hsl_to_rgb, rgb_to_hsl, Hsl, Rgb, Rgba};
    pub use crate::math::{clamp, clamp01, exp_slew, lerp, smoothstep, step_toward, TAU};
    pub use crate::noise::Perlin;
    pub use crate::slew::{Ema, RateLimiter, SlewLimiter};
    pub use crate::spline::{closed_spline, closed_spline_into};
    pub use glam::{Mat3, Vec2, Vec3};
}
