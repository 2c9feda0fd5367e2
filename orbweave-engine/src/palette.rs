//! Per-blob color dynamics.
//!
//! Each blob owns a fixed palette slot. Every frame the slot plus loudness (and depth
//! front-ness for satellites) gives a target HSL; the current HSL moves toward it at
//! bounded rates (hue along the short way round), is converted to RGB, and the RGB is
//! slewed once more to hide conversion banding.

use orbweave_core::color::{Hsl, Rgb};
use orbweave_core::math::{clamp, clamp01, exp_slew, hue_delta, step_toward, wrap_degrees};
use serde::{Deserialize, Serialize};

/// Base HSL of a palette entry (degrees, percent, percent).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteSlot {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl PaletteSlot {
    pub const fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self { hue, saturation, lightness }
    }
}

/// Cyan, violet, magenta, blue, green.
pub fn default_palette() -> Vec<PaletteSlot> {
    vec![
        PaletteSlot::new(195.0, 85.0, 60.0),
        PaletteSlot::new(270.0, 85.0, 60.0),
        PaletteSlot::new(310.0, 85.0, 60.0),
        PaletteSlot::new(220.0, 85.0, 60.0),
        PaletteSlot::new(155.0, 75.0, 55.0),
    ]
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTuning {
    /// Degrees per second.
    pub hue_rate: f32,
    /// Percentage points per second.
    pub saturation_rate: f32,
    /// Percentage points per second.
    pub lightness_rate: f32,
    /// Relative saturation lift at silence and the extra lift at full loudness.
    pub saturation_boost: f32,
    pub saturation_gain: f32,
    pub lightness_boost: f32,
    pub lightness_gain: f32,
    /// Absolute points added for a fully front-facing satellite.
    pub front_saturation: f32,
    pub front_lightness: f32,
    pub rgb_tau: f32,
}

impl Default for ColorTuning {
    fn default() -> Self {
        Self {
            hue_rate: 6.0,
            saturation_rate: 18.0,
            lightness_rate: 12.0,
            saturation_boost: 0.07,
            saturation_gain: 0.08,
            lightness_boost: 0.04,
            lightness_gain: 0.04,
            front_saturation: 1.2,
            front_lightness: 0.8,
            rgb_tau: 0.28,
        }
    }
}

/// Where the color of `slot` wants to be at this loudness and front-ness.
pub fn target_hsl(slot: &PaletteSlot, loudness: f32, frontness: f32, tuning: &ColorTuning) -> Hsl {
    let loud = clamp01(loudness);
    let front = clamp01(frontness);
    Hsl::new(
        slot.hue,
        slot.saturation * (1.0 + tuning.saturation_boost + tuning.saturation_gain * loud) + tuning.front_saturation * front,
        slot.lightness * (1.0 + tuning.lightness_boost + tuning.lightness_gain * loud) + tuning.front_lightness * front,
    )
    .normalized()
}

/// Rate-limited move of `current` toward `target` over `dt`.
pub fn step_hsl(current: Hsl, target: Hsl, dt: f32, tuning: &ColorTuning) -> Hsl {
    let dt = dt.max(0.0);
    let max_h = tuning.hue_rate.max(0.0) * dt;
    let dh = clamp(hue_delta(current.h, target.h), -max_h, max_h);
    Hsl::new(
        wrap_degrees(current.h + dh),
        clamp(step_toward(current.s, target.s, tuning.saturation_rate, dt), 0.0, 100.0),
        clamp(step_toward(current.l, target.l, tuning.lightness_rate, dt), 0.0, 100.0),
    )
}

/// Persistent color register of one blob.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ColorState {
    pub hsl: Hsl,
    /// Smoothed RGB handed to gradient stops, channels 0..255.
    pub rgb: Rgb,
}

impl ColorState {
    /// Start exactly on `target`.
    pub fn primed(target: Hsl) -> Self {
        Self { hsl: target, rgb: target.to_rgb() }
    }

    pub fn step(&mut self, target: Hsl, dt: f32, tuning: &ColorTuning) -> Rgb {
        self.hsl = step_hsl(self.hsl, target, dt, tuning);
        let raw = self.hsl.to_rgb();
        let tau = tuning.rgb_tau;
        self.rgb = Rgb::new(
            exp_slew(self.rgb.r, raw.r, tau, tau, dt),
            exp_slew(self.rgb.g, raw.g, tau, tau, dt),
            exp_slew(self.rgb.b, raw.b, tau, tau, dt),
        );
        self.rgb
    }
}

/// Advance (or lazily create) a blob's color register.
pub fn update_color(
    state: &mut Option<ColorState>,
    slot: &PaletteSlot,
    loudness: f32,
    frontness: f32,
    dt: f32,
    tuning: &ColorTuning,
) -> ColorState {
    let target = target_hsl(slot, loudness, frontness, tuning);
    match state {
        Some(s) => {
            s.step(target, dt, tuning);
            *s
        }
        None => *state.insert(ColorState::primed(target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn loudness_lifts_saturation_and_lightness_within_bounds() {
        let t = ColorTuning::default();
        let slot = PaletteSlot::new(195.0, 70.0, 50.0);
        let quiet = target_hsl(&slot, 0.0, 0.0, &t);
        let loud = target_hsl(&slot, 1.0, 0.0, &t);
        assert!(loud.s > quiet.s && loud.l > quiet.l);
        assert!(loud.s <= 70.0 * 1.15 + 1e-3);
        assert!(loud.l <= 50.0 * 1.08 + 1e-3);
        assert_eq!(loud.h, 195.0);
    }

    #[test]
    fn changes_respect_rate_limits() {
        let t = ColorTuning::default();
        let mut cur = Hsl::new(350.0, 20.0, 80.0);
        let target = Hsl::new(100.0, 90.0, 10.0);
        for _ in 0..240 {
            let next = step_hsl(cur, target, DT, &t);
            assert!(hue_delta(cur.h, next.h).abs() <= t.hue_rate * DT + 1e-4);
            assert!((next.s - cur.s).abs() <= t.saturation_rate * DT + 1e-4);
            assert!((next.l - cur.l).abs() <= t.lightness_rate * DT + 1e-4);
            cur = next;
        }
    }

    #[test]
    fn hue_takes_the_short_way_across_zero() {
        let t = ColorTuning::default();
        let next = step_hsl(Hsl::new(358.0, 50.0, 50.0), Hsl::new(10.0, 50.0, 50.0), 1.0, &t);
        assert!((next.h - 4.0).abs() < 1e-3, "h={}", next.h);
    }

    #[test]
    fn register_primes_then_eases() {
        let t = ColorTuning::default();
        let slot = default_palette()[2];
        let mut state = None;
        let first = update_color(&mut state, &slot, 0.0, 0.5, DT, &t);
        assert_eq!(first.hsl, target_hsl(&slot, 0.0, 0.5, &t));

        let second = update_color(&mut state, &slot, 1.0, 0.5, DT, &t);
        assert!(second.hsl.s >= first.hsl.s);
        assert!(second.hsl.s - first.hsl.s <= t.saturation_rate * DT + 1e-4);
        let raw = second.hsl.to_rgb();
        assert!((second.rgb.r - raw.r).abs() <= (first.rgb.r - raw.r).abs() + 1e-3);
    }
}
