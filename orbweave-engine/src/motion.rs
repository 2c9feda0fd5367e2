//! Slow motion drivers for the orb body.
//!
//! Contents:
//! - `Phase`      : wrapping radian accumulator with a rate in rad/s
//! - `Breath`     : 0..1 cosine breathing cycle, slewed
//! - `OrbMotion`  : per-frame orb radius, spin, rim phase and rim opacity registers
//!
//! Everything advances with the frame's shared `dt`; nothing reads the wall clock.

use core::f32::consts::PI;

use orbweave_core::math::{clamp01, cos, sin, smoothstep, wrap_phase01, TAU};
use orbweave_core::noise::Perlin;
use orbweave_core::slew::SlewLimiter;
use serde::{Deserialize, Serialize};

/// Wrapping phase accumulator, radians in `[0, 2π)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Phase {
    value: f32,
    rate: f32,
}

impl Phase {
    #[inline] pub fn new(rate: f32) -> Self { Self { value: 0.0, rate } }

    #[inline]
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.value = wrap_phase01((self.value + self.rate * dt) / TAU) * TAU;
        self.value
    }

    #[inline] pub fn value(&self) -> f32 { self.value }
}

/// Ease-in-out breathing cycle in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Breath {
    phase: Phase,
    slew: SlewLimiter,
}

impl Breath {
    /// `period` seconds per full cycle, output smoothed with `tau`.
    pub fn new(period: f32, tau: f32) -> Self {
        let rate = if period > 0.0 { TAU / period } else { 0.0 };
        Self { phase: Phase::new(rate), slew: SlewLimiter::symmetric(tau) }
    }

    pub fn next(&mut self, dt: f32) -> f32 {
        let p = self.phase.advance(dt);
        let raw = 0.5 - 0.5 * cos(p);
        self.slew.next(raw, dt)
    }

    #[inline] pub fn value(&self) -> f32 { self.slew.value() }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbTuning {
    /// Base radius as a fraction of `min(width, height)`.
    pub radius_fraction: f32,
    /// Peak-to-peak pulsation as a fraction of the base radius.
    pub pulse_depth: f32,
    /// Pulsation angular speed, rad/s.
    pub pulse_omega: f32,
    /// Noise drift of the pulsation speed.
    pub drift_depth: f32,
    /// Growth at full loudness, fraction of the base radius.
    pub amplitude_gain: f32,
    pub radius_tau: f32,
    pub breath_period: f32,
    pub breath_tau: f32,
    /// Body spin, rad/s.
    pub spin_rate: f32,
    /// Rim gradient rotation, rad/s.
    pub rim_speed: f32,
    pub rim_floor: f32,
    pub rim_gain: f32,
    pub rim_max: f32,
    pub rim_tau: f32,
}

impl Default for OrbTuning {
    fn default() -> Self {
        Self {
            radius_fraction: 0.22,
            pulse_depth: 0.05,
            pulse_omega: 0.8,
            drift_depth: 0.02,
            amplitude_gain: 0.105,
            radius_tau: 0.32,
            breath_period: 7.2,
            breath_tau: 0.36,
            spin_rate: PI / 30.0,
            rim_speed: 0.48,
            rim_floor: 0.10,
            rim_gain: 0.24,
            rim_max: 0.30,
            rim_tau: 0.22,
        }
    }
}

/// Unsmoothed main radius for `time`: slow noise-drifted pulse plus loudness growth.
pub fn orb_radius_target(base: f32, time: f32, main_env: f32, noise: &Perlin, tuning: &OrbTuning) -> f32 {
    let drift_f = 1.0 + tuning.drift_depth * (noise.sample(time * 0.17, 0.07, 2.4) - 0.5);
    let drift_phi = 0.25 * (noise.sample(time * 0.09, 0.11, 3.1) - 0.5);
    let pulse = smoothstep(-1.0, 1.0, sin(tuning.pulse_omega * drift_f * time + drift_phi));
    let scale = 1.0 + (pulse - 0.5) * tuning.pulse_depth + smoothstep(0.0, 1.0, main_env) * tuning.amplitude_gain;
    base * scale
}

/// Orb-level motion of one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct OrbFrame {
    pub radius: f32,
    pub breath: f32,
    pub spin: f32,
    pub rim_phase: f32,
    pub rim_opacity: f32,
}

/// Persistent orb registers. The first step snaps radius and rim opacity to their targets.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbMotion {
    tuning: OrbTuning,
    breath: Breath,
    rim: Phase,
    spin: f32,
    radius: Option<SlewLimiter>,
    rim_opacity: Option<SlewLimiter>,
}

impl OrbMotion {
    pub fn new(tuning: OrbTuning) -> Self {
        Self {
            breath: Breath::new(tuning.breath_period, tuning.breath_tau),
            rim: Phase::new(tuning.rim_speed),
            spin: 0.0,
            radius: None,
            rim_opacity: None,
            tuning,
        }
    }

    /// Advance by `dt`. `input` is the normalized amplitude, `main_env` the main envelope.
    pub fn step(&mut self, base_radius: f32, time: f32, dt: f32, input: f32, main_env: f32, noise: &Perlin) -> OrbFrame {
        let t = &self.tuning;

        let target = orb_radius_target(base_radius, time, main_env, noise, t);
        let radius = match &mut self.radius {
            Some(s) => s.next(target, dt),
            None => {
                let s = SlewLimiter::symmetric(t.radius_tau).with_value(target);
                self.radius = Some(s);
                target
            }
        };

        let rim_target = (t.rim_floor + t.rim_gain * clamp01(input)).min(t.rim_max);
        let rim_opacity = match &mut self.rim_opacity {
            Some(s) => s.next(rim_target, dt),
            None => {
                self.rim_opacity = Some(SlewLimiter::symmetric(t.rim_tau).with_value(rim_target));
                rim_target
            }
        };

        self.spin = wrap_phase01((self.spin + t.spin_rate * (1.0 + 0.06 * sin(0.3 * time)) * dt) / TAU) * TAU;

        OrbFrame {
            radius,
            breath: self.breath.next(dt),
            spin: self.spin,
            rim_phase: self.rim.advance(dt),
            rim_opacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wraps() {
        let mut p = Phase::new(PI);
        for _ in 0..7 {
            p.advance(1.0);
        }
        assert!((p.value() - PI).abs() < 1e-4, "{}", p.value());
        assert!(p.value() < TAU);
    }

    #[test]
    fn breath_stays_in_unit_range_and_cycles() {
        let mut b = Breath::new(7.2, 0.36);
        let (mut lo, mut hi) = (1.0f32, 0.0f32);
        for _ in 0..(60 * 15) {
            let v = b.next(1.0 / 60.0);
            assert!((0.0..=1.0).contains(&v));
            lo = lo.min(v);
            hi = hi.max(v);
        }
        assert!(lo < 0.05 && hi > 0.9, "lo={lo} hi={hi}");
    }

    #[test]
    fn radius_target_tracks_loudness() {
        let noise = Perlin::new(5);
        let t = OrbTuning::default();
        let quiet = orb_radius_target(70.0, 3.0, 0.0, &noise, &t);
        let loud = orb_radius_target(70.0, 3.0, 1.0, &noise, &t);
        assert!((loud - quiet - 70.0 * t.amplitude_gain).abs() < 1e-3);
        assert!(quiet > 70.0 * (1.0 - t.pulse_depth) && quiet < 70.0 * (1.0 + t.pulse_depth));
    }

    #[test]
    fn first_step_snaps_then_smooths() {
        let noise = Perlin::new(5);
        let mut m = OrbMotion::new(OrbTuning::default());
        let f0 = m.step(70.0, 0.0, 0.016, 0.0, 0.0, &noise);
        let target0 = orb_radius_target(70.0, 0.0, 0.0, &noise, &OrbTuning::default());
        assert_eq!(f0.radius, target0);
        let f1 = m.step(70.0, 0.016, 0.016, 1.0, 1.0, &noise);
        let target1 = orb_radius_target(70.0, 0.016, 1.0, &noise, &OrbTuning::default());
        assert!(f1.radius > f0.radius && f1.radius < target1);
        assert!(f1.rim_opacity > f0.rim_opacity && f1.rim_opacity <= OrbTuning::default().rim_max);
    }
}
