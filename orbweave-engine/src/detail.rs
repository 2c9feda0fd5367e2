//! Fine surface detail that carries state across frames:
//! - the micro-speck field and its twinkle buffer, driven by a seeded LCG
//! - the inner ripple's rotation
//! - the caustic arc's sweep and scroll
//!
//! Every accumulator wraps at a period its consumers repeat on, so long
//! sessions never lose resolution or jump.

use orbweave_core::math::{clamp, exp, sanitize, TAU};
use serde::{Deserialize, Serialize};

use crate::motion::Phase;

/// Upper bound on the speck count a preset may ask for.
pub const MAX_SPECKS: usize = 64;

/// Relative ripple frequencies. All become integers over [`RIPPLE_PERIOD`].
pub const RIPPLE_FREQS: [f32; 3] = [1.0, 1.35, 1.9];

/// Ripple rotation wraps here: 20 turns, the shortest span on which every
/// frequency in [`RIPPLE_FREQS`] completes whole cycles.
pub const RIPPLE_PERIOD: f32 = 20.0 * TAU;

/// Angular drift of the ripple per unit of ripple speed.
const RIPPLE_SWIRL: f32 = 0.45;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailTuning {
    pub speck_count: usize,
    /// Drift speed of the speck field.
    pub speck_speed: f32,
    /// Twinkle events per second per speck.
    pub twinkle_rate: f32,
    /// Extra brightness a twinkle adds at its peak.
    pub twinkle_boost: f32,
    /// Twinkle decay, 1/s.
    pub twinkle_decay: f32,
    pub ripple_speed: f32,
    /// Caustic sweep cycles per second.
    pub caustic_speed: f32,
    /// Caustic sector scroll, rad/s.
    pub caustic_scroll: f32,
    /// Seed of the twinkle generator.
    pub seed: u32,
}

impl Default for DetailTuning {
    fn default() -> Self {
        Self {
            speck_count: 22,
            speck_speed: 0.8,
            twinkle_rate: 0.12,
            twinkle_boost: 1.8,
            twinkle_decay: 7.0,
            ripple_speed: 0.6,
            caustic_speed: 0.62,
            caustic_scroll: 0.10,
            seed: 0x5EC_C0DE,
        }
    }
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lcg(u32);

impl Lcg {
    pub const fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Next value in `[0, 1)`, from the top 24 bits.
    #[inline]
    pub fn next_unit(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Detail values of one frame, read by the layer assembly.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DetailFrame<'a> {
    /// Per-speck twinkle, `[0, twinkle_boost]`.
    pub twinkle: &'a [f32],
    /// Speck drift phases: angular swirl, radial wander, brightness wobble.
    pub drift: [f32; 3],
    /// Ripple rotation, `[0, RIPPLE_PERIOD)`.
    pub ripple: f32,
    /// Caustic sweep phase, radians.
    pub caustic: f32,
    /// Caustic sector scroll, radians.
    pub scroll: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetailState {
    rng: Lcg,
    twinkle: Vec<f32>,
    drift: [Phase; 3],
    ripple: f32,
    caustic: Phase,
    scroll: Phase,
}

impl DetailState {
    pub fn new(tuning: &DetailTuning) -> Self {
        let speed = tuning.speck_speed;
        Self {
            rng: Lcg::new(tuning.seed),
            twinkle: vec![0.0; tuning.speck_count.min(MAX_SPECKS)],
            drift: [Phase::new(speed * 0.7), Phase::new(speed * 0.45), Phase::new(speed)],
            ripple: 0.0,
            caustic: Phase::new(TAU * tuning.caustic_speed),
            scroll: Phase::new(tuning.caustic_scroll),
        }
    }

    /// Advance every accumulator by `dt` and roll the twinkles.
    pub fn step(&mut self, dt: f32, tuning: &DetailTuning) {
        let dt = clamp(sanitize(dt, 0.0), 0.0, 1.0);
        for p in &mut self.drift {
            p.advance(dt);
        }
        self.ripple = (self.ripple + tuning.ripple_speed * RIPPLE_SWIRL * dt).rem_euclid(RIPPLE_PERIOD);
        self.caustic.advance(dt);
        self.scroll.advance(dt);

        let chance = tuning.twinkle_rate * dt;
        let fade = exp(-tuning.twinkle_decay.max(0.0) * dt);
        for tw in &mut self.twinkle {
            if self.rng.next_unit() < chance {
                *tw = tuning.twinkle_boost;
            }
            *tw *= fade;
        }
    }

    pub fn frame(&self) -> DetailFrame<'_> {
        DetailFrame {
            twinkle: &self.twinkle,
            drift: [self.drift[0].value(), self.drift[1].value(), self.drift[2].value()],
            ripple: self.ripple,
            caustic: self.caustic.value(),
            scroll: self.scroll.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn lcg_is_seeded_and_in_range() {
        let (mut a, mut b) = (Lcg::new(9), Lcg::new(9));
        for _ in 0..1000 {
            let x = a.next_unit();
            assert_eq!(x, b.next_unit());
            assert!((0.0..1.0).contains(&x));
        }
        assert_ne!(Lcg::new(1).next_unit(), Lcg::new(2).next_unit());
    }

    #[test]
    fn same_seed_same_twinkles() {
        let tuning = DetailTuning { twinkle_rate: 6.0, ..DetailTuning::default() };
        let (mut a, mut b) = (DetailState::new(&tuning), DetailState::new(&tuning));
        for _ in 0..300 {
            a.step(DT, &tuning);
            b.step(DT, &tuning);
            assert_eq!(a.frame(), b.frame());
        }
        assert!(a.frame().twinkle.iter().any(|t| *t > 0.0));

        let other = DetailTuning { seed: 77, ..tuning };
        let mut c = DetailState::new(&other);
        for _ in 0..300 {
            c.step(DT, &other);
        }
        assert_ne!(a.frame().twinkle, c.frame().twinkle);
    }

    #[test]
    fn twinkles_stay_bounded_and_decay() {
        let tuning = DetailTuning { twinkle_rate: 30.0, ..DetailTuning::default() };
        let mut d = DetailState::new(&tuning);
        for _ in 0..200 {
            d.step(DT, &tuning);
            assert!(d.frame().twinkle.iter().all(|t| (0.0..=tuning.twinkle_boost).contains(t)));
        }
        let quiet = DetailTuning { twinkle_rate: 0.0, ..tuning };
        for _ in 0..180 {
            d.step(DT, &quiet);
        }
        assert!(d.frame().twinkle.iter().all(|t| *t < 1e-3));
    }

    #[test]
    fn accumulators_wrap() {
        let tuning = DetailTuning { ripple_speed: 500.0, caustic_speed: 50.0, ..DetailTuning::default() };
        let mut d = DetailState::new(&tuning);
        for _ in 0..1000 {
            d.step(DT, &tuning);
            let f = d.frame();
            assert!((0.0..=RIPPLE_PERIOD).contains(&f.ripple));
            assert!((0.0..=TAU).contains(&f.caustic));
            assert!(f.drift.iter().all(|p| (0.0..=TAU).contains(p)));
        }
    }

    #[test]
    fn speck_count_is_capped() {
        let d = DetailState::new(&DetailTuning { speck_count: 1000, ..DetailTuning::default() });
        assert_eq!(d.frame().twinkle.len(), MAX_SPECKS);
    }

    #[test]
    fn bad_deltas_do_nothing() {
        let tuning = DetailTuning::default();
        let mut d = DetailState::new(&tuning);
        let before = d.clone();
        d.step(f32::NAN, &tuning);
        d.step(-1.0, &tuning);
        assert_eq!(d.frame().ripple, before.frame().ripple);
        assert_eq!(d.frame().drift, before.frame().drift);
    }
}
