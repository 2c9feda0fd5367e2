//! Stateful smoothing primitives built on [`math::exp_slew`](crate::math::exp_slew).
//!
//! Provided smoothers:
//! - `SlewLimiter` : asymmetric attack/release first-order lag (seconds)
//! - `Ema`         : fixed-alpha exponential moving average, seeded by its first sample
//! - `RateLimiter` : linear slew with a maximum rate per second
//!
//! All smoothers are `Copy`, allocation free and advance with an explicit `dt`.

use crate::math::{ema, exp_slew, step_toward};

// -------------------------------- Slew Limiter -----------------------------------

/// First-order lag toward a moving target with separate rise and fall time constants.
///
/// `attack_tau` applies while the target is above the current value, `release_tau`
/// otherwise. A tau `<= 0` snaps to the target.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlewLimiter {
    attack_tau: f32,
    release_tau: f32,
    y: f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(attack_tau: f32, release_tau: f32) -> Self {
        Self { attack_tau, release_tau, y: 0.0 }
    }

    /// Same time constant in both directions.
    #[inline]
    pub fn symmetric(tau: f32) -> Self {
        Self::new(tau, tau)
    }

    #[inline]
    pub fn with_value(mut self, y0: f32) -> Self {
        self.y = y0;
        self
    }

    #[inline]
    pub fn set_taus(&mut self, attack_tau: f32, release_tau: f32) {
        self.attack_tau = attack_tau;
        self.release_tau = release_tau;
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    /// Advance by `dt` seconds toward `target` and return the new value.
    #[inline]
    pub fn next(&mut self, target: f32, dt: f32) -> f32 {
        self.y = exp_slew(self.y, target, self.attack_tau, self.release_tau, dt);
        self.y
    }

    #[inline] pub fn value(&self) -> f32 { self.y }
    #[inline] pub fn attack_tau(&self) -> f32 { self.attack_tau }
    #[inline] pub fn release_tau(&self) -> f32 { self.release_tau }
}

// ------------------------------------ EMA ----------------------------------------

/// `y += alpha * (x - y)`, one step per call regardless of wall time.
///
/// The first sample seeds the state so the output does not ramp up from zero.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ema {
    alpha: f32,
    y: Option<f32>,
}

impl Ema {
    #[inline]
    pub fn new(alpha: f32) -> Self { Self { alpha, y: None } }

    /// Start from a known value instead of the first sample.
    #[inline]
    pub fn seeded(alpha: f32, y0: f32) -> Self { Self { alpha, y: Some(y0) } }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = match self.y {
            Some(y) => ema(y, x, self.alpha),
            None => x,
        };
        self.y = Some(y);
        y
    }

    #[inline] pub fn value(&self) -> Option<f32> { self.y }
    #[inline] pub fn alpha(&self) -> f32 { self.alpha }
}

// -------------------------------- Rate Limiter -----------------------------------

/// Linear slew: the value moves toward its target by at most `max_rate` units per second.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimiter {
    max_rate: f32,
    y: f32,
}

impl RateLimiter {
    #[inline]
    pub fn new(max_rate: f32, y0: f32) -> Self { Self { max_rate: max_rate.max(0.0), y: y0 } }

    #[inline]
    pub fn next(&mut self, target: f32, dt: f32) -> f32 {
        self.y = step_toward(self.y, target, self.max_rate, dt);
        self.y
    }

    #[inline] pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_and_release_taus_are_honored() {
        let dt: f32 = 1.0e-3;
        let mut s = SlewLimiter::new(0.2, 0.5);
        let steps = (0.2 / dt).round() as usize;
        for _ in 0..steps { s.next(1.0, dt); }
        assert!((s.value() - 0.632).abs() < 2e-3, "attack v={}", s.value());

        s.reset(1.0);
        let steps = (0.5 / dt).round() as usize;
        for _ in 0..steps { s.next(0.0, dt); }
        assert!((s.value() - 0.368).abs() < 2e-3, "release v={}", s.value());
    }

    #[test]
    fn slew_holds_at_zero_dt() {
        let mut s = SlewLimiter::symmetric(0.3).with_value(0.4);
        assert_eq!(s.next(1.0, 0.0), 0.4);
    }

    #[test]
    fn ema_seeds_from_first_sample() {
        let mut e = Ema::new(0.04);
        assert_eq!(e.process(5.0), 5.0);
        let y = e.process(6.0);
        assert!((y - 5.04).abs() < 1e-6);
    }

    #[test]
    fn rate_limiter_moves_linearly() {
        let mut r = RateLimiter::new(12.0, 50.0);
        for _ in 0..10 { r.next(80.0, 0.1); }
        assert!((r.value() - 62.0).abs() < 1e-3);
        r.next(62.5, 0.1);
        assert!((r.value() - 62.5).abs() < 1e-6);
    }
}
