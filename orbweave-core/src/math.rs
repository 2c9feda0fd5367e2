//! Scalar math helpers shared by every orbweave stage.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for the outline hot path
//! - Side-effect free helpers; garbage in (NaN, tau <= 0) degrades to a sane value
//!
//! Conventions:
//! - Times are seconds, angles radians unless a name says degrees.
//! - All functions are `#[inline]` where useful to help the optimizer.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;
use num_traits::Float;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { x.floor() }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] pub(crate) fn m_powf(x: f32, y: f32) -> f32 { x.powf(y) }
        #[inline] pub(crate) fn m_atan2(y: f32, x: f32) -> f32 { y.atan2(x) }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { libm::floorf(x) }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { libm::sqrtf(x) }
        #[inline] pub(crate) fn m_powf(x: f32, y: f32) -> f32 { libm::powf(x, y) }
        #[inline] pub(crate) fn m_atan2(y: f32, x: f32) -> f32 { libm::atan2f(y, x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_floor(x: f32) -> f32 { x.floor() }
        #[inline] pub(crate) fn m_sqrt(x: f32) -> f32 { x.sqrt() }
        #[inline] pub(crate) fn m_powf(x: f32, y: f32) -> f32 { x.powf(y) }
        #[inline] pub(crate) fn m_atan2(y: f32, x: f32) -> f32 { y.atan2(x) }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// Below this a tau or a length is treated as zero.
pub const EPS: f32 = 1.0e-9;

// --------------------------------- Utilities -------------------------------------

/// Clamp `x` into `[lo, hi]`. NaN maps to `lo`.
#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x >= lo {
        if x > hi { hi } else { x }
    } else {
        lo
    }
}

/// Clamp into `[0, 1]`.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    clamp(x, 0.0, 1.0)
}

#[inline]
pub fn lerp<T: Float>(a: T, b: T, t: T) -> T {
    a + (b - a) * t
}

/// Cubic Hermite step between two edges, input clamped.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let span = edge1 - edge0;
    if abs(span) < EPS {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = clamp01((x - edge0) / span);
    t * t * (3.0 - 2.0 * t)
}

/// Replace non-finite values with `fallback`.
#[inline]
pub fn sanitize<T: Float>(x: T, fallback: T) -> T {
    if x.is_finite() { x } else { fallback }
}

#[inline]
pub fn abs(x: f32) -> f32 {
    if x < 0.0 { -x } else { x }
}

/// Wrap phase into [0, 1).
#[inline]
pub fn wrap_phase01(p: f32) -> f32 {
    let w = p - m_floor(p);
    if w >= 1.0 { 0.0 } else { w }
}

/// Wrap an angle in degrees into [0, 360).
#[inline]
pub fn wrap_degrees(deg: f32) -> f32 {
    wrap_phase01(deg / 360.0) * 360.0
}

/// Signed shortest angular distance `from -> to` in degrees, in (-180, 180].
#[inline]
pub fn hue_delta(from: f32, to: f32) -> f32 {
    let d = wrap_degrees(to - from);
    if d > 180.0 { d - 360.0 } else { d }
}

// --------------------------------- Trig ------------------------------------------

/// Fast sine: range reduction into [-π/2, π/2] and a 7th-order odd polynomial.
/// Max abs error ~2e-4 when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let k = m_floor(x / TAU + 0.5);
            let mut xr = x - k * TAU;
            // sin(x) = sin(π - x) folds the outer quarters in
            if xr > PI * 0.5 {
                xr = PI - xr;
            } else if xr < -PI * 0.5 {
                xr = -PI - xr;
            }
            let x2 = xr * xr;
            xr * (1.0 + x2 * (-1.0 / 6.0 + x2 * (1.0 / 120.0 - x2 / 5040.0)))
        } else {
            m_sin(x)
        }
    }
}

#[inline]
pub fn fast_cos(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // cos(x) = sin(x + π/2)
            fast_sin(x + PI * 0.5)
        } else {
            m_cos(x)
        }
    }
}

#[inline]
pub fn sin(x: f32) -> f32 { m_sin(x) }

#[inline]
pub fn cos(x: f32) -> f32 { m_cos(x) }

#[inline]
pub fn exp(x: f32) -> f32 { m_exp(x) }

#[inline]
pub fn sqrt(x: f32) -> f32 { m_sqrt(x.max(0.0)) }

#[inline]
pub fn powf(x: f32, y: f32) -> f32 { m_powf(x, y) }

#[inline]
pub fn atan2(y: f32, x: f32) -> f32 { m_atan2(y, x) }

#[inline]
pub fn floor(x: f32) -> f32 { m_floor(x) }

// --------------------------------- Smoothing -------------------------------------

/// Fraction of the remaining distance covered in `dt` by a first-order lag
/// with time constant `tau`: `1 - exp(-dt / tau)`.
///
/// `tau <= 0` snaps (returns 1); `dt <= 0` holds (returns 0).
#[inline]
pub fn one_pole_coeff(dt: f32, tau: f32) -> f32 {
    if tau.is_nan() || tau <= EPS {
        return 1.0;
    }
    if dt.is_nan() || dt <= 0.0 {
        return 0.0;
    }
    clamp01(1.0 - m_exp(-dt / tau))
}

/// Move `current` toward `target` with an asymmetric first-order lag.
///
/// Uses `attack_tau` when the target is above the current value and
/// `release_tau` otherwise. Never overshoots for `dt >= 0`, holds at `dt = 0`
/// and snaps when the selected tau is `<= 0`.
#[inline]
pub fn exp_slew(current: f32, target: f32, attack_tau: f32, release_tau: f32, dt: f32) -> f32 {
    if !target.is_finite() {
        return current;
    }
    if !current.is_finite() {
        return target;
    }
    let tau = if target > current { attack_tau } else { release_tau };
    let k = one_pole_coeff(dt, tau);
    if k >= 1.0 {
        return target;
    }
    let next = current + (target - current) * k;
    // rounding can land a hair past the target
    if target > current { next.min(target) } else { next.max(target) }
}

/// One EMA step: `y + alpha * (x - y)` with `alpha` clamped to [0, 1].
#[inline]
pub fn ema(y: f32, x: f32, alpha: f32) -> f32 {
    y + clamp01(alpha) * (x - y)
}

/// Move `current` toward `target` by at most `max_rate * dt`.
#[inline]
pub fn step_toward(current: f32, target: f32, max_rate: f32, dt: f32) -> f32 {
    let max_step = (max_rate * dt.max(0.0)).max(0.0);
    current + clamp(target - current, -max_step, max_step)
}

// ------------------------------------ Tests --------------------------------------
