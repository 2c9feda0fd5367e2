//! Closed cardinal (Catmull-Rom family) splines over a ring of control points.
//!
//! `tension` follows the cardinal convention: the tangent at each point is
//! `(1 - tension) / 2 * (next - prev)`. Tension 0 is the uniform
//! Catmull-Rom; larger values shorten the tangents so the curve hugs the polygon.

use alloc::vec::Vec;

use glam::Vec2;

/// Sub-steps per segment used by the presets.
pub const DEFAULT_STEPS: usize = 10;

/// Fewer sub-steps than this shows facets on a 100-point ring.
pub const MIN_STEPS: usize = 8;

/// Tangent scale for a cardinal tension.
#[inline]
pub fn tangent_scale(tension: f32) -> f32 {
    0.5 * (1.0 - tension)
}

/// Evaluate one cardinal segment between `p1` and `p2` at `t` in `[0, 1]`.
///
/// `s` is the tangent scale from [`tangent_scale`].
#[inline]
pub fn segment(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, s: f32, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let c0 = -s * t3 + 2.0 * s * t2 - s * t;
    let c1 = (2.0 - s) * t3 + (s - 3.0) * t2 + 1.0;
    let c2 = (s - 2.0) * t3 + (3.0 - 2.0 * s) * t2 + s * t;
    let c3 = s * t3 - s * t2;
    p0 * c0 + p1 * c1 + p2 * c2 + p3 * c3
}

/// Build a closed outline through `points` into `out` (cleared first).
///
/// Each segment gets `max(steps, MIN_STEPS)` samples; the last emitted point is a
/// copy of the first so the path closes exactly. Fewer than 3 points leaves `out` empty.
pub fn closed_spline_into(points: &[Vec2], tension: f32, steps: usize, out: &mut Vec<Vec2>) {
    out.clear();
    let n = points.len();
    if n < 3 {
        return;
    }
    let steps = steps.max(MIN_STEPS);
    let s = tangent_scale(if tension.is_finite() { tension } else { 0.0 });
    out.reserve(n * steps + 1);

    let inv = 1.0 / steps as f32;
    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];
        out.push(p1);
        for k in 1..steps {
            out.push(segment(p0, p1, p2, p3, s, k as f32 * inv));
        }
    }
    out.push(points[0]);
}

/// Allocating wrapper around [`closed_spline_into`].
pub fn closed_spline(points: &[Vec2], tension: f32, steps: usize) -> Vec<Vec2> {
    let mut out = Vec::new();
    closed_spline_into(points, tension, steps, &mut out);
    out
}

/// True when the path has at least 4 points and ends where it starts.
pub fn is_closed(path: &[Vec2]) -> bool {
    match (path.first(), path.last()) {
        (Some(a), Some(b)) if path.len() > 3 => a == b,
        _ => false,
    }
}
