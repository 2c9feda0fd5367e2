//! Control-point rings for one blob outline.
//!
//! Two variants share the same perturbation model (seam-free sine harmonics plus two
//! octaves of noise sampled on a circle):
//! - [`body_ring`]: the orb body and its glow. The summed deformation goes through a
//!   per-angle EMA across frames ([`EdgeFilter`]) to remove shimmer.
//! - [`satellite_ring`]: larger relative deformation, a breathing term and a slewed
//!   anisotropic rotate/shear/scale post-transform ([`ShapeState`]).
//!
//! The rings feed [`closed_spline_into`](orbweave_core::spline::closed_spline_into).

use orbweave_core::glam::Vec2;
use orbweave_core::math::{clamp01, cos, exp_slew, fast_cos, fast_sin, powf, sanitize, sin, smoothstep, TAU};
use orbweave_core::noise::Perlin;
use serde::{Deserialize, Serialize};

/// One sine term of the radius perturbation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    /// Angular frequency, cycles per turn. Non-integer values never repeat exactly.
    pub frequency: f32,
    /// Fraction of the radius.
    pub amplitude: f32,
    /// Phase advance, rad/s (negative runs backwards).
    pub speed: f32,
    /// Extra phase offset in turns, added to the blob seed.
    pub phase: f32,
}

impl Harmonic {
    pub const fn new(frequency: f32, amplitude: f32, speed: f32, phase: f32) -> Self {
        Self { frequency, amplitude, speed, phase }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breathing {
    /// rad/s
    pub frequency: f32,
    /// Peak radius growth as a fraction.
    pub amplitude: f32,
    pub phase: f32,
}

/// Targets of the slow ellipse wobble.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Anisotropy {
    /// Peak deviation of the x/y scales from 1.
    pub stretch: f32,
    /// Peak shear factor.
    pub shear: f32,
    /// Wobble speed, rad/s.
    pub rate: f32,
    /// Local frame rotation, rad/s.
    pub spin: f32,
    /// Slew time constant of scale and shear, seconds.
    pub tau: f32,
}

impl Default for Anisotropy {
    fn default() -> Self {
        Self { stretch: 0.0, shear: 0.0, rate: 0.35, spin: 0.1, tau: 2.0 }
    }
}

/// Constant per-blob shape configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeParams {
    /// Angle samples around the ring; fixed for the life of the blob.
    pub samples: usize,
    /// Multiplier on elapsed time before it reaches the wave functions.
    pub time_scale: f32,
    pub harmonics: Vec<Harmonic>,
    /// Turns per second added to every harmonic phase.
    pub global_drift: f32,
    /// Noise perturbation, fraction of the radius.
    pub noise_amount: f32,
    /// Extra deformation (body) or radius (satellite) at full loudness.
    pub amplitude_gain: f32,
    pub breathing: Breathing,
    pub aniso: Anisotropy,
    /// Per-angle EMA weight across frames (body variant).
    pub edge_alpha: f32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            samples: 96,
            time_scale: 1.0,
            harmonics: Vec::new(),
            global_drift: 0.0,
            noise_amount: 0.0,
            amplitude_gain: 0.0,
            breathing: Breathing::default(),
            aniso: Anisotropy::default(),
            edge_alpha: 0.04,
        }
    }
}

/// Everything a ring needs for one frame.
#[derive(Copy, Clone, Debug)]
pub struct ShapeInput<'a> {
    pub center: Vec2,
    pub radius: f32,
    /// Elapsed time before `time_scale`.
    pub time: f32,
    /// Loudness, clamped to `[0, 1]` on use.
    pub amplitude: f32,
    pub seed: f32,
    /// Rigid rotation of the ring, radians.
    pub spin: f32,
    pub params: &'a ShapeParams,
    pub noise: &'a Perlin,
}

/// Sine with a non-integer frequency that still closes at `angle = 2π`:
/// cross-fades toward the copy shifted by one turn so both ends meet with matching slope.
#[inline]
fn seamless_sin(frequency: f32, angle: f32, phase: f32) -> f32 {
    let w = smoothstep(0.0, TAU, angle);
    let a = sin(frequency * angle + phase);
    if w <= 0.0 {
        return a;
    }
    let b = sin(frequency * (angle - TAU) + phase);
    a + (b - a) * w
}

/// Harmonic perturbation at `angle`, fraction of the radius.
pub fn harmonic_offset(params: &ShapeParams, seed: f32, angle: f32, time: f32) -> f32 {
    let global = TAU * params.global_drift * time;
    params
        .harmonics
        .iter()
        .map(|h| h.amplitude * seamless_sin(h.frequency, angle, (seed + h.phase) * TAU + h.speed * time + global))
        .sum()
}

/// Two-octave noise perturbation at `angle`, fraction of the radius. Zero-mean.
pub fn noise_offset(noise: &Perlin, amount: f32, seed: f32, angle: f32, time: f32) -> f32 {
    if amount == 0.0 {
        return 0.0;
    }
    let x = cos(angle) * 1.2 + time * 0.06;
    let y = sin(angle) * 1.2 + time * 0.06;
    let z = time * 0.03 + seed;
    let n1 = noise.sample(x, y, z);
    let n2 = noise.sample(x * 2.4 + time * 0.08, y * 2.4 + time * 0.08, z + 0.5);
    amount * ((n1 - 0.5) + 0.5 * (n2 - 0.5))
}

#[inline]
fn ring_angle(i: usize, n: usize) -> f32 {
    i as f32 / n as f32 * TAU
}

// --------------------------------- Body variant ----------------------------------

/// Refresh rate the edge filter's alpha is specified at.
pub const EDGE_REFERENCE_HZ: f32 = 60.0;

/// Per-angle low-pass over frames. The first frame primes it with the raw values.
///
/// `alpha` is the weight of one frame at [`EDGE_REFERENCE_HZ`]; other frame
/// deltas use `1 - (1 - alpha)^(dt * EDGE_REFERENCE_HZ)`, so the edge settles in
/// the same wall time at any refresh rate.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeFilter {
    alpha: f32,
    values: Vec<f32>,
}

impl EdgeFilter {
    pub fn new(alpha: f32) -> Self {
        Self { alpha: clamp01(alpha), values: Vec::new() }
    }

    /// Weight of a frame lasting `dt` seconds.
    #[inline]
    pub fn weight(&self, dt: f32) -> f32 {
        let frames = sanitize(dt, 0.0).max(0.0) * EDGE_REFERENCE_HZ;
        clamp01(1.0 - powf(1.0 - self.alpha, frames))
    }

    /// Filter `raw` in place against last frame's values.
    pub fn apply(&mut self, raw: &mut [f32], dt: f32) {
        if self.values.len() != raw.len() {
            self.values.clear();
            self.values.extend_from_slice(raw);
            return;
        }
        let k = self.weight(dt);
        for (v, r) in self.values.iter_mut().zip(raw.iter_mut()) {
            *v += k * (*r - *v);
            *r = *v;
        }
    }

    #[inline] pub fn values(&self) -> &[f32] { &self.values }
}

/// Body/glow ring: `radius + smoothed deformation` at each of `samples` angles.
pub fn body_ring(input: &ShapeInput<'_>, edge: &mut EdgeFilter, dt: f32, out: &mut Vec<Vec2>) {
    out.clear();
    let params = input.params;
    let n = params.samples;
    if n < 3 || !(input.radius > 0.0) {
        return;
    }
    let t = input.time * params.time_scale;
    let gain = 1.0 + clamp01(input.amplitude) * params.amplitude_gain;

    let mut deform: Vec<f32> = (0..n)
        .map(|i| {
            let a = ring_angle(i, n);
            let off = harmonic_offset(params, input.seed, a, t)
                + noise_offset(input.noise, params.noise_amount, input.seed, a, t);
            input.radius * gain * off
        })
        .collect();
    edge.apply(&mut deform, dt);

    out.extend(deform.iter().enumerate().map(|(i, d)| {
        let a = ring_angle(i, n) + input.spin;
        let r = (input.radius + d).max(0.0);
        input.center + Vec2::new(fast_cos(a), fast_sin(a)) * r
    }));
}

// ------------------------------- Satellite variant -------------------------------

/// Slewed anisotropic transform of a satellite.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ShapeState {
    pub sx: f32,
    pub sy: f32,
    pub shear: f32,
}

impl ShapeState {
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0, shear: 0.0 };

    /// This frame's unsmoothed targets.
    pub fn target(aniso: &Anisotropy, seed: f32, time: f32) -> Self {
        let w = time * aniso.rate;
        Self {
            sx: 1.0 + aniso.stretch * sin(w + seed * TAU),
            sy: 1.0 + aniso.stretch * sin(w * 0.83 + seed * 5.0 + 1.3),
            shear: aniso.shear * sin(w * 0.61 + seed * 3.7),
        }
    }

    /// Slew every component toward `target` with one time constant.
    pub fn step(&mut self, target: Self, tau: f32, dt: f32) {
        self.sx = exp_slew(self.sx, target.sx, tau, tau, dt);
        self.sy = exp_slew(self.sy, target.sy, tau, tau, dt);
        self.shear = exp_slew(self.shear, target.shear, tau, tau, dt);
    }
}

/// Rotate into the local frame, shear x by y, scale, rotate back.
pub fn apply_aniso(center: Vec2, p: Vec2, angle: f32, s: &ShapeState) -> Vec2 {
    let d = p - center;
    let (sa, ca) = (sin(angle), cos(angle));
    let mut xr = ca * d.x + sa * d.y;
    let yr = -sa * d.x + ca * d.y;
    xr += s.shear * yr;
    let (xs, ys) = (xr * s.sx, yr * s.sy);
    center + Vec2::new(ca * xs - sa * ys, sa * xs + ca * ys)
}

/// Satellite ring. `state` holds the slewed transform; `None` primes it with this frame's target.
pub fn satellite_ring(input: &ShapeInput<'_>, state: &mut Option<ShapeState>, dt: f32, out: &mut Vec<Vec2>) {
    out.clear();
    let params = input.params;
    let n = params.samples;
    if n < 3 || !(input.radius > 0.0) {
        return;
    }
    let t = input.time * params.time_scale;
    let amp = clamp01(input.amplitude);

    let b = &params.breathing;
    let breathe = 1.0 + b.amplitude * (sin(t * b.frequency + b.phase) + 1.0) * 0.5;
    let radius = input.radius * (breathe + amp * params.amplitude_gain);

    let target = ShapeState::target(&params.aniso, input.seed, t);
    let shape = match state {
        Some(s) => {
            s.step(target, params.aniso.tau, dt);
            *s
        }
        None => *state.insert(target),
    };
    let local = input.spin + t * params.aniso.spin + input.seed * TAU;

    out.extend((0..n).map(|i| {
        let a = ring_angle(i, n);
        let off = harmonic_offset(params, input.seed, a, t)
            + noise_offset(input.noise, params.noise_amount, input.seed, a, t);
        let r = (radius * (1.0 + off)).max(0.0);
        let p = input.center + Vec2::new(fast_cos(a), fast_sin(a)) * r;
        apply_aniso(input.center, p, local, &shape)
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_params() -> ShapeParams {
        ShapeParams {
            samples: 96,
            time_scale: 0.8,
            harmonics: vec![
                Harmonic::new(1.2, 0.0052, 0.4, 0.0),
                Harmonic::new(1.8, 0.0023, 0.55, 0.3),
                Harmonic::new(2.3, 0.0015, 0.75, 0.7),
            ],
            global_drift: 0.03,
            noise_amount: 0.004,
            amplitude_gain: 0.5,
            ..ShapeParams::default()
        }
    }

    fn satellite_params() -> ShapeParams {
        ShapeParams {
            samples: 64,
            harmonics: vec![Harmonic::new(0.65, 0.035, 0.075, 0.0), Harmonic::new(1.25, 0.008, -0.03, 0.25)],
            noise_amount: 0.02,
            amplitude_gain: 0.1,
            breathing: Breathing { frequency: 0.7, amplitude: 0.035, phase: 0.0 },
            aniso: Anisotropy { stretch: 0.06, shear: 0.05, ..Anisotropy::default() },
            ..ShapeParams::default()
        }
    }

    fn input<'a>(params: &'a ShapeParams, noise: &'a Perlin, time: f32, amplitude: f32) -> ShapeInput<'a> {
        ShapeInput { center: Vec2::new(100.0, 100.0), radius: 70.0, time, amplitude, seed: 0.37, spin: 0.0, params, noise }
    }

    #[test]
    fn body_ring_is_deterministic() {
        let p = body_params();
        let n = Perlin::new(1);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        let (mut ea, mut eb) = (EdgeFilter::new(0.04), EdgeFilter::new(0.04));
        for f in 0..30 {
            let t = f as f32 / 60.0;
            body_ring(&input(&p, &n, t, 0.4), &mut ea, 1.0 / 60.0, &mut a);
            body_ring(&input(&p, &n, t, 0.4), &mut eb, 1.0 / 60.0, &mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn body_ring_hugs_base_radius() {
        let p = body_params();
        let n = Perlin::new(2);
        let mut out = Vec::new();
        body_ring(&input(&p, &n, 12.0, 1.0), &mut EdgeFilter::new(0.04), 1.0 / 60.0, &mut out);
        assert_eq!(out.len(), 96);
        for q in &out {
            let r = (*q - Vec2::new(100.0, 100.0)).length();
            assert!((r - 70.0).abs() < 70.0 * 0.05, "r={r}");
        }
    }

    #[test]
    fn edge_filter_smooths_across_frames_not_angles() {
        let mut f = EdgeFilter::new(0.04);
        let mut first = vec![1.0, 2.0, 3.0];
        f.apply(&mut first, 1.0 / 60.0);
        assert_eq!(first, vec![1.0, 2.0, 3.0]);
        let mut second = vec![11.0, 2.0, -7.0];
        f.apply(&mut second, 1.0 / 60.0);
        assert!((second[0] - 1.4).abs() < 1e-4);
        assert_eq!(second[1], 2.0);
        assert!((second[2] - 2.6).abs() < 1e-4);
    }

    #[test]
    fn edge_filter_settles_at_the_same_pace_at_any_refresh_rate() {
        let (mut slow, mut fast) = (EdgeFilter::new(0.04), EdgeFilter::new(0.04));
        slow.apply(&mut [0.0], 1.0 / 60.0);
        fast.apply(&mut [0.0], 1.0 / 120.0);
        for _ in 0..60 {
            slow.apply(&mut [10.0], 1.0 / 60.0);
        }
        for _ in 0..120 {
            fast.apply(&mut [10.0], 1.0 / 120.0);
        }
        assert!((slow.values()[0] - fast.values()[0]).abs() < 1e-3, "{} vs {}", slow.values()[0], fast.values()[0]);
        assert!((slow.weight(1.0 / 60.0) - 0.04).abs() < 1e-5);
        assert_eq!(slow.weight(0.0), 0.0);
        assert_eq!(slow.weight(f32::NAN), 0.0);
    }

    #[test]
    fn amplitude_is_clamped() {
        let p = body_params();
        let n = Perlin::new(3);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        body_ring(&input(&p, &n, 4.0, 1.0), &mut EdgeFilter::new(0.04), 1.0 / 60.0, &mut a);
        body_ring(&input(&p, &n, 4.0, 9.0), &mut EdgeFilter::new(0.04), 1.0 / 60.0, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn harmonics_close_the_ring() {
        let p = satellite_params();
        let start = harmonic_offset(&p, 0.2, 0.0, 3.0);
        let end = harmonic_offset(&p, 0.2, TAU, 3.0);
        assert!((start - end).abs() < 1e-5);
    }

    #[test]
    fn satellite_wobble_is_slewed() {
        let p = satellite_params();
        let n = Perlin::new(4);
        let mut state = None;
        let mut out = Vec::new();
        satellite_ring(&input(&p, &n, 0.0, 0.0), &mut state, 1.0 / 60.0, &mut out);
        let primed = state.expect("primed");
        assert_eq!(primed, ShapeState::target(&p.aniso, 0.37, 0.0));

        satellite_ring(&input(&p, &n, 40.0, 0.0), &mut state, 1.0 / 60.0, &mut out);
        let moved = state.expect("kept");
        let target = ShapeState::target(&p.aniso, 0.37, 40.0);
        let k = 1.0 - (-1.0f32 / 60.0 / p.aniso.tau).exp();
        assert!((moved.sx - primed.sx).abs() <= (target.sx - primed.sx).abs() * k + 1e-6);
        assert!((moved.shear - primed.shear).abs() <= (target.shear - primed.shear).abs() * k + 1e-6);
        assert_eq!(out.len(), 64);
    }

    #[test]
    fn identity_aniso_is_noop() {
        let c = Vec2::new(5.0, -2.0);
        let p = Vec2::new(9.0, 1.0);
        let q = apply_aniso(c, p, 0.7, &ShapeState::IDENTITY);
        assert!((q - p).length() < 1e-5);
    }

    #[test]
    fn degenerate_radius_gives_empty_ring() {
        let p = body_params();
        let n = Perlin::new(5);
        let mut out = vec![Vec2::ONE];
        let mut inp = input(&p, &n, 1.0, 0.0);
        inp.radius = 0.0;
        body_ring(&inp, &mut EdgeFilter::new(0.04), 1.0 / 60.0, &mut out);
        assert!(out.is_empty());
    }
}
