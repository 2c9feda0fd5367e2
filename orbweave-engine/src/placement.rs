//! Pseudo-3D orbits for satellite blobs.
//!
//! Each satellite has a base point on a slightly eccentric orbit in its own 3D frame.
//! Two slowly advancing angles (plus a very slow precession wobble) build a rotation
//! `Rz(theta) * Ry(phi)`; the rotated point is smoothed per blob, projected with a
//! depth-dependent perspective factor and clamped to a disc around the orb center.
//! Depth also gives a front-ness in `[0, 1]` that drives opacity and color.

use core::f32::consts::PI;

use orbweave_core::glam::{Mat3, Vec2, Vec3};
use orbweave_core::math::{clamp, clamp01, cos, exp_slew, powf, sin, EPS, TAU};
use serde::{Deserialize, Serialize};

use crate::state::BlobId;

/// Constant orbit configuration of one satellite.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitParams {
    /// Speed of the rotation-matrix angles.
    pub rotation_speed: f32,
    /// Speed of the point along its orbit, rad/s.
    pub orbit_speed: f32,
    /// Multiplier on elapsed time for the rotation angles.
    pub time_scale: f32,
    /// Depth of the orbit as a fraction of the sphere radius.
    pub depth: f32,
}

impl Default for OrbitParams {
    fn default() -> Self {
        Self { rotation_speed: 0.5, orbit_speed: 0.06, time_scale: 0.18, depth: 0.4 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepulsionTuning {
    pub enabled: bool,
    /// Pairs closer than this fraction of the sphere radius push apart.
    pub threshold: f32,
    /// Largest nudge per frame, fraction of the sphere radius.
    pub strength: f32,
}

impl Default for RepulsionTuning {
    fn default() -> Self {
        Self { enabled: false, threshold: 0.35, strength: 0.02 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementTuning {
    /// Orbit radius, fraction of the sphere radius.
    pub orbit_fraction: f32,
    /// Screen-space clamp radius, fraction of the sphere radius.
    pub clamp_fraction: f32,
    pub perspective_depth: f32,
    /// Extra perspective at full loudness.
    pub perspective_gain: f32,
    /// Orbit growth at full loudness.
    pub orbit_gain: f32,
    pub eccentricity: f32,
    pub smoothing_tau: f32,
    /// Precession wobble of the rotation axis, radians.
    pub precession: f32,
    /// Opacity of a fully back-facing satellite.
    pub occlusion_floor: f32,
    /// Satellites deeper than this fraction of the sphere radius are not drawn.
    pub cull_depth: f32,
    pub repulsion: RepulsionTuning,
}

impl Default for PlacementTuning {
    fn default() -> Self {
        Self {
            orbit_fraction: 0.78,
            clamp_fraction: 0.82,
            perspective_depth: 0.22,
            perspective_gain: 0.06,
            orbit_gain: 0.08,
            eccentricity: 0.05,
            smoothing_tau: 0.28,
            precession: 0.05,
            occlusion_floor: 0.15,
            cull_depth: -0.95,
            repulsion: RepulsionTuning::default(),
        }
    }
}

/// Smoothed 3D position and perspective of one satellite.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PlacementState {
    pub pos: Vec3,
    pub perspective: f32,
}

/// Shared inputs of one frame.
#[derive(Copy, Clone, Debug)]
pub struct PlacementContext {
    pub center: Vec2,
    pub sphere_radius: f32,
    pub time: f32,
    pub dt: f32,
    /// Eased loudness in `[0, 1]`.
    pub energy: f32,
}

/// Where a satellite lands this frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub id: BlobId,
    pub screen: Vec2,
    /// Smoothed z, positive toward the viewer.
    pub depth: f32,
    pub perspective: f32,
    pub frontness: f32,
    pub opacity: f32,
    pub visible: bool,
}

/// `Rz(theta) * Ry(phi)`.
#[inline]
pub fn rotation(theta: f32, phi: f32) -> Mat3 {
    Mat3::from_rotation_z(theta) * Mat3::from_rotation_y(phi)
}

/// Rotation angles at `time`, including the slow precession of the axis.
pub fn orbit_angles(orbit: &OrbitParams, seed: f32, time: f32, energy: f32, tuning: &PlacementTuning) -> (f32, f32) {
    let e = clamp01(energy);
    let blob_time = time * orbit.time_scale * (1.0 + seed * 0.5);
    let slow = time * 0.03;
    let theta = blob_time * orbit.rotation_speed * 0.2 * (1.0 + 0.03 * e)
        + seed * TAU
        + tuning.precession * sin(slow * 0.15 + seed * 2.0);
    let phi = blob_time * orbit.rotation_speed * 0.15 * (1.0 + 0.02 * e)
        + seed * PI
        + tuning.precession * 0.8 * cos(slow * 0.12 + seed * 1.8);
    (theta, phi)
}

/// Unrotated orbit point of satellite `index`.
pub fn orbit_point(index: usize, orbit: &OrbitParams, seed: f32, ctx: &PlacementContext, tuning: &PlacementTuning) -> Vec3 {
    let t = ctx.time;
    let e = clamp01(ctx.energy);
    let k = index as f32;
    let angle = k * 0.8 + t * orbit.orbit_speed + seed * 0.8;
    let breathing = 0.98 + 0.02 * (0.85 + 0.15 * sin(t * 0.02 + seed * 0.4));
    let r = ctx.sphere_radius * tuning.orbit_fraction * (1.0 + tuning.orbit_gain * e) * breathing;
    let ecc = tuning.eccentricity + 0.02 * sin(0.15 * t + seed * 3.1);
    Vec3::new(
        sin(angle) * r * (1.0 + ecc),
        cos(angle) * r * (1.0 - ecc),
        sin(angle * 0.5 + k * 0.5 + seed * 0.3) * ctx.sphere_radius * orbit.depth,
    )
}

/// Pull `p` back onto the disc of radius `max` around `center` if it is outside.
#[inline]
pub fn clamp_to_radius(center: Vec2, p: Vec2, max: f32) -> Vec2 {
    let d = p - center;
    let len = d.length();
    if len > max && len > EPS {
        center + d * (max.max(0.0) / len)
    } else {
        p
    }
}

/// Place satellite `index`. `state` is its smoothing register; `None` primes it.
pub fn place(
    id: BlobId,
    index: usize,
    orbit: &OrbitParams,
    seed: f32,
    ctx: &PlacementContext,
    state: &mut Option<PlacementState>,
    tuning: &PlacementTuning,
) -> Placement {
    let sphere = ctx.sphere_radius.max(EPS);
    let e = clamp01(ctx.energy);
    let (theta, phi) = orbit_angles(orbit, seed, ctx.time, e, tuning);
    let p = rotation(theta, phi) * orbit_point(index, orbit, seed, ctx, tuning);
    let persp = clamp(1.0 + p.z / sphere * (tuning.perspective_depth + tuning.perspective_gain * e), 0.5, 1.5);

    let s = match state {
        Some(s) => {
            let tau = tuning.smoothing_tau;
            let dt = ctx.dt;
            s.pos = Vec3::new(
                exp_slew(s.pos.x, p.x, tau, tau, dt),
                exp_slew(s.pos.y, p.y, tau, tau, dt),
                exp_slew(s.pos.z, p.z, tau, tau, dt),
            );
            s.perspective = exp_slew(s.perspective, persp, tau, tau, dt);
            *s
        }
        None => *state.insert(PlacementState { pos: p, perspective: persp }),
    };

    let raw = ctx.center + Vec2::new(s.pos.x, s.pos.y) * s.perspective;
    let screen = clamp_to_radius(ctx.center, raw, sphere * tuning.clamp_fraction);
    let nz = clamp(s.pos.z / sphere, -1.0, 1.0);
    let frontness = clamp01(nz * 0.5 + 0.5);
    let floor = clamp01(tuning.occlusion_floor);

    Placement {
        id,
        screen,
        depth: s.pos.z,
        perspective: s.perspective,
        frontness,
        opacity: floor + (1.0 - floor) * powf(frontness, 1.2),
        visible: s.pos.z > tuning.cull_depth * sphere,
    }
}

/// Soft pairwise separation, then re-clamp. Each satellite moves at most
/// `strength * sphere_radius` per call; nothing is written back to the registers.
pub fn repel(placements: &mut [Placement], center: Vec2, sphere_radius: f32, tuning: &PlacementTuning) {
    let rep = &tuning.repulsion;
    if !rep.enabled || placements.len() < 2 {
        return;
    }
    let threshold = sphere_radius * rep.threshold;
    let max_nudge = sphere_radius * rep.strength;
    if !(threshold > EPS) || !(max_nudge > 0.0) {
        return;
    }

    let mut nudges = vec![Vec2::ZERO; placements.len()];
    for i in 0..placements.len() {
        for j in (i + 1)..placements.len() {
            let d = placements[i].screen - placements[j].screen;
            let dist = d.length();
            if dist >= threshold {
                continue;
            }
            let dir = if dist > EPS {
                d / dist
            } else {
                let a = (i + j) as f32;
                Vec2::new(cos(a), sin(a))
            };
            let push = 0.5 * max_nudge * (threshold - dist) / threshold;
            nudges[i] += dir * push;
            nudges[j] -= dir * push;
        }
    }

    let max_r = sphere_radius * tuning.clamp_fraction;
    for (p, n) in placements.iter_mut().zip(nudges) {
        p.screen = clamp_to_radius(center, p.screen + n.clamp_length_max(max_nudge), max_r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(time: f32, energy: f32) -> PlacementContext {
        PlacementContext { center: Vec2::new(200.0, 300.0), sphere_radius: 80.0, time, dt: 1.0 / 60.0, energy }
    }

    #[test]
    fn rotation_is_orthonormal() {
        for (t, p) in [(0.0, 0.0), (0.7, 1.9), (-2.3, 4.4)] {
            let m = rotation(t, p);
            assert!((m.determinant() - 1.0).abs() < 1e-5);
            let v = Vec3::new(1.0, -2.0, 0.5);
            assert!(((m * v).length() - v.length()).abs() < 1e-4);
            let expected_row0 = Vec3::new(t.cos() * p.cos(), -t.sin(), t.cos() * p.sin());
            assert!((m.row(0) - expected_row0).length() < 1e-5);
        }
    }

    #[test]
    fn screen_position_never_leaves_clamp_disc() {
        let tuning = PlacementTuning::default();
        let orbit = OrbitParams { depth: 1.5, ..OrbitParams::default() };
        let mut states = [None, None, None, None];
        for f in 0..3000 {
            let c = ctx(f as f32 * 0.05, (f % 7) as f32 / 6.0);
            for (i, st) in states.iter_mut().enumerate() {
                let p = place(BlobId(i as u16 + 2), i, &orbit, 0.13 + 0.2 * i as f32, &c, st, &tuning);
                let d = (p.screen - c.center).length();
                assert!(d <= c.sphere_radius * tuning.clamp_fraction + 1e-3, "d={d}");
                assert!((0.0..=1.0).contains(&p.frontness));
                assert!(p.opacity >= tuning.occlusion_floor - 1e-6 && p.opacity <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn position_is_slewed_per_blob() {
        let tuning = PlacementTuning::default();
        let orbit = OrbitParams::default();
        let mut st = None;
        let c0 = ctx(0.0, 0.0);
        place(BlobId(2), 0, &orbit, 0.3, &c0, &mut st, &tuning);
        let before = st.expect("primed");

        let c1 = ctx(30.0, 0.0);
        let target = rotation(
            orbit_angles(&orbit, 0.3, 30.0, 0.0, &tuning).0,
            orbit_angles(&orbit, 0.3, 30.0, 0.0, &tuning).1,
        ) * orbit_point(0, &orbit, 0.3, &c1, &tuning);
        place(BlobId(2), 0, &orbit, 0.3, &c1, &mut st, &tuning);
        let after = st.expect("kept");
        let k = 1.0 - (-c1.dt / tuning.smoothing_tau).exp();
        assert!(((after.pos - before.pos).length() - (target - before.pos).length() * k).abs() < 1e-3);
    }

    #[test]
    fn frontness_follows_depth() {
        let tuning = PlacementTuning::default();
        let orbit = OrbitParams::default();
        let c = ctx(0.0, 0.0);
        let mut front = Some(PlacementState { pos: Vec3::new(0.0, 0.0, 80.0), perspective: 1.2 });
        let mut back = Some(PlacementState { pos: Vec3::new(0.0, 0.0, -80.0), perspective: 0.8 });
        let tuning_frozen = PlacementTuning { smoothing_tau: 1.0e6, ..tuning };
        let f = place(BlobId(2), 0, &orbit, 0.1, &c, &mut front, &tuning_frozen);
        let b = place(BlobId(3), 1, &orbit, 0.1, &c, &mut back, &tuning_frozen);
        assert!(f.frontness > 0.99 && b.frontness < 0.01);
        assert!(f.opacity > b.opacity);
        assert!(f.visible && !b.visible);
    }

    #[test]
    fn repulsion_is_bounded_and_separates() {
        let tuning = PlacementTuning {
            repulsion: RepulsionTuning { enabled: true, threshold: 0.35, strength: 0.02 },
            ..PlacementTuning::default()
        };
        let center = Vec2::new(0.0, 0.0);
        let mk = |id: u16, x: f32| Placement {
            id: BlobId(id),
            screen: Vec2::new(x, 0.0),
            depth: 0.0,
            perspective: 1.0,
            frontness: 0.5,
            opacity: 1.0,
            visible: true,
        };
        let mut ps = [mk(2, 0.0), mk(3, 4.0), mk(4, 4.0)];
        let before: Vec<Vec2> = ps.iter().map(|p| p.screen).collect();
        repel(&mut ps, center, 100.0, &tuning);
        for (p, b) in ps.iter().zip(&before) {
            assert!((p.screen - *b).length() <= 100.0 * 0.02 + 1e-4);
        }
        assert!((ps[0].screen - ps[1].screen).length() > 4.0);
        assert!((ps[1].screen - ps[2].screen).length() > 0.0);
    }

    #[test]
    fn repulsion_off_is_noop() {
        let tuning = PlacementTuning::default();
        let p = Placement {
            id: BlobId(2),
            screen: Vec2::ONE,
            depth: 0.0,
            perspective: 1.0,
            frontness: 0.5,
            opacity: 1.0,
            visible: true,
        };
        let mut ps = [p, p];
        repel(&mut ps, Vec2::ZERO, 100.0, &tuning);
        assert_eq!(ps, [p, p]);
    }
}
