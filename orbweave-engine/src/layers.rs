//! Back-to-front draw list for one frame.
//!
//! Order: edge bloom and vignette, halo, glow, body, inner shadow, satellites
//! (back to front), edge whispers, inner ripple, cool/warm core, refraction rims,
//! caustic arc, specular hotspot, sparkles, micro specks. Layers whose opacity
//! rounds to nothing are skipped.

use core::f32::consts::PI;

use orbweave_core::color::{Rgb, Rgba};
use orbweave_core::glam::Vec2;
use orbweave_core::math::{atan2, clamp01, cos, powf, sin, TAU};
use serde::{Deserialize, Serialize};

use crate::detail::{DetailFrame, RIPPLE_FREQS};
use crate::draw::{BlendMode, Fill, GradientStop, Layer, LayerKind, Outline};
use crate::envelope::Envelopes;
use crate::motion::OrbFrame;
use crate::placement::Placement;
use crate::state::BlobId;

/// Layers below this opacity are not emitted.
pub const MIN_OPACITY: f32 = 0.003;

/// Per-family switches, all on by default.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerToggles {
    pub bloom: bool,
    pub halo: bool,
    pub glow: bool,
    pub body: bool,
    pub inner_shadow: bool,
    pub satellites: bool,
    pub whispers: bool,
    pub ripple: bool,
    pub core: bool,
    pub rims: bool,
    pub caustics: bool,
    pub specular: bool,
    pub sparkles: bool,
    pub specks: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            bloom: true,
            halo: true,
            glow: true,
            body: true,
            inner_shadow: true,
            satellites: true,
            whispers: true,
            ripple: true,
            core: true,
            rims: true,
            caustics: true,
            specular: true,
            sparkles: true,
            specks: true,
        }
    }
}

/// Frame background for the host theme.
pub fn background(dark_mode: bool) -> Rgba {
    if dark_mode { Rgba::hex(0x0B_10_20) } else { Rgba::hex(0xF4_F7_FB) }
}

/// One satellite ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct SatelliteFrame {
    pub placement: Placement,
    pub outline: Vec<Vec2>,
    pub color: Rgb,
}

/// Inputs of [`assemble`].
#[derive(Copy, Clone, Debug)]
pub struct LayerInput<'a> {
    pub center: Vec2,
    pub radius: f32,
    pub time: f32,
    pub dt: f32,
    /// Latest input amplitude, `[0, 1]`, unsmoothed.
    pub amplitude: f32,
    pub envelopes: Envelopes,
    pub orb: OrbFrame,
    pub body_id: BlobId,
    pub body: &'a [Vec2],
    pub body_color: Rgb,
    pub glow: Option<(&'a [Vec2], Rgb)>,
    /// Already sorted back to front.
    pub satellites: &'a [SatelliteFrame],
    /// Unit vector toward the light, screen space.
    pub light: Vec2,
    pub detail: DetailFrame<'a>,
    pub toggles: LayerToggles,
}

const CORE_COOL: u32 = 0x9B_C2_FF;
const CORE_WARM: u32 = 0xFF_E0_C2;
const CORE_INNER: f32 = 0.055;
const CORE_OUTER: f32 = 0.36;
const CORE_MAX_OPACITY: f32 = 0.20;

const RIM_COOL: u32 = 0x8F_C3_FF;
const RIM_WARM: u32 = 0xFF_C8_93;
const RIM_WIDTH: f32 = 0.034;
const RIM_MAX_OPACITY: f32 = 0.30;

const SPEC_MIN: f32 = 0.02;
const SPEC_MAX: f32 = 0.22;
const SPEC_SIZE: f32 = 0.075;

const SPARKLES: usize = 4;
const SPARKLE_ARC: f32 = 0.96;
const SPARKLE_SIZE: f32 = 0.06;

const BLOOM_EDGE: f32 = 1.20;
const BLOOM_OPACITY: f32 = 0.20;
const BLOOM_TILT: f32 = 0.06;
const VIGNETTE_OPACITY: f32 = 0.12;

const WHISPER_ARC: f32 = 32.0 * PI / 180.0;
/// Angle from the shadow side, peak alpha, color.
const WHISPERS: [(f32, f32, [u8; 3]); 3] = [
    (-0.25 * PI, 0.18, [37, 214, 255]),
    (0.12 * PI, 0.18, [124, 114, 255]),
    (0.48 * PI, 0.14, [255, 108, 218]),
];

const RIPPLE_COOL: u32 = 0x94_B7_E9;
const RIPPLE_WARM: u32 = 0xFF_DD_BF;
const RIPPLE_OPACITY: f32 = 0.20;
const RIPPLE_DEPTH: f32 = 0.065;
const RIPPLE_EXTENT: f32 = 0.88;
const RIPPLE_OFFSETS: [f32; 3] = [0.0, 1.1, 2.3];
const RIPPLE_STOPS: usize = 120;

const CAUSTIC_ARC: f32 = 56.0 * PI / 180.0;
const CAUSTIC_EASE: f32 = 0.55;
const CAUSTIC_COOL_MAX: f32 = 0.28;
const CAUSTIC_WARM_MAX: f32 = 0.24;
const CAUSTIC_BLOOM: f32 = 0.16;

const SPECK_RADIUS: (f32, f32) = (0.38, 0.86);
const SPECK_SIZE: (f32, f32) = (0.006, 0.018);
const SPECK_OPACITY: (f32, f32) = (0.04, 0.16);
const SPECK_SWIRL: f32 = 0.9;

fn push(out: &mut Vec<Layer>, kind: LayerKind, outline: Outline, fill: Fill, blend: BlendMode, opacity: f32) {
    let opacity = clamp01(opacity);
    if opacity < MIN_OPACITY {
        return;
    }
    out.push(Layer { kind, outline, fill, blend, opacity, stroke: None });
}

fn radial(center: Vec2, radius: f32, stops: &[(f32, Rgba)]) -> Fill {
    Fill::Radial {
        center,
        radius: radius.max(0.0),
        stops: stops.iter().map(|&(o, c)| GradientStop::new(o, c)).collect(),
    }
}

fn path(points: &[Vec2]) -> Outline {
    Outline::Path { points: points.to_vec() }
}

/// Farthest outline point from `center`.
fn reach(center: Vec2, points: &[Vec2]) -> f32 {
    points.iter().map(|p| (*p - center).length()).fold(0.0, f32::max)
}

/// Closed annular sector of `arc` radians centered on `angle`.
fn arc_sector(center: Vec2, inner: f32, outer: f32, angle: f32, arc: f32, steps: usize) -> Vec<Vec2> {
    let at = |radius: f32, i: usize| {
        let a = angle - arc * 0.5 + arc * i as f32 / steps as f32;
        center + Vec2::new(cos(a), sin(a)) * radius
    };
    let mut points: Vec<Vec2> = (0..=steps).map(|i| at(outer, i)).collect();
    points.extend((0..=steps).rev().map(|i| at(inner, i)));
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}

/// Three faint colored sectors hugging one blob's edge.
fn whispers(out: &mut Vec<Layer>, id: BlobId, center: Vec2, radius: f32, shadow_angle: f32, breath: f32, dt: f32) {
    if !(radius > 0.0) {
        return;
    }
    let k = clamp01(breath);
    let rate = if dt > 0.0 { (1.0 / (60.0 * dt)).min(1.0) } else { 1.0 };
    let opacity = 0.006 + 0.012 * (0.9 + 0.2 * rate) * k;
    let r = radius * 0.985;
    for (offset, peak, [cr, cg, cb]) in WHISPERS {
        let col = Rgba::rgb8(cr, cg, cb, 0.0);
        push(
            out,
            LayerKind::Whisper(id),
            path(&arc_sector(center, radius * 0.955, radius * 1.010, shadow_angle + offset, WHISPER_ARC, 32)),
            radial(center, r, &[(0.968, col), (0.980 + 0.004 * k, col.with_alpha(peak)), (0.995, col)]),
            BlendMode::Screen,
            opacity,
        );
    }
}

/// Breathing pulse of the core's inner radius.
fn core_pulse(t: f32) -> f32 {
    let slow = 0.5 + 0.5 * sin(t * 0.7 + 0.3 * sin(t * 0.11));
    let jitter = 0.5 + 0.5 * sin(t * 3.1 + 1.7);
    0.92 + 0.08 * (0.75 * slow + 0.25 * jitter)
}

/// Build the frame's layers into `out` (cleared first).
pub fn assemble(input: &LayerInput<'_>, out: &mut Vec<Layer>) {
    out.clear();
    let c = input.center;
    let r = input.radius;
    let t = input.time;
    let env = input.envelopes;
    let light = input.light;
    let tg = input.toggles;
    let light_angle = atan2(light.y, light.x);
    let amp = clamp01(input.amplitude);
    let detail = input.detail;

    if tg.bloom {
        let bc = c + Vec2::new(0.0, r * BLOOM_TILT);
        let edge = r * BLOOM_EDGE;
        push(
            out,
            LayerKind::Bloom,
            Outline::Circle { center: bc, radius: edge },
            radial(
                bc,
                edge,
                &[
                    ((1.0 / BLOOM_EDGE).min(0.999), Rgba::WHITE.with_alpha(0.25)),
                    (0.92, Rgba::WHITE.with_alpha(0.07)),
                    (1.0, Rgba::WHITE.with_alpha(0.0)),
                ],
            ),
            BlendMode::Screen,
            BLOOM_OPACITY,
        );
        push(
            out,
            LayerKind::Vignette,
            Outline::Circle { center: c, radius: r * 1.05 },
            radial(c, r * 1.05, &[(0.78, Rgba::TRANSPARENT), (1.0, Rgba::BLACK.with_alpha(0.25))]),
            BlendMode::Multiply,
            VIGNETTE_OPACITY,
        );
    }

    if tg.halo {
        let k = clamp01(0.4 * input.orb.breath + 0.6 * env.main);
        push(
            out,
            LayerKind::Halo,
            Outline::Circle { center: c, radius: r * (1.72 + 0.30 * k) },
            radial(
                c,
                r * (1.72 + 0.30 * k),
                &[
                    (0.0, Rgba::rgb8(240, 246, 255, 0.30)),
                    (0.58, Rgba::rgb8(210, 230, 255, 0.12)),
                    (1.0, Rgba::rgb8(210, 230, 255, 0.0)),
                ],
            ),
            BlendMode::Screen,
            0.10 + 0.17 * k,
        );
    }

    if let (true, Some((points, color))) = (tg.glow, input.glow) {
        push(
            out,
            LayerKind::Glow,
            path(points),
            radial(
                c,
                reach(c, points),
                &[(0.0, color.to_rgba(0.55)), (0.6, color.to_rgba(0.25)), (1.0, color.to_rgba(0.0))],
            ),
            BlendMode::Screen,
            0.25 + 0.35 * env.main,
        );
    }

    if tg.body && !input.body.is_empty() {
        let mid = Rgb::new(150.0, 200.0, 255.0).lerp(input.body_color, 0.5);
        push(
            out,
            LayerKind::Body,
            path(input.body),
            radial(
                c + light * r * 0.18,
                reach(c, input.body) * 1.1,
                &[
                    (0.0, Rgba::rgb8(210, 230, 255, 0.92)),
                    (0.22, mid.to_rgba(0.42)),
                    (1.0, input.body_color.to_rgba(0.0)),
                ],
            ),
            BlendMode::Normal,
            1.0,
        );
    }

    if tg.inner_shadow && !input.body.is_empty() {
        push(
            out,
            LayerKind::InnerShadow,
            path(input.body),
            radial(
                c - light * r * 0.26,
                r * 1.1,
                &[
                    (0.0, Rgba::rgb8(10, 20, 40, 0.0)),
                    (0.7, Rgba::rgb8(10, 20, 40, 0.06)),
                    (1.0, Rgba::rgb8(10, 20, 40, 0.18)),
                ],
            ),
            BlendMode::Multiply,
            0.55 + 0.1 * input.orb.breath,
        );
    }

    if tg.satellites {
        for s in input.satellites.iter().filter(|s| s.placement.visible && !s.outline.is_empty()) {
            let sc = s.placement.screen;
            push(
                out,
                LayerKind::Satellite(s.placement.id),
                path(&s.outline),
                radial(
                    sc,
                    reach(sc, &s.outline),
                    &[(0.0, s.color.to_rgba(0.85)), (0.55, s.color.to_rgba(0.45)), (1.0, s.color.to_rgba(0.0))],
                ),
                BlendMode::Screen,
                s.placement.opacity * 0.8,
            );
        }
    }

    if tg.whispers {
        let shadow = light_angle + PI;
        let breath = input.orb.breath;
        if !input.body.is_empty() {
            whispers(out, input.body_id, c, reach(c, input.body), shadow, breath, input.dt);
        }
        for s in input.satellites.iter().filter(|s| s.placement.visible && !s.outline.is_empty()) {
            let sc = s.placement.screen;
            whispers(out, s.placement.id, sc, reach(sc, &s.outline), shadow, breath, input.dt);
        }
    }

    if tg.ripple {
        let extent = r * RIPPLE_EXTENT;
        let tint = Rgba::hex(if clamp01(env.core) < 0.5 { RIPPLE_COOL } else { RIPPLE_WARM });
        let turn = detail.ripple;
        let stops = (0..=RIPPLE_STOPS)
            .map(|i| {
                let u = i as f32 / RIPPLE_STOPS as f32;
                let theta = turn + u * TAU;
                let wave: f32 = RIPPLE_FREQS.iter().zip(RIPPLE_OFFSETS).map(|(f, o)| sin(theta * f + o)).sum();
                let n = 0.5 + 0.5 * wave / 3.0;
                GradientStop::new(u, tint.with_alpha(0.35 + 0.65 * n))
            })
            .collect();
        let opacity = RIPPLE_OPACITY * (0.9 + 0.1 * clamp01(env.main));
        if opacity >= MIN_OPACITY && extent > 0.0 {
            out.push(Layer {
                kind: LayerKind::Ripple,
                outline: Outline::Circle { center: c, radius: extent },
                fill: Fill::Sweep { center: c, start_angle: turn, stops },
                blend: BlendMode::Normal,
                opacity,
                stroke: None,
            });
        }
        let hole = clamp01(r * CORE_INNER * core_pulse(t) / extent.max(f32::EPSILON));
        push(
            out,
            LayerKind::Ripple,
            Outline::Circle { center: c, radius: extent },
            radial(
                c,
                extent,
                &[
                    (hole, Rgba::TRANSPARENT),
                    (powf(hole, 0.55), Rgba::BLACK.with_alpha(0.6 * RIPPLE_DEPTH)),
                    (1.0, Rgba::TRANSPARENT),
                ],
            ),
            BlendMode::Normal,
            1.0,
        );
    }

    if tg.core {
        let fade = clamp01(env.core);
        let inner = CORE_INNER * core_pulse(t) / CORE_OUTER;
        let center = c + light * r * 0.08;
        for (kind, hex, opacity) in [
            (LayerKind::CoreCool, CORE_COOL, CORE_MAX_OPACITY * (1.0 - fade) + 0.04),
            (LayerKind::CoreWarm, CORE_WARM, CORE_MAX_OPACITY * fade),
        ] {
            let col = Rgba::hex(hex);
            push(
                out,
                kind,
                Outline::Circle { center, radius: r * CORE_OUTER },
                radial(center, r * CORE_OUTER, &[(0.0, col), (inner, col.with_alpha(0.8)), (1.0, col.with_alpha(0.0))]),
                BlendMode::Screen,
                opacity,
            );
        }
    }

    if tg.rims {
        let pop = 1.0 + 0.04 * sin(t * 1.7 + 0.9);
        let cool = Rgba::hex(RIM_COOL);
        let warm = Rgba::hex(RIM_WARM);
        let phase = input.orb.rim_phase;
        let rims = [
            (
                LayerKind::RimCool,
                r * (1.0 + RIM_WIDTH),
                phase,
                [cool, Rgba::WHITE.with_alpha(0.6), cool.with_alpha(0.2), warm.with_alpha(0.5), cool],
                input.orb.rim_opacity * 1.08 * pop,
            ),
            (
                LayerKind::RimWarm,
                r * (1.0 - RIM_WIDTH * 0.35),
                -phase * 0.85,
                [warm, warm.with_alpha(0.3), cool.with_alpha(0.4), Rgba::WHITE.with_alpha(0.5), warm],
                input.orb.rim_opacity * 0.9 * pop,
            ),
        ];
        for (kind, radius, start_angle, colors, opacity) in rims {
            let opacity = opacity.min(RIM_MAX_OPACITY);
            if opacity < MIN_OPACITY {
                continue;
            }
            out.push(Layer {
                kind,
                outline: Outline::Circle { center: c, radius },
                fill: Fill::Sweep {
                    center: c,
                    start_angle,
                    stops: colors
                        .iter()
                        .enumerate()
                        .map(|(i, col)| GradientStop::new(i as f32 / 4.0, *col))
                        .collect(),
                },
                blend: BlendMode::Screen,
                opacity,
                stroke: Some(r * RIM_WIDTH),
            });
        }
    }

    if tg.caustics {
        let jitter = 0.12 * sin(t * 0.8);
        let sector = arc_sector(c, r * 0.92, r * (1.0 + RIM_WIDTH * 1.40), light_angle + detail.scroll, CAUSTIC_ARC, 36);
        let u = 0.5 - 0.5 * cos(detail.caustic);
        let (a, b) = (powf(u, CAUSTIC_EASE), powf(1.0 - u, CAUSTIC_EASE));
        let sweep = a / (a + b).max(f32::EPSILON) * TAU;
        let cool = Rgba::hex(RIM_COOL);
        let warm = Rgba::hex(RIM_WARM);
        let arcs = [
            (
                LayerKind::CausticCool,
                sweep + jitter,
                [(0.10, cool.with_alpha(0.0)), (0.18, cool.with_alpha(0.82)), (0.28, cool.with_alpha(0.0))],
                (0.26 * (0.85 + 0.30 * amp)).min(CAUSTIC_COOL_MAX),
            ),
            (
                LayerKind::CausticWarm,
                -sweep * 0.9 - jitter,
                [(0.62, warm.with_alpha(0.0)), (0.70, warm.with_alpha(0.73)), (0.80, warm.with_alpha(0.0))],
                (0.25 * (0.85 + 0.28 * amp)).min(CAUSTIC_WARM_MAX),
            ),
        ];
        for (kind, start_angle, stops, opacity) in arcs {
            push(
                out,
                kind,
                path(&sector),
                Fill::Sweep {
                    center: c,
                    start_angle,
                    stops: stops.iter().map(|&(o, col)| GradientStop::new(o, col)).collect(),
                },
                BlendMode::Screen,
                opacity,
            );
        }
        push(
            out,
            LayerKind::CausticBloom,
            path(&sector),
            radial(
                c,
                r * (1.05 + 0.02 * input.orb.breath),
                &[(0.78, Rgba::WHITE.with_alpha(0.0)), (0.90, Rgba::WHITE.with_alpha(0.10)), (0.995, Rgba::WHITE.with_alpha(0.0))],
            ),
            BlendMode::Screen,
            CAUSTIC_BLOOM,
        );
    }

    if tg.specular {
        let spec = powf(clamp01(env.specular), 0.9);
        let pos = c + light * r * (0.52 + 0.04 * input.orb.breath);
        let size = r * SPEC_SIZE * (1.0 + 0.25 * spec);
        push(
            out,
            LayerKind::Specular,
            Outline::Circle { center: pos, radius: size },
            radial(pos, size, &[(0.0, Rgba::WHITE), (0.4, Rgba::WHITE.with_alpha(0.55)), (1.0, Rgba::WHITE.with_alpha(0.0))]),
            BlendMode::Screen,
            SPEC_MIN + (SPEC_MAX - SPEC_MIN) * spec,
        );
    }

    if tg.sparkles {
        let sparkle = powf(clamp01(env.sparkle), 0.9);
        let base = atan2(light.y, light.x);
        for i in 0..SPARKLES {
            let k = i as f32;
            let a = base + (k - 1.5) * 0.32 + 0.05 * sin(t * 0.9 + k);
            let pos = c + Vec2::new(cos(a), sin(a)) * r * SPARKLE_ARC;
            let twinkle = 0.5 + 0.5 * sin(t * (2.1 + 0.37 * k) + k * 1.3);
            let size = r * SPARKLE_SIZE * (0.6 + 0.4 * twinkle);
            push(
                out,
                LayerKind::Sparkle,
                Outline::Circle { center: pos, radius: size },
                radial(pos, size, &[(0.0, Rgba::WHITE), (1.0, Rgba::WHITE.with_alpha(0.0))]),
                BlendMode::Plus,
                (0.04 + 0.18 * sparkle) * (0.5 + 0.5 * twinkle),
            );
        }
    }

    if tg.specks {
        let level = powf(clamp01(env.main), 0.9);
        let count = detail.twinkle.len() as f32;
        let [swirl, wander, wobble] = detail.drift;
        let size = r * (SPECK_SIZE.0 + (SPECK_SIZE.1 - SPECK_SIZE.0) * (0.3 + 0.7 * level));
        for (i, boost) in detail.twinkle.iter().enumerate() {
            let k = i as f32;
            let u = (k + 1.7) / (count + 2.0);
            let a = light_angle - CAUSTIC_ARC * 0.35 + u * CAUSTIC_ARC * 0.7 + SPECK_SWIRL * 0.12 * sin(swirl + k * 1.9);
            let spread = SPECK_RADIUS.0 + (SPECK_RADIUS.1 - SPECK_RADIUS.0) * (0.35 + 0.65 * (0.5 + 0.5 * sin(wander + k)));
            let pos = c + Vec2::new(cos(a), sin(a)) * r * spread;
            let glint = (0.8 + 0.2 * sin(wobble + k)) * (1.0 + boost);
            push(
                out,
                LayerKind::Speck,
                Outline::Circle { center: pos, radius: size },
                radial(pos, size, &[(0.0, Rgba::WHITE.with_alpha(0.88)), (1.0, Rgba::WHITE.with_alpha(0.0))]),
                BlendMode::Screen,
                (SPECK_OPACITY.0 + (SPECK_OPACITY.1 - SPECK_OPACITY.0) * level * glint).min(RIM_MAX_OPACITY),
            );
        }
    }
}
