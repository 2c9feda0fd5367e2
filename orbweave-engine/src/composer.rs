//! Frame composer: the Running/Stopped state machine and the per-frame pipeline.
//!
//! One [`Composer`] owns the [`EngineState`] and drives every stage in dependency
//! order with the frame's single smoothed delta:
//! envelopes → orb motion → shapes and placement → colors → layer assembly.
//! While stopped, ticks are no-ops and nothing is mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use orbweave_core::glam::Vec2;
use orbweave_core::math::smoothstep;
use orbweave_core::noise::Perlin;
use orbweave_core::spline::closed_spline_into;
use tracing::{debug, trace, warn};

use crate::clock::FrameTiming;
use crate::draw::{DrawBackend, FrameOutput, Layer, Viewport};
use crate::envelope::normalize_amplitude;
use crate::layers::{self, LayerInput, SatelliteFrame};
use crate::palette::update_color;
use crate::placement::{place, repel, Placement, PlacementContext};
use crate::preset::{BlobConfig, Preset, PresetError};
use crate::shape::{body_ring, satellite_ring, ShapeInput};
use crate::state::{BlobId, EngineState};

/// Seed of the noise field that drifts the orb's pulsation.
const ORB_NOISE_SEED: u64 = 0x0B_5EED;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
}

/// Outcome of [`Composer::render`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// Not running; nothing was computed.
    Stopped,
    Drawn,
    /// Composed, but the backend refused it.
    Dropped,
}

pub struct Composer {
    preset: Arc<Preset>,
    noise: BTreeMap<BlobId, Perlin>,
    orb_noise: Perlin,
    light: Vec2,
    state: EngineState,
    run: RunState,
    amplitude: f32,
    viewport: Viewport,
    dark_mode: bool,
    ring: Vec<Vec2>,
}

impl Composer {
    /// Validate `preset` and build a stopped composer.
    pub fn new(preset: Preset, viewport: Viewport) -> Result<Self, PresetError> {
        preset.validate()?;
        let noise = preset.blobs().map(|b| (b.id, Perlin::from_unit_seed(b.seed))).collect();
        let [lx, ly] = preset.light_direction;
        let state = EngineState::new(preset.clock, &preset.envelopes, preset.orb, &preset.detail);
        debug!(preset = %preset.name, satellites = preset.satellites.len(), "composer created");
        Ok(Self {
            light: Vec2::new(lx, ly).normalize_or_zero(),
            noise,
            orb_noise: Perlin::new(ORB_NOISE_SEED),
            state,
            run: RunState::Stopped,
            amplitude: 0.0,
            viewport,
            dark_mode: true,
            preset: Arc::new(preset),
            ring: Vec::new(),
        })
    }

    /// Start or stop. Starting rebases the clock on `now` so the pause never shows up as a delta;
    /// stopping leaves every register where it is.
    pub fn set_running(&mut self, running: bool, now: f64) {
        let next = if running { RunState::Running } else { RunState::Stopped };
        if next == self.run {
            return;
        }
        if next == RunState::Running {
            self.state.clock.restart(now);
        }
        self.run = next;
        debug!(state = ?next, frame = self.state.clock.frame(), "run state changed");
    }

    #[inline] pub fn is_running(&self) -> bool { self.run == RunState::Running }
    #[inline] pub fn run_state(&self) -> RunState { self.run }

    /// Latest amplitude in the preset's scale. Held until the next call.
    pub fn set_amplitude(&mut self, raw: f32) {
        self.amplitude = normalize_amplitude(raw, self.preset.amplitude_scale);
    }

    /// Amplitude already in `[0, 1]` (clamped; NaN is 0).
    pub fn set_amplitude_unit(&mut self, amplitude: f32) {
        self.amplitude = normalize_amplitude(amplitude, crate::envelope::AmplitudeScale::Unit);
    }

    #[inline] pub fn amplitude(&self) -> f32 { self.amplitude }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.dark_mode = dark;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    #[inline] pub fn viewport(&self) -> Viewport { self.viewport }
    #[inline] pub fn state(&self) -> &EngineState { &self.state }
    #[inline] pub fn preset(&self) -> &Preset { &self.preset }

    /// Frame callback with a wall-clock timestamp in seconds. `None` while stopped.
    pub fn tick(&mut self, now: f64) -> Option<FrameOutput> {
        if !self.is_running() {
            return None;
        }
        let raw = self.state.clock.raw_delta(now);
        let timing = self.state.clock.advance(raw);
        Some(self.compose(timing))
    }

    /// Frame callback with an externally measured raw delta. `None` while stopped.
    ///
    /// Clears the clock's stored timestamp: a later [`tick`](Self::tick) starts
    /// measuring from its own `now` instead of a stale one.
    pub fn tick_dt(&mut self, raw_dt: f32) -> Option<FrameOutput> {
        if !self.is_running() {
            return None;
        }
        self.state.clock.forget_timestamp();
        let timing = self.state.clock.advance(raw_dt);
        Some(self.compose(timing))
    }

    /// Tick and hand the frame to `backend`. A backend error drops this frame only.
    pub fn render<B: DrawBackend + ?Sized>(&mut self, now: f64, backend: &mut B) -> FrameStatus {
        let Some(frame) = self.tick(now) else {
            return FrameStatus::Stopped;
        };
        match backend.draw(&frame) {
            Ok(()) => FrameStatus::Drawn,
            Err(err) => {
                warn!(frame = frame.timing.frame, error = %err, "backend rejected frame, dropping it");
                FrameStatus::Dropped
            }
        }
    }

    /// Spline a ring of control points into `out`.
    fn smooth_into(&self, tension: f32, out: &mut Vec<Vec2>) {
        closed_spline_into(&self.ring, tension, self.preset.spline.steps, out);
    }

    fn body_outline(&mut self, blob: &BlobConfig, center: Vec2, radius: f32, timing: FrameTiming, amp: f32, spin: f32) -> Vec<Vec2> {
        let noise = self.noise.get(&blob.id).unwrap_or(&self.orb_noise);
        let input = ShapeInput {
            center,
            radius: radius * blob.size,
            time: timing.time,
            amplitude: amp,
            seed: blob.seed,
            spin,
            params: &blob.shape,
            noise,
        };
        let edge = self.state.registers_mut(blob.id).edge_mut(blob.shape.edge_alpha);
        body_ring(&input, edge, timing.dt, &mut self.ring);
        let mut out = Vec::new();
        self.smooth_into(self.preset.spline.body_tension, &mut out);
        out
    }

    fn compose(&mut self, timing: FrameTiming) -> FrameOutput {
        let FrameTiming { dt, time, .. } = timing;
        let preset = Arc::clone(&self.preset);
        let viewport = self.viewport;
        let center = viewport.center();

        let env = self.state.tracker.update(self.amplitude, dt);
        self.state.detail.step(dt, &preset.detail);

        let base = preset.orb.radius_fraction * viewport.min_side();
        let orb = self.state.orb.step(base, time, dt, self.amplitude, env.main, &self.orb_noise);
        let r = orb.radius;
        let eased = smoothstep(0.0, 1.0, env.main);

        let body = self.body_outline(&preset.body, center, r, timing, eased, orb.spin);
        let glow = preset.glow.as_ref().map(|g| self.body_outline(g, center, r, timing, eased, -orb.spin * 0.5));

        let ctx = PlacementContext { center, sphere_radius: r, time, dt, energy: env.main };
        let mut placements: Vec<Placement> = preset
            .satellites
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let reg = self.state.registers_mut(s.id);
                place(s.id, i, &s.orbit, s.seed, &ctx, &mut reg.placement, &preset.placement)
            })
            .collect();
        repel(&mut placements, center, r, &preset.placement);

        let palette = &preset.palette;
        let body_color = update_color(
            &mut self.state.registers_mut(preset.body.id).color,
            &palette[preset.body.palette_slot],
            env.main,
            0.0,
            dt,
            &preset.color,
        )
        .rgb;
        let glow_color = preset.glow.as_ref().map(|g| {
            update_color(&mut self.state.registers_mut(g.id).color, &palette[g.palette_slot], env.main, 0.0, dt, &preset.color)
                .rgb
        });

        let mut satellites = Vec::with_capacity(placements.len());
        for (cfg, p) in preset.satellites.iter().zip(placements) {
            let color = update_color(
                &mut self.state.registers_mut(cfg.id).color,
                &palette[cfg.palette_slot],
                env.main,
                p.frontness,
                dt,
                &preset.color,
            )
            .rgb;
            let noise = self.noise.get(&cfg.id).unwrap_or(&self.orb_noise);
            let input = ShapeInput {
                center: p.screen,
                radius: r * cfg.size * p.perspective,
                time,
                amplitude: eased,
                seed: cfg.seed,
                spin: 0.0,
                params: &cfg.shape,
                noise,
            };
            satellite_ring(&input, &mut self.state.registers_mut(cfg.id).shape, dt, &mut self.ring);
            let mut outline = Vec::new();
            self.smooth_into(preset.spline.satellite_tension, &mut outline);
            satellites.push(SatelliteFrame { placement: p, outline, color });
        }
        satellites.sort_by(|a, b| a.placement.depth.total_cmp(&b.placement.depth));

        let input = LayerInput {
            center,
            radius: r,
            time,
            dt,
            amplitude: self.amplitude,
            envelopes: env,
            orb,
            body_id: preset.body.id,
            body: &body,
            body_color,
            glow: glow.as_deref().zip(glow_color),
            satellites: &satellites,
            light: self.light,
            detail: self.state.detail.frame(),
            toggles: preset.layers,
        };
        let mut out: Vec<Layer> = Vec::new();
        layers::assemble(&input, &mut out);

        trace!(frame = timing.frame, dt, layers = out.len(), main = env.main, "frame composed");

        FrameOutput {
            timing,
            viewport,
            envelopes: env,
            background: layers::background(self.dark_mode),
            layers: out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{BackendError, LayerKind};

    const FRAME: f64 = 1.0 / 60.0;

    fn running(preset: Preset) -> Composer {
        let mut c = Composer::new(preset, Viewport::new(400.0, 400.0)).expect("valid preset");
        c.set_running(true, 0.0);
        c
    }

    struct Recorder(Vec<usize>);

    impl DrawBackend for Recorder {
        fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError> {
            self.0.push(frame.layers.len());
            Ok(())
        }
    }

    /// Fails every other frame.
    struct Flaky(u32);

    impl DrawBackend for Flaky {
        fn draw(&mut self, _: &FrameOutput) -> Result<(), BackendError> {
            self.0 += 1;
            if self.0 % 2 == 1 { Err(BackendError::SurfaceLost) } else { Ok(()) }
        }
    }

    #[test]
    fn stopped_ticks_touch_nothing() {
        let mut c = running(Preset::siri());
        c.set_amplitude(0.7);
        for i in 1..=30 {
            c.tick(i as f64 * FRAME);
        }
        c.set_running(false, 0.5);
        let before = c.state().clone();
        c.set_amplitude(1.0);
        assert!(c.tick(0.6).is_none());
        assert!(c.tick_dt(0.016).is_none());
        assert_eq!(c.render(0.7, &mut Recorder(Vec::new())), FrameStatus::Stopped);
        assert_eq!(c.state(), &before);
    }

    #[test]
    fn resuming_does_not_see_the_pause() {
        let mut c = running(Preset::siri());
        for i in 1..=10 {
            c.tick(i as f64 * FRAME);
        }
        c.set_running(false, 10.0 * FRAME);
        c.set_running(true, 100.0);
        let t = c.state().clock.time();
        let frame = c.tick(100.0 + FRAME).expect("running");
        assert!(frame.timing.time - t < 0.05, "{}", frame.timing.time - t);
    }

    #[test]
    fn mixed_entry_points_do_not_jump() {
        let mut c = running(Preset::siri());
        for i in 1..=20 {
            c.tick(i as f64 * FRAME);
        }
        let before = c.tick_dt(FRAME as f32).expect("frame");
        let after = c.tick(50.0).expect("frame");
        assert!(after.timing.elapsed - before.timing.elapsed <= f64::from(before.timing.dt) + 1e-9);
        let next = c.tick(50.0 + FRAME).expect("frame");
        assert!(next.timing.dt < 0.02, "dt={}", next.timing.dt);
    }

    #[test]
    fn running_advances_the_clock() {
        let mut c = running(Preset::siri());
        let a = c.tick(FRAME).expect("frame");
        let b = c.tick(2.0 * FRAME).expect("frame");
        assert_eq!(b.timing.frame, a.timing.frame + 1);
        assert!(b.timing.time > a.timing.time);
        assert!(c.state().blob_count() >= 1 + Preset::siri().satellites.len());
    }

    #[test]
    fn outlines_are_deterministic() {
        let mut a = running(Preset::cloud());
        let mut b = running(Preset::cloud());
        for i in 1..=90 {
            let amp = if i % 20 < 10 { 0.8 } else { 0.1 };
            a.set_amplitude(amp);
            b.set_amplitude(amp);
            let fa = a.tick_dt(FRAME as f32).expect("frame");
            let fb = b.tick_dt(FRAME as f32).expect("frame");
            assert_eq!(fa, fb, "frame {i}");
        }
    }

    #[test]
    fn body_and_satellites_stay_closed_and_inside() {
        let mut c = running(Preset::siri());
        c.set_amplitude(1.0);
        let mut last = None;
        for _ in 0..240 {
            last = c.tick_dt(FRAME as f32);
        }
        let frame = last.expect("frame");
        let center = frame.viewport.center();
        let limit = 0.22 * 400.0 * 2.2;
        let mut sats = 0;
        for layer in &frame.layers {
            let pts = layer.outline.points();
            if matches!(layer.kind, LayerKind::Body | LayerKind::Satellite(_)) {
                assert!(pts.len() > 3);
                assert!(pts.first() == pts.last(), "{:?} not closed", layer.kind);
                assert!(pts.iter().all(|p| (*p - center).length() < limit));
            }
            if matches!(layer.kind, LayerKind::Satellite(_)) {
                sats += 1;
            }
        }
        assert!(sats <= 4);
        assert_eq!(frame.layers[0].kind, LayerKind::Bloom);
    }

    #[test]
    fn dropped_frames_do_not_stop_the_loop() {
        let mut c = running(Preset::siri());
        let mut backend = Flaky(0);
        let statuses: Vec<_> = (1..=4).map(|i| c.render(i as f64 * FRAME, &mut backend)).collect();
        assert_eq!(statuses, [FrameStatus::Dropped, FrameStatus::Drawn, FrameStatus::Dropped, FrameStatus::Drawn]);
        assert_eq!(c.state().clock.frame(), 4);
    }

    #[test]
    fn degenerate_inputs_are_absorbed() {
        let mut c = running(Preset::siri());
        c.set_viewport(Viewport::new(0.0, 0.0));
        c.set_amplitude(f32::NAN);
        let frame = c.tick_dt(f32::INFINITY).expect("frame");
        assert!(frame.timing.dt.is_finite());
        assert_eq!(frame.envelopes.main, 0.0);
        assert!(frame.layers.iter().all(|l| l.opacity.is_finite()));
        for l in &frame.layers {
            assert!(l.outline.points().iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn percent_presets_normalize_at_the_boundary() {
        let mut preset = Preset::siri();
        preset.amplitude_scale = crate::envelope::AmplitudeScale::Percent;
        let mut c = running(preset);
        c.set_amplitude(50.0);
        assert_eq!(c.amplitude(), 0.5);
        c.set_amplitude(250.0);
        assert_eq!(c.amplitude(), 1.0);
        c.set_amplitude_unit(0.25);
        assert_eq!(c.amplitude(), 0.25);
    }

    #[test]
    fn dark_mode_picks_the_background() {
        let mut c = running(Preset::siri());
        let dark = c.tick_dt(0.016).expect("frame").background;
        c.set_dark_mode(false);
        let light = c.tick_dt(0.016).expect("frame").background;
        assert_ne!(dark, light);
    }

    #[test]
    fn invalid_presets_fail_construction() {
        let mut p = Preset::siri();
        p.palette.clear();
        assert!(matches!(Composer::new(p, Viewport::new(10.0, 10.0)), Err(PresetError::EmptyPalette)));
    }
}
