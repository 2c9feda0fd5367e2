//! Amplitude ingestion and the named loudness envelopes.
//!
//! The external amplitude is normalized to `[0, 1]` once at the boundary
//! ([`normalize_amplitude`]); each [`EnvelopeKind`] then follows it through its own
//! asymmetric slew. Envelopes are resolved through an enum-indexed table, never by name.

use core::ops::Index;

use orbweave_core::math::{clamp01, sanitize};
use orbweave_core::slew::SlewLimiter;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// Body size, glow, color loudness.
    Main,
    /// Specular hotspot.
    Specular,
    /// Sparkles along the lit arc.
    Sparkle,
    /// Cool/warm core crossfade.
    Core,
}

impl EnvelopeKind {
    pub const COUNT: usize = 4;

    /// Update order. `Main` comes first so envelopes sourced from it see this frame's value.
    pub const ALL: [Self; Self::COUNT] = [Self::Main, Self::Specular, Self::Sparkle, Self::Core];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Range convention of the raw amplitude a host hands in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeScale {
    /// Already `[0, 1]` (canonical).
    #[default]
    Unit,
    /// `[0, 100]`, divided by 100 on ingestion.
    Percent,
}

impl AmplitudeScale {
    #[inline]
    pub fn full_scale(self) -> f32 {
        match self {
            Self::Unit => 1.0,
            Self::Percent => 100.0,
        }
    }
}

/// Map a raw amplitude onto `[0, 1]`. NaN and infinities become 0.
#[inline]
pub fn normalize_amplitude(raw: f32, scale: AmplitudeScale) -> f32 {
    clamp01(sanitize(raw, 0.0) / scale.full_scale())
}

/// What an envelope chases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeSource {
    /// The normalized input amplitude.
    Input,
    /// The main envelope after this frame's update.
    Main,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeTuning {
    pub attack_tau: f32,
    pub release_tau: f32,
    /// Target multiplier before clamping to 1.
    pub drive: f32,
    pub source: EnvelopeSource,
}

impl EnvelopeTuning {
    /// From rates in 1/s, the way the motion is usually described ("attack 6.6/s").
    pub fn from_rates(attack_rate: f32, release_rate: f32, drive: f32, source: EnvelopeSource) -> Self {
        Self { attack_tau: 1.0 / attack_rate, release_tau: 1.0 / release_rate, drive, source }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeSet {
    pub main: EnvelopeTuning,
    pub specular: EnvelopeTuning,
    pub sparkle: EnvelopeTuning,
    pub core: EnvelopeTuning,
}

impl Default for EnvelopeSet {
    fn default() -> Self {
        use EnvelopeSource::{Input, Main};
        Self {
            main: EnvelopeTuning::from_rates(6.6, 4.6, 1.0, Input),
            specular: EnvelopeTuning::from_rates(14.0, 7.0, 1.15, Input),
            sparkle: EnvelopeTuning::from_rates(18.0, 8.0, 1.0, Input),
            core: EnvelopeTuning::from_rates(3.5, 3.5, 1.0, Main),
        }
    }
}

impl EnvelopeSet {
    pub fn get(&self, kind: EnvelopeKind) -> &EnvelopeTuning {
        match kind {
            EnvelopeKind::Main => &self.main,
            EnvelopeKind::Specular => &self.specular,
            EnvelopeKind::Sparkle => &self.sparkle,
            EnvelopeKind::Core => &self.core,
        }
    }
}

/// One frame's envelope values, each in `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Envelopes {
    pub main: f32,
    pub specular: f32,
    pub sparkle: f32,
    pub core: f32,
}

impl Envelopes {
    fn slot_mut(&mut self, kind: EnvelopeKind) -> &mut f32 {
        match kind {
            EnvelopeKind::Main => &mut self.main,
            EnvelopeKind::Specular => &mut self.specular,
            EnvelopeKind::Sparkle => &mut self.sparkle,
            EnvelopeKind::Core => &mut self.core,
        }
    }
}

impl Index<EnvelopeKind> for Envelopes {
    type Output = f32;

    fn index(&self, kind: EnvelopeKind) -> &f32 {
        match kind {
            EnvelopeKind::Main => &self.main,
            EnvelopeKind::Specular => &self.specular,
            EnvelopeKind::Sparkle => &self.sparkle,
            EnvelopeKind::Core => &self.core,
        }
    }
}

/// Persistent slews for every [`EnvelopeKind`].
#[derive(Clone, Debug, PartialEq)]
pub struct AmplitudeTracker {
    table: [(EnvelopeTuning, SlewLimiter); EnvelopeKind::COUNT],
    last: Envelopes,
}

impl AmplitudeTracker {
    pub fn new(set: &EnvelopeSet) -> Self {
        let table = EnvelopeKind::ALL.map(|kind| {
            let t = *set.get(kind);
            (t, SlewLimiter::new(t.attack_tau, t.release_tau))
        });
        Self { table, last: Envelopes::default() }
    }

    /// Advance every envelope by `dt` toward a `[0, 1]` amplitude (re-clamped, NaN is 0).
    pub fn update(&mut self, amplitude: f32, dt: f32) -> Envelopes {
        let input = normalize_amplitude(amplitude, AmplitudeScale::Unit);
        let mut out = Envelopes::default();
        for kind in EnvelopeKind::ALL {
            let (tuning, slew) = &mut self.table[kind.index()];
            let source = match tuning.source {
                EnvelopeSource::Input => input,
                EnvelopeSource::Main => out.main,
            };
            let target = clamp01(source * tuning.drive);
            *out.slot_mut(kind) = clamp01(slew.next(target, dt));
        }
        self.last = out;
        out
    }

    /// [`update`](Self::update) for a raw value in the given scale.
    pub fn update_scaled(&mut self, raw: f32, scale: AmplitudeScale, dt: f32) -> Envelopes {
        self.update(normalize_amplitude(raw, scale), dt)
    }

    /// Values after the most recent update.
    #[inline]
    pub fn envelopes(&self) -> Envelopes {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn normalization_clamps_garbage() {
        for raw in [-5.0, 0.0, 0.5, 1.0, 250.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let v = normalize_amplitude(raw, AmplitudeScale::Unit);
            assert!((0.0..=1.0).contains(&v), "raw={raw} v={v}");
        }
        assert_eq!(normalize_amplitude(f32::NAN, AmplitudeScale::Percent), 0.0);
        assert!((normalize_amplitude(42.0, AmplitudeScale::Percent) - 0.42).abs() < 1e-6);
        assert_eq!(normalize_amplitude(130.0, AmplitudeScale::Percent), 1.0);
    }

    #[test]
    fn every_envelope_stays_bounded() {
        let mut tr = AmplitudeTracker::new(&EnvelopeSet::default());
        for raw in [-3.0, 170.0, f32::NAN, 0.3, 1e9, -1e9] {
            let e = tr.update_scaled(raw, AmplitudeScale::Percent, DT);
            for kind in EnvelopeKind::ALL {
                assert!((0.0..=1.0).contains(&e[kind]), "{kind:?}={}", e[kind]);
            }
        }
    }

    #[test]
    fn silence_settles_main_to_zero_within_five_seconds() {
        let mut tr = AmplitudeTracker::new(&EnvelopeSet::default());
        for _ in 0..120 {
            tr.update(1.0, DT);
        }
        assert!(tr.envelopes().main > 0.99);
        let mut e = tr.envelopes();
        for _ in 0..300 {
            e = tr.update(0.0, DT);
        }
        assert!(e.main.abs() < 1e-3, "main={}", e.main);
    }

    #[test]
    fn step_response_matches_taus() {
        let set = EnvelopeSet::default();
        let mut tr = AmplitudeTracker::new(&set);

        let dt = set.main.attack_tau / 1000.0;
        for _ in 0..1000 {
            tr.update(1.0, dt);
        }
        assert!((tr.envelopes().main - 0.632).abs() < 2e-3, "attack {}", tr.envelopes().main);

        for _ in 0..600 {
            tr.update(1.0, DT);
        }
        let dt = set.main.release_tau / 1000.0;
        for _ in 0..1000 {
            tr.update(0.0, dt);
        }
        assert!((tr.envelopes().main - 0.368).abs() < 2e-3, "release {}", tr.envelopes().main);
    }

    #[test]
    fn attack_is_faster_than_release() {
        let set = EnvelopeSet::default();
        assert!(set.main.attack_tau < set.main.release_tau);
        assert!(set.sparkle.attack_tau < set.main.attack_tau);
    }

    #[test]
    fn core_follows_main_not_input() {
        let mut tr = AmplitudeTracker::new(&EnvelopeSet::default());
        let e = tr.update(1.0, DT);
        assert!(e.core < e.main);
        assert!(e.specular > e.main);
    }
}
