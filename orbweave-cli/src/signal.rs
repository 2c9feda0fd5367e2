//! Synthetic amplitude sources standing in for a microphone.

use std::f32::consts::TAU;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Signal {
    Silent,
    /// 0 for the first second, then 1.
    Step,
    /// Short bursts, like syllables.
    Pulse,
    Sine,
    Const(f32),
}

impl Signal {
    /// Amplitude in `[0, 1]` at `t` seconds.
    pub fn at(self, t: f32) -> f32 {
        let v = match self {
            Self::Silent => 0.0,
            Self::Step => if t < 1.0 { 0.0 } else { 1.0 },
            Self::Pulse => {
                let phase = (t * 2.5).fract();
                let word = (t * 0.4).fract() < 0.7;
                if word && phase < 0.45 { 0.35 + 0.6 * (phase / 0.45 * std::f32::consts::PI).sin() } else { 0.04 }
            }
            Self::Sine => 0.5 + 0.5 * (t * TAU * 0.35).sin(),
            Self::Const(v) => v,
        };
        v.clamp(0.0, 1.0)
    }
}

impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "step" => Ok(Self::Step),
            "pulse" => Ok(Self::Pulse),
            "sine" => Ok(Self::Sine),
            other => match other.strip_prefix("const:") {
                Some(v) => v.parse().map(Self::Const).map_err(|e| format!("bad constant `{v}`: {e}")),
                None => Err(format!("unknown signal `{s}` (silent|step|pulse|sine|const:V)")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_form() {
        assert_eq!("silent".parse::<Signal>(), Ok(Signal::Silent));
        assert_eq!("STEP".parse::<Signal>(), Ok(Signal::Step));
        assert_eq!("const:0.25".parse::<Signal>(), Ok(Signal::Const(0.25)));
        assert!("const:x".parse::<Signal>().is_err());
        assert!("loud".parse::<Signal>().is_err());
    }

    #[test]
    fn stays_in_unit_range() {
        for s in [Signal::Silent, Signal::Step, Signal::Pulse, Signal::Sine, Signal::Const(7.0)] {
            for i in 0..600 {
                let v = s.at(i as f32 / 60.0);
                assert!((0.0..=1.0).contains(&v), "{s:?} {v}");
            }
        }
        assert_eq!(Signal::Step.at(0.5), 0.0);
        assert_eq!(Signal::Step.at(1.5), 1.0);
    }
}
