//! Master clock and the single smoothed frame delta.
//!
//! Every frame computes one raw delta (wall-clock difference, clamped), folds it
//! into an EMA and advances elapsed time by the result. Every stage of that frame
//! reads the same [`FrameTiming`].
//!
//! Elapsed time is accumulated in `f64`. Animation stages read it wrapped into
//! `[0, TIME_WRAP)` as `f32`, which keeps sub-millisecond resolution however long
//! the orb has been running.

use orbweave_core::math::{clamp, sanitize};
use orbweave_core::slew::Ema;
use serde::{Deserialize, Serialize};

/// Largest raw delta accepted after a stall, seconds.
pub const MAX_FRAME_DT: f32 = 0.1;

/// EMA weight of each new raw delta.
pub const DT_SMOOTHING: f32 = 0.3;

/// Delta the EMA starts from (60 Hz).
pub const NOMINAL_DT: f32 = 1.0 / 60.0;

/// Period of the animation time handed to the stages, seconds.
pub const TIME_WRAP: f64 = 3600.0;

/// Shared timing of one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameTiming {
    /// Smoothed delta every smoother uses this frame.
    pub dt: f32,
    /// Animation time: `elapsed` wrapped into `[0, TIME_WRAP)`.
    pub time: f32,
    /// Elapsed running time, seconds.
    pub elapsed: f64,
    /// Frames composed so far, this one included.
    pub frame: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockTuning {
    pub max_dt: f32,
    pub dt_smoothing: f32,
}

impl Default for ClockTuning {
    fn default() -> Self {
        Self { max_dt: MAX_FRAME_DT, dt_smoothing: DT_SMOOTHING }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameClock {
    tuning: ClockTuning,
    last: Option<f64>,
    dt: Ema,
    elapsed: f64,
    frame: u64,
}

impl FrameClock {
    pub fn new(tuning: ClockTuning) -> Self {
        let alpha = clamp(sanitize(tuning.dt_smoothing, DT_SMOOTHING), 0.0, 1.0);
        Self { tuning, last: None, dt: Ema::seeded(alpha, NOMINAL_DT), elapsed: 0.0, frame: 0 }
    }

    /// Forget the previous timestamp so the next frame does not see the pause as a delta.
    pub fn restart(&mut self, now: f64) {
        self.last = Some(sanitize(now, 0.0));
    }

    /// Drop the stored timestamp. The next [`raw_delta`](Self::raw_delta) reports 0.
    ///
    /// Used when a frame was advanced by an externally measured delta, so a later
    /// timestamped frame does not measure from a stale stamp.
    pub fn forget_timestamp(&mut self) {
        self.last = None;
    }

    /// Raw delta since the previous call, clamped to `[0, max_dt]`.
    ///
    /// The first call after construction reports 0.
    pub fn raw_delta(&mut self, now: f64) -> f32 {
        let now = sanitize(now, 0.0);
        let raw = match self.last {
            Some(last) => (now - last) as f32,
            None => 0.0,
        };
        self.last = Some(now);
        self.clamp_raw(raw)
    }

    fn clamp_raw(&self, raw: f32) -> f32 {
        clamp(sanitize(raw, 0.0), 0.0, self.tuning.max_dt)
    }

    /// Fold `raw_dt` into the EMA and advance the clock by the smoothed delta.
    pub fn advance(&mut self, raw_dt: f32) -> FrameTiming {
        let raw = self.clamp_raw(raw_dt);
        self.elapsed += f64::from(self.dt.process(raw));
        self.frame += 1;
        self.timing()
    }

    /// Timing of the most recent frame.
    pub fn timing(&self) -> FrameTiming {
        FrameTiming {
            dt: self.dt.value().unwrap_or(NOMINAL_DT),
            time: self.time(),
            elapsed: self.elapsed,
            frame: self.frame,
        }
    }

    /// Animation time, wrapped.
    #[inline] pub fn time(&self) -> f32 { self.elapsed.rem_euclid(TIME_WRAP) as f32 }
    #[inline] pub fn elapsed(&self) -> f64 { self.elapsed }
    #[inline] pub fn frame(&self) -> u64 { self.frame }
}
