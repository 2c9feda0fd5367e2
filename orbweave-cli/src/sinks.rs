//! Frame sinks: a console meter and a JSON-lines writer.

use std::io::Write;

use orbweave_engine::{BackendError, DrawBackend, FrameOutput};

/// Once-per-interval meter on stderr: peak main envelope and layer count.
#[derive(Debug)]
pub struct Meter {
    interval: u64,
    count: u64,
    peak: f32,
    layers: usize,
    pub dropped: u64,
    pub frames: u64,
}

impl Meter {
    pub fn new(interval: u64) -> Self {
        Self { interval: interval.max(1), count: 0, peak: 0.0, layers: 0, dropped: 0, frames: 0 }
    }

    /// Feed one frame; returns the meter line when an interval completes.
    pub fn observe(&mut self, frame: &FrameOutput) -> Option<String> {
        self.frames += 1;
        self.peak = self.peak.max(frame.envelopes.main);
        self.layers = self.layers.max(frame.layers.len());
        self.count += 1;
        if self.count < self.interval {
            return None;
        }
        let line = format!(
            "[meter] t={:6.2}s  main peak ~ {:.3}  layers {:2}  dropped {}",
            frame.timing.elapsed, self.peak, self.layers, self.dropped
        );
        self.count = 0;
        self.peak = 0.0;
        self.layers = 0;
        Some(line)
    }
}

impl DrawBackend for Meter {
    fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError> {
        if let Some(line) = self.observe(frame) {
            eprintln!("{line}");
        }
        Ok(())
    }
}

/// One serialized frame per line.
pub struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DrawBackend for JsonLines<W> {
    fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError> {
        serde_json::to_writer(&mut self.out, frame).map_err(|e| BackendError::Rejected(e.to_string()))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}
