//! Orbweave CLI: drive the orb engine headlessly with a synthetic amplitude signal.

mod signal;
mod sinks;
mod svg;

use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use orbweave_engine::{AmplitudeScale, Composer, DrawBackend, FrameStatus, Preset, Viewport};
use tracing::info;
use tracing_subscriber::EnvFilter;

use signal::Signal;
use sinks::{JsonLines, Meter};
use svg::SvgSnapshot;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
enum Format {
    #[default]
    Summary,
    Json,
    Svg,
}

#[derive(Debug, Default)]
struct Args {
    preset: Option<String>,
    frames: Option<u64>,
    fps: Option<f64>,
    size: Option<(f32, f32)>,
    signal: Option<Signal>,
    percent: bool,
    light: bool,
    format: Format,
    out: Option<String>,
    dump_preset: bool,
}

fn parse_size(s: &str) -> Option<(f32, f32)> {
    let (w, h) = s.split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Args {
    let mut a = Args::default();
    for s in args {
        if s == "--percent"     { a.percent = true;     continue; }
        if s == "--light"       { a.light = true;       continue; }
        if s == "--dump-preset" { a.dump_preset = true; continue; }
        if let Some(rest) = s.strip_prefix("--preset=") { a.preset = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--frames=") { a.frames = rest.parse().ok();       continue; }
        if let Some(rest) = s.strip_prefix("--fps=")    { a.fps    = rest.parse().ok();       continue; }
        if let Some(rest) = s.strip_prefix("--size=")   { a.size   = parse_size(rest);        continue; }
        if let Some(rest) = s.strip_prefix("--out=")    { a.out    = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--signal=") {
            match rest.parse() {
                Ok(sig) => a.signal = Some(sig),
                Err(e) => eprintln!("[warn] {e}"),
            }
            continue;
        }
        if let Some(rest) = s.strip_prefix("--format=") {
            match rest {
                "summary" => a.format = Format::Summary,
                "json" => a.format = Format::Json,
                "svg" => a.format = Format::Svg,
                other => eprintln!("[warn] unknown format: {other}"),
            }
            continue;
        }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

/// A built-in name, or a path to a TOML preset.
fn load_preset(name_or_path: Option<&str>) -> Result<Preset, Box<dyn Error>> {
    let target = name_or_path.unwrap_or("siri");
    let path = Path::new(target);
    if path.extension().is_some_and(|e| e == "toml") || path.is_file() {
        let text = fs::read_to_string(path)?;
        return Ok(Preset::from_toml_str(&text)?);
    }
    Ok(Preset::named(target)?)
}

fn open_out(path: Option<&str>) -> Result<Box<dyn Write>, Box<dyn Error>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(fs::File::create(p)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Run `frames` ticks at `fps`, feeding `signal`, into `backend`. Returns the dropped-frame count.
fn drive<B: DrawBackend>(composer: &mut Composer, frames: u64, fps: f64, signal: Signal, scale: f32, backend: &mut B) -> u64 {
    composer.set_running(true, 0.0);
    let mut dropped = 0;
    for i in 1..=frames {
        let now = i as f64 / fps;
        composer.set_amplitude(signal.at(now as f32) * scale);
        if composer.render(now, backend) == FrameStatus::Dropped {
            dropped += 1;
        }
    }
    composer.set_running(false, frames as f64 / fps);
    dropped
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1));
    let mut preset = load_preset(args.preset.as_deref())?;
    if args.percent {
        preset.amplitude_scale = AmplitudeScale::Percent;
    }

    if args.dump_preset {
        let mut out = open_out(args.out.as_deref())?;
        out.write_all(preset.to_toml_string()?.as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    let (w, h) = args.size.unwrap_or((390.0, 390.0));
    let fps = args.fps.filter(|f| *f > 0.0 && f.is_finite()).unwrap_or(60.0);
    let frames = args.frames.unwrap_or((fps * 5.0) as u64);
    let signal = args.signal.unwrap_or(Signal::Pulse);
    let scale = preset.amplitude_scale.full_scale();

    info!(preset = %preset.name, frames, fps, width = w, height = h, ?signal, "orbweave-cli");

    let mut composer = Composer::new(preset, Viewport::new(w, h))?;
    composer.set_dark_mode(!args.light);

    match args.format {
        Format::Summary => {
            let mut meter = Meter::new(fps.round() as u64);
            meter.dropped = drive(&mut composer, frames, fps, signal, scale, &mut meter);
            info!(frames = meter.frames, dropped = meter.dropped, "done");
        }
        Format::Json => {
            let mut sink = JsonLines::new(open_out(args.out.as_deref())?);
            let dropped = drive(&mut composer, frames, fps, signal, scale, &mut sink);
            sink.into_inner().flush()?;
            info!(frames, dropped, "done");
        }
        Format::Svg => {
            let mut snap = SvgSnapshot::default();
            let dropped = drive(&mut composer, frames, fps, signal, scale, &mut snap);
            let doc = snap.last().ok_or("no frame was drawn")?;
            let mut out = open_out(args.out.as_deref())?;
            out.write_all(doc.as_bytes())?;
            out.flush()?;
            info!(frames, dropped, "done");
        }
    }
    Ok(())
}
