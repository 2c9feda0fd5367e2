//! SVG snapshot of a frame: paths, gradients and blend modes.
//!
//! Sweep gradients have no SVG equivalent; they are approximated with a linear
//! gradient along the start angle.

use std::fmt::Write as _;

use orbweave_engine::orbweave_core::color::Rgba;
use orbweave_engine::orbweave_core::glam::Vec2;
use orbweave_engine::{BackendError, BlendMode, DrawBackend, Fill, FrameOutput, GradientStop, Layer, Outline};

fn color(c: Rgba) -> String {
    let [r, g, b] = c.to_rgb8();
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn blend(mode: BlendMode) -> &'static str {
    match mode {
        BlendMode::Normal => "normal",
        BlendMode::Screen => "screen",
        BlendMode::Multiply => "multiply",
        BlendMode::Plus => "plus-lighter",
    }
}

fn path_data(points: &[Vec2]) -> String {
    let mut d = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        let _ = write!(d, "{}{:.2},{:.2} ", if i == 0 { 'M' } else { 'L' }, p.x, p.y);
    }
    d.push('Z');
    d
}

fn stops(out: &mut String, stops: &[GradientStop]) {
    for s in stops {
        let _ = write!(
            out,
            r#"<stop offset="{:.3}" stop-color="{}" stop-opacity="{:.3}"/>"#,
            s.offset,
            color(s.color),
            s.color.a
        );
    }
}

/// Gradient definition for `fill` (if any) and the paint reference to use.
fn paint(defs: &mut String, id: usize, fill: &Fill) -> String {
    match fill {
        Fill::Solid { color: c } => color(*c),
        Fill::Radial { center, radius, stops: s } => {
            let _ = write!(
                defs,
                r#"<radialGradient id="g{id}" gradientUnits="userSpaceOnUse" cx="{:.2}" cy="{:.2}" r="{:.2}">"#,
                center.x, center.y, radius
            );
            stops(defs, s);
            defs.push_str("</radialGradient>");
            format!("url(#g{id})")
        }
        Fill::Sweep { center, start_angle, stops: s } => {
            let (sin, cos) = start_angle.sin_cos();
            let _ = write!(
                defs,
                r#"<linearGradient id="g{id}" gradientUnits="objectBoundingBox" x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" data-cx="{:.1}" data-cy="{:.1}">"#,
                0.5 - 0.5 * cos,
                0.5 - 0.5 * sin,
                0.5 + 0.5 * cos,
                0.5 + 0.5 * sin,
                center.x,
                center.y
            );
            stops(defs, s);
            defs.push_str("</linearGradient>");
            format!("url(#g{id})")
        }
    }
}

fn element(body: &mut String, layer: &Layer, paint: &str) {
    let paint_attrs = match layer.stroke {
        Some(w) => format!(r#"fill="none" stroke="{paint}" stroke-width="{w:.2}""#),
        None => format!(r#"fill="{paint}""#),
    };
    let style = format!(r#"opacity="{:.3}" style="mix-blend-mode:{}""#, layer.opacity, blend(layer.blend));
    let _ = match &layer.outline {
        Outline::Path { points } => writeln!(body, r#"<path d="{}" {paint_attrs} {style}/>"#, path_data(points)),
        Outline::Circle { center, radius } => writeln!(
            body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" {paint_attrs} {style}/>"#,
            center.x, center.y, radius
        ),
    };
}

/// Render `frame` as a standalone SVG document.
pub fn render(frame: &FrameOutput) -> String {
    let (w, h) = (frame.viewport.width, frame.viewport.height);
    let mut defs = String::new();
    let mut body = String::new();
    for (i, layer) in frame.layers.iter().enumerate() {
        let p = paint(&mut defs, i, &layer.fill);
        element(&mut body, layer, &p);
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n\
         <defs>{defs}</defs>\n\
         <rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n\
         <g style=\"isolation:isolate\">\n{body}</g>\n</svg>\n",
        color(frame.background)
    )
}

/// Keeps the most recent frame's document.
#[derive(Debug, Default)]
pub struct SvgSnapshot {
    last: Option<String>,
}

impl SvgSnapshot {
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl DrawBackend for SvgSnapshot {
    fn draw(&mut self, frame: &FrameOutput) -> Result<(), BackendError> {
        if frame.layers.is_empty() {
            return Err(BackendError::Rejected("empty frame".into()));
        }
        self.last = Some(render(frame));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbweave_engine::{Composer, Preset, Viewport};

    #[test]
    fn snapshot_contains_every_layer() {
        let mut c = Composer::new(Preset::siri(), Viewport::new(320.0, 240.0)).expect("preset");
        c.set_running(true, 0.0);
        c.set_amplitude(0.8);
        let mut svg = SvgSnapshot::default();
        let mut layers = 0;
        for _ in 0..20 {
            let frame = c.tick_dt(1.0 / 60.0).expect("frame");
            layers = frame.layers.len();
            svg.draw(&frame).expect("draw");
        }
        let doc = svg.last().expect("document");
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains(r#"viewBox="0 0 320 240""#));
        let shapes = doc.matches("<path").count() + doc.matches("<circle").count();
        assert_eq!(shapes, layers);
        assert!(doc.contains("mix-blend-mode:screen"));
        assert!(doc.contains("stroke-width"));
    }

    #[test]
    fn colors_are_hex() {
        assert_eq!(color(Rgba::hex(0x0B_10_20)), "#0b1020");
        assert_eq!(path_data(&[Vec2::ZERO, Vec2::ONE]), "M0.00,0.00 L1.00,1.00 Z");
    }
}
