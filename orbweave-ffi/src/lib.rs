//! C ABI wrapper for the Orbweave engine.
//!
//! The host owns the display-refresh callback and the drawing surface. Each
//! refresh it calls `orbweave_tick(engine, now)` and then walks the layers of the
//! returned frame with the accessor functions, back to front.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `OrbweaveEngine` (heap-allocated; you own/delete it).
//! - Null handles and out-of-range indices are ignored, never dereferenced.
//! - Points are interleaved `x, y` pairs; gradient stops are `offset, r, g, b, a` quintuples.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from the UI/render thread.

use std::ffi::{c_char, CStr};

use orbweave_engine::{BlendMode, Composer, Fill, FrameOutput, Layer, Outline, Preset, PresetError, Viewport};
use tracing::warn;

/// Floats per gradient stop in `orbweave_layer_stops`.
pub const ORBWEAVE_STOP_STRIDE: u32 = 5;

/// Opaque engine wrapper we hand to C.
pub struct OrbweaveEngine {
    composer: Composer,
    frame: Option<FrameOutput>,
}

impl OrbweaveEngine {
    fn new(preset: Preset, width: f32, height: f32) -> Result<Self, PresetError> {
        Ok(Self { composer: Composer::new(preset, Viewport::new(width, height))?, frame: None })
    }

    fn layer(&self, index: u32) -> Option<&Layer> {
        self.frame.as_ref()?.layers.get(index as usize)
    }
}

/// Flat description of one layer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OrbweaveLayerInfo {
    /// 0 halo, 1 glow, 2 satellite, 3 body, 4 inner shadow, 5/6 core cool/warm,
    /// 7/8 rim cool/warm, 9 specular, 10 sparkle, 11 bloom, 12 vignette,
    /// 13 edge whisper, 14 ripple, 15/16/17 caustic cool/warm/bloom, 18 speck.
    pub kind: u32,
    /// Blob id of satellite and edge-whisper layers, 0 otherwise.
    pub blob_id: u32,
    /// 0 normal, 1 screen, 2 multiply, 3 plus.
    pub blend: u32,
    pub opacity: f32,
    /// Stroke width, 0 when the outline is filled.
    pub stroke_width: f32,
    /// 0 path, 1 circle.
    pub outline_type: u32,
    pub point_count: u32,
    pub circle_x: f32,
    pub circle_y: f32,
    pub circle_radius: f32,
    /// 0 solid, 1 radial, 2 sweep.
    pub fill_type: u32,
    pub stop_count: u32,
    /// Gradient center (radial and sweep).
    pub fill_x: f32,
    pub fill_y: f32,
    /// Radial radius, or sweep start angle in radians.
    pub fill_extent: f32,
    /// Solid color, straight alpha.
    pub solid_rgba: [f32; 4],
}

fn blend_code(b: BlendMode) -> u32 {
    match b {
        BlendMode::Normal => 0,
        BlendMode::Screen => 1,
        BlendMode::Multiply => 2,
        BlendMode::Plus => 3,
    }
}

impl From<&Layer> for OrbweaveLayerInfo {
    fn from(l: &Layer) -> Self {
        let mut info = Self {
            kind: l.kind.code(),
            blob_id: l.kind.blob().map_or(0, |id| u32::from(id.0)),
            blend: blend_code(l.blend),
            opacity: l.opacity,
            stroke_width: l.stroke.unwrap_or(0.0),
            stop_count: l.fill.stops().len() as u32,
            ..Self::default()
        };
        match &l.outline {
            Outline::Path { points } => info.point_count = points.len() as u32,
            Outline::Circle { center, radius } => {
                info.outline_type = 1;
                (info.circle_x, info.circle_y, info.circle_radius) = (center.x, center.y, *radius);
            }
        }
        match &l.fill {
            Fill::Solid { color } => info.solid_rgba = [color.r, color.g, color.b, color.a],
            Fill::Radial { center, radius, .. } => {
                info.fill_type = 1;
                (info.fill_x, info.fill_y, info.fill_extent) = (center.x, center.y, *radius);
            }
            Fill::Sweep { center, start_angle, .. } => {
                info.fill_type = 2;
                (info.fill_x, info.fill_y, info.fill_extent) = (center.x, center.y, *start_angle);
            }
        }
        info
    }
}

fn boxed(result: Result<OrbweaveEngine, PresetError>) -> *mut OrbweaveEngine {
    match result {
        Ok(e) => Box::into_raw(Box::new(e)),
        Err(err) => {
            warn!(error = %err, "orbweave_create failed");
            std::ptr::null_mut()
        }
    }
}

/// Borrow a C string; null or invalid UTF-8 gives `None`.
fn c_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

// --- Creation / destruction -------------------------------------------------------

/// Create a stopped engine from a built-in preset (`"siri"`, `"cloud"`; null means `"siri"`).
/// Returns null if the name is unknown.
#[no_mangle]
pub extern "C" fn orbweave_create(width: f32, height: f32, preset_name: *const c_char) -> *mut OrbweaveEngine {
    let preset = match c_str(preset_name) {
        Some(name) => Preset::named(name),
        None => Ok(Preset::siri()),
    };
    boxed(preset.and_then(|p| OrbweaveEngine::new(p, width, height)))
}

/// Create a stopped engine from TOML preset text. Returns null on parse or validation errors.
#[no_mangle]
pub extern "C" fn orbweave_create_from_toml(width: f32, height: f32, toml: *const c_char) -> *mut OrbweaveEngine {
    let Some(text) = c_str(toml) else {
        return std::ptr::null_mut();
    };
    boxed(Preset::from_toml_str(text).and_then(|p| OrbweaveEngine::new(p, width, height)))
}

/// Destroy an engine previously returned by `orbweave_create*`.
#[no_mangle]
pub extern "C" fn orbweave_destroy(engine: *mut OrbweaveEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)); }
    }
}

// --- Inputs ----------------------------------------------------------------------

/// Start or stop the animation. `now` is the host's clock in seconds.
#[no_mangle]
pub extern "C" fn orbweave_set_running(engine: *mut OrbweaveEngine, running: bool, now: f64) {
    if engine.is_null() { return; }
    let e = unsafe { &mut *engine };
    e.composer.set_running(running, now);
}

/// Amplitude in `[0, 1]`. Out-of-range values are clamped, NaN is 0.
#[no_mangle]
pub extern "C" fn orbweave_set_amplitude(engine: *mut OrbweaveEngine, amplitude: f32) {
    if engine.is_null() { return; }
    let e = unsafe { &mut *engine };
    e.composer.set_amplitude_unit(amplitude);
}

/// Amplitude in `[0, 100]`.
#[no_mangle]
pub extern "C" fn orbweave_set_amplitude_percent(engine: *mut OrbweaveEngine, percent: f32) {
    if engine.is_null() { return; }
    let e = unsafe { &mut *engine };
    e.composer.set_amplitude_unit(percent / 100.0);
}

/// Viewport in pixels; sides below 1 become 1.
#[no_mangle]
pub extern "C" fn orbweave_set_viewport(engine: *mut OrbweaveEngine, width: f32, height: f32) {
    if engine.is_null() { return; }
    let e = unsafe { &mut *engine };
    e.composer.set_viewport(Viewport::new(width, height));
}

#[no_mangle]
pub extern "C" fn orbweave_set_dark_mode(engine: *mut OrbweaveEngine, dark: bool) {
    if engine.is_null() { return; }
    let e = unsafe { &mut *engine };
    e.composer.set_dark_mode(dark);
}

// --- Frames ----------------------------------------------------------------------

/// Compose the next frame. Returns its layer count, or 0 while stopped
/// (the previous frame stays readable).
#[no_mangle]
pub extern "C" fn orbweave_tick(engine: *mut OrbweaveEngine, now: f64) -> u32 {
    if engine.is_null() { return 0; }
    let e = unsafe { &mut *engine };
    match e.composer.tick(now) {
        Some(frame) => {
            let n = frame.layers.len() as u32;
            e.frame = Some(frame);
            n
        }
        None => 0,
    }
}

/// Layers in the most recent frame.
#[no_mangle]
pub extern "C" fn orbweave_layer_count(engine: *const OrbweaveEngine) -> u32 {
    if engine.is_null() { return 0; }
    let e = unsafe { &*engine };
    e.frame.as_ref().map_or(0, |f| f.layers.len() as u32)
}

/// Fill `out` with layer `index`. Returns false if there is no such layer.
#[no_mangle]
pub extern "C" fn orbweave_layer_info(engine: *const OrbweaveEngine, index: u32, out: *mut OrbweaveLayerInfo) -> bool {
    if engine.is_null() || out.is_null() { return false; }
    let e = unsafe { &*engine };
    let Some(layer) = e.layer(index) else { return false };
    unsafe { *out = OrbweaveLayerInfo::from(layer); }
    true
}

/// Copy up to `capacity` outline points of layer `index` into `out_xy` (2 floats each).
/// Returns the number of points written.
#[no_mangle]
pub extern "C" fn orbweave_layer_points(engine: *const OrbweaveEngine, index: u32, out_xy: *mut f32, capacity: u32) -> u32 {
    if engine.is_null() || out_xy.is_null() { return 0; }
    let e = unsafe { &*engine };
    let Some(layer) = e.layer(index) else { return 0 };
    let points = layer.outline.points();
    let n = points.len().min(capacity as usize);
    let out = unsafe { std::slice::from_raw_parts_mut(out_xy, n * 2) };
    for (dst, p) in out.chunks_exact_mut(2).zip(points) {
        dst[0] = p.x;
        dst[1] = p.y;
    }
    n as u32
}

/// Copy up to `capacity` gradient stops of layer `index` into `out`
/// (`ORBWEAVE_STOP_STRIDE` floats each). Returns the number of stops written.
#[no_mangle]
pub extern "C" fn orbweave_layer_stops(engine: *const OrbweaveEngine, index: u32, out: *mut f32, capacity: u32) -> u32 {
    if engine.is_null() || out.is_null() { return 0; }
    let e = unsafe { &*engine };
    let Some(layer) = e.layer(index) else { return 0 };
    let stops = layer.fill.stops();
    let n = stops.len().min(capacity as usize);
    let dst = unsafe { std::slice::from_raw_parts_mut(out, n * ORBWEAVE_STOP_STRIDE as usize) };
    for (d, s) in dst.chunks_exact_mut(ORBWEAVE_STOP_STRIDE as usize).zip(stops) {
        d.copy_from_slice(&[s.offset, s.color.r, s.color.g, s.color.b, s.color.a]);
    }
    n as u32
}

/// Background of the most recent frame as straight RGBA. Returns false before the first frame.
#[no_mangle]
pub extern "C" fn orbweave_background(engine: *const OrbweaveEngine, out_rgba: *mut f32) -> bool {
    if engine.is_null() || out_rgba.is_null() { return false; }
    let e = unsafe { &*engine };
    let Some(frame) = &e.frame else { return false };
    let c = frame.background;
    let out = unsafe { std::slice::from_raw_parts_mut(out_rgba, 4) };
    out.copy_from_slice(&[c.r, c.g, c.b, c.a]);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbweave_engine::LayerKind;
    use std::ffi::CString;

    fn create(name: &str) -> *mut OrbweaveEngine {
        let name = CString::new(name).expect("cstring");
        orbweave_create(400.0, 300.0, name.as_ptr())
    }

    #[test]
    fn null_handles_are_ignored() {
        let null = std::ptr::null_mut();
        orbweave_set_running(null, true, 0.0);
        orbweave_set_amplitude(null, 0.5);
        orbweave_destroy(null);
        assert_eq!(orbweave_tick(null, 0.1), 0);
        assert_eq!(orbweave_layer_count(null), 0);
        assert!(!orbweave_background(null, std::ptr::null_mut()));
    }

    #[test]
    fn unknown_presets_return_null() {
        assert!(create("nope").is_null());
        let bad = CString::new("name = [").expect("cstring");
        assert!(orbweave_create_from_toml(10.0, 10.0, bad.as_ptr()).is_null());
        let e = orbweave_create(10.0, 10.0, std::ptr::null());
        assert!(!e.is_null());
        orbweave_destroy(e);
    }

    #[test]
    fn frames_are_readable_layer_by_layer() {
        let e = create("cloud");
        assert!(!e.is_null());
        assert_eq!(orbweave_tick(e, 0.0), 0, "stopped engines compose nothing");

        orbweave_set_running(e, true, 0.0);
        orbweave_set_amplitude_percent(e, 80.0);
        let mut count = 0;
        for i in 1..=30 {
            count = orbweave_tick(e, f64::from(i) / 60.0);
        }
        assert!(count > 0);
        assert_eq!(orbweave_layer_count(e), count);

        let mut saw_body = false;
        for i in 0..count {
            let mut info = OrbweaveLayerInfo::default();
            assert!(orbweave_layer_info(e, i, &mut info));
            assert!(info.opacity > 0.0 && info.opacity <= 1.0);
            if info.kind == LayerKind::Body.code() {
                saw_body = true;
                let mut xy = vec![0.0f32; info.point_count as usize * 2];
                let n = orbweave_layer_points(e, i, xy.as_mut_ptr(), info.point_count);
                assert_eq!(n, info.point_count);
                let last = xy.len() - 2;
                assert_eq!((xy[0], xy[1]), (xy[last], xy[last + 1]));
            }
            let mut stops = vec![0.0f32; info.stop_count as usize * ORBWEAVE_STOP_STRIDE as usize];
            assert_eq!(orbweave_layer_stops(e, i, stops.as_mut_ptr(), info.stop_count), info.stop_count);
        }
        assert!(saw_body);
        assert!(!orbweave_layer_info(e, count, &mut OrbweaveLayerInfo::default()));

        let mut bg = [0.0f32; 4];
        assert!(orbweave_background(e, bg.as_mut_ptr()));
        assert_eq!(bg[3], 1.0);

        orbweave_set_running(e, false, 0.6);
        assert_eq!(orbweave_tick(e, 0.7), 0);
        assert_eq!(orbweave_layer_count(e), count);
        orbweave_destroy(e);
    }

    #[test]
    fn toml_presets_are_accepted() {
        let text = CString::new(Preset::cloud().to_toml_string().expect("toml")).expect("cstring");
        let e = orbweave_create_from_toml(200.0, 200.0, text.as_ptr());
        assert!(!e.is_null());
        orbweave_set_viewport(e, 0.0, 0.0);
        orbweave_set_dark_mode(e, false);
        orbweave_set_running(e, true, 1.0);
        assert!(orbweave_tick(e, 1.02) > 0);
        orbweave_destroy(e);
    }
}
