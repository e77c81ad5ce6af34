//! Palette helpers for class colors and overlay previews.

/// Hue step between consecutive palette entries, in degrees.
const GOLDEN_ANGLE_DEG: f32 = 137.5;

const PALETTE_SATURATION: f32 = 0.8;
const PALETTE_VALUE: f32 = 0.9;

/// Convert HSV (hue in degrees, saturation and value in 0..=1) to RGB in 0..=1.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (r + m, g + m, b + m)
}

/// Palette entry `index` as RGB in 0..=1. Consecutive indices are spread by
/// the golden angle so neighbours never share a hue.
pub fn palette_rgb(index: u32) -> (f32, f32, f32) {
    let hue = (index as f32 * GOLDEN_ANGLE_DEG) % 360.0;
    hsv_to_rgb(hue, PALETTE_SATURATION, PALETTE_VALUE)
}

/// Palette entry `index` as 8-bit RGB.
pub fn palette_rgb8(index: u32) -> [u8; 3] {
    let (r, g, b) = palette_rgb(index);
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
