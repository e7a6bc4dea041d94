//! Color adjustment primitives: brightness, contrast, saturation, hue.
//!
//! Every function takes the image by reference and returns a new buffer of the
//! same shape. Each has an identity parameter (`1.0` for the three factors,
//! `0` degrees for hue) under which the input is returned unchanged.
//!
//! Saturation and hue work in HSV with `h ∈ [0, 360)`, `s, v ∈ [0, 1]`, then
//! convert back to BGR. Grayscale buffers have no chroma, so both leave them
//! untouched.

use super::buffer::ImageBuffer;

/// Pivot for contrast scaling.
const MID_GRAY: f32 = 128.0;

/// Multiply every sample by `factor`, clamping to `0..=255`.
pub fn brightness(image: &ImageBuffer, factor: f32) -> ImageBuffer {
    if factor == 1.0 {
        return image.clone();
    }
    image.map_samples(|v| to_u8(v as f32 * factor))
}

/// Scale each sample's deviation from mid-gray by `factor`.
pub fn contrast(image: &ImageBuffer, factor: f32) -> ImageBuffer {
    if factor == 1.0 {
        return image.clone();
    }
    image.map_samples(|v| to_u8((v as f32 - MID_GRAY) * factor + MID_GRAY))
}

/// Scale HSV saturation by `factor` (clamped to `[0, 1]` afterwards).
pub fn saturation(image: &ImageBuffer, factor: f32) -> ImageBuffer {
    if factor == 1.0 {
        return image.clone();
    }
    image.map_colors(|bgr| {
        let (h, s, v) = bgr_to_hsv(bgr);
        hsv_to_bgr(h, (s * factor).clamp(0.0, 1.0), v)
    })
}

/// Rotate the HSV hue by `degrees`, wrapping around the color wheel.
pub fn hue(image: &ImageBuffer, degrees: f32) -> ImageBuffer {
    let shift = degrees.rem_euclid(360.0);
    if shift == 0.0 {
        return image.clone();
    }
    image.map_colors(|bgr| {
        let (h, s, v) = bgr_to_hsv(bgr);
        hsv_to_bgr((h + shift).rem_euclid(360.0), s, v)
    })
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub(crate) fn bgr_to_hsv([b, g, r]: [u8; 3]) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

pub(crate) fn hsv_to_bgr(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let sector = h / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [
        to_u8((b + m) * 255.0),
        to_u8((g + m) * 255.0),
        to_u8((r + m) * 255.0),
    ]
}
