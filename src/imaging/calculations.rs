//! Pure calculation functions: dimensions, histograms and lookup tables.
//!
//! All functions here are pure and testable without any I/O or images.

/// A 256-bin histogram of 8-bit samples.
pub type Histogram = [u64; 256];

/// 256-entry sample remapping table.
pub type Lut = [u8; 256];

/// Dimensions after an integer upscale, or `None` on overflow.
///
/// # Examples
/// ```
/// # use retouch::imaging::calculations::scaled_dimensions;
/// assert_eq!(scaled_dimensions((640, 480), 4), Some((2560, 1920)));
/// assert_eq!(scaled_dimensions((u32::MAX, 1), 2), None);
/// ```
pub fn scaled_dimensions(dims: (u32, u32), scale: u32) -> Option<(u32, u32)> {
    Some((dims.0.checked_mul(scale)?, dims.1.checked_mul(scale)?))
}

/// Radius of a square kernel with odd side `size`.
pub fn kernel_radius(size: u32) -> u32 {
    size / 2
}

pub fn histogram(samples: impl IntoIterator<Item = u8>) -> Histogram {
    let mut hist = [0u64; 256];
    for v in samples {
        hist[v as usize] += 1;
    }
    hist
}

/// Lowest and highest sample values after discarding `clip` (a fraction in
/// `[0, 0.5)`) of the samples at each end.
///
/// An empty histogram yields the full range.
pub fn percentile_bounds(hist: &Histogram, clip: f64) -> (u8, u8) {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return (0, 255);
    }
    let cut = (total as f64 * clip.clamp(0.0, 0.499)).floor() as u64;

    let mut seen = 0;
    let mut low = 0u8;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > cut {
            low = value as u8;
            break;
        }
    }

    let mut seen = 0;
    let mut high = 255u8;
    for (value, &count) in hist.iter().enumerate().rev() {
        seen += count;
        if seen > cut {
            high = value as u8;
            break;
        }
    }
    (low, high)
}

/// Linear stretch mapping `low..=high` onto `0..=255`.
///
/// Degenerate ranges (`high <= low`) produce the identity table.
pub fn stretch_lut(low: u8, high: u8) -> Lut {
    let mut lut = identity_lut();
    if high <= low {
        return lut;
    }
    let span = (high - low) as f32;
    for (i, entry) in lut.iter_mut().enumerate() {
        let t = (i as f32 - low as f32) / span;
        *entry = (t * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Power-law table `out = 255 · (in / 255)^(1 / gamma)`.
///
/// `gamma > 1` brightens mid-tones, `gamma < 1` darkens them.
pub fn gamma_lut(gamma: f64) -> Lut {
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = (255.0 * (i as f64 / 255.0).powf(inv)).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

pub fn identity_lut() -> Lut {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = i as u8;
    }
    lut
}
