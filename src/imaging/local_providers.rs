//! Model-free provider implementations.
//!
//! | Capability | Approach |
//! |---|---|
//! | Background removal | Median border color + flood fill from the edges |
//! | Super-resolution | `resize_exact` with `Lanczos3`, then `unsharpen` |
//! | Auto color | Gray-world white balance + percentile stretch per channel |
//!
//! These stand in for the ML models. They honour the same contract: a fresh
//! buffer back, input untouched.

use super::buffer::ImageBuffer;
use super::calculations::{histogram, percentile_bounds, scaled_dimensions, stretch_lut};
use super::params::Sharpening;
use super::providers::{
    BackgroundRemover, ColorCorrector, ProviderError, ProviderResult, SuperResolver,
};
use image::imageops::FilterType;
use std::collections::VecDeque;

/// Replaces the region connected to the image border whose color is within
/// `tolerance` (Euclidean, in 8-bit units) of the median border color.
#[derive(Debug, Clone, Copy)]
pub struct BorderFloodRemover {
    tolerance: u8,
    fill: [u8; 3],
}

impl BorderFloodRemover {
    /// `fill` is in BGR order.
    pub fn new(tolerance: u8, fill: [u8; 3]) -> Self {
        Self { tolerance, fill }
    }
}

fn border_median(image: &ImageBuffer) -> [u8; 3] {
    let (w, h) = image.dimensions();
    let mut channels: [Vec<u8>; 3] = Default::default();
    let mut push = |x: u32, y: u32| {
        for (c, &v) in image.pixel(x, y).iter().enumerate() {
            channels[c].push(v);
        }
    };
    for x in 0..w {
        push(x, 0);
        if h > 1 {
            push(x, h - 1);
        }
    }
    for y in 1..h.saturating_sub(1) {
        push(0, y);
        if w > 1 {
            push(w - 1, y);
        }
    }
    channels.map(|mut values| {
        values.sort_unstable();
        values[values.len() / 2]
    })
}

fn distance_sq(p: &[u8], q: [u8; 3]) -> u32 {
    p.iter()
        .zip(q)
        .map(|(&a, b)| (a as i32 - b as i32).pow(2) as u32)
        .sum()
}

impl BackgroundRemover for BorderFloodRemover {
    fn remove_background(&self, image: &ImageBuffer) -> ProviderResult {
        let img = image.to_bgr();
        let (w, h) = (img.width() as usize, img.height() as usize);
        let reference = border_median(&img);
        let limit = (self.tolerance as u32).pow(2);
        let is_background =
            |x: usize, y: usize| distance_sq(img.pixel(x as u32, y as u32), reference) <= limit;

        let mut mask = vec![false; w * h];
        let mut queue = VecDeque::new();
        let border = (0..w)
            .flat_map(|x| [(x, 0), (x, h - 1)])
            .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
        for (x, y) in border {
            if !mask[y * w + x] && is_background(x, y) {
                mask[y * w + x] = true;
                queue.push_back((x, y));
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            let neighbours = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbours {
                if nx < w && ny < h && !mask[ny * w + nx] && is_background(nx, ny) {
                    mask[ny * w + nx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        let mut data = img.as_raw().to_vec();
        for (pixel, _) in data
            .chunks_exact_mut(3)
            .zip(&mask)
            .filter(|(_, in_background)| **in_background)
        {
            pixel.copy_from_slice(&self.fill);
        }
        Ok(Some(img.with_samples(data)))
    }
}

/// Integer-factor Lanczos upscale with a light unsharp mask on top.
///
/// Outputs above `max_pixels` are refused before anything is allocated.
#[derive(Debug, Clone, Copy)]
pub struct LanczosUpscaler {
    scale: u32,
    max_pixels: u64,
    sharpening: Sharpening,
}

impl LanczosUpscaler {
    pub fn new(scale: u32, max_pixels: u64) -> Self {
        Self {
            scale,
            max_pixels,
            sharpening: Sharpening::light(),
        }
    }
}

impl SuperResolver for LanczosUpscaler {
    fn super_resolve(&self, image: &ImageBuffer) -> ProviderResult {
        let (w, h) = scaled_dimensions(image.dimensions(), self.scale).ok_or_else(|| {
            ProviderError::Failed(format!(
                "{}x{} cannot be scaled by {}",
                image.width(),
                image.height(),
                self.scale
            ))
        })?;
        let pixels = w as u64 * h as u64;
        if pixels > self.max_pixels {
            return Err(ProviderError::Failed(format!(
                "upscaled image would be {w}x{h} ({pixels} pixels), limit is {}",
                self.max_pixels
            )));
        }
        let upscaled = image
            .to_sample_image()
            .resize_exact(w, h, FilterType::Lanczos3)
            .unsharpen(self.sharpening.sigma, self.sharpening.threshold);
        Ok(Some(ImageBuffer::from_sample_image(upscaled)))
    }
}

/// Gray-world white balance followed by a per-channel contrast stretch that
/// ignores the darkest and brightest `clip` fraction of samples.
#[derive(Debug, Clone, Copy)]
pub struct GrayWorldCorrector {
    clip: f64,
}

impl GrayWorldCorrector {
    pub fn new(clip: f64) -> Self {
        Self { clip }
    }
}

impl Default for GrayWorldCorrector {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl ColorCorrector for GrayWorldCorrector {
    fn color_correct(&self, image: &ImageBuffer) -> ProviderResult {
        let img = image.to_bgr();
        let count = (img.width() as f64) * (img.height() as f64);

        let mut sums = [0f64; 3];
        for p in img.pixels() {
            for (sum, &v) in sums.iter_mut().zip(p) {
                *sum += v as f64;
            }
        }
        let means = sums.map(|s| s / count);
        let gray = means.iter().sum::<f64>() / 3.0;
        let gains = means.map(|m| if m < 1.0 { 1.0 } else { gray / m });

        let balanced = img.map_colors(|p| {
            let mut out = [0u8; 3];
            for c in 0..3 {
                out[c] = (p[c] as f64 * gains[c]).round().clamp(0.0, 255.0) as u8;
            }
            out
        });

        let luts = [0, 1, 2].map(|c| {
            let hist = histogram(balanced.pixels().map(|p| p[c]));
            let (low, high) = percentile_bounds(&hist, self.clip);
            stretch_lut(low, high)
        });
        Ok(Some(balanced.map_colors(|p| {
            [luts[0][p[0] as usize], luts[1][p[1] as usize], luts[2][p[2] as usize]]
        })))
    }
}
