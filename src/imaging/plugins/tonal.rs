//! `color_adjustments`: histogram-driven tone operations.

use super::per_channel;
use crate::imaging::buffer::{Channels, ImageBuffer};
use crate::imaging::params::NoParams;
use crate::imaging::registry::{Capability, CapabilityRegistry, RegistryError};
use image::GrayImage;
use imageproc::contrast::{equalize_histogram, stretch_contrast};

const NAMESPACE: &str = "color_adjustments";

/// Equalize the HSV value channel, leaving hue and saturation alone.
///
/// At fixed hue and saturation every BGR component is proportional to the
/// value, so rescaling each pixel by `v' / v` is the HSV round trip without
/// the conversion. A single-level image has nothing to spread and is
/// returned as is.
pub fn histogram_equalization(image: &ImageBuffer) -> ImageBuffer {
    match image.channels() {
        Channels::Gray => per_channel(image, equalize_plane),
        Channels::Bgr => {
            let (width, height) = image.dimensions();
            let mut value = GrayImage::new(width, height);
            for (v, p) in value.iter_mut().zip(image.pixels()) {
                *v = p[0].max(p[1]).max(p[2]);
            }
            let equalized = equalize_plane(&value);
            let mut levels = value.iter().zip(equalized.iter());
            image.map_colors(|p| {
                let Some((&v, &target)) = levels.next() else {
                    return p;
                };
                if v == 0 {
                    return p;
                }
                let gain = target as f32 / v as f32;
                p.map(|c| (c as f32 * gain).round().clamp(0.0, 255.0) as u8)
            })
        }
    }
}

fn equalize_plane(plane: &GrayImage) -> GrayImage {
    match min_max(plane) {
        Some((low, high)) if low < high => equalize_histogram(plane),
        _ => plane.clone(),
    }
}

fn min_max(plane: &GrayImage) -> Option<(u8, u8)> {
    let low = plane.iter().copied().min()?;
    let high = plane.iter().copied().max()?;
    Some((low, high))
}

/// Stretch each channel independently so its minimum maps to 0 and its
/// maximum to 255. Flat channels are left alone.
pub fn contrast_stretching(image: &ImageBuffer) -> ImageBuffer {
    per_channel(image, |plane| match min_max(plane) {
        Some((low, high)) if low < high => stretch_contrast(plane, low, high, 0, 255),
        _ => plane.clone(),
    })
}

pub(super) fn register(registry: &mut CapabilityRegistry) -> Result<(), RegistryError> {
    registry.register(Capability::single(
        format!("{NAMESPACE}.histogram_equalization"),
        "Equalize brightness distribution",
        &[],
        |image: &ImageBuffer, _: &NoParams| histogram_equalization(image),
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.contrast_stretching"),
        "Stretch each channel to the full range",
        &[],
        |image: &ImageBuffer, _: &NoParams| contrast_stretching(image),
    ))?;
    Ok(())
}
