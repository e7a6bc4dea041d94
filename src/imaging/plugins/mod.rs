//! Dotted `category.function` operations.
//!
//! | Namespace | Module |
//! |---|---|
//! | `geometric_transformations` | [`geometric`] |
//! | `color_adjustments` | [`tonal`] |
//! | `filtering_and_noise_removal` | [`filtering`] |
//! | `morphological_operations` | [`morphology`] |
//! | `image_enhancement` | [`enhancement`] |
//!
//! Each module owns one namespace and registers its functions explicitly
//! through a `register` function. The pixel work is done by `imageproc`,
//! which only knows single-channel images for most of these operations;
//! [`per_channel`] splits a BGR buffer into planes and merges the results.

pub mod enhancement;
pub mod filtering;
pub mod geometric;
pub mod morphology;
pub mod tonal;

use super::buffer::ImageBuffer;
use super::params::ParamError;
use super::registry::{CapabilityRegistry, RegistryError};
use crate::config::LimitsConfig;
use image::GrayImage;

/// Largest accepted square kernel side.
pub const MAX_KERNEL: u32 = 31;

/// Register every plugin namespace.
///
/// `limits` bounds caller-chosen output sizes (resize targets).
pub fn register_all(
    registry: &mut CapabilityRegistry,
    limits: &LimitsConfig,
) -> Result<(), RegistryError> {
    geometric::register(registry, limits)?;
    tonal::register(registry)?;
    filtering::register(registry)?;
    morphology::register(registry)?;
    enhancement::register(registry)?;
    Ok(())
}

/// Check a square kernel side: odd, between `min` and [`MAX_KERNEL`].
pub(crate) fn check_kernel(name: &str, size: u32, min: u32) -> Result<(), ParamError> {
    if size % 2 == 0 || size < min || size > MAX_KERNEL {
        return Err(ParamError::Invalid(format!(
            "{name} must be an odd number between {min} and {MAX_KERNEL}, got {size}"
        )));
    }
    Ok(())
}

/// Apply a single-channel operation to every channel of `image` independently.
///
/// `op` must return a plane of the same dimensions.
pub(crate) fn per_channel(
    image: &ImageBuffer,
    op: impl Fn(&GrayImage) -> GrayImage,
) -> ImageBuffer {
    let (width, height) = image.dimensions();
    let n = image.channels().count();
    let src = image.as_raw();

    let mut out = vec![0u8; src.len()];
    for c in 0..n {
        let mut plane = GrayImage::new(width, height);
        for (dst, &v) in plane.iter_mut().zip(src.iter().skip(c).step_by(n)) {
            *dst = v;
        }
        let result = op(&plane);
        for (dst, &v) in out.iter_mut().skip(c).step_by(n).zip(result.iter()) {
            *dst = v;
        }
    }
    image.with_samples(out)
}
