//! `morphological_operations`: min/max filters and their compositions.
//!
//! Grayscale morphology with a square mask, so color channels keep their
//! intensities instead of being binarized.

use super::{check_kernel, per_channel};
use crate::imaging::buffer::ImageBuffer;
use crate::imaging::calculations::kernel_radius;
use crate::imaging::params::{ParamError, Parameters};
use crate::imaging::registry::{Capability, CapabilityRegistry, RegistryError};
use image::GrayImage;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};
use serde::Deserialize;

const NAMESPACE: &str = "morphological_operations";
const MAX_ITERATIONS: u32 = 32;

/// Square structuring element and repeat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MorphologyParams {
    pub kernel_size: u32,
    pub iterations: u32,
}

impl Default for MorphologyParams {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            iterations: 1,
        }
    }
}

impl Parameters for MorphologyParams {
    fn validate(&self) -> Result<(), ParamError> {
        check_kernel("kernel_size", self.kernel_size, 1)?;
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(ParamError::Invalid(format!(
                "iterations must be between 1 and {MAX_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        Ok(())
    }
}

fn repeat(
    image: &ImageBuffer,
    params: &MorphologyParams,
    op: fn(&GrayImage, &Mask) -> GrayImage,
) -> ImageBuffer {
    // check_kernel caps the side at MAX_KERNEL, so the radius fits in a u8
    let mask = Mask::square(kernel_radius(params.kernel_size) as u8);
    per_channel(image, |plane| {
        (1..params.iterations).fold(op(plane, &mask), |acc, _| op(&acc, &mask))
    })
}

pub fn erosion(image: &ImageBuffer, params: &MorphologyParams) -> ImageBuffer {
    repeat(image, params, grayscale_erode)
}

pub fn dilation(image: &ImageBuffer, params: &MorphologyParams) -> ImageBuffer {
    repeat(image, params, grayscale_dilate)
}

/// Erosion then dilation: removes bright details smaller than the kernel.
pub fn opening(image: &ImageBuffer, params: &MorphologyParams) -> ImageBuffer {
    dilation(&erosion(image, params), params)
}

/// Dilation then erosion: fills dark gaps smaller than the kernel.
pub fn closing(image: &ImageBuffer, params: &MorphologyParams) -> ImageBuffer {
    erosion(&dilation(image, params), params)
}

pub(super) fn register(registry: &mut CapabilityRegistry) -> Result<(), RegistryError> {
    const PARAMS: &[&str] = &["kernel_size", "iterations"];
    registry.register(Capability::single(
        format!("{NAMESPACE}.erosion"),
        "Shrink bright regions",
        PARAMS,
        erosion,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.dilation"),
        "Grow bright regions",
        PARAMS,
        dilation,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.opening"),
        "Erosion followed by dilation",
        PARAMS,
        opening,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.closing"),
        "Dilation followed by erosion",
        PARAMS,
        closing,
    ))?;
    Ok(())
}
