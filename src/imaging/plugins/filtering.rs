//! `filtering_and_noise_removal`: smoothing, denoising and sharpening.

use super::{check_kernel, per_channel};
use crate::imaging::buffer::ImageBuffer;
use crate::imaging::calculations::kernel_radius;
use crate::imaging::params::{NoParams, ParamError, Parameters};
use crate::imaging::registry::{Capability, CapabilityRegistry, RegistryError};
use imageproc::filter;
use serde::Deserialize;

const NAMESPACE: &str = "filtering_and_noise_removal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelParams {
    pub kernel_size: u32,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self { kernel_size: 3 }
    }
}

impl Parameters for KernelParams {
    fn validate(&self) -> Result<(), ParamError> {
        check_kernel("kernel_size", self.kernel_size, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianParams {
    pub sigma: f32,
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl Parameters for GaussianParams {
    fn validate(&self) -> Result<(), ParamError> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(ParamError::Invalid(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// Box average; edges are replicated.
pub fn mean_filter(image: &ImageBuffer, params: &KernelParams) -> ImageBuffer {
    let r = kernel_radius(params.kernel_size);
    per_channel(image, |plane| filter::box_filter(plane, r, r))
}

pub fn median_filter(image: &ImageBuffer, params: &KernelParams) -> ImageBuffer {
    let r = kernel_radius(params.kernel_size);
    per_channel(image, |plane| filter::median_filter(plane, r, r))
}

pub fn gaussian_blur(image: &ImageBuffer, params: &GaussianParams) -> ImageBuffer {
    ImageBuffer::from_sample_image(image.to_sample_image().blur(params.sigma))
}

/// Laplacian-boosted identity (`imageproc::filter::sharpen3x3`).
pub fn sharpen(image: &ImageBuffer) -> ImageBuffer {
    per_channel(image, filter::sharpen3x3)
}

pub(super) fn register(registry: &mut CapabilityRegistry) -> Result<(), RegistryError> {
    registry.register(Capability::single(
        format!("{NAMESPACE}.mean_filter"),
        "Box average over a square window",
        &["kernel_size"],
        mean_filter,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.gaussian_blur"),
        "Gaussian blur",
        &["sigma"],
        gaussian_blur,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.sharpen"),
        "Sharpen edges with a 3x3 kernel",
        &[],
        |image: &ImageBuffer, _: &NoParams| sharpen(image),
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.median_filter"),
        "Median over a square window",
        &["kernel_size"],
        median_filter,
    ))?;
    Ok(())
}
