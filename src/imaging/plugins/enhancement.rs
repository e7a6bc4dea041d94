//! `image_enhancement`: gamma, thresholding and smoothing.
//!
//! Both threshold operations return a single-channel image; the pipeline
//! expands it back to three channels before encoding.

use super::{check_kernel, per_channel};
use crate::imaging::buffer::ImageBuffer;
use crate::imaging::calculations::{gamma_lut, kernel_radius};
use crate::imaging::params::{ParamError, Parameters};
use crate::imaging::registry::{Capability, CapabilityRegistry, RegistryError};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::filter::box_filter;
use serde::Deserialize;

const NAMESPACE: &str = "image_enhancement";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GammaParams {
    pub gamma: f64,
}

impl Default for GammaParams {
    fn default() -> Self {
        Self { gamma: 1.0 }
    }
}

impl Parameters for GammaParams {
    fn validate(&self) -> Result<(), ParamError> {
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ParamError::Invalid(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdParams {
    pub threshold: u8,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self { threshold: 127 }
    }
}

impl Parameters for ThresholdParams {}

/// Local-mean threshold: a pixel is white when it exceeds the mean of its
/// `block_size` window minus `c`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptiveThresholdParams {
    pub block_size: u32,
    pub c: f64,
}

impl Default for AdaptiveThresholdParams {
    fn default() -> Self {
        Self {
            block_size: 11,
            c: 2.0,
        }
    }
}

impl Parameters for AdaptiveThresholdParams {
    fn validate(&self) -> Result<(), ParamError> {
        check_kernel("block_size", self.block_size, 3)?;
        if !self.c.is_finite() {
            return Err(ParamError::Invalid("c must be a finite number".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingParams {
    pub kernel_size: u32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self { kernel_size: 5 }
    }
}

impl Parameters for SmoothingParams {
    fn validate(&self) -> Result<(), ParamError> {
        check_kernel("kernel_size", self.kernel_size, 1)
    }
}

pub fn gamma_correction(image: &ImageBuffer, params: &GammaParams) -> ImageBuffer {
    let lut = gamma_lut(params.gamma);
    image.map_samples(|v| lut[v as usize])
}

pub fn global_threshold(image: &ImageBuffer, params: &ThresholdParams) -> ImageBuffer {
    per_channel(&image.to_gray(), |plane| {
        threshold(plane, params.threshold, ThresholdType::Binary)
    })
}

/// The local mean comes from `box_filter`; `imageproc`'s own
/// `adaptive_threshold` has no offset, so `c` is applied here.
pub fn adaptive_threshold(image: &ImageBuffer, params: &AdaptiveThresholdParams) -> ImageBuffer {
    let r = kernel_radius(params.block_size);
    per_channel(&image.to_gray(), |plane| {
        let mut out = box_filter(plane, r, r);
        for (m, &v) in out.iter_mut().zip(plane.iter()) {
            *m = if v as f64 > *m as f64 - params.c { 255 } else { 0 };
        }
        out
    })
}

pub fn smoothing(image: &ImageBuffer, params: &SmoothingParams) -> ImageBuffer {
    let r = kernel_radius(params.kernel_size);
    per_channel(image, |plane| box_filter(plane, r, r))
}

pub(super) fn register(registry: &mut CapabilityRegistry) -> Result<(), RegistryError> {
    registry.register(Capability::single(
        format!("{NAMESPACE}.gamma_correction"),
        "Power-law tone curve",
        &["gamma"],
        gamma_correction,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.global_threshold"),
        "Binarize against a fixed threshold",
        &["threshold"],
        global_threshold,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.adaptive_threshold"),
        "Binarize against the local mean",
        &["block_size", "c"],
        adaptive_threshold,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.smoothing"),
        "Box smoothing",
        &["kernel_size"],
        smoothing,
    ))?;
    Ok(())
}
