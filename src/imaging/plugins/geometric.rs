//! `geometric_transformations`: rotation, mirroring and resizing.

use crate::config::LimitsConfig;
use crate::imaging::buffer::ImageBuffer;
use crate::imaging::params::{NoParams, ParamError, Parameters};
use crate::imaging::registry::{Capability, CapabilityRegistry, RegistryError, Step};
use image::imageops::FilterType;
use serde::Deserialize;

const NAMESPACE: &str = "geometric_transformations";

/// Clockwise rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RotateParams {
    pub angle: u32,
}

impl Default for RotateParams {
    fn default() -> Self {
        Self { angle: 90 }
    }
}

impl Parameters for RotateParams {
    fn validate(&self) -> Result<(), ParamError> {
        match self.angle {
            90 | 180 | 270 => Ok(()),
            other => Err(ParamError::Invalid(format!(
                "angle must be 90, 180 or 270, got {other}"
            ))),
        }
    }
}

/// Target size for `handle_resize`. Both fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}

impl Parameters for ResizeParams {
    fn validate(&self) -> Result<(), ParamError> {
        if self.width == 0 || self.height == 0 {
            return Err(ParamError::Invalid(format!(
                "resize target must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl ResizeParams {
    /// Reject targets larger than `max_pixels`.
    pub fn check_limit(&self, max_pixels: u64) -> Result<(), ParamError> {
        let pixels = self.width as u64 * self.height as u64;
        if pixels > max_pixels {
            return Err(ParamError::Invalid(format!(
                "resize target {}x{} is {pixels} pixels, limit is {max_pixels}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

pub fn rotate(image: &ImageBuffer, params: &RotateParams) -> ImageBuffer {
    let img = image.to_sample_image();
    let rotated = match params.angle {
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img.rotate90(),
    };
    ImageBuffer::from_sample_image(rotated)
}

pub fn flip_horizontal(image: &ImageBuffer) -> ImageBuffer {
    ImageBuffer::from_sample_image(image.to_sample_image().fliph())
}

pub fn flip_vertical(image: &ImageBuffer) -> ImageBuffer {
    ImageBuffer::from_sample_image(image.to_sample_image().flipv())
}

/// Bilinear resize to an exact size; aspect ratio is not preserved.
pub fn resize(image: &ImageBuffer, params: &ResizeParams) -> ImageBuffer {
    let resized =
        image
            .to_sample_image()
            .resize_exact(params.width, params.height, FilterType::Triangle);
    ImageBuffer::from_sample_image(resized)
}

pub(super) fn register(
    registry: &mut CapabilityRegistry,
    limits: &LimitsConfig,
) -> Result<(), RegistryError> {
    registry.register(Capability::single(
        format!("{NAMESPACE}.rotate"),
        "Rotate clockwise by 90, 180 or 270 degrees",
        &["angle"],
        rotate,
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.flip_horizontal"),
        "Mirror left to right",
        &[],
        |image: &ImageBuffer, _: &NoParams| flip_horizontal(image),
    ))?;
    registry.register(Capability::single(
        format!("{NAMESPACE}.flip_vertical"),
        "Mirror top to bottom",
        &[],
        |image: &ImageBuffer, _: &NoParams| flip_vertical(image),
    ))?;
    let max_pixels = limits.max_pixels;
    let resize_id = format!("{NAMESPACE}.handle_resize");
    let step_name = resize_id.clone();
    registry.register(Capability::staged(
        resize_id,
        "Resize to an exact width and height",
        &["width", "height"],
        move |set| {
            let params: ResizeParams = set.decode()?;
            params.check_limit(max_pixels)?;
            Ok(vec![Step::new(step_name.clone(), move |image| {
                resize(image, &params)
            })])
        },
    ))?;
    Ok(())
}
