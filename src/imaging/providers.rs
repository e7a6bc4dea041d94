//! Capability providers for the heavy operations.
//!
//! Background removal, super-resolution and automatic color correction are
//! black boxes from the pipeline's point of view: `&ImageBuffer` in, a new
//! buffer (or nothing) out. Each gets its own trait so a model-backed
//! implementation can replace the local one without touching dispatch.
//!
//! The local implementations live in
//! [`local_providers`](super::local_providers) and need nothing beyond the
//! `image` crate.

use super::buffer::ImageBuffer;
use super::local_providers::{BorderFloodRemover, GrayWorldCorrector, LanczosUpscaler};
use crate::config::EditorConfig;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    Failed(String),
}

/// Result of a provider call. `Ok(None)` means the provider produced nothing.
pub type ProviderResult = Result<Option<ImageBuffer>, ProviderError>;

pub trait BackgroundRemover: Send + Sync {
    fn remove_background(&self, image: &ImageBuffer) -> ProviderResult;
}

pub trait SuperResolver: Send + Sync {
    fn super_resolve(&self, image: &ImageBuffer) -> ProviderResult;
}

pub trait ColorCorrector: Send + Sync {
    fn color_correct(&self, image: &ImageBuffer) -> ProviderResult;
}

/// The provider set a registry is built from.
#[derive(Clone)]
pub struct Providers {
    pub background: Arc<dyn BackgroundRemover>,
    pub super_resolution: Arc<dyn SuperResolver>,
    pub color: Arc<dyn ColorCorrector>,
}

impl Providers {
    /// Local, model-free providers configured from `config`.
    pub fn local(config: &EditorConfig) -> Self {
        let bg = &config.background_removal;
        let [r, g, b] = bg.fill;
        Self {
            background: Arc::new(BorderFloodRemover::new(bg.tolerance, [b, g, r])),
            super_resolution: Arc::new(LanczosUpscaler::new(
                config.super_resolution.scale,
                config.limits.max_pixels,
            )),
            color: Arc::new(GrayWorldCorrector::default()),
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}
