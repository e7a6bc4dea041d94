//! Image processing: buffers, codecs, transforms and the capability registry.
//!
//! | Concern | Module | Crate / function |
//! |---|---|---|
//! | **Pixel storage** | [`buffer`] | BGR `u8`, gray or color |
//! | **Decode / encode** | [`codec`] | `image::ImageReader`, `JpegEncoder` |
//! | **Parameters** | [`params`] | `serde_json` + typed `Deserialize` structs |
//! | **Color adjustments** | [`color`] | HSV math, per-pixel |
//! | **Heavy capabilities** | [`providers`], [`local_providers`] | flood fill, `Lanczos3`, gray-world |
//! | **Plugin namespaces** | [`plugins`] | `imageops`, window filters |
//! | **Dispatch table** | [`registry`] | reserved literals + `category.function` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and histogram math (unit testable)
//! - **Transforms**: `&ImageBuffer` in, new [`ImageBuffer`] out, never mutating the input
//! - **Registry**: [`CapabilityRegistry`] mapping identifiers to prepared [`Plan`]s

pub mod buffer;
pub mod calculations;
pub mod codec;
pub mod color;
pub mod local_providers;
pub mod params;
pub mod plugins;
pub mod providers;
pub mod registry;

pub use buffer::{BufferError, Channels, ImageBuffer};
pub use codec::{CodecError, ImageCodec, OutputFormat, RustCodec};
pub use params::{
    Adjustment, AdjustmentParams, NoParams, ParamError, ParameterSet, Parameters, Quality,
    Sharpening,
};
pub use providers::{BackgroundRemover, ColorCorrector, ProviderError, Providers, SuperResolver};
pub use registry::{
    ADJUSTMENTS, AUTO_COLOR, BACKGROUND_REMOVAL, Capability, CapabilityRegistry, Plan,
    RegistryError, Step, TransformError, TransformOutput,
};
