//! In-memory pixel buffer shared by every stage of the edit pipeline.
//!
//! Samples are interleaved `u8` in **BGR** order (height × width × channels).
//! Only two layouts exist: single-channel grayscale and three-channel color.
//! Anything else (alpha, 16-bit) is flattened by the codec before it gets here.
//!
//! Conversion to and from the `image` crate happens in two flavours:
//!
//! - [`ImageBuffer::from_rgb_image`] / [`ImageBuffer::to_rgb_image`] swap the
//!   channel order and are used at the codec boundary.
//! - [`ImageBuffer::to_sample_image`] / [`ImageBuffer::from_sample_image`]
//!   hand the raw samples over unchanged. They are only valid for operations
//!   that treat every channel the same way (resize, rotate, blur, ...).

use image::{DynamicImage, GrayImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("expected {expected} samples for {width}x{height}x{channels}, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
        actual: usize,
    },
}

/// Channel layout of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    Bgr,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Bgr => 3,
        }
    }
}

/// Owned 8-bit image, BGR order for color data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap raw interleaved samples, validating the length against the shape.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: Channels,
        data: Vec<u8>,
    ) -> Result<Self, BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(BufferError::SizeMismatch {
                width,
                height,
                channels: channels.count(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        Self::from_raw(width, height, Channels::Bgr, data)
    }

    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        Self::from_raw(width, height, Channels::Gray, data)
    }

    /// A color image where every pixel is `bgr`.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Result<Self, BufferError> {
        let pixels = width as usize * height as usize;
        let data = bgr.iter().copied().cycle().take(pixels * 3).collect();
        Self::from_bgr(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at `(x, y)`; one or three entries depending on layout.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let n = self.channels.count();
        let idx = (y as usize * self.width as usize + x as usize) * n;
        &self.data[idx..idx + n]
    }

    /// Iterate pixels as slices of `channels().count()` samples.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.channels.count())
    }

    /// Three-channel copy; grayscale samples are replicated into B, G and R.
    pub fn to_bgr(&self) -> ImageBuffer {
        self.clone().into_bgr()
    }

    pub fn into_bgr(self) -> ImageBuffer {
        match self.channels {
            Channels::Bgr => self,
            Channels::Gray => {
                let data = self.data.iter().flat_map(|&v| [v, v, v]).collect();
                ImageBuffer {
                    width: self.width,
                    height: self.height,
                    channels: Channels::Bgr,
                    data,
                }
            }
        }
    }

    /// Single-channel copy using BT.601 luma weights.
    pub fn to_gray(&self) -> ImageBuffer {
        match self.channels {
            Channels::Gray => self.clone(),
            Channels::Bgr => {
                let data = self
                    .data
                    .chunks_exact(3)
                    .map(|p| luma(p[0], p[1], p[2]))
                    .collect();
                ImageBuffer {
                    width: self.width,
                    height: self.height,
                    channels: Channels::Gray,
                    data,
                }
            }
        }
    }

    /// A buffer of the same shape holding `data`.
    pub(crate) fn with_samples(&self, data: Vec<u8>) -> ImageBuffer {
        debug_assert_eq!(data.len(), self.data.len());
        ImageBuffer {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }

    /// Apply `f` to every sample independently.
    pub fn map_samples(&self, f: impl Fn(u8) -> u8) -> ImageBuffer {
        ImageBuffer {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Apply `f` to every BGR pixel.
    ///
    /// Grayscale buffers carry no chroma, so they are returned unchanged.
    pub fn map_colors(&self, mut f: impl FnMut([u8; 3]) -> [u8; 3]) -> ImageBuffer {
        if self.channels == Channels::Gray {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.data.len());
        for p in self.data.chunks_exact(3) {
            data.extend_from_slice(&f([p[0], p[1], p[2]]));
        }
        ImageBuffer {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data,
        }
    }

    /// Build from an `image` crate RGB image, swapping into BGR order.
    pub fn from_rgb_image(img: RgbImage) -> ImageBuffer {
        let (width, height) = img.dimensions();
        let mut data = img.into_raw();
        for p in data.chunks_exact_mut(3) {
            p.swap(0, 2);
        }
        ImageBuffer {
            width,
            height,
            channels: Channels::Bgr,
            data,
        }
    }

    /// Convert to an `image` crate RGB image (grayscale is expanded first).
    pub fn to_rgb_image(&self) -> RgbImage {
        let bgr = self.to_bgr();
        let mut img = RgbImage::new(bgr.width, bgr.height);
        img.copy_from_slice(&bgr.data);
        for p in img.chunks_exact_mut(3) {
            p.swap(0, 2);
        }
        img
    }

    /// Hand the samples to the `image` crate without reordering channels.
    pub(crate) fn to_sample_image(&self) -> DynamicImage {
        match self.channels {
            Channels::Gray => {
                let mut img = GrayImage::new(self.width, self.height);
                img.copy_from_slice(&self.data);
                DynamicImage::ImageLuma8(img)
            }
            Channels::Bgr => {
                let mut img = RgbImage::new(self.width, self.height);
                img.copy_from_slice(&self.data);
                DynamicImage::ImageRgb8(img)
            }
        }
    }

    /// Inverse of [`to_sample_image`](Self::to_sample_image).
    pub(crate) fn from_sample_image(img: DynamicImage) -> ImageBuffer {
        let (width, height) = (img.width(), img.height());
        match img {
            DynamicImage::ImageLuma8(gray) => ImageBuffer {
                width,
                height,
                channels: Channels::Gray,
                data: gray.into_raw(),
            },
            other => ImageBuffer {
                width,
                height,
                channels: Channels::Bgr,
                data: other.into_rgb8().into_raw(),
            },
        }
    }
}

/// BT.601 luma of a BGR triple, rounded.
pub fn luma(b: u8, g: u8, r: u8) -> u8 {
    (0.114 * b as f32 + 0.587 * g as f32 + 0.299 * r as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}
