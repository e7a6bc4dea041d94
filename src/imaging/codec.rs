//! Byte stream ⇄ [`ImageBuffer`] conversion.
//!
//! | Direction | Crate / function |
//! |---|---|
//! | Sniff format | `image::ImageReader::with_guessed_format` |
//! | Decode (PNG, JPEG, TIFF, WebP, BMP) | `image` crate decoders |
//! | EXIF orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode others | `DynamicImage::write_to` |
//!
//! Decoding always produces a three-channel BGR buffer: grayscale inputs are
//! expanded and alpha is dropped. Encoding accepts both layouts.

use super::buffer::{Channels, ImageBuffer};
use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("image is {pixels} pixels, limit is {limit}")]
    TooLarge { pixels: u64, limit: u64 },
    #[error("failed to encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("unsupported image format '{0}'")]
    UnsupportedFormat(String),
}

/// Formats the encoder can produce.
///
/// Serialized as its uppercase name (`"PNG"`), parsed case-insensitively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
    Tiff,
    Bmp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::WebP,
        OutputFormat::Tiff,
        OutputFormat::Bmp,
    ];

    pub fn mime_type(self) -> &'static str {
        self.image_format().to_mime_type()
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Bmp => "bmp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WEBP",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::WebP),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputFormat> for String {
    fn from(value: OutputFormat) -> Self {
        value.to_string()
    }
}

/// Decode/encode boundary used by the pipeline and the batch store.
pub trait ImageCodec: Sync {
    /// Decode bytes into a three-channel BGR buffer.
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError>;

    /// Encode a one- or three-channel buffer.
    fn encode(&self, image: &ImageBuffer, format: OutputFormat) -> Result<Vec<u8>, CodecError>;
}

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RustCodec {
    jpeg_quality: Quality,
    max_pixels: u64,
}

impl RustCodec {
    pub fn new(jpeg_quality: Quality, max_pixels: u64) -> Self {
        Self {
            jpeg_quality,
            max_pixels,
        }
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new(Quality::default(), 40_000_000)
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        let decode_err = |e: image::ImageError| CodecError::Decode(e.to_string());

        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .into_decoder()
            .map_err(decode_err)?;

        let (width, height) = decoder.dimensions();
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(CodecError::TooLarge {
                pixels,
                limit: self.max_pixels,
            });
        }

        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
        img.apply_orientation(orientation);

        if img.width() == 0 || img.height() == 0 {
            return Err(CodecError::Decode("image has no pixels".into()));
        }
        Ok(ImageBuffer::from_rgb_image(img.into_rgb8()))
    }

    fn encode(&self, image: &ImageBuffer, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
        let encode_err = |e: image::ImageError| CodecError::Encode {
            format,
            message: e.to_string(),
        };

        let dynamic = match image.channels() {
            Channels::Bgr => DynamicImage::ImageRgb8(image.to_rgb_image()),
            Channels::Gray => {
                let mut gray = GrayImage::new(image.width(), image.height());
                gray.copy_from_slice(image.as_raw());
                DynamicImage::ImageLuma8(gray)
            }
        };

        let mut bytes = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                let encoder =
                    JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality.value() as u8);
                dynamic.write_with_encoder(encoder).map_err(encode_err)?;
            }
            other => {
                dynamic
                    .write_to(&mut Cursor::new(&mut bytes), other.image_format())
                    .map_err(encode_err)?;
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{color_ramp, encode_png};

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("Jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("tif".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert!(matches!(
            "gif".parse::<OutputFormat>(),
            Err(CodecError::UnsupportedFormat(f)) if f == "gif"
        ));
    }

    #[test]
    fn mime_types_follow_format() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
    }

    #[test]
    fn png_roundtrip_preserves_samples() {
        let codec = RustCodec::default();
        let img = color_ramp(12, 7);
        let bytes = codec.encode(&img, OutputFormat::Png).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), img);
    }

    #[test]
    fn decoded_gray_png_is_three_channel() {
        let gray = ImageBuffer::from_gray(3, 2, vec![0, 50, 100, 150, 200, 250]).unwrap();
        let codec = RustCodec::default();
        let bytes = codec.encode(&gray, OutputFormat::Png).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.channels(), Channels::Bgr);
        assert_eq!(decoded, gray.to_bgr());
    }

    #[test]
    fn every_format_encodes() {
        let codec = RustCodec::default();
        let img = color_ramp(16, 16);
        for format in OutputFormat::ALL {
            let bytes = codec.encode(&img, format).unwrap();
            assert!(!bytes.is_empty(), "{format} produced no bytes");
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (16, 16), "{format} changed size");
        }
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let codec = RustCodec::default();
        assert!(matches!(
            codec.decode(b"definitely not an image"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn oversized_images_are_rejected() {
        let codec = RustCodec::new(Quality::default(), 100);
        let bytes = encode_png(&color_ramp(20, 20));
        assert!(matches!(
            codec.decode(&bytes),
            Err(CodecError::TooLarge {
                pixels: 400,
                limit: 100
            })
        ));
    }
}
