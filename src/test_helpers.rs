//! Shared test utilities: synthetic images and encoded fixtures.
//!
//! Everything here is deterministic so tests can compare exact samples.

use crate::imaging::{ImageBuffer, ImageCodec, OutputFormat, RustCodec};

/// Color image where every pixel is `bgr`.
pub fn uniform(width: u32, height: u32, bgr: [u8; 3]) -> ImageBuffer {
    ImageBuffer::filled(width, height, bgr).unwrap()
}

/// Color image with varying hue, saturation and value across the frame.
pub fn color_ramp(width: u32, height: u32) -> ImageBuffer {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let b = (x * 255 / width.max(2).saturating_sub(1)).min(255) as u8;
            let g = (y * 255 / height.max(2).saturating_sub(1)).min(255) as u8;
            let r = ((x + y) * 37 % 256) as u8;
            data.extend_from_slice(&[b, g, r]);
        }
    }
    ImageBuffer::from_bgr(width, height, data).unwrap()
}

/// Horizontal grayscale gradient.
pub fn gray_ramp(width: u32, height: u32) -> ImageBuffer {
    let data = (0..height)
        .flat_map(|_| (0..width).map(move |x| (x * 255 / width.max(2).saturating_sub(1)) as u8))
        .collect();
    ImageBuffer::from_gray(width, height, data).unwrap()
}

/// `inner` square of `fg` centred on a `bg` canvas.
pub fn square_on_background(size: u32, inner: u32, bg: [u8; 3], fg: [u8; 3]) -> ImageBuffer {
    let start = (size - inner) / 2;
    let mut data = Vec::with_capacity((size * size * 3) as usize);
    for y in 0..size {
        for x in 0..size {
            let inside = (start..start + inner).contains(&x) && (start..start + inner).contains(&y);
            data.extend_from_slice(if inside { &fg } else { &bg });
        }
    }
    ImageBuffer::from_bgr(size, size, data).unwrap()
}

pub fn encode_png(image: &ImageBuffer) -> Vec<u8> {
    RustCodec::default()
        .encode(image, OutputFormat::Png)
        .unwrap()
}
