use crate::shared::frame::{Frame, FRAME_CHANNELS};
use crate::video::domain::pixel_converter::{ConvertError, PixelConverter};
use crate::video::domain::raw_frame::{PixelLayout, RawFrame};

/// Converts any supported raw layout into a tightly packed RGBA [`Frame`].
///
/// Row padding is stripped; opaque sources get alpha 255.
pub struct RgbaConverter;

impl RgbaConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RgbaConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelConverter for RgbaConverter {
    fn convert(&self, raw: &RawFrame, index: usize) -> Result<Frame, ConvertError> {
        validate(raw)?;

        let w = raw.width as usize;
        let h = raw.height as usize;
        let bpp = raw.layout.bytes_per_pixel();
        let mut pixels = Vec::with_capacity(w * h * FRAME_CHANNELS as usize);

        for row in 0..h {
            let start = row * raw.stride;
            let src = &raw.data[start..start + w * bpp];
            match raw.layout {
                PixelLayout::Gray8 => {
                    for &v in src {
                        pixels.extend_from_slice(&[v, v, v, 255]);
                    }
                }
                PixelLayout::Rgb24 => {
                    for px in src.chunks_exact(3) {
                        pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
                    }
                }
                PixelLayout::Bgr24 => {
                    for px in src.chunks_exact(3) {
                        pixels.extend_from_slice(&[px[2], px[1], px[0], 255]);
                    }
                }
                PixelLayout::Rgba32 => pixels.extend_from_slice(src),
            }
        }

        Ok(Frame::new(
            pixels,
            raw.width,
            raw.height,
            FRAME_CHANNELS,
            index,
        ))
    }
}

fn validate(raw: &RawFrame) -> Result<(), ConvertError> {
    let row = raw.width as usize * raw.layout.bytes_per_pixel();
    if raw.height > 0 && raw.stride < row {
        return Err(ConvertError::InvalidStride {
            layout: raw.layout,
            width: raw.width,
            stride: raw.stride,
        });
    }
    let expected = raw.required_len();
    if raw.data.len() < expected {
        return Err(ConvertError::BufferTooSmall {
            layout: raw.layout,
            width: raw.width,
            height: raw.height,
            expected,
            actual: raw.data.len(),
        });
    }
    Ok(())
}
