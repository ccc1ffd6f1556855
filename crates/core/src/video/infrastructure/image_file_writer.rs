use std::path::Path;

use image::{DynamicImage, RgbaImage};

use crate::shared::frame::{Frame, FRAME_CHANNELS};
use crate::video::domain::image_writer::ImageWriter;

/// Saves RGBA frames with the `image` crate.
///
/// Formats without an alpha channel (JPEG, BMP) get the color channels only.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != FRAME_CHANNELS {
            return Err(format!(
                "expected {FRAME_CHANNELS}-channel frame, got {}",
                frame.channels()
            )
            .into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame data does not match its dimensions")?;
        let img = match size {
            Some((w, h)) if (w, h) != img.dimensions() => {
                image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
            }
            _ => img,
        };

        let keeps_alpha = matches!(
            image::ImageFormat::from_path(path),
            Ok(image::ImageFormat::Png | image::ImageFormat::Tiff | image::ImageFormat::WebP)
        );
        if keeps_alpha {
            img.save(path)?;
        } else {
            DynamicImage::ImageRgba8(img).to_rgb8().save(path)?;
        }
        log::trace!("Wrote frame {} to {}", frame.index(), path.display());
        Ok(())
    }
}
