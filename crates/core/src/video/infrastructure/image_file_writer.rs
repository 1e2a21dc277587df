use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves frames with the `image` crate; the format follows the extension.
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
        scale: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.size(), frame.size(), frame.data().to_vec())
            .ok_or("Frame data does not match its size")?;

        let img = match scale {
            Some(factor) if factor > 1 => {
                let side = frame.size() * factor;
                image::imageops::resize(&img, side, side, image::imageops::FilterType::Nearest)
            }
            _ => img,
        };

        img.save(path)?;
        Ok(())
    }
}
