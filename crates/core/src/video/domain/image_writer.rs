use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;

/// Writes decoded frames out as image files.
pub trait ImageWriter {
    /// Writes one frame to `path`. With `scale`, each pixel becomes a
    /// `scale x scale` block, which keeps small fingerprint rasters legible.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        scale: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Writes every frame into `dir` as `frame_{index:05}.png` and returns the
    /// paths in frame order.
    fn write_all(
        &self,
        dir: &Path,
        frames: &[Frame],
        scale: Option<u32>,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        frames
            .iter()
            .map(|frame| {
                let path = dir.join(format!("frame_{:05}.png", frame.index()));
                self.write(&path, frame, scale)?;
                Ok(path)
            })
            .collect()
    }
}
