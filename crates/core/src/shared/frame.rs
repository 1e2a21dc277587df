use ndarray::ArrayView3;

use crate::shared::constants::RGB_CHANNELS;

/// A single decoded frame: a square RGB24 raster in row-major order.
///
/// Pixel data is exactly `3 * size * size` bytes, top-to-bottom,
/// left-to-right, one `(R, G, B)` triple per pixel. Frames are immutable
/// once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    size: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, size: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            Self::byte_len(size),
            "data length must equal 3 * size * size"
        );
        Self { data, size, index }
    }

    /// Builds a frame where every pixel has the same color.
    pub fn solid(size: u32, rgb: [u8; 3], index: usize) -> Self {
        let pixels = (size as usize) * (size as usize);
        let data = rgb.repeat(pixels);
        Self::new(data, size, index)
    }

    /// Number of bytes an RGB24 frame of the given side length occupies.
    pub fn byte_len(size: u32) -> usize {
        (size as usize) * (size as usize) * RGB_CHANNELS
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Side length in pixels (width == height).
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Position of this frame in decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y as usize) * (self.size as usize) + (x as usize)) * RGB_CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// `(row, column, channel)` view over the pixel data.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        let side = self.size as usize;
        ArrayView3::from_shape((side, side, RGB_CHANNELS), &self.data)
            .expect("Frame data length must match dimensions")
    }
}
