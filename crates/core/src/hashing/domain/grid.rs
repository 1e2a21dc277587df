use std::ops::Range;

use ndarray::{s, Array3, Axis};

use crate::hashing::domain::hash_error::HashError;
use crate::shared::constants::RGB_CHANNELS;
use crate::shared::frame::Frame;

/// How a square frame is partitioned into a `cells x cells` grid.
///
/// When the frame side divides evenly every cell is `scale` pixels wide.
/// Otherwise the first `cells - 1` cells per axis are `frame_size / (cells - 1)`
/// wide and the last one takes the remainder, so every pixel lands in
/// exactly one cell either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    frame_size: u32,
    cells: u32,
    scale: u32,
    overflow: u32,
}

impl GridLayout {
    pub fn new(frame_size: u32, cells: u32) -> Result<Self, HashError> {
        if cells < 2 || cells > frame_size {
            return Err(HashError::InvalidGrid {
                grid: cells,
                frame_size,
            });
        }

        if frame_size % cells == 0 {
            let scale = frame_size / cells;
            return Ok(Self {
                frame_size,
                cells,
                scale,
                overflow: scale,
            });
        }

        let scale = frame_size / (cells - 1);
        let overflow = frame_size % (cells - 1);
        if overflow == 0 {
            return Err(HashError::UntileableGrid {
                grid: cells,
                frame_size,
            });
        }
        Ok(Self {
            frame_size,
            cells,
            scale,
            overflow,
        })
    }

    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn cells(&self) -> u32 {
        self.cells
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Width of the last row and column.
    pub fn overflow(&self) -> u32 {
        self.overflow
    }

    pub fn is_exact(&self) -> bool {
        self.frame_size % self.cells == 0
    }

    /// Pixel range covered by cell `i` along either axis.
    pub fn span(&self, i: u32) -> Range<usize> {
        let start = (i * self.scale) as usize;
        let width = if i + 1 == self.cells {
            self.overflow
        } else {
            self.scale
        };
        start..start + width as usize
    }
}

/// Per-cell mean colors plus the mean color of the whole frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellGrid {
    cells: Array3<u8>,
    mean: [u8; 3],
}

impl CellGrid {
    /// Number of cells per side.
    pub fn dim(&self) -> usize {
        self.cells.len_of(Axis(0))
    }

    pub fn cell(&self, row: usize, col: usize) -> [u8; 3] {
        [
            self.cells[[row, col, 0]],
            self.cells[[row, col, 1]],
            self.cells[[row, col, 2]],
        ]
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        let dim = self.dim();
        (0..dim * dim).map(move |p| self.cell(p / dim, p % dim))
    }

    pub fn mean(&self) -> [u8; 3] {
        self.mean
    }
}

/// Averages `frame` down to the cells of `layout`.
///
/// Cell values and the global mean are truncated integer means.
pub fn normalize(frame: &Frame, layout: &GridLayout) -> CellGrid {
    debug_assert_eq!(frame.size(), layout.frame_size());
    let dim = layout.cells() as usize;
    let view = frame.as_ndarray();
    let mut cells = Array3::<u8>::zeros((dim, dim, RGB_CHANNELS));
    let mut totals = [0u64; RGB_CHANNELS];

    for row in 0..dim {
        let rows = layout.span(row as u32);
        for col in 0..dim {
            let block = view.slice(s![rows.clone(), layout.span(col as u32), ..]);
            let count = (block.len_of(Axis(0)) * block.len_of(Axis(1))) as u64;
            for (channel, total) in totals.iter_mut().enumerate() {
                let sum: u64 = block
                    .index_axis(Axis(2), channel)
                    .iter()
                    .map(|&v| u64::from(v))
                    .sum();
                *total += sum;
                cells[[row, col, channel]] = (sum / count) as u8;
            }
        }
    }

    let pixels = u64::from(layout.frame_size()) * u64::from(layout.frame_size());
    let mean = totals.map(|total| (total / pixels) as u8);
    CellGrid { cells, mean }
}
