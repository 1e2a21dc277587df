use serde::Serialize;

use crate::hashing::domain::grid::{normalize, GridLayout};
use crate::hashing::domain::hash_error::HashError;
use crate::shared::constants::{HASH_SEGMENT_BITS, NORM_DIM};
use crate::shared::frame::Frame;

/// ITU-R BT.709 luma weights.
const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// One of the seven bit-vectors in a [`HashResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
    Luminance,
    Grayscale,
    Combined1,
    Combined2,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Red,
        Channel::Green,
        Channel::Blue,
        Channel::Luminance,
        Channel::Grayscale,
        Channel::Combined1,
        Channel::Combined2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
            Channel::Luminance => "luminance",
            Channel::Grayscale => "grayscale",
            Channel::Combined1 => "combined1",
            Channel::Combined2 => "combined2",
        }
    }
}

/// Seven perceptual fingerprints of one frame.
///
/// Every channel has the same length and the same cell-to-bit mapping: grid
/// cell `p` (row-major) is bit `p % 64` of word `p / 64`, low bit first.
/// Two results built with the same frame size and grid can be compared
/// channel by channel with a Hamming distance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HashResult {
    cells: usize,
    red: Vec<u64>,
    green: Vec<u64>,
    blue: Vec<u64>,
    luminance: Vec<u64>,
    grayscale: Vec<u64>,
    combined1: Vec<u64>,
    combined2: Vec<u64>,
}

impl HashResult {
    fn zeroed(words: usize, cells: usize) -> Self {
        Self {
            cells,
            red: vec![0; words],
            green: vec![0; words],
            blue: vec![0; words],
            luminance: vec![0; words],
            grayscale: vec![0; words],
            combined1: vec![0; words],
            combined2: vec![0; words],
        }
    }

    pub fn red(&self) -> &[u64] {
        &self.red
    }

    pub fn green(&self) -> &[u64] {
        &self.green
    }

    pub fn blue(&self) -> &[u64] {
        &self.blue
    }

    pub fn luminance(&self) -> &[u64] {
        &self.luminance
    }

    pub fn grayscale(&self) -> &[u64] {
        &self.grayscale
    }

    pub fn combined1(&self) -> &[u64] {
        &self.combined1
    }

    pub fn combined2(&self) -> &[u64] {
        &self.combined2
    }

    pub fn channel(&self, channel: Channel) -> &[u64] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
            Channel::Luminance => &self.luminance,
            Channel::Grayscale => &self.grayscale,
            Channel::Combined1 => &self.combined1,
            Channel::Combined2 => &self.combined2,
        }
    }

    /// Words per channel: `ceil(N * N / 64)` for an `N x N` frame.
    pub fn words(&self) -> usize {
        self.red.len()
    }

    /// Number of grid cells, i.e. meaningful bits per channel.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// The leading words that hold cell bits; the rest are always zero.
    pub fn significant(&self, channel: Channel) -> &[u64] {
        let used = self.cells.div_ceil(HASH_SEGMENT_BITS);
        &self.channel(channel)[..used]
    }

    /// Lowercase hex of the significant words, 16 digits per word in word
    /// order.
    pub fn to_hex(&self, channel: Channel) -> String {
        self.significant(channel)
            .iter()
            .map(|word| format!("{word:016x}"))
            .collect()
    }

    fn set(&mut self, channel: Channel, cell: usize) {
        let word = cell / HASH_SEGMENT_BITS;
        let bit = 1u64 << (cell % HASH_SEGMENT_BITS);
        let words = match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
            Channel::Luminance => &mut self.luminance,
            Channel::Grayscale => &mut self.grayscale,
            Channel::Combined1 => &mut self.combined1,
            Channel::Combined2 => &mut self.combined2,
        };
        words[word] |= bit;
    }
}

/// Words per channel for a frame of side `frame_size`.
pub fn word_count(frame_size: u32) -> usize {
    let bits = (frame_size as usize) * (frame_size as usize);
    bits.div_ceil(HASH_SEGMENT_BITS)
}

fn luma([r, g, b]: [u8; 3]) -> u32 {
    (LUMA_R * f64::from(r) + LUMA_G * f64::from(g) + LUMA_B * f64::from(b)) as u32
}

fn gray([r, g, b]: [u8; 3]) -> u32 {
    (u32::from(r) + u32::from(g) + u32::from(b)) / 3
}

/// Digests `frame` on the default [`NORM_DIM`] grid.
pub fn digest(frame: &Frame) -> Result<HashResult, HashError> {
    digest_with_grid(frame, NORM_DIM)
}

/// Reduces `frame` to a `grid x grid` cell raster and thresholds every cell
/// against the frame-wide mean, one bit per cell per channel.
///
/// Fails when the grid is not `1 < grid <= frame.size()` or cannot tile the
/// frame.
pub fn digest_with_grid(frame: &Frame, grid: u32) -> Result<HashResult, HashError> {
    let layout = GridLayout::new(frame.size(), grid)?;
    let cells = normalize(frame, &layout);
    let dim = cells.dim();
    let mut result = HashResult::zeroed(word_count(frame.size()), dim * dim);

    let mean = cells.mean();
    let mean_luma = luma(mean);
    let mean_gray = gray(mean);

    for (p, cell) in cells.iter().enumerate() {
        let above = [cell[0] >= mean[0], cell[1] >= mean[1], cell[2] >= mean[2]];
        if above[0] {
            result.set(Channel::Red, p);
        }
        if above[1] {
            result.set(Channel::Green, p);
        }
        if above[2] {
            result.set(Channel::Blue, p);
        }
        if luma(cell) >= mean_luma {
            result.set(Channel::Luminance, p);
        }
        if gray(cell) >= mean_gray {
            result.set(Channel::Grayscale, p);
        }

        let majority = above.iter().filter(|&&b| b).count();
        if majority % 2 == 0 {
            result.set(Channel::Combined1, p);
        } else {
            result.set(Channel::Combined2, p);
        }
    }

    log::trace!(
        "Digested frame {} on a {grid}x{grid} grid, mean {:?}",
        frame.index(),
        mean
    );
    Ok(result)
}
