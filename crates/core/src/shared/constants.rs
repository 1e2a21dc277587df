/// Canonical square dimension every decoded frame is scaled to (N).
pub const FRAME_SIZE: u32 = 256;

/// Cells per side of the grid the hash engine reduces a frame to.
pub const NORM_DIM: u32 = 32;

/// Capacity of the pull buffer between a byte source and the demuxer.
pub const IO_BUFFER_SIZE: usize = 4096;

/// Bits per word in every hash channel.
pub const HASH_SEGMENT_BITS: usize = 64;

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;
