use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashError {
    #[error("grid of {grid} cells does not fit a {frame_size}px frame (need 1 < grid <= frame size)")]
    InvalidGrid { grid: u32, frame_size: u32 },
    #[error("grid of {grid} cells leaves no remainder row for a {frame_size}px frame")]
    UntileableGrid { grid: u32, frame_size: u32 },
}
