pub mod grid;
pub mod hash_error;
pub mod perceptual_hash;
