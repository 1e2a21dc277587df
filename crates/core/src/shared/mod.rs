pub mod codec_info;
pub mod constants;
pub mod frame;
pub mod stream_info;
