pub mod byte_source;
pub mod decode_backend;
pub mod decode_error;
pub mod decode_session;
pub mod image_writer;
#[cfg(test)]
pub mod stub_backend;
