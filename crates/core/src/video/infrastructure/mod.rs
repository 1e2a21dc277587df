pub mod ffmpeg_backend;
pub mod image_file_writer;
pub mod reader_source;
mod source_adapter;
