pub mod fingerprint_video_use_case;
pub mod pipeline_logger;
