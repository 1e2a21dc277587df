use std::fmt;

/// Media type of a demuxed stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Subtitle => "subtitle",
            MediaKind::Data => "data",
            MediaKind::Attachment => "attachment",
            MediaKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Metadata for one stream discovered while probing a container.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: String,
    /// Zero for non-video streams.
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
}

impl StreamInfo {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.index, self.kind, self.codec)?;
        if self.is_video() {
            write!(f, " {}x{} @ {:.2} fps", self.width, self.height, self.fps)?;
            if self.total_frames > 0 {
                write!(f, ", {} frames", self.total_frames)?;
            }
        }
        Ok(())
    }
}

/// Index of the first video stream in ascending index order, if any.
pub fn first_video_stream(streams: &[StreamInfo]) -> Option<usize> {
    let mut ordered: Vec<&StreamInfo> = streams.iter().collect();
    ordered.sort_by_key(|s| s.index);
    ordered.into_iter().find(|s| s.is_video()).map(|s| s.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(index: usize, kind: MediaKind) -> StreamInfo {
        StreamInfo {
            index,
            kind,
            codec: "test".to_string(),
            width: 0,
            height: 0,
            fps: 0.0,
            total_frames: 0,
        }
    }

    #[test]
    fn test_first_video_stream_skips_audio() {
        let streams = vec![
            stream(0, MediaKind::Audio),
            stream(1, MediaKind::Video),
            stream(2, MediaKind::Video),
        ];
        assert_eq!(first_video_stream(&streams), Some(1));
    }

    #[test]
    fn test_first_video_stream_uses_index_order() {
        let streams = vec![stream(3, MediaKind::Video), stream(1, MediaKind::Video)];
        assert_eq!(first_video_stream(&streams), Some(1));
    }

    #[test]
    fn test_first_video_stream_none() {
        let streams = vec![stream(0, MediaKind::Audio), stream(1, MediaKind::Subtitle)];
        assert_eq!(first_video_stream(&streams), None);
        assert_eq!(first_video_stream(&[]), None);
    }

    #[test]
    fn test_display_video() {
        let info = StreamInfo {
            index: 0,
            kind: MediaKind::Video,
            codec: "h264".to_string(),
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames: 900,
        };
        assert_eq!(
            info.to_string(),
            "#0 video (h264) 1920x1080 @ 30.00 fps, 900 frames"
        );
    }

    #[test]
    fn test_display_audio() {
        let mut info = stream(1, MediaKind::Audio);
        info.codec = "aac".to_string();
        assert_eq!(info.to_string(), "#1 audio (aac)");
    }
}
