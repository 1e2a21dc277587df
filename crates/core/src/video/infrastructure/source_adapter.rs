use crate::video::domain::byte_source::{ByteSource, Whence};

/// Result of one pull through the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(usize),
    EndOfData,
    Failed,
}

/// A seek as the demuxer phrases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekRequest {
    /// "How long is the input?" The adapter never knows.
    Size,
    To(i64, Whence),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    Position(u64),
    SizeUnsupported,
    Failed,
}

/// Bridges a [`ByteSource`] to the demuxer's pull-buffer I/O callbacks.
///
/// Reads never exceed `capacity` bytes, size queries are refused so the
/// demuxer falls back to forward reads, and absolute seeks to negative
/// offsets are clamped to zero.
pub struct SourceAdapter {
    source: Box<dyn ByteSource>,
    capacity: usize,
}

impl SourceAdapter {
    pub fn new(source: Box<dyn ByteSource>, capacity: usize) -> Self {
        Self { source, capacity }
    }

    pub fn into_source(self) -> Box<dyn ByteSource> {
        self.source
    }

    pub fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let len = buf.len().min(self.capacity);
        match self.source.read(&mut buf[..len]) {
            Ok(0) => ReadOutcome::EndOfData,
            Ok(n) => ReadOutcome::Data(n.min(len)),
            Err(e) => {
                log::debug!("Byte source read failed: {e}");
                ReadOutcome::Failed
            }
        }
    }

    pub fn seek(&mut self, request: SeekRequest) -> SeekOutcome {
        let (offset, whence) = match request {
            SeekRequest::Size => return SeekOutcome::SizeUnsupported,
            SeekRequest::To(offset, whence) => (offset, whence),
        };
        let offset = match whence {
            Whence::Relative => offset,
            Whence::Beginning | Whence::End => offset.max(0),
        };

        if let Err(e) = self.source.seek(offset, whence) {
            log::debug!("Byte source seek to {offset} ({whence:?}) failed: {e}");
            return SeekOutcome::Failed;
        }
        match self.source.tell() {
            Ok(position) => SeekOutcome::Position(position),
            Err(e) => {
                log::debug!("Byte source tell failed: {e}");
                SeekOutcome::Failed
            }
        }
    }
}
