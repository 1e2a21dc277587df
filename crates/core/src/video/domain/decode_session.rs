use crate::shared::constants::{FRAME_SIZE, IO_BUFFER_SIZE};
use crate::shared::frame::Frame;
use crate::shared::stream_info::{first_video_stream, StreamInfo};
use crate::video::domain::byte_source::ByteSource;
use crate::video::domain::decode_backend::{
    DecodeBackend, DemuxInput, DemuxPacket, FrameDecoder, FrameReceive, FrameScaler, PacketRead,
};
use crate::video::domain::decode_error::{DecodeError, ErrorKind};

/// Tunables for a decode session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Side length every frame is scaled to.
    pub frame_size: u32,
    /// Capacity of the pull buffer between the byte source and the demuxer.
    pub buffer_size: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            frame_size: FRAME_SIZE,
            buffer_size: IO_BUFFER_SIZE,
        }
    }
}

/// Turns a [`ByteSource`] into an ordered sequence of square RGB24 frames.
///
/// The session owns the backend input (pull buffer, I/O binding, format
/// context) for its whole lifetime. [`init`](Self::init) drives probing and
/// may be retried: every step that already succeeded is skipped. Each
/// [`decode`](Self::decode) call acquires its own decoder, frames, packet and
/// scaler and releases all of them before returning, whatever the outcome.
///
/// A session is not reentrant; callers serialize access per instance.
pub struct DecodeSession<B: DecodeBackend> {
    backend: B,
    config: DecodeConfig,
    source: Option<Box<dyn ByteSource>>,
    input: Option<B::Input>,
    detected: bool,
    stream_index: Option<usize>,
}

impl<B: DecodeBackend> DecodeSession<B> {
    pub fn new(backend: B, source: Box<dyn ByteSource>) -> Self {
        Self::with_config(backend, source, DecodeConfig::default())
    }

    pub fn with_config(backend: B, source: Box<dyn ByteSource>, config: DecodeConfig) -> Self {
        Self {
            backend,
            config,
            source: Some(source),
            input: None,
            detected: false,
            stream_index: None,
        }
    }

    pub fn config(&self) -> DecodeConfig {
        self.config
    }

    /// Allocates the input, binds the byte source, probes the container and
    /// selects the first video stream.
    pub fn init(&mut self) -> Result<(), DecodeError> {
        let input = match self.input.take() {
            Some(input) => input,
            None => self.backend.alloc_input()?,
        };
        let input = self.input.insert(input);

        if !input.is_bound() {
            input.bind(&mut self.source, self.config.buffer_size)?;
        }

        if !input.is_open() {
            input.open()?;
        }

        if !self.detected {
            input.find_stream_info()?;
            self.detected = true;
        }

        if self.stream_index.is_none() {
            let streams = input.streams();
            let index = first_video_stream(&streams).ok_or(ErrorKind::NoVideoStream)?;
            log::debug!("Selected video stream {index} of {}", streams.len());
            self.stream_index = Some(index);
        }

        Ok(())
    }

    /// True once binding, probing and stream selection have all succeeded.
    pub fn initialized(&self) -> bool {
        self.detected
            && self.stream_index.is_some()
            && self
                .input
                .as_ref()
                .is_some_and(|input| input.is_bound() && input.is_open())
    }

    /// Index of the selected video stream, once detected.
    pub fn stream_index(&self) -> Option<usize> {
        self.stream_index
    }

    /// Streams discovered by probing; empty before `init` reaches them.
    pub fn streams(&self) -> Vec<StreamInfo> {
        self.input
            .as_ref()
            .map(|input| input.streams())
            .unwrap_or_default()
    }

    /// Logs the detected stream layout and asks the backend for its own dump.
    pub fn dump(&self) -> Result<(), DecodeError> {
        if !self.initialized() {
            return Err(ErrorKind::NotInitialized.into());
        }
        let (Some(input), Some(stream_index)) = (self.input.as_ref(), self.stream_index) else {
            return Err(ErrorKind::NotInitialized.into());
        };

        for stream in input.streams() {
            let marker = if stream.index == stream_index { '*' } else { ' ' };
            log::info!("{marker} {stream}");
        }
        input.dump(stream_index);
        Ok(())
    }

    /// Decodes every frame of the selected stream, scaled to
    /// `frame_size x frame_size` RGB24, in decode order.
    ///
    /// Zero decodable frames yields an empty vector, not an error.
    pub fn decode(&mut self) -> Result<Vec<Frame>, DecodeError> {
        if !self.initialized() {
            return Err(ErrorKind::NotInitialized.into());
        }
        let (Some(input), Some(stream_index)) = (self.input.as_mut(), self.stream_index) else {
            return Err(ErrorKind::NotInitialized.into());
        };
        let backend = &self.backend;
        let frame_size = self.config.frame_size;

        let stream = input
            .streams()
            .into_iter()
            .find(|s| s.index == stream_index)
            .ok_or(ErrorKind::NoVideoStream)?;

        // Each acquisition below is owned by a local; an early return drops
        // everything acquired so far in reverse order.
        let codec = backend
            .find_decoder(input, &stream)
            .ok_or(ErrorKind::UnknownDecoder)?;
        let mut context = backend.alloc_codec_context(&codec)?;
        backend.copy_parameters(&mut context, input, stream_index)?;
        let decoder = backend.open_decoder(context, &codec)?;
        log::debug!(
            "Decoding stream {stream_index} with {} into {frame_size}x{frame_size} RGB24",
            decoder.codec_name()
        );

        let source_frame = backend.alloc_frame()?;
        let target_frame = backend.alloc_frame()?;
        let pixels = alloc_pixels(Frame::byte_len(frame_size))?;
        let scaler = backend.scaler(&decoder, frame_size)?;
        let packet = backend.alloc_packet()?;

        let mut scratch = Scratch::<B> {
            packet,
            scaler,
            pixels,
            target_frame,
            source_frame,
            decoder,
            frame_size,
        };
        let frames = scratch.run(input, stream_index)?;
        log::info!("Decoded {} frames from stream {stream_index}", frames.len());
        Ok(frames)
    }
}

/// Per-call decode resources. Fields drop in declaration order, which is
/// the reverse of acquisition order.
struct Scratch<B: DecodeBackend> {
    packet: B::Packet,
    scaler: B::Scaler,
    pixels: Box<[u8]>,
    target_frame: B::Frame,
    source_frame: B::Frame,
    decoder: B::Decoder,
    frame_size: u32,
}

impl<B: DecodeBackend> Scratch<B> {
    fn run(&mut self, input: &mut B::Input, stream_index: usize) -> Result<Vec<Frame>, DecodeError> {
        let mut frames = Vec::new();

        loop {
            let status = match input.read_packet(&mut self.packet) {
                Ok(status) => status,
                Err(e) => {
                    self.packet.release();
                    return Err(e);
                }
            };
            if status == PacketRead::EndOfStream {
                self.packet.release();
                break;
            }

            let result = if self.packet.stream_index() == stream_index {
                self.feed(&mut frames)
            } else {
                Ok(())
            };
            self.packet.release();
            result?;
        }

        // Flush frames still buffered inside the decoder.
        self.decoder.send_packet(None)?;
        self.drain(&mut frames)?;

        Ok(frames)
    }

    fn feed(&mut self, frames: &mut Vec<Frame>) -> Result<(), DecodeError> {
        if let Err(e) = self.decoder.send_packet(Some(&self.packet)) {
            log::warn!("Skipping packet rejected by decoder: {e}");
            return Ok(());
        }
        self.drain(frames)
    }

    fn drain(&mut self, frames: &mut Vec<Frame>) -> Result<(), DecodeError> {
        loop {
            match self.decoder.receive_frame(&mut self.source_frame)? {
                FrameReceive::Frame => {
                    self.scaler
                        .scale(&self.source_frame, &mut self.target_frame, &mut self.pixels)?;
                    frames.push(Frame::new(
                        self.pixels.to_vec(),
                        self.frame_size,
                        frames.len(),
                    ));
                }
                FrameReceive::Again | FrameReceive::EndOfStream => return Ok(()),
            }
        }
    }
}

fn alloc_pixels(len: usize) -> Result<Box<[u8]>, DecodeError> {
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| ErrorKind::NoMemory)?;
    pixels.resize(len, 0);
    Ok(pixels.into_boxed_slice())
}
