use crate::shared::codec_info::CodecInfo;
use crate::shared::stream_info::StreamInfo;
use crate::video::domain::byte_source::ByteSource;
use crate::video::domain::decode_error::DecodeError;

/// Outcome of pulling the next packet from a demuxer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketRead {
    /// The packet buffer now holds data.
    Packet,
    EndOfStream,
}

/// Outcome of asking a decoder for its next frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameReceive {
    /// The frame buffer now holds a decoded picture.
    Frame,
    /// The decoder needs more input before it can emit another frame.
    Again,
    /// The decoder has been flushed and holds nothing further.
    EndOfStream,
}

/// A reusable packet buffer.
pub trait DemuxPacket {
    fn stream_index(&self) -> usize;

    /// Drops the payload so the buffer can be refilled.
    fn release(&mut self);
}

/// Container-level input bound to a [`ByteSource`].
///
/// Each step reports whether it already happened so that callers can retry
/// a failed probe without redoing work that succeeded.
pub trait DemuxInput {
    type Packet: DemuxPacket;

    fn is_bound(&self) -> bool;

    /// Allocates the pull buffer and binds the source to it.
    ///
    /// The source is taken out of `source` only once the binding exists;
    /// on failure it stays in place for a later attempt.
    fn bind(
        &mut self,
        source: &mut Option<Box<dyn ByteSource>>,
        buffer_size: usize,
    ) -> Result<(), DecodeError>;

    fn is_open(&self) -> bool;

    /// Probes the container through the bound source only: no file name,
    /// no format hint.
    fn open(&mut self) -> Result<(), DecodeError>;

    /// Reads enough of the input to resolve per-stream codec parameters.
    fn find_stream_info(&mut self) -> Result<(), DecodeError>;

    fn streams(&self) -> Vec<StreamInfo>;

    fn read_packet(&mut self, packet: &mut Self::Packet) -> Result<PacketRead, DecodeError>;

    /// Writes a human-readable description of the container to the
    /// backend's diagnostic output.
    fn dump(&self, stream_index: usize);
}

/// Packet-in, frames-out decoder.
pub trait FrameDecoder {
    type Packet;
    type Frame;

    /// Feeds one packet, or `None` to enter draining mode.
    fn send_packet(&mut self, packet: Option<&Self::Packet>) -> Result<(), DecodeError>;

    fn receive_frame(&mut self, frame: &mut Self::Frame) -> Result<FrameReceive, DecodeError>;

    /// Short codec name for diagnostics.
    fn codec_name(&self) -> String;
}

/// Pixel-format and size converter into a fixed RGB24 square.
pub trait FrameScaler {
    type Frame;

    /// Converts `source` into `target`, whose planes are backed by `pixels`
    /// (`3 * N * N` bytes, tightly packed).
    fn scale(
        &mut self,
        source: &Self::Frame,
        target: &mut Self::Frame,
        pixels: &mut [u8],
    ) -> Result<(), DecodeError>;
}

/// Demux, decode and scale capability a decode session drives.
///
/// Every resource comes back as an owned value whose `Drop` releases it,
/// so a session can abandon any partially built set of resources by
/// letting them go out of scope.
pub trait DecodeBackend {
    type Packet: DemuxPacket;
    type Frame;
    type Input: DemuxInput<Packet = Self::Packet>;
    /// Decoder lookup handle; not an owned resource.
    type Codec;
    /// Allocated but unopened decoder context.
    type CodecContext;
    type Decoder: FrameDecoder<Packet = Self::Packet, Frame = Self::Frame>;
    type Scaler: FrameScaler<Frame = Self::Frame>;

    fn alloc_input(&self) -> Result<Self::Input, DecodeError>;

    /// Looks up a decoder for `stream`, which belongs to `input`.
    fn find_decoder(&self, input: &Self::Input, stream: &StreamInfo) -> Option<Self::Codec>;

    fn alloc_codec_context(&self, codec: &Self::Codec) -> Result<Self::CodecContext, DecodeError>;

    fn copy_parameters(
        &self,
        context: &mut Self::CodecContext,
        input: &Self::Input,
        stream_index: usize,
    ) -> Result<(), DecodeError>;

    fn open_decoder(
        &self,
        context: Self::CodecContext,
        codec: &Self::Codec,
    ) -> Result<Self::Decoder, DecodeError>;

    fn alloc_frame(&self) -> Result<Self::Frame, DecodeError>;

    fn alloc_packet(&self) -> Result<Self::Packet, DecodeError>;

    /// Builds a converter from the decoder's native size and pixel format to
    /// `frame_size x frame_size` RGB24.
    fn scaler(&self, decoder: &Self::Decoder, frame_size: u32) -> Result<Self::Scaler, DecodeError>;

    /// Video codecs this backend knows about.
    fn codecs(&self) -> Vec<CodecInfo>;
}
