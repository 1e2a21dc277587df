use std::ffi::{c_char, c_int, c_void, CStr};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use ffmpeg_next::ffi;
use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::Error;

use crate::shared::codec_info::CodecInfo;
use crate::shared::frame::Frame;
use crate::shared::stream_info::{MediaKind, StreamInfo};
use crate::video::domain::byte_source::{ByteSource, Whence};
use crate::video::domain::decode_backend::{
    DecodeBackend, DemuxInput, DemuxPacket, FrameDecoder, FrameReceive, FrameScaler, PacketRead,
};
use crate::video::domain::decode_error::{DecodeError, ErrorKind};
use crate::video::infrastructure::source_adapter::{
    ReadOutcome, SeekOutcome, SeekRequest, SourceAdapter,
};

// libavformat/avio.h
const AVSEEK_SIZE: c_int = 0x10000;
const AVSEEK_FORCE: c_int = 0x20000;

impl From<Error> for DecodeError {
    fn from(e: Error) -> Self {
        DecodeError::backend(i32::from(e), e.to_string())
    }
}

/// Registers ffmpeg's formats and codecs. Call once per process before
/// creating the first session.
pub fn init() -> Result<(), DecodeError> {
    ffmpeg_next::init()?;
    Ok(())
}

/// Decode backend on top of libavformat, libavcodec and libswscale.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Format context that has been allocated but not yet opened.
struct RawFormat(*mut ffi::AVFormatContext);

impl RawFormat {
    fn alloc() -> Result<Self, DecodeError> {
        let ptr = unsafe { ffi::avformat_alloc_context() };
        if ptr.is_null() {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(Self(ptr))
    }

    fn into_raw(self) -> *mut ffi::AVFormatContext {
        let ptr = self.0;
        mem::forget(self);
        ptr
    }
}

impl Drop for RawFormat {
    fn drop(&mut self) {
        unsafe { ffi::avformat_free_context(self.0) };
    }
}

enum FormatState {
    /// A failed open already freed the context.
    Vacant,
    Allocated(RawFormat),
    Open(Input),
}

impl FormatState {
    fn as_mut_ptr(&mut self) -> Option<*mut ffi::AVFormatContext> {
        match self {
            FormatState::Vacant => None,
            FormatState::Allocated(raw) => Some(raw.0),
            FormatState::Open(input) => Some(unsafe { input.as_mut_ptr() }),
        }
    }
}

/// Custom AVIO context reading through a [`SourceAdapter`].
struct AvioBinding {
    context: *mut ffi::AVIOContext,
    adapter: *mut SourceAdapter,
}

impl AvioBinding {
    /// On failure the adapter is handed back untouched.
    fn new(adapter: SourceAdapter, buffer_size: c_int) -> Result<Self, SourceAdapter> {
        let buffer = unsafe { ffi::av_malloc(buffer_size as usize) } as *mut u8;
        if buffer.is_null() {
            return Err(adapter);
        }

        let adapter = Box::into_raw(Box::new(adapter));
        let context = unsafe {
            ffi::avio_alloc_context(
                buffer,
                buffer_size,
                0,
                adapter as *mut c_void,
                Some(read_packet),
                None,
                Some(seek_packet),
            )
        };
        if context.is_null() {
            unsafe {
                ffi::av_free(buffer as *mut c_void);
                return Err(*Box::from_raw(adapter));
            }
        }

        Ok(Self { context, adapter })
    }

    /// Puts the source and the I/O context back at byte zero with the
    /// sticky end-of-file and error state cleared.
    fn rewind(&mut self) -> Result<(), DecodeError> {
        let adapter = unsafe { &mut *self.adapter };
        if adapter.seek(SeekRequest::To(0, Whence::Beginning)) != SeekOutcome::Position(0) {
            return Err(Error::Other {
                errno: ffmpeg_next::error::ESPIPE,
            }
            .into());
        }
        unsafe {
            let ctx = &mut *self.context;
            ctx.buf_ptr = ctx.buffer;
            ctx.buf_end = ctx.buffer;
            ctx.pos = 0;
            ctx.eof_reached = 0;
            ctx.error = 0;
        }
        Ok(())
    }
}

impl Drop for AvioBinding {
    fn drop(&mut self) {
        unsafe {
            // The demuxer may have swapped the buffer, so free whatever the
            // context holds now rather than the one handed in.
            ffi::av_freep(ptr::addr_of_mut!((*self.context).buffer) as *mut c_void);
            ffi::avio_context_free(&mut self.context);
            drop(Box::from_raw(self.adapter));
        }
    }
}

unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    if opaque.is_null() || buf.is_null() || buf_size <= 0 {
        return c_int::from(Error::Unknown);
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let adapter = unsafe { &mut *(opaque as *mut SourceAdapter) };
        let buf = unsafe { slice::from_raw_parts_mut(buf, buf_size as usize) };
        adapter.read(buf)
    }));
    match result {
        Ok(ReadOutcome::Data(n)) => n as c_int,
        Ok(ReadOutcome::EndOfData) => c_int::from(Error::Eof),
        Ok(ReadOutcome::Failed) | Err(_) => c_int::from(Error::Unknown),
    }
}

unsafe extern "C" fn seek_packet(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
    if opaque.is_null() {
        return -1;
    }
    let request = if whence & AVSEEK_SIZE != 0 {
        SeekRequest::Size
    } else {
        match Whence::from_raw(whence & !AVSEEK_FORCE) {
            Some(whence) => SeekRequest::To(offset, whence),
            None => return -1,
        }
    };
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let adapter = unsafe { &mut *(opaque as *mut SourceAdapter) };
        adapter.seek(request)
    }));
    match result {
        Ok(SeekOutcome::Position(position)) => i64::try_from(position).unwrap_or(-1),
        Ok(SeekOutcome::SizeUnsupported) => -1,
        Ok(SeekOutcome::Failed) | Err(_) => i64::from(c_int::from(Error::Unknown)),
    }
}

/// Format context plus the custom I/O it reads through.
pub struct FfmpegInput {
    format: FormatState,
    io: Option<AvioBinding>,
}

impl FfmpegInput {
    fn opened(&self) -> Result<&Input, DecodeError> {
        match &self.format {
            FormatState::Open(input) => Ok(input),
            _ => Err(ErrorKind::NotInitialized.into()),
        }
    }

    fn opened_mut(&mut self) -> Result<&mut Input, DecodeError> {
        match &mut self.format {
            FormatState::Open(input) => Ok(input),
            _ => Err(ErrorKind::NotInitialized.into()),
        }
    }
}

impl Drop for FfmpegInput {
    fn drop(&mut self) {
        // Pull buffer and AVIO context go first; the format context must not
        // keep a dangling pb while it is being closed.
        let Some(io) = self.io.take() else {
            return;
        };
        if let Some(ctx) = self.format.as_mut_ptr() {
            unsafe { (*ctx).pb = ptr::null_mut() };
        }
        drop(io);
    }
}

impl DemuxInput for FfmpegInput {
    type Packet = ffmpeg_next::Packet;

    fn is_bound(&self) -> bool {
        self.io.is_some()
    }

    fn bind(
        &mut self,
        source: &mut Option<Box<dyn ByteSource>>,
        buffer_size: usize,
    ) -> Result<(), DecodeError> {
        if self.io.is_some() {
            return Ok(());
        }
        let size = c_int::try_from(buffer_size).map_err(|_| Error::Other {
            errno: ffmpeg_next::error::EINVAL,
        })?;
        let Some(taken) = source.take() else {
            return Err(ErrorKind::NotInitialized.into());
        };

        match AvioBinding::new(SourceAdapter::new(taken, buffer_size), size) {
            Ok(io) => {
                self.io = Some(io);
                Ok(())
            }
            Err(adapter) => {
                *source = Some(adapter.into_source());
                Err(ErrorKind::NoMemory.into())
            }
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.format, FormatState::Open(_))
    }

    fn open(&mut self) -> Result<(), DecodeError> {
        let Some(io) = self.io.as_mut() else {
            return Err(ErrorKind::NotInitialized.into());
        };
        let raw = match mem::replace(&mut self.format, FormatState::Vacant) {
            FormatState::Allocated(raw) => raw,
            FormatState::Vacant => {
                // An earlier open consumed input and left the I/O context at
                // end of file; probing again has to start from scratch.
                io.rewind()?;
                RawFormat::alloc()?
            }
            FormatState::Open(input) => {
                self.format = FormatState::Open(input);
                return Ok(());
            }
        };

        let mut ptr = raw.into_raw();
        let code = unsafe {
            (*ptr).pb = io.context;
            ffi::avformat_open_input(&mut ptr, ptr::null(), ptr::null(), ptr::null_mut())
        };
        if code < 0 {
            // avformat_open_input frees the context on failure.
            return Err(Error::from(code).into());
        }

        self.format = FormatState::Open(unsafe { Input::wrap(ptr) });
        Ok(())
    }

    fn find_stream_info(&mut self) -> Result<(), DecodeError> {
        let input = self.opened_mut()?;
        let code = unsafe { ffi::avformat_find_stream_info(input.as_mut_ptr(), ptr::null_mut()) };
        if code < 0 {
            return Err(Error::from(code).into());
        }
        Ok(())
    }

    fn streams(&self) -> Vec<StreamInfo> {
        match self.opened() {
            Ok(input) => input.streams().map(|s| stream_info(&s)).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn read_packet(
        &mut self,
        packet: &mut ffmpeg_next::Packet,
    ) -> Result<PacketRead, DecodeError> {
        let input = self.opened_mut()?;
        match packet.read(input) {
            Ok(()) => Ok(PacketRead::Packet),
            Err(Error::Eof) => Ok(PacketRead::EndOfStream),
            Err(e) => Err(e.into()),
        }
    }

    fn dump(&self, stream_index: usize) {
        if let Ok(input) = self.opened() {
            ffmpeg_next::format::context::input::dump(input, stream_index as i32, None);
        }
    }
}

impl DemuxPacket for ffmpeg_next::Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }

    fn release(&mut self) {
        unsafe { ffi::av_packet_unref(self.as_mut_ptr()) };
    }
}

fn stream_info(stream: &ffmpeg_next::format::stream::Stream) -> StreamInfo {
    let parameters = stream.parameters();
    let kind = match parameters.medium() {
        ffmpeg_next::media::Type::Video => MediaKind::Video,
        ffmpeg_next::media::Type::Audio => MediaKind::Audio,
        ffmpeg_next::media::Type::Subtitle => MediaKind::Subtitle,
        ffmpeg_next::media::Type::Data => MediaKind::Data,
        ffmpeg_next::media::Type::Attachment => MediaKind::Attachment,
        ffmpeg_next::media::Type::Unknown => MediaKind::Unknown,
    };
    let (width, height) = unsafe {
        let raw = parameters.as_ptr();
        ((*raw).width.max(0) as u32, (*raw).height.max(0) as u32)
    };

    let rate = stream.rate();
    let fps = if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    };

    StreamInfo {
        index: stream.index(),
        kind,
        codec: parameters.id().name().to_string(),
        width,
        height,
        fps,
        total_frames: stream.frames().max(0) as usize,
    }
}

pub struct FfmpegDecoder(ffmpeg_next::decoder::Video);

impl FrameDecoder for FfmpegDecoder {
    type Packet = ffmpeg_next::Packet;
    type Frame = VideoFrame;

    fn send_packet(&mut self, packet: Option<&ffmpeg_next::Packet>) -> Result<(), DecodeError> {
        match packet {
            Some(packet) => self.0.send_packet(packet)?,
            None => self.0.send_eof()?,
        }
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut VideoFrame) -> Result<FrameReceive, DecodeError> {
        match self.0.receive_frame(frame) {
            Ok(()) => Ok(FrameReceive::Frame),
            Err(Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                Ok(FrameReceive::Again)
            }
            Err(Error::Eof) => Ok(FrameReceive::EndOfStream),
            Err(e) => Err(e.into()),
        }
    }

    fn codec_name(&self) -> String {
        self.0
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default()
    }
}

pub struct FfmpegScaler {
    context: scaling::Context,
    size: u32,
}

impl FrameScaler for FfmpegScaler {
    type Frame = VideoFrame;

    fn scale(
        &mut self,
        source: &VideoFrame,
        target: &mut VideoFrame,
        pixels: &mut [u8],
    ) -> Result<(), DecodeError> {
        let side = c_int::try_from(self.size).map_err(|_| ErrorKind::InvalidScaler)?;
        if pixels.len() < Frame::byte_len(self.size) {
            return Err(ErrorKind::InvalidScaler.into());
        }

        // Point the target planes at the caller's buffer so the scaler writes
        // straight into it, tightly packed.
        let code = unsafe {
            let raw = target.as_mut_ptr();
            ffi::av_image_fill_arrays(
                (*raw).data.as_mut_ptr(),
                (*raw).linesize.as_mut_ptr(),
                pixels.as_ptr(),
                ffi::AVPixelFormat::AV_PIX_FMT_RGB24,
                side,
                side,
                1,
            )
        };
        if code < 0 {
            return Err(Error::from(code).into());
        }
        target.set_format(Pixel::RGB24);
        target.set_width(self.size);
        target.set_height(self.size);

        self.context.run(source, target)?;
        Ok(())
    }
}

impl DecodeBackend for FfmpegBackend {
    type Packet = ffmpeg_next::Packet;
    type Frame = VideoFrame;
    type Input = FfmpegInput;
    type Codec = ffmpeg_next::Codec;
    type CodecContext = ffmpeg_next::codec::context::Context;
    type Decoder = FfmpegDecoder;
    type Scaler = FfmpegScaler;

    fn alloc_input(&self) -> Result<FfmpegInput, DecodeError> {
        Ok(FfmpegInput {
            format: FormatState::Allocated(RawFormat::alloc()?),
            io: None,
        })
    }

    fn find_decoder(&self, input: &FfmpegInput, stream: &StreamInfo) -> Option<ffmpeg_next::Codec> {
        let id = input.opened().ok()?.stream(stream.index)?.parameters().id();
        ffmpeg_next::codec::decoder::find(id)
    }

    fn alloc_codec_context(
        &self,
        codec: &ffmpeg_next::Codec,
    ) -> Result<ffmpeg_next::codec::context::Context, DecodeError> {
        let context = ffmpeg_next::codec::context::Context::new_with_codec(*codec);
        if unsafe { context.as_ptr().is_null() } {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(context)
    }

    fn copy_parameters(
        &self,
        context: &mut ffmpeg_next::codec::context::Context,
        input: &FfmpegInput,
        stream_index: usize,
    ) -> Result<(), DecodeError> {
        let stream = input
            .opened()?
            .stream(stream_index)
            .ok_or(ErrorKind::NoVideoStream)?;
        context.set_parameters(stream.parameters())?;
        Ok(())
    }

    fn open_decoder(
        &self,
        context: ffmpeg_next::codec::context::Context,
        codec: &ffmpeg_next::Codec,
    ) -> Result<FfmpegDecoder, DecodeError> {
        let decoder = context.decoder().open_as(*codec)?.video()?;
        Ok(FfmpegDecoder(decoder))
    }

    fn alloc_frame(&self) -> Result<VideoFrame, DecodeError> {
        let frame = VideoFrame::empty();
        if unsafe { frame.as_ptr().is_null() } {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(frame)
    }

    fn alloc_packet(&self) -> Result<ffmpeg_next::Packet, DecodeError> {
        Ok(ffmpeg_next::Packet::empty())
    }

    fn scaler(&self, decoder: &FfmpegDecoder, frame_size: u32) -> Result<FfmpegScaler, DecodeError> {
        let video = &decoder.0;
        scaling::Context::get(
            video.format(),
            video.width(),
            video.height(),
            Pixel::RGB24,
            frame_size,
            frame_size,
            scaling::Flags::BILINEAR,
        )
        .map(|context| FfmpegScaler {
            context,
            size: frame_size,
        })
        .map_err(|e| {
            log::debug!(
                "No scaler from {:?} {}x{}: {e}",
                video.format(),
                video.width(),
                video.height()
            );
            ErrorKind::InvalidScaler.into()
        })
    }

    fn codecs(&self) -> Vec<CodecInfo> {
        let mut codecs = Vec::new();
        let mut descriptor: *const ffi::AVCodecDescriptor = ptr::null();
        loop {
            descriptor = unsafe { ffi::avcodec_descriptor_next(descriptor) };
            if descriptor.is_null() {
                break;
            }
            let d = unsafe { &*descriptor };
            if d.type_ != ffi::AVMediaType::AVMEDIA_TYPE_VIDEO {
                continue;
            }
            if ffmpeg_next::codec::decoder::find(d.id.into()).is_none() {
                continue;
            }
            let (id, description, mime_types) =
                unsafe { (c_string(d.name), c_string(d.long_name), c_strings(d.mime_types)) };
            codecs.push(CodecInfo::new(id, description).with_mime_types(mime_types));
        }
        codecs
    }
}

unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Reads a NULL-terminated array of C strings.
unsafe fn c_strings(mut ptr: *const *const c_char) -> Vec<String> {
    let mut items = Vec::new();
    if ptr.is_null() {
        return items;
    }
    unsafe {
        while !(*ptr).is_null() {
            items.push(c_string(*ptr));
            ptr = ptr.add(1);
        }
    }
    items
}
