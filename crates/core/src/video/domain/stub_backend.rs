//! Scripted, allocation-counting backend for exercising `DecodeSession`
//! without a real demuxer.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::shared::codec_info::CodecInfo;
use crate::shared::stream_info::{MediaKind, StreamInfo};
use crate::video::domain::byte_source::ByteSource;
use crate::video::domain::decode_backend::{
    DecodeBackend, DemuxInput, DemuxPacket, FrameDecoder, FrameReceive, FrameScaler, PacketRead,
};
use crate::video::domain::decode_error::{DecodeError, ErrorKind};

const INVALID_DATA: i32 = -1_094_995_529;
const IO_ERROR: i32 = -5;
const INVALID_ARGUMENT: i32 = -22;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Input,
    IoBinding,
    CodecContext,
    Decoder,
    Frame,
    Packet,
    Scaler,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailAt {
    AllocInput,
    Bind,
    Open,
    StreamInfo,
    FindDecoder,
    AllocContext,
    CopyParameters,
    OpenDecoder,
    SourceFrame,
    TargetFrame,
    Scaler,
    Packet,
    ReadPacket,
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    live: HashMap<Resource, i64>,
    allocated: HashMap<Resource, usize>,
    calls: HashMap<&'static str, usize>,
    released: Vec<Resource>,
}

impl Ledger {
    pub fn live(&self, kind: Resource) -> i64 {
        self.live.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_live(&self) -> i64 {
        self.live.values().sum()
    }

    pub fn allocations(&self, kind: Resource) -> usize {
        self.allocated.get(&kind).copied().unwrap_or(0)
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn release_order(&self) -> Vec<Resource> {
        self.released.clone()
    }

    fn acquire(&mut self, kind: Resource) {
        *self.live.entry(kind).or_default() += 1;
        *self.allocated.entry(kind).or_default() += 1;
    }

    fn release(&mut self, kind: Resource) {
        *self.live.entry(kind).or_default() -= 1;
        self.released.push(kind);
    }
}

/// What the stub container holds and how its decoder behaves.
#[derive(Clone, Debug)]
pub struct StubScript {
    pub streams: Vec<StreamInfo>,
    /// Stream index of each packet, in container order.
    pub packets: Vec<usize>,
    pub frames_per_packet: usize,
    /// Frames the decoder keeps back until it is flushed.
    pub held_frames: usize,
    /// Ordinals (among packets sent to the decoder) the decoder rejects.
    pub rejected_packets: Vec<usize>,
}

impl StubScript {
    pub fn stream(index: usize, kind: MediaKind) -> StreamInfo {
        let video = kind == MediaKind::Video;
        StreamInfo {
            index,
            kind,
            codec: "stub".to_string(),
            width: if video { 64 } else { 0 },
            height: if video { 48 } else { 0 },
            fps: if video { 25.0 } else { 0.0 },
            total_frames: 0,
        }
    }

    pub fn video_only(packets: usize) -> Self {
        Self {
            streams: vec![Self::stream(0, MediaKind::Video)],
            packets: vec![0; packets],
            frames_per_packet: 1,
            held_frames: 0,
            rejected_packets: Vec::new(),
        }
    }

    pub fn audio_only() -> Self {
        Self {
            streams: vec![Self::stream(0, MediaKind::Audio)],
            packets: vec![0, 0],
            ..Self::video_only(0)
        }
    }

    pub fn audio_then_video() -> Self {
        Self {
            streams: vec![
                Self::stream(0, MediaKind::Audio),
                Self::stream(1, MediaKind::Video),
                Self::stream(2, MediaKind::Subtitle),
            ],
            packets: vec![0, 1, 0, 1, 2],
            ..Self::video_only(0)
        }
    }
}

struct StubState {
    script: StubScript,
    fail: Option<FailAt>,
}

#[derive(Clone)]
pub struct StubBackend {
    ledger: Arc<Mutex<Ledger>>,
    state: Arc<Mutex<StubState>>,
}

impl StubBackend {
    pub fn new(script: StubScript) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger::default())),
            state: Arc::new(Mutex::new(StubState { script, fail: None })),
        }
    }

    pub fn fail_at(&self, at: FailAt) {
        self.state.lock().unwrap().fail = Some(at);
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail = None;
    }

    pub fn ledger(&self) -> Ledger {
        self.ledger.lock().unwrap().clone()
    }

    fn failing(&self, at: FailAt) -> bool {
        self.state.lock().unwrap().fail == Some(at)
    }

    fn script(&self) -> StubScript {
        self.state.lock().unwrap().script.clone()
    }

    fn call(&self, name: &'static str) {
        *self.ledger.lock().unwrap().calls.entry(name).or_default() += 1;
    }

    fn track(&self, kind: Resource) -> Tracked {
        self.ledger.lock().unwrap().acquire(kind);
        Tracked {
            kind,
            ledger: Arc::clone(&self.ledger),
        }
    }
}

struct Tracked {
    kind: Resource,
    ledger: Arc<Mutex<Ledger>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.release(self.kind);
        }
    }
}

struct StubIo {
    source: Box<dyn ByteSource>,
    buffer: Vec<u8>,
    _tracked: Tracked,
}

pub struct StubInput {
    // Declared first so the binding is released before the input itself.
    io: Option<StubIo>,
    _tracked: Tracked,
    backend: StubBackend,
    open: bool,
    packets: VecDeque<usize>,
}

impl DemuxInput for StubInput {
    type Packet = StubPacket;

    fn is_bound(&self) -> bool {
        self.io.is_some()
    }

    fn bind(
        &mut self,
        source: &mut Option<Box<dyn ByteSource>>,
        buffer_size: usize,
    ) -> Result<(), DecodeError> {
        if self.backend.failing(FailAt::Bind) {
            return Err(ErrorKind::NoMemory.into());
        }
        let source = source.take().ok_or(ErrorKind::NotInitialized)?;
        self.io = Some(StubIo {
            source,
            buffer: vec![0; buffer_size],
            _tracked: self.backend.track(Resource::IoBinding),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<(), DecodeError> {
        self.backend.call("open");
        let invalid = || DecodeError::backend(INVALID_DATA, "Invalid data found when processing input");
        if self.backend.failing(FailAt::Open) {
            return Err(invalid());
        }
        let io = self.io.as_mut().ok_or(ErrorKind::NotInitialized)?;
        match io.source.read(&mut io.buffer) {
            Ok(n) if n > 0 => {}
            _ => return Err(invalid()),
        }
        self.packets = self.backend.script().packets.into();
        self.open = true;
        Ok(())
    }

    fn find_stream_info(&mut self) -> Result<(), DecodeError> {
        self.backend.call("find_stream_info");
        if self.backend.failing(FailAt::StreamInfo) {
            return Err(DecodeError::backend(IO_ERROR, "Input/output error"));
        }
        Ok(())
    }

    fn streams(&self) -> Vec<StreamInfo> {
        if self.open {
            self.backend.script().streams
        } else {
            Vec::new()
        }
    }

    fn read_packet(&mut self, packet: &mut StubPacket) -> Result<PacketRead, DecodeError> {
        if self.backend.failing(FailAt::ReadPacket) {
            return Err(DecodeError::backend(IO_ERROR, "Input/output error"));
        }
        match self.packets.pop_front() {
            Some(stream) => {
                packet.stream = stream;
                Ok(PacketRead::Packet)
            }
            None => Ok(PacketRead::EndOfStream),
        }
    }

    fn dump(&self, _stream_index: usize) {
        self.backend.call("dump");
    }
}

pub struct StubPacket {
    stream: usize,
    backend: StubBackend,
    _tracked: Tracked,
}

impl DemuxPacket for StubPacket {
    fn stream_index(&self) -> usize {
        self.stream
    }

    fn release(&mut self) {
        self.backend.call("release_packet");
    }
}

pub struct StubFrame {
    sequence: usize,
    _tracked: Tracked,
}

pub struct StubContext {
    _tracked: Tracked,
}

pub struct StubDecoder {
    _tracked: Tracked,
    _context: StubContext,
    backend: StubBackend,
    script: StubScript,
    buffered: usize,
    sent: usize,
    produced: usize,
    flushed: bool,
}

impl FrameDecoder for StubDecoder {
    type Packet = StubPacket;
    type Frame = StubFrame;

    fn send_packet(&mut self, packet: Option<&StubPacket>) -> Result<(), DecodeError> {
        if packet.is_none() {
            self.backend.call("flush");
            self.flushed = true;
            return Ok(());
        }
        self.backend.call("send_packet");
        let ordinal = self.sent;
        self.sent += 1;
        if self.script.rejected_packets.contains(&ordinal) {
            return Err(DecodeError::backend(
                INVALID_DATA,
                "Invalid data found when processing input",
            ));
        }
        self.buffered += self.script.frames_per_packet;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut StubFrame) -> Result<FrameReceive, DecodeError> {
        let held = if self.flushed { 0 } else { self.script.held_frames };
        if self.buffered > held {
            self.buffered -= 1;
            frame.sequence = self.produced;
            self.produced += 1;
            Ok(FrameReceive::Frame)
        } else if self.flushed {
            Ok(FrameReceive::EndOfStream)
        } else {
            Ok(FrameReceive::Again)
        }
    }

    fn codec_name(&self) -> String {
        "stub".to_string()
    }
}

pub struct StubScaler {
    _tracked: Tracked,
}

impl FrameScaler for StubScaler {
    type Frame = StubFrame;

    fn scale(
        &mut self,
        source: &StubFrame,
        target: &mut StubFrame,
        pixels: &mut [u8],
    ) -> Result<(), DecodeError> {
        target.sequence = source.sequence;
        pixels.fill(source.sequence as u8);
        Ok(())
    }
}

impl DecodeBackend for StubBackend {
    type Packet = StubPacket;
    type Frame = StubFrame;
    type Input = StubInput;
    type Codec = String;
    type CodecContext = StubContext;
    type Decoder = StubDecoder;
    type Scaler = StubScaler;

    fn alloc_input(&self) -> Result<StubInput, DecodeError> {
        if self.failing(FailAt::AllocInput) {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(StubInput {
            io: None,
            _tracked: self.track(Resource::Input),
            backend: self.clone(),
            open: false,
            packets: VecDeque::new(),
        })
    }

    fn find_decoder(&self, _input: &StubInput, stream: &StreamInfo) -> Option<String> {
        if self.failing(FailAt::FindDecoder) {
            return None;
        }
        Some(stream.codec.clone())
    }

    fn alloc_codec_context(&self, _codec: &String) -> Result<StubContext, DecodeError> {
        if self.failing(FailAt::AllocContext) {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(StubContext {
            _tracked: self.track(Resource::CodecContext),
        })
    }

    fn copy_parameters(
        &self,
        _context: &mut StubContext,
        _input: &StubInput,
        _stream_index: usize,
    ) -> Result<(), DecodeError> {
        if self.failing(FailAt::CopyParameters) {
            return Err(DecodeError::backend(INVALID_ARGUMENT, "Invalid argument"));
        }
        Ok(())
    }

    fn open_decoder(&self, context: StubContext, _codec: &String) -> Result<StubDecoder, DecodeError> {
        if self.failing(FailAt::OpenDecoder) {
            return Err(DecodeError::backend(INVALID_ARGUMENT, "Invalid argument"));
        }
        Ok(StubDecoder {
            _tracked: self.track(Resource::Decoder),
            _context: context,
            backend: self.clone(),
            script: self.script(),
            buffered: 0,
            sent: 0,
            produced: 0,
            flushed: false,
        })
    }

    fn alloc_frame(&self) -> Result<StubFrame, DecodeError> {
        let live = self.ledger.lock().unwrap().live(Resource::Frame);
        if (live == 0 && self.failing(FailAt::SourceFrame))
            || (live == 1 && self.failing(FailAt::TargetFrame))
        {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(StubFrame {
            sequence: 0,
            _tracked: self.track(Resource::Frame),
        })
    }

    fn alloc_packet(&self) -> Result<StubPacket, DecodeError> {
        if self.failing(FailAt::Packet) {
            return Err(ErrorKind::NoMemory.into());
        }
        Ok(StubPacket {
            stream: 0,
            backend: self.clone(),
            _tracked: self.track(Resource::Packet),
        })
    }

    fn scaler(&self, _decoder: &StubDecoder, _frame_size: u32) -> Result<StubScaler, DecodeError> {
        if self.failing(FailAt::Scaler) {
            return Err(ErrorKind::InvalidScaler.into());
        }
        Ok(StubScaler {
            _tracked: self.track(Resource::Scaler),
        })
    }

    fn codecs(&self) -> Vec<CodecInfo> {
        vec![CodecInfo::new("stub", "Scripted test codec").with_mime_types(["video/x-stub"])]
    }
}
