use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::hashing::domain::grid::GridLayout;
use crate::hashing::domain::perceptual_hash::{digest_with_grid, HashResult};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::decode_backend::DecodeBackend;
use crate::video::domain::decode_session::DecodeSession;
use crate::video::domain::image_writer::ImageWriter;

/// Fingerprint of one decoded frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameFingerprint {
    pub index: usize,
    pub hash: HashResult,
}

struct FrameExport {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    scale: Option<u32>,
}

/// Video fingerprinting pipeline: init → decode → digest every frame.
///
/// Optionally logs the container layout first and writes each decoded
/// frame out as an image.
pub struct FingerprintVideoUseCase<B: DecodeBackend> {
    session: DecodeSession<B>,
    grid: u32,
    logger: Box<dyn PipelineLogger>,
    dump: bool,
    export: Option<FrameExport>,
}

impl<B: DecodeBackend> FingerprintVideoUseCase<B> {
    pub fn new(session: DecodeSession<B>, grid: u32, logger: Box<dyn PipelineLogger>) -> Self {
        Self {
            session,
            grid,
            logger,
            dump: false,
            export: None,
        }
    }

    pub fn with_dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    pub fn with_frame_export(
        mut self,
        writer: Box<dyn ImageWriter>,
        dir: PathBuf,
        scale: Option<u32>,
    ) -> Self {
        self.export = Some(FrameExport { writer, dir, scale });
        self
    }

    pub fn session(&self) -> &DecodeSession<B> {
        &self.session
    }

    /// Runs the pipeline and returns one fingerprint per frame in decode order.
    pub fn execute(&mut self) -> Result<Vec<FrameFingerprint>, Box<dyn std::error::Error>> {
        // Reject a bad grid before touching the input.
        GridLayout::new(self.session.config().frame_size, self.grid)?;

        self.session.init()?;
        if self.dump {
            self.session.dump()?;
        }

        let start = Instant::now();
        let frames = self.session.decode()?;
        self.logger
            .timing("decode", start.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .info(&format!("Decoded {} frames", frames.len()));

        if let Some(export) = &self.export {
            let start = Instant::now();
            let paths = export
                .writer
                .write_all(&export.dir, &frames, export.scale)?;
            self.logger
                .timing("export", start.elapsed().as_secs_f64() * 1000.0);
            log::debug!("Wrote {} frames to {}", paths.len(), export.dir.display());
        }

        let total = frames.len();
        let mut fingerprints = Vec::with_capacity(total);
        for frame in &frames {
            let start = Instant::now();
            let hash = digest_with_grid(frame, self.grid)?;
            self.logger
                .timing("digest", start.elapsed().as_secs_f64() * 1000.0);
            fingerprints.push(FrameFingerprint {
                index: frame.index(),
                hash,
            });
            self.logger.progress(fingerprints.len(), total);
        }

        self.logger.summary();
        Ok(fingerprints)
    }
}
