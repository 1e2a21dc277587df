use std::path::{Path, PathBuf};
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use framesig_core::hashing::domain::grid::GridLayout;
use framesig_core::hashing::domain::perceptual_hash::Channel;
use framesig_core::pipeline::fingerprint_video_use_case::{
    FingerprintVideoUseCase, FrameFingerprint,
};
use framesig_core::pipeline::pipeline_logger::LogPipelineLogger;
use framesig_core::shared::constants::{FRAME_SIZE, IO_BUFFER_SIZE, NORM_DIM};
use framesig_core::video::domain::decode_backend::DecodeBackend;
use framesig_core::video::domain::decode_session::{DecodeConfig, DecodeSession};
use framesig_core::video::infrastructure::ffmpeg_backend::{self, FfmpegBackend};
use framesig_core::video::infrastructure::image_file_writer::ImageFileWriter;
use framesig_core::video::infrastructure::reader_source::ReaderSource;

/// Decodes a video into square RGB frames and prints their perceptual fingerprints.
#[derive(Parser)]
#[command(name = "framesig")]
struct Cli {
    /// Input video file. Without one, the available video codecs are listed
    /// and the command fails with a usage error unless --list-codecs is given.
    input: Option<PathBuf>,

    /// Cells per side of the hash grid.
    #[arg(long, default_value_t = NORM_DIM)]
    grid: u32,

    /// Side length every frame is scaled to.
    #[arg(long, default_value_t = FRAME_SIZE)]
    frame_size: u32,

    /// Log the detected streams before decoding.
    #[arg(long)]
    dump: bool,

    /// Print every channel of every fingerprint as hex.
    #[arg(long)]
    hashes: bool,

    /// Print the fingerprints as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Save each decoded frame as a PNG into this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Pixel upscale factor for saved frames.
    #[arg(long, default_value = "1")]
    frame_scale: u32,

    /// List available video codecs and exit.
    #[arg(long)]
    list_codecs: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    ffmpeg_backend::init()?;
    let backend = FfmpegBackend::new();

    match &cli.input {
        Some(input) if !cli.list_codecs => run_fingerprint(&cli, input, backend),
        _ => {
            list_codecs(&backend);
            if !cli.list_codecs {
                missing_input().exit();
            }
            Ok(())
        }
    }
}

fn missing_input() -> clap::Error {
    Cli::command().error(
        ErrorKind::MissingRequiredArgument,
        "need exactly one input file (or --list-codecs)",
    )
}

fn run_fingerprint(
    cli: &Cli,
    input: &Path,
    backend: FfmpegBackend,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ReaderSource::open(input)
        .map_err(|e| format!("Cannot open {}: {e}", input.display()))?;
    let config = DecodeConfig {
        frame_size: cli.frame_size,
        buffer_size: IO_BUFFER_SIZE,
    };
    let session = DecodeSession::with_config(backend, Box::new(source), config);

    let mut use_case =
        FingerprintVideoUseCase::new(session, cli.grid, Box::new(LogPipelineLogger::default()))
            .with_dump(cli.dump);
    if let Some(dir) = &cli.frames_dir {
        let scale = (cli.frame_scale > 1).then_some(cli.frame_scale);
        use_case = use_case.with_frame_export(Box::new(ImageFileWriter::new()), dir.clone(), scale);
    }

    let fingerprints = use_case.execute()?;
    if let Some(dir) = &cli.frames_dir {
        log::info!("Frames written to {}", dir.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&fingerprints)?);
    } else {
        print_fingerprints(&fingerprints, cli.hashes);
    }
    Ok(())
}

fn print_fingerprints(fingerprints: &[FrameFingerprint], hashes: bool) {
    println!("{} frames", fingerprints.len());
    if !hashes {
        return;
    }
    for fingerprint in fingerprints {
        println!("frame {}", fingerprint.index);
        for channel in Channel::ALL {
            println!(
                "  {:<10} {}",
                channel.name(),
                fingerprint.hash.to_hex(channel)
            );
        }
    }
}

fn list_codecs(backend: &impl DecodeBackend) {
    let codecs = backend.codecs();
    if codecs.is_empty() {
        log::warn!("No video codecs available");
        return;
    }
    for codec in codecs {
        let mime_types: Vec<&str> = codec.mime_types.iter().map(String::as_str).collect();
        if mime_types.is_empty() {
            println!("{:<20} {}", codec.id, codec.description);
        } else {
            println!(
                "{:<20} {} [{}]",
                codec.id,
                codec.description,
                mime_types.join(", ")
            );
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !cli.list_codecs && !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    if cli.frame_size == 0 {
        return Err("Frame size must be positive".into());
    }
    GridLayout::new(cli.frame_size, cli.grid)?;
    if cli.frame_scale == 0 {
        return Err("Frame scale must be at least 1".into());
    }
    if cli.frames_dir.is_some() && cli.input.is_none() {
        return Err("--frames-dir needs an input file".into());
    }
    Ok(())
}
