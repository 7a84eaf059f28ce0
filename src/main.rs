use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use skywatch::codec::{default_candidates, CodecCapabilityProbe, CodecTable, VideoBackend};
use skywatch::recorder::{ExternalEncoder, JsonRecordingLog, Recorder, RecorderEvent};
use skywatch::utils::logger;
use skywatch::{AppConfig, Error, FrameSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    camera: Option<u32>,
    #[arg(long, global = true)]
    width: Option<u32>,
    #[arg(long, global = true)]
    height: Option<u32>,
    /// Four character code of the codec to keep clips in
    #[arg(long, global = true)]
    codec: Option<String>,
    /// External encoder binary
    #[arg(long, global = true)]
    encoder: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe which codecs can be written natively or through the encoder
    Probe,
    /// Record one clip from the camera
    Record {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(short, long)]
        seconds: Option<u64>,
        /// Throw the clip away instead of keeping it
        #[arg(long, default_value_t = false)]
        discard: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    if let Some(dir) = config_path.parent() {
        logger::init(dir);
    }
    logger::info(&format!("Using config {}", config_path.display()));

    match cli.command {
        Commands::Probe => {
            let table = probe(&config)?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Commands::Record { seconds, discard } => {
            record(&config, seconds.map(Duration::from_secs), !discard)?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(camera) = cli.camera {
        config.camera_index = camera;
    }
    if let Some(width) = cli.width {
        config.camera_width = width;
    }
    if let Some(height) = cli.height {
        config.camera_height = height;
    }
    if let Some(codec) = &cli.codec {
        config.video_codec = codec.clone();
    }
    if let Some(encoder) = &cli.encoder {
        config.encoder_path = encoder.clone();
    }
}

#[cfg(feature = "opencv")]
fn backend() -> Result<Arc<dyn VideoBackend>> {
    Ok(Arc::new(skywatch::codec::OpenCvBackend))
}

#[cfg(not(feature = "opencv"))]
fn backend() -> Result<Arc<dyn VideoBackend>> {
    anyhow::bail!("built without the `opencv` feature; no video backend available")
}

#[cfg(feature = "opencv")]
fn open_camera(source: &FrameSource, config: &AppConfig) -> Result<()> {
    source
        .open(config.camera_index, config.camera_width, config.camera_height)
        .with_context(|| format!("opening camera {}", config.camera_index))
}

#[cfg(not(feature = "opencv"))]
fn open_camera(_source: &FrameSource, _config: &AppConfig) -> Result<()> {
    anyhow::bail!("built without the `opencv` feature; no camera available")
}

fn probe(config: &AppConfig) -> Result<CodecTable> {
    let probe = CodecCapabilityProbe::new(backend()?, &config.encoder_path);
    Ok(probe.probe(&default_candidates()))
}

fn record(config: &AppConfig, limit: Option<Duration>, keep: bool) -> Result<()> {
    let codec = config.codec()?;
    let table = probe(config)?;
    let encode_path = table
        .encode_path(codec)
        .ok_or(Error::CodecUnavailable(codec))?;
    println!("Recording {} via {:?}", codec, encode_path);

    let source = Arc::new(FrameSource::new(config.stop_timeout()));
    open_camera(&source, config)?;

    let recorder = Recorder::new(
        Arc::clone(&source),
        backend()?,
        Arc::new(ExternalEncoder::new(&config.encoder_path)),
        Arc::new(JsonRecordingLog::new(config.log_path())),
        config.recorder_settings(encode_path)?,
    )?;
    let events = recorder.subscribe();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    recorder.setup(source.latest_frame())?;
    let started = Instant::now();
    while running.load(Ordering::SeqCst) && limit.map_or(true, |limit| started.elapsed() < limit)
    {
        std::thread::sleep(Duration::from_millis(50));
    }
    recorder.stop_recording(keep)?;

    // transcode jobs outlive the session
    while !recorder.is_at_rest() {
        if let Ok(event) = events.recv_timeout(Duration::from_millis(200)) {
            print_event(&event);
        }
    }
    for event in events.try_iter() {
        print_event(&event);
    }

    drop(recorder);
    source.stop();
    Ok(())
}

fn print_event(event: &RecorderEvent) {
    match event {
        RecorderEvent::RecordingStarted => println!("Recording started"),
        RecorderEvent::RecordingStopped => println!("Recording stopped"),
        RecorderEvent::LogUpdated(entry) => {
            println!("Saved {} ({}) in {}", entry.date_time, entry.length, entry.pathname)
        }
        RecorderEvent::TranscodeFinished { job, success } => {
            println!("{} finished, success: {}", job, success)
        }
    }
}
