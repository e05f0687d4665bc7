use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use beat_visualizer::{
    audio::{AudioDecoder, AudioFeatureExtractor, SymphoniaDecoder},
    config::Config,
    pipeline::{Progress, RenderPipeline, Resolution},
    styles::{StyleKind, StyleRegistry, StyleRenderer},
    video::{FfmpegEncoder, FfmpegEncoderFactory},
};

#[derive(Parser)]
#[command(
    name = "beat-visualizer",
    version,
    about = "Turn an audio track into a beat-synchronized music video",
    long_about = "Beat Visualizer analyses an audio track frame by frame and renders procedural visuals that react to its beats and frequency bands, then encodes them together with the original audio."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG)
    #[arg(short, long)]
    audio: PathBuf,

    /// Output video file path (or PNG path with --preview-frame)
    #[arg(short, long)]
    output: PathBuf,

    /// Visual style (particle-system, geometric-patterns, waveform-animation, gradient-flow, spectrum-3d, auto)
    #[arg(short, long, default_value = "auto")]
    style: String,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Video bitrate in kbps
    #[arg(long)]
    bitrate: Option<u32>,

    /// Seconds of audio to render (default: the whole track)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render a single frame to a PNG instead of encoding a video
    #[arg(long, value_name = "FRAME")]
    preview_frame: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting Beat Visualizer v{}", env!("CARGO_PKG_VERSION"));
    info!("Audio: {:?}", cli.audio);
    info!("Output: {:?}", cli.output);
    info!("Style: {}", cli.style);

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    let style: StyleKind = cli.style.parse().map_err(|e: beat_visualizer::CompositorError| {
        anyhow::anyhow!(e.user_message())
    })?;

    let mut options = config.generation_options(style);
    options.resolution = Resolution::new(
        cli.width.unwrap_or(options.resolution.width),
        cli.height.unwrap_or(options.resolution.height),
    );
    options.frame_rate = cli.fps.unwrap_or(options.frame_rate);
    options.bitrate_kbps = cli.bitrate.unwrap_or(options.bitrate_kbps);
    options.duration = cli.duration;
    options.validate()?;

    let decoder = match cli.audio.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            if !SymphoniaDecoder::is_format_supported(ext) {
                warn!("Unrecognized audio extension '{}', trying anyway", ext);
            }
            SymphoniaDecoder::with_extension_hint(ext)
        }
        None => SymphoniaDecoder::new(),
    };

    let audio = tokio::fs::read(&cli.audio)
        .await
        .with_context(|| format!("Failed to read {:?}", cli.audio))?;

    if let Some(frame_index) = cli.preview_frame {
        return render_preview(&config, &decoder, &audio, style, options.resolution, options.frame_rate, frame_index, &cli.output);
    }

    if !FfmpegEncoder::check_ffmpeg_available(&config.video.ffmpeg.binary) {
        warn!("{} was not found on PATH; encoding will fail", config.video.ffmpeg.binary);
    }

    let encoders = FfmpegEncoderFactory::new(config.video.ffmpeg.clone());
    let pipeline = RenderPipeline::new(config, Arc::new(decoder), Arc::new(encoders))?;

    let job = pipeline.start(audio, options)?;
    let canceller = job.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling...");
            canceller.cancel();
        }
    });

    let mut last_decile = None;
    let result = job
        .run(move |p: &Progress| {
            let decile = (p.percentage / 10.0).floor() as u32;
            if last_decile != Some(decile) {
                last_decile = Some(decile);
                match p.estimated_time_remaining_ms {
                    Some(ms) if p.current_frame > 0 => info!(
                        "   {:>3.0}% {:?} frame {}/{} (~{:.0}s left)",
                        p.percentage, p.stage, p.current_frame, p.total_frames, ms as f64 / 1000.0
                    ),
                    _ => info!("   {:>3.0}% {:?}", p.percentage, p.stage),
                }
            }
        })
        .await;

    let output = match result {
        Ok(output) => output,
        Err(e) if e.is_cancellation() => {
            info!("Render cancelled; no output written");
            return Ok(());
        }
        Err(e) => anyhow::bail!(e.user_message()),
    };

    tokio::fs::write(&cli.output, &output.video)
        .await
        .with_context(|| format!("Failed to write {:?}", cli.output))?;

    let sidecar = cli.output.with_extension("meta.toml");
    let metadata = toml::to_string_pretty(&output.metadata)?;
    tokio::fs::write(&sidecar, metadata).await?;

    info!("Output saved to: {:?}", cli.output);
    info!("Metadata saved to: {:?}", sidecar);
    info!(
        "{} frames, {:.1}s, {} BPM, {}KB",
        output.metadata.frame_count,
        output.metadata.duration,
        output.metadata.estimated_bpm,
        output.metadata.file_size / 1024
    );
    Ok(())
}

/// Render frames up to `frame_index` and save the last one as a PNG
#[allow(clippy::too_many_arguments)]
fn render_preview(
    config: &Config,
    decoder: &SymphoniaDecoder,
    audio: &[u8],
    style: StyleKind,
    resolution: Resolution,
    frame_rate: u32,
    frame_index: usize,
    output: &Path,
) -> Result<()> {
    info!("Rendering preview of frame {}", frame_index);

    let pcm = decoder.decode(audio)?;
    let duration = ((frame_index + 1) as f64 / frame_rate as f64).min(pcm.duration());
    let track = AudioFeatureExtractor::with_config(config.audio.clone()).extract(&pcm, frame_rate, duration)?;
    if frame_index >= track.len() {
        anyhow::bail!(
            "Frame {} is past the end of the track ({} frames)",
            frame_index,
            track.len()
        );
    }

    let registry = StyleRegistry::new(config.render.style.clone());
    let mut renderer = StyleRenderer::new(registry.create(style)?, resolution.width, resolution.height, frame_rate)?;

    // Stateful styles need every earlier frame to reach the requested one
    let mut last = None;
    for features in &track.frames[..=frame_index] {
        last = Some(renderer.render_frame(features.index, features)?);
    }

    let frame = last.context("No frame rendered")?;
    frame.save_png(output)?;
    info!("Preview saved to: {:?}", output);
    Ok(())
}
