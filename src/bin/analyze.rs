// Inspect what the visualizer hears in a track

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use beat_visualizer::{
    audio::{AudioDecoder, AudioFeatureExtractor, LiveAnalyzer, SymphoniaDecoder},
    config::Config,
};

#[derive(Parser)]
#[command(name = "analyze", version, about = "Print beats, tempo and band energies of an audio file")]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG)
    audio: PathBuf,

    /// Analysis frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also replay the track through the live analyzer
    #[arg(long)]
    live: bool,

    /// Number of beats to list
    #[arg(long, default_value_t = 10)]
    show: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    println!("🎵 Analyzing {:?}", cli.audio);

    let bytes = std::fs::read(&cli.audio).with_context(|| format!("Failed to read {:?}", cli.audio))?;
    let decoder = match cli.audio.extension().and_then(|e| e.to_str()) {
        Some(ext) => SymphoniaDecoder::with_extension_hint(ext),
        None => SymphoniaDecoder::new(),
    };
    let pcm = decoder.decode(&bytes)?;
    println!(
        "   ✅ Decoded: {:.2}s, {} Hz, {} channels",
        pcm.duration(),
        pcm.sample_rate(),
        pcm.channels()
    );

    // Offline pass: exactly what the render pipeline sees
    println!("\n1. Offline feature extraction at {} fps...", cli.fps);
    let extractor = AudioFeatureExtractor::with_config(config.audio.clone());
    let track = extractor.extract(&pcm, cli.fps, pcm.duration())?;
    let (bass, mid, treble) = track.mean_bands();

    println!("   Frames: {}", track.len());
    println!("   Beats detected: {}", track.beat_count());
    println!("   Estimated BPM: {}", track.estimated_bpm);
    println!("   Mean bands: bass {:.3}, mid {:.3}, treble {:.3}", bass, mid, treble);

    println!("   First {} beats:", cli.show);
    for frame in track.frames.iter().filter(|f| f.beat_detected).take(cli.show) {
        println!(
            "     frame {:>6} at {:>7.2}s (bass {:.3})",
            frame.index,
            frame.index as f64 / cli.fps as f64,
            frame.bass
        );
    }

    if cli.live {
        // Simulated playback: one reading per display tick
        println!("\n2. Live analyzer replay...");
        let mut live = LiveAnalyzer::new(&pcm, &config.audio)?;
        let tick_ms = 1000.0 / cli.fps as f64;
        let mut beats = 0;

        for tick in 0..track.len() {
            let position = tick as f64 * tick_ms / 1000.0;
            let frame = live.analyze_with_timestamp(position, tick as f64 * tick_ms)?;
            let detection = live.beat_detection(&frame);
            if detection.is_beat {
                beats += 1;
                if beats <= cli.show {
                    println!(
                        "     beat at {:>7.2}s (strength {:.3}, {} BPM so far)",
                        position, detection.strength, detection.bpm
                    );
                }
            }
        }

        println!("   Live beats: {}", beats);
        println!("   Live BPM: {}", live.estimated_bpm());
    }

    println!("\n🎉 Analysis complete");
    Ok(())
}
