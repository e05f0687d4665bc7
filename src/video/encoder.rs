use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::types::Frame;

/// Output stream parameters handed to an encoder factory
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate_kbps: u32,
}

impl EncodeSettings {
    /// Bytes of one RGB24 frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// The original audio, to be muxed alongside the video
#[derive(Debug, Clone, Copy)]
pub struct AudioTrack<'a> {
    pub bytes: &'a [u8],
    pub duration: f64,
}

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub bytes: Vec<u8>,
    pub file_size: u64,
    pub frame_count: usize,
    pub codec: String,
}

/// Incremental video encoder
///
/// Frames arrive in index order after `begin`; `finalize` flushes and muxes,
/// `abort` discards everything written so far.
pub trait VideoEncoder: Send {
    fn begin(&mut self, audio: AudioTrack<'_>) -> Result<()>;

    fn write_frame(&mut self, frame: Frame) -> Result<()>;

    fn finalize(&mut self) -> Result<EncodedVideo>;

    fn abort(&mut self);
}

/// Creates one encoder per render job
pub trait EncoderFactory: Send + Sync {
    fn create_encoder(&self, settings: &EncodeSettings) -> Result<Box<dyn VideoEncoder>>;
}

/// ffmpeg invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegOptions {
    /// ffmpeg executable name or path
    pub binary: String,

    /// Video codec passed to `-c:v`
    pub codec: String,

    /// Encoder preset, if the codec supports one
    pub preset: Option<String>,

    /// Output pixel format
    pub pixel_format: String,

    /// AAC bitrate for the muxed audio
    pub audio_bitrate_kbps: u32,
}

impl Default for FfmpegOptions {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            codec: "libx264".to_string(),
            preset: Some("medium".to_string()),
            pixel_format: "yuv420p".to_string(),
            audio_bitrate_kbps: 192,
        }
    }
}

/// Builds [`FfmpegEncoder`]s
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoderFactory {
    options: FfmpegOptions,
}

impl FfmpegEncoderFactory {
    pub fn new(options: FfmpegOptions) -> Self {
        Self { options }
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn create_encoder(&self, settings: &EncodeSettings) -> Result<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegEncoder::new(settings.clone(), self.options.clone())?))
    }
}

static ENCODER_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Streams raw RGB24 frames into an ffmpeg child process
///
/// The audio is staged in a private temporary directory so ffmpeg can mux
/// it; the finished MP4 is read back into memory and the directory removed.
pub struct FfmpegEncoder {
    settings: EncodeSettings,
    options: FfmpegOptions,
    work_dir: Option<PathBuf>,
    child: Option<Child>,
    frames_written: usize,
}

impl FfmpegEncoder {
    pub fn new(settings: EncodeSettings, options: FfmpegOptions) -> Result<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(VideoError::InvalidParameters {
                details: format!("Invalid resolution {}x{}", settings.width, settings.height),
            }
            .into());
        }

        // yuv420p needs even dimensions
        if settings.width % 2 != 0 || settings.height % 2 != 0 {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "Resolution must be even in both dimensions, got {}x{}",
                    settings.width, settings.height
                ),
            }
            .into());
        }

        if settings.frame_rate == 0 || settings.bitrate_kbps == 0 {
            return Err(VideoError::InvalidParameters {
                details: "Frame rate and bitrate must be positive".to_string(),
            }
            .into());
        }

        Ok(Self {
            settings,
            options,
            work_dir: None,
            child: None,
            frames_written: 0,
        })
    }

    pub fn check_ffmpeg_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn ensure_work_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.work_dir {
            return Ok(dir.clone());
        }

        let dir = std::env::temp_dir().join(format!(
            "beat_visualizer_{}_{}",
            std::process::id(),
            ENCODER_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir)?;
        self.work_dir = Some(dir.clone());
        Ok(dir)
    }

    fn output_path(dir: &std::path::Path) -> PathBuf {
        dir.join("output.mp4")
    }

    fn build_args(&self, audio_path: &std::path::Path, output_path: &std::path::Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-loglevel".into(), "error".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgb24".into(),
            "-video_size".into(), format!("{}x{}", self.settings.width, self.settings.height),
            "-framerate".into(), self.settings.frame_rate.to_string(),
            "-i".into(), "pipe:0".into(),
            "-i".into(), audio_path.display().to_string(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-c:v".into(), self.options.codec.clone(),
            "-pix_fmt".into(), self.options.pixel_format.clone(),
            "-b:v".into(), format!("{}k", self.settings.bitrate_kbps),
        ];

        if let Some(preset) = &self.options.preset {
            args.extend(["-preset".to_string(), preset.clone()]);
        }

        args.extend([
            "-c:a".into(), "aac".into(),
            "-b:a".into(), format!("{}k", self.options.audio_bitrate_kbps),
            "-shortest".into(),
            "-movflags".into(), "+faststart".into(),
            output_path.display().to_string(),
        ]);

        args
    }

    fn ffmpeg_log(&self) -> String {
        self.work_dir
            .as_ref()
            .and_then(|dir| fs::read_to_string(dir.join("ffmpeg.log")).ok())
            .map(|log| log.trim().to_string())
            .unwrap_or_default()
    }

    fn cleanup(&mut self) {
        if let Some(dir) = self.work_dir.take() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!("Failed to remove temporary directory {}: {}", dir.display(), e);
            }
        }
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn begin(&mut self, audio: AudioTrack<'_>) -> Result<()> {
        if self.child.is_some() {
            return Err(VideoError::Encode {
                reason: "Encoder already started".to_string(),
            }
            .into());
        }

        if !Self::check_ffmpeg_available(&self.options.binary) {
            return Err(VideoError::Encode {
                reason: format!("{} not found. Please install FFmpeg.", self.options.binary),
            }
            .into());
        }

        let dir = self.ensure_work_dir()?;
        let audio_path = dir.join("audio.input");
        fs::write(&audio_path, audio.bytes)?;
        let log = File::create(dir.join("ffmpeg.log"))?;

        let args = self.build_args(&audio_path, &Self::output_path(&dir));
        debug!("Spawning {} {}", self.options.binary, args.join(" "));

        let child = Command::new(&self.options.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|e| VideoError::Encode {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        info!(
            "FFmpeg encoder started: {}x{} @ {}fps, {} at {}kbps, {:.1}s of audio",
            self.settings.width,
            self.settings.height,
            self.settings.frame_rate,
            self.options.codec,
            self.settings.bitrate_kbps,
            audio.duration
        );

        self.child = Some(child);
        self.frames_written = 0;
        Ok(())
    }

    fn write_frame(&mut self, frame: Frame) -> Result<()> {
        if frame.width() != self.settings.width || frame.height() != self.settings.height {
            return Err(VideoError::Encode {
                reason: format!(
                    "Frame is {}x{}, encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.settings.width,
                    self.settings.height
                ),
            }
            .into());
        }

        let stdin = self
            .child
            .as_mut()
            .and_then(|child| child.stdin.as_mut())
            .ok_or_else(|| VideoError::Encode {
                reason: "Encoder not started".to_string(),
            })?;

        if let Err(e) = stdin.write_all(frame.as_rgb_bytes()) {
            let log = self.ffmpeg_log();
            return Err(VideoError::Encode {
                reason: format!("Failed to write frame {} to FFmpeg: {} {}", self.frames_written, e, log),
            }
            .into());
        }

        self.frames_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<EncodedVideo> {
        let mut child = self.child.take().ok_or_else(|| VideoError::Encode {
            reason: "Encoder not started".to_string(),
        })?;

        // Close stdin to signal EOF
        drop(child.stdin.take());

        let status = child.wait().map_err(|e| VideoError::Encode {
            reason: format!("Failed to wait for FFmpeg: {}", e),
        })?;

        if !status.success() {
            let log = self.ffmpeg_log();
            self.cleanup();
            return Err(VideoError::Encode {
                reason: format!("FFmpeg exited with {}: {}", status, log),
            }
            .into());
        }

        let output_path = self
            .work_dir
            .as_deref()
            .map(Self::output_path)
            .ok_or_else(|| VideoError::Encode {
                reason: "Encoder working directory missing".to_string(),
            })?;

        let bytes = fs::read(&output_path).map_err(|e| VideoError::Encode {
            reason: format!("Failed to read encoded output: {}", e),
        });
        self.cleanup();
        let bytes = bytes?;

        info!(
            "FFmpeg encoding complete: {} frames, {}KB",
            self.frames_written,
            bytes.len() / 1024
        );

        Ok(EncodedVideo {
            file_size: bytes.len() as u64,
            bytes,
            frame_count: self.frames_written,
            codec: self.options.codec.clone(),
        })
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            if let Err(e) = child.kill() {
                debug!("FFmpeg already exited: {}", e);
            }
            let _ = child.wait();
            debug!("FFmpeg encoder aborted after {} frames", self.frames_written);
        }
        self.frames_written = 0;
        self.cleanup();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.abort();
    }
}
