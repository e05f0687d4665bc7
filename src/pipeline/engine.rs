use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    audio::{AudioDecoder, AudioFeatureExtractor, FeatureTrack, PcmBuffer, SymphoniaDecoder},
    config::Config,
    error::{AudioError, CompositorError, PipelineError, Result},
    pipeline::{
        job::{lock, JobHandle},
        options::{GenerationOptions, RenderOutput, VideoMetadata},
        progress::{JobState, Progress, ProgressSink, ProgressTracker},
    },
    styles::{AutoSchedule, StyleRegistry, StyleRenderer},
    video::{AudioTrack, EncodeSettings, EncodedVideo, EncoderFactory, FfmpegEncoderFactory, VideoEncoder},
};

/// Audio-to-video render pipeline
///
/// Runs one job at a time through three stages:
/// 1. Analyzing - decode the audio and extract one feature frame per video frame
/// 2. Rendering - draw every frame in index order and stream it to the encoder
/// 3. Encoding - flush the encoder and mux the original audio
///
/// Clones share the same active-job slot, so a second `start` on any clone
/// fails with [`PipelineError::Busy`] until the running job finishes.
#[derive(Clone)]
pub struct RenderPipeline {
    config: Config,
    decoder: Arc<dyn AudioDecoder>,
    encoders: Arc<dyn EncoderFactory>,
    registry: Arc<StyleRegistry>,
    active: Arc<Mutex<Option<JobHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl RenderPipeline {
    /// Create a pipeline around the given decode and encode collaborators
    pub fn new(config: Config, decoder: Arc<dyn AudioDecoder>, encoders: Arc<dyn EncoderFactory>) -> Result<Self> {
        config.validate()?;
        let registry = StyleRegistry::new(config.render.style.clone());

        Ok(Self {
            config,
            decoder,
            encoders,
            registry: Arc::new(registry),
            active: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Pipeline using symphonia for decoding and ffmpeg for encoding
    pub fn with_defaults(config: Config) -> Result<Self> {
        let encoders = FfmpegEncoderFactory::new(config.video.ffmpeg.clone());
        Self::new(config, Arc::new(SymphoniaDecoder::new()), Arc::new(encoders))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// State of the active job, or `Idle`
    pub fn state(&self) -> JobState {
        lock(&self.active)
            .as_ref()
            .map(JobHandle::state)
            .unwrap_or(JobState::Idle)
    }

    pub fn active_job(&self) -> Option<JobHandle> {
        lock(&self.active).clone()
    }

    /// Claim the pipeline for a new job
    ///
    /// Fails fast with `Busy` while another job is active, before the
    /// options are even looked at.
    pub fn start(&self, audio: Vec<u8>, options: GenerationOptions) -> Result<RenderJob> {
        let mut slot = lock(&self.active);
        if let Some(active) = slot.as_ref() {
            return Err(PipelineError::Busy { state: active.state() }.into());
        }

        options.validate()?;

        let handle = JobHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed), JobState::Analyzing);
        *slot = Some(handle.clone());
        drop(slot);

        debug!("Render job {} claimed the pipeline", handle.id());

        Ok(RenderJob {
            pipeline: self.clone(),
            handle,
            audio: Arc::new(audio),
            options,
            frames_rendered: 0,
        })
    }

    /// `start` followed by `run`
    pub async fn generate<S: ProgressSink>(
        &self,
        audio: Vec<u8>,
        options: GenerationOptions,
        sink: S,
    ) -> Result<RenderOutput> {
        self.start(audio, options)?.run(sink).await
    }
}

/// A claimed render job, ready to run
///
/// Dropping a job that has not reached a terminal state marks it cancelled
/// and frees the pipeline.
pub struct RenderJob {
    pipeline: RenderPipeline,
    handle: JobHandle,
    audio: Arc<Vec<u8>>,
    options: GenerationOptions,
    frames_rendered: usize,
}

impl RenderJob {
    pub fn handle(&self) -> JobHandle {
        self.handle.clone()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Run every stage to completion, cancellation or failure
    ///
    /// The final notification always carries the terminal stage.
    pub async fn run<S: ProgressSink>(mut self, mut sink: S) -> Result<RenderOutput> {
        let mut tracker = ProgressTracker::new();

        info!("🎬 Starting render job {}", self.handle.id());
        info!("   Style: {}", self.options.style);
        info!(
            "   Output: {}x{} @ {}fps, {}kbps",
            self.options.resolution.width,
            self.options.resolution.height,
            self.options.frame_rate,
            self.options.bitrate_kbps
        );

        let result = self.execute(&mut sink, &mut tracker).await;

        let terminal = match &result {
            Ok(output) => {
                info!(
                    "🎉 Render complete: {} frames, {}KB",
                    output.metadata.frame_count,
                    output.metadata.file_size / 1024
                );
                JobState::Complete
            }
            Err(e) if e.is_cancellation() => {
                info!("🛑 Render cancelled after {} frames", self.frames_rendered);
                JobState::Cancelled
            }
            Err(e) => {
                warn!("Render job {} failed: {}", self.handle.id(), e);
                JobState::Error
            }
        };

        self.handle.set_state(terminal);
        let progress = tracker.event(terminal, self.frames_rendered, 1, 1);
        self.report(&mut sink, &progress);
        self.release();

        result
    }

    async fn execute<S: ProgressSink>(&mut self, sink: &mut S, tracker: &mut ProgressTracker) -> Result<RenderOutput> {
        let track = self.analyze(sink, tracker).await?;

        info!("🎨 Step 2: Rendering {} frames...", track.len());
        self.handle.set_state(JobState::Rendering);

        let settings = EncodeSettings {
            width: self.options.resolution.width,
            height: self.options.resolution.height,
            frame_rate: self.options.frame_rate,
            bitrate_kbps: self.options.bitrate_kbps,
        };
        let mut encoder = self.pipeline.encoders.create_encoder(&settings)?;

        let begun = encoder.begin(AudioTrack {
            bytes: self.audio.as_slice(),
            duration: track.duration,
        });
        if let Err(e) = begun {
            encoder.abort();
            return Err(e);
        }

        if let Err(e) = self.render(encoder.as_mut(), &track, sink, tracker).await {
            encoder.abort();
            return Err(e);
        }
        info!("   ✅ Rendered {} frames", self.frames_rendered);

        if self.handle.is_cancel_requested() {
            encoder.abort();
            return Err(self.cancelled());
        }

        info!("📼 Step 3: Encoding video...");
        self.handle.set_state(JobState::Encoding);
        let progress = tracker.event(JobState::Encoding, self.frames_rendered, 0, 1);
        self.report(sink, &progress);

        let encoded = finalize(encoder).await?;
        info!("   ✅ Encoded {} frames with {}", encoded.frame_count, encoded.codec);

        let metadata = VideoMetadata {
            duration: track.duration,
            width: settings.width,
            height: settings.height,
            frame_rate: settings.frame_rate,
            bitrate: settings.bitrate_kbps,
            file_size: encoded.file_size,
            style: self.options.style,
            created_at: Utc::now(),
            frame_count: encoded.frame_count,
            estimated_bpm: track.estimated_bpm,
            codec: encoded.codec,
        };

        Ok(RenderOutput {
            video: encoded.bytes,
            metadata,
        })
    }

    /// Decode and extract the feature track
    async fn analyze<S: ProgressSink>(&mut self, sink: &mut S, tracker: &mut ProgressTracker) -> Result<FeatureTrack> {
        info!("🎵 Step 1: Analyzing audio...");
        let progress = tracker.event(JobState::Analyzing, 0, 0, 1);
        self.report(sink, &progress);

        let pcm = self.decode().await?;
        if self.handle.is_cancel_requested() {
            return Err(self.cancelled());
        }

        let track_duration = pcm.duration();
        let duration = self
            .options
            .duration
            .map_or(track_duration, |requested| requested.min(track_duration));
        if duration < track_duration {
            debug!("Rendering the first {:.2}s of {:.2}s", duration, track_duration);
        } else if self.options.duration.is_some_and(|d| d > track_duration) {
            debug!("Requested duration clamped to the track length {:.2}s", track_duration);
        }

        info!(
            "   Loaded: {:.1}s, {} Hz, {} channels",
            track_duration,
            pcm.sample_rate(),
            pcm.channels()
        );

        let extractor = AudioFeatureExtractor::with_config(self.pipeline.config.audio.clone());
        let mut session = extractor.session(&pcm, self.options.frame_rate, duration)?;
        drop(pcm);

        let total = session.total_frames();
        tracker.set_total_frames(total);

        loop {
            let (returned, step) = tokio::task::spawn_blocking(move || {
                let step = session.next_chunk();
                (session, step)
            })
            .await
            .map_err(|e| PipelineError::JobFailed {
                reason: format!("Analysis task failed: {}", e),
            })?;
            session = returned;

            let Some(done) = step? else { break };
            let progress = tracker.event(JobState::Analyzing, 0, done, total);
            self.report(sink, &progress);

            if self.handle.is_cancel_requested() {
                return Err(self.cancelled());
            }
            tokio::task::yield_now().await;
        }

        let track = session.finish();
        info!("   ✅ Analysis complete:");
        info!("      Frames: {}", track.len());
        info!("      Beats detected: {}", track.beat_count());
        info!("      BPM: {}", track.estimated_bpm);

        Ok(track)
    }

    async fn decode(&self) -> Result<PcmBuffer> {
        let decoder = Arc::clone(&self.pipeline.decoder);
        let audio = Arc::clone(&self.audio);

        let pcm = tokio::task::spawn_blocking(move || decoder.decode(audio.as_slice()))
            .await
            .map_err(|e| PipelineError::JobFailed {
                reason: format!("Decode task failed: {}", e),
            })??;

        if pcm.frame_count() == 0 || pcm.sample_rate() == 0 {
            return Err(AudioError::Decode {
                reason: "audio contains no samples".to_string(),
            }
            .into());
        }
        Ok(pcm)
    }

    /// Draw frames in index order and hand each to the encoder
    async fn render<S: ProgressSink>(
        &mut self,
        encoder: &mut dyn VideoEncoder,
        track: &FeatureTrack,
        sink: &mut S,
        tracker: &mut ProgressTracker,
    ) -> Result<()> {
        let render_config = &self.pipeline.config.render;
        let batch = render_config.effective_parallel_frames();
        let yield_every = render_config.yield_every.max(1);

        let style = self.pipeline.registry.create(self.options.style)?;
        let mut renderer = StyleRenderer::new(
            style,
            self.options.resolution.width,
            self.options.resolution.height,
            self.options.frame_rate,
        )?;
        let schedule = if self.options.style.is_auto() {
            Some(AutoSchedule::new(&render_config.style.auto)?)
        } else {
            None
        };
        if batch > 1 && !renderer.is_frame_local() {
            debug!("{} is not frame-local, rendering sequentially", renderer.kind());
        }

        let total = track.len();
        let progress = tracker.event(JobState::Rendering, 0, 0, total);
        self.report(sink, &progress);

        let mut next = 0;
        let mut since_yield = 0;
        while next < total {
            if self.handle.is_cancel_requested() {
                return Err(self.cancelled());
            }

            let end = (next + batch).min(total);
            let frames = if end - next == 1 {
                vec![renderer.render_frame(next, &track.frames[next])?]
            } else {
                renderer.render_batch(next, &track.frames[next..end])?
            };

            // A cancel lets at most the frame in flight through
            for frame in frames {
                if self.handle.is_cancel_requested() {
                    return Err(self.cancelled());
                }
                encoder.write_frame(frame)?;
                self.frames_rendered += 1;
            }
            since_yield += end - next;
            next = end;

            let mut progress = tracker.event(JobState::Rendering, end, end, total);
            progress.current_style = Some(
                schedule
                    .as_ref()
                    .map_or(self.options.style, |schedule| schedule.kind_at(end - 1)),
            );
            self.report(sink, &progress);

            if since_yield >= yield_every {
                since_yield = 0;
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    fn report<S: ProgressSink>(&self, sink: &mut S, progress: &Progress) {
        self.handle.set_progress(progress);
        sink.report(progress);
    }

    fn cancelled(&self) -> CompositorError {
        PipelineError::Cancelled {
            frames_rendered: self.frames_rendered,
        }
        .into()
    }

    fn release(&self) {
        let mut slot = lock(&self.pipeline.active);
        if slot.as_ref().is_some_and(|active| active.same_job(&self.handle)) {
            *slot = None;
        }
    }
}

impl Drop for RenderJob {
    fn drop(&mut self) {
        if !self.handle.state().is_terminal() {
            self.handle.cancel();
            self.handle.set_state(JobState::Cancelled);
        }
        self.release();
    }
}

/// Flush the encoder off the async executor, aborting it on failure
async fn finalize(encoder: Box<dyn VideoEncoder>) -> Result<EncodedVideo> {
    let (mut encoder, result) = tokio::task::spawn_blocking(move || {
        let mut encoder = encoder;
        let result = encoder.finalize();
        (encoder, result)
    })
    .await
    .map_err(|e| PipelineError::JobFailed {
        reason: format!("Encoding task failed: {}", e),
    })?;

    if result.is_err() {
        encoder.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StyleError, VideoError};
    use crate::pipeline::{NoProgress, Resolution};
    use crate::styles::StyleKind;
    use crate::video::Frame;

    #[derive(Debug, Default)]
    struct EncoderLog {
        begun: bool,
        frames: usize,
        finalized: bool,
        aborted: bool,
        /// Cancel this job once the given number of frames is written
        cancel_after: Option<(usize, JobHandle)>,
    }

    struct RecordingFactory {
        log: Arc<Mutex<EncoderLog>>,
        fail_at: Option<usize>,
    }

    struct RecordingEncoder {
        log: Arc<Mutex<EncoderLog>>,
        fail_at: Option<usize>,
        bytes: Vec<u8>,
    }

    impl EncoderFactory for RecordingFactory {
        fn create_encoder(&self, _settings: &EncodeSettings) -> Result<Box<dyn VideoEncoder>> {
            Ok(Box::new(RecordingEncoder {
                log: Arc::clone(&self.log),
                fail_at: self.fail_at,
                bytes: Vec::new(),
            }))
        }
    }

    impl VideoEncoder for RecordingEncoder {
        fn begin(&mut self, audio: AudioTrack<'_>) -> Result<()> {
            assert!(!audio.bytes.is_empty());
            self.log.lock().unwrap().begun = true;
            Ok(())
        }

        fn write_frame(&mut self, frame: Frame) -> Result<()> {
            let mut log = self.log.lock().unwrap();
            if self.fail_at == Some(log.frames) {
                return Err(VideoError::Encode {
                    reason: "disk full".to_string(),
                }
                .into());
            }
            log.frames += 1;
            if let Some((count, handle)) = &log.cancel_after {
                if *count == log.frames {
                    handle.cancel();
                }
            }
            self.bytes.extend_from_slice(&frame.as_rgb_bytes()[..3]);
            Ok(())
        }

        fn finalize(&mut self) -> Result<EncodedVideo> {
            let mut log = self.log.lock().unwrap();
            log.finalized = true;
            Ok(EncodedVideo {
                file_size: self.bytes.len() as u64,
                bytes: std::mem::take(&mut self.bytes),
                frame_count: log.frames,
                codec: "recording".to_string(),
            })
        }

        fn abort(&mut self) {
            self.bytes.clear();
            self.log.lock().unwrap().aborted = true;
        }
    }

    /// Returns the same PCM for any input
    struct FixedDecoder(PcmBuffer);

    impl AudioDecoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<PcmBuffer> {
            Ok(self.0.clone())
        }
    }

    struct RejectingDecoder;

    impl AudioDecoder for RejectingDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<PcmBuffer> {
            Err(AudioError::Decode {
                reason: "unrecognized container".to_string(),
            }
            .into())
        }
    }

    /// Two seconds at 8 kHz with a click every half second
    fn clicks() -> PcmBuffer {
        let samples = (0..16000)
            .map(|i| {
                if i % 4000 < 200 {
                    ((i as f32) * 0.3).sin() * 0.8
                } else {
                    0.0
                }
            })
            .collect();
        PcmBuffer::new(samples, 8000, 1)
    }

    fn options(style: StyleKind) -> GenerationOptions {
        GenerationOptions {
            style,
            resolution: Resolution::new(32, 18),
            frame_rate: 10,
            bitrate_kbps: 500,
            duration: None,
        }
    }

    fn pipeline_with(
        config: Config,
        decoder: Arc<dyn AudioDecoder>,
        fail_at: Option<usize>,
    ) -> (RenderPipeline, Arc<Mutex<EncoderLog>>) {
        let log = Arc::new(Mutex::new(EncoderLog::default()));
        let factory = RecordingFactory {
            log: Arc::clone(&log),
            fail_at,
        };
        let pipeline = RenderPipeline::new(config, decoder, Arc::new(factory)).unwrap();
        (pipeline, log)
    }

    fn pipeline(fail_at: Option<usize>) -> (RenderPipeline, Arc<Mutex<EncoderLog>>) {
        pipeline_with(Config::default(), Arc::new(FixedDecoder(clicks())), fail_at)
    }

    #[tokio::test]
    async fn test_complete_job_metadata() {
        let (pipeline, log) = pipeline(None);
        let output = pipeline
            .generate(vec![1, 2, 3], options(StyleKind::GradientFlow), NoProgress)
            .await
            .unwrap();

        let metadata = &output.metadata;
        assert_eq!(metadata.frame_count, 20);
        assert_eq!((metadata.width, metadata.height), (32, 18));
        assert_eq!(metadata.frame_rate, 10);
        assert_eq!(metadata.bitrate, 500);
        assert_eq!(metadata.style, StyleKind::GradientFlow);
        assert_eq!(metadata.codec, "recording");
        assert!((metadata.duration - 2.0).abs() < 1e-9);
        assert_eq!(metadata.file_size, output.video.len() as u64);
        assert_eq!(output.video.len(), 60);

        let log = log.lock().unwrap();
        assert!(log.begun && log.finalized && !log.aborted);
        assert_eq!(pipeline.state(), JobState::Idle);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_within_stage_ranges() {
        let (pipeline, _log) = pipeline(None);
        let mut events: Vec<Progress> = Vec::new();
        pipeline
            .generate(vec![0], options(StyleKind::Auto), |p: &Progress| events.push(p.clone()))
            .await
            .unwrap();

        for pair in events.windows(2) {
            assert!(pair[1].percentage >= pair[0].percentage);
        }
        for event in &events {
            let (lo, hi) = event.stage.percentage_range();
            assert!(event.percentage >= lo && event.percentage <= hi, "{:?}", event);
        }

        let stages: Vec<JobState> = events.iter().map(|p| p.stage).collect();
        assert_eq!(stages.first(), Some(&JobState::Analyzing));
        assert!(stages.contains(&JobState::Rendering));
        assert!(stages.contains(&JobState::Encoding));
        assert_eq!(stages.last(), Some(&JobState::Complete));
        assert_eq!(events.last().map(|p| p.percentage), Some(100.0));

        let rendered: Vec<usize> = events
            .iter()
            .filter(|p| p.stage == JobState::Rendering)
            .map(|p| p.current_frame)
            .collect();
        assert_eq!(rendered, (0..=20).collect::<Vec<_>>());
        assert!(events
            .iter()
            .filter(|p| p.stage == JobState::Rendering && p.current_frame > 0)
            .all(|p| p.current_style == Some(StyleKind::ParticleSystem)));
    }

    #[tokio::test]
    async fn test_cancel_stops_at_frame_boundary() {
        let (pipeline, log) = pipeline(None);
        let job = pipeline.start(vec![0], options(StyleKind::ParticleSystem)).unwrap();
        let handle = job.handle();
        let canceller = handle.clone();

        let mut last_stage = JobState::Idle;
        let result = job
            .run(|p: &Progress| {
                if p.stage == JobState::Rendering && p.current_frame == 5 {
                    canceller.cancel();
                }
                last_stage = p.stage;
            })
            .await;

        let err = result.err().unwrap();
        assert!(err.is_cancellation());
        assert_eq!(last_stage, JobState::Cancelled);
        assert_eq!(handle.state(), JobState::Cancelled);

        let log = log.lock().unwrap();
        assert_eq!(log.frames, 5);
        assert!(log.aborted);
        assert!(!log.finalized);
        assert_eq!(pipeline.state(), JobState::Idle);
    }

    #[tokio::test]
    async fn test_parallel_batch_stops_at_next_frame_after_cancel() {
        let mut config = Config::default();
        config.render.parallel_frames = 4;
        let (pipeline, log) = pipeline_with(config, Arc::new(FixedDecoder(clicks())), None);

        let job = pipeline.start(vec![0], options(StyleKind::Spectrum3d)).unwrap();
        // Cancel lands while the second batch is being written
        log.lock().unwrap().cancel_after = Some((5, job.handle()));
        let err = job.run(NoProgress).await.err().unwrap();

        assert!(matches!(
            err,
            CompositorError::Pipeline(PipelineError::Cancelled { frames_rendered: 5 })
        ));
        let log = log.lock().unwrap();
        assert_eq!(log.frames, 5);
        assert!(log.aborted);
    }

    #[tokio::test]
    async fn test_parallel_batches_cancel_between_batches() {
        let mut config = Config::default();
        config.render.parallel_frames = 4;
        let (pipeline, log) = pipeline_with(config, Arc::new(FixedDecoder(clicks())), None);

        let job = pipeline.start(vec![0], options(StyleKind::Spectrum3d)).unwrap();
        let handle = job.handle();
        let result = job
            .run(move |p: &Progress| {
                if p.stage == JobState::Rendering && p.current_frame >= 6 {
                    handle.cancel();
                }
            })
            .await;

        assert!(result.err().unwrap().is_cancellation());
        assert_eq!(log.lock().unwrap().frames, 8);
    }

    #[tokio::test]
    async fn test_second_start_is_busy() {
        let (pipeline, _log) = pipeline(None);
        let job = pipeline.start(vec![0], options(StyleKind::GradientFlow)).unwrap();
        let other = pipeline.clone();
        let mut busy = None;

        job.run(|p: &Progress| {
            if p.stage == JobState::Rendering && busy.is_none() {
                busy = Some(matches!(
                    other.start(vec![0], GenerationOptions::default()),
                    Err(CompositorError::Pipeline(PipelineError::Busy {
                        state: JobState::Rendering
                    }))
                ));
            }
        })
        .await
        .unwrap();

        assert_eq!(busy, Some(true));
        assert_eq!(pipeline.state(), JobState::Idle);
        assert!(pipeline.start(vec![0], GenerationOptions::default()).is_ok());
    }

    #[tokio::test]
    async fn test_busy_is_checked_before_options() {
        let (pipeline, _log) = pipeline(None);
        let _job = pipeline.start(vec![0], options(StyleKind::GradientFlow)).unwrap();
        assert_eq!(pipeline.state(), JobState::Analyzing);

        let invalid = GenerationOptions {
            frame_rate: 0,
            ..Default::default()
        };
        assert!(matches!(
            pipeline.start(vec![0], invalid),
            Err(CompositorError::Pipeline(PipelineError::Busy { .. }))
        ));
    }

    #[tokio::test]
    async fn test_dropping_an_unrun_job_frees_the_pipeline() {
        let (pipeline, _log) = pipeline(None);
        let job = pipeline.start(vec![0], options(StyleKind::GradientFlow)).unwrap();
        let handle = job.handle();
        assert!(pipeline.active_job().is_some());

        drop(job);
        assert_eq!(handle.state(), JobState::Cancelled);
        assert!(pipeline.active_job().is_none());
    }

    #[tokio::test]
    async fn test_encode_error_fails_the_job() {
        let (pipeline, log) = pipeline(Some(3));
        let job = pipeline.start(vec![0], options(StyleKind::WaveformAnimation)).unwrap();
        let handle = job.handle();

        let err = job.run(NoProgress).await.err().unwrap();
        assert!(matches!(err, CompositorError::Video(VideoError::Encode { .. })));
        assert!(!err.is_cancellation());
        assert_eq!(handle.state(), JobState::Error);
        assert_eq!(handle.progress().map(|p| p.stage), Some(JobState::Error));

        let log = log.lock().unwrap();
        assert_eq!(log.frames, 3);
        assert!(log.aborted);
    }

    #[tokio::test]
    async fn test_decode_error_happens_before_any_frame() {
        let (pipeline, log) = pipeline_with(Config::default(), Arc::new(RejectingDecoder), None);
        let err = pipeline
            .generate(b"not audio".to_vec(), options(StyleKind::Auto), NoProgress)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, CompositorError::Audio(AudioError::Decode { .. })));
        let log = log.lock().unwrap();
        assert!(!log.begun);
        assert_eq!(log.frames, 0);
    }

    #[tokio::test]
    async fn test_non_finite_audio_is_a_render_error() {
        let pcm = PcmBuffer::new(vec![f32::NAN; 8000], 8000, 1);
        let (pipeline, log) = pipeline_with(Config::default(), Arc::new(FixedDecoder(pcm)), None);
        let err = pipeline
            .generate(vec![0], options(StyleKind::GeometricPatterns), NoProgress)
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            CompositorError::Style(StyleError::Render { frame: 0, .. })
        ));
        assert!(log.lock().unwrap().aborted);
    }

    #[tokio::test]
    async fn test_duration_is_clamped_to_the_track() {
        let (pipeline, _log) = pipeline(None);

        let long = GenerationOptions {
            duration: Some(10.0),
            ..options(StyleKind::GradientFlow)
        };
        let output = pipeline.generate(vec![0], long, NoProgress).await.unwrap();
        assert_eq!(output.metadata.frame_count, 20);

        let short = GenerationOptions {
            duration: Some(0.55),
            ..options(StyleKind::GradientFlow)
        };
        let output = pipeline.generate(vec![0], short, NoProgress).await.unwrap();
        assert_eq!(output.metadata.frame_count, 6);
        assert!((output.metadata.duration - 0.55).abs() < 1e-9);
    }
}
