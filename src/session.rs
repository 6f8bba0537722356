//! Session driver
//!
//! Pulls frames from the attached source, keys them with a per-frame snapshot
//! of the shared configuration and hands the outputs to a sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{KeyError, Result};
use crate::keying::{Compositor, KeyOutputs, SharedKeyConfig};
use crate::output::FrameSink;
use crate::source::FrameSource;
use crate::telemetry::{FrameProfiler, FrameStats};

/// How often the run loop logs a timing summary
const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

/// Result of a single [`KeySession::run_cycle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame was keyed and written; carries its index
    Processed(u64),
    /// The source had no new frame
    NoFrame,
    /// No source attached, nothing was done
    Skipped,
    /// The source delivered a zero-sized frame, which was discarded
    Dropped,
}

/// Counters and timing of a session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub processed: u64,
    pub skipped: u64,
    pub idle: u64,
    /// Frames stretched to the session size before keying
    pub resampled: u64,
    pub dropped: u64,
    /// Keying time per frame
    pub timing: FrameStats,
    pub fps: f64,
}

/// Frame loop tying source, compositor and sink together
pub struct KeySession {
    config: SharedKeyConfig,
    source: Option<Box<dyn FrameSource>>,
    compositor: Compositor,
    profiler: FrameProfiler,
    processed: u64,
    skipped: u64,
    idle: u64,
    resampled: u64,
    dropped: u64,
}

impl KeySession {
    pub fn new(config: SharedKeyConfig) -> Self {
        Self {
            config,
            source: None,
            compositor: Compositor::new(),
            profiler: FrameProfiler::new(),
            processed: 0,
            skipped: 0,
            idle: 0,
            resampled: 0,
            dropped: 0,
        }
    }

    /// Handle for changing sensitivities and backgrounds while running
    pub fn config(&self) -> &SharedKeyConfig {
        &self.config
    }

    /// Start reading from `source`, replacing any previous one
    ///
    /// The new source may deliver a different frame size.
    pub fn attach_source(&mut self, source: Box<dyn FrameSource>) {
        tracing::info!(source = %source.name(), "Frame source attached");
        self.compositor.reset();
        self.source = Some(source);
    }

    pub fn detach_source(&mut self) -> Option<Box<dyn FrameSource>> {
        let source = self.source.take();
        if let Some(source) = &source {
            tracing::info!(source = %source.name(), "Frame source detached");
        }
        source
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Outputs of the last keyed frame
    pub fn last_outputs(&self) -> &KeyOutputs {
        self.compositor.outputs()
    }

    /// Key at most one frame
    pub fn run_cycle(&mut self, sink: &mut dyn FrameSink) -> Result<CycleOutcome> {
        match self.key_next(sink) {
            Ok(CycleOutcome::NoFrame) => {
                self.idle += 1;
                Ok(CycleOutcome::NoFrame)
            }
            Ok(outcome) => Ok(outcome),
            Err(KeyError::NoFrameSource) => {
                self.skipped += 1;
                tracing::debug!(skipped = self.skipped, "Cycle skipped: no frame source");
                Ok(CycleOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    fn key_next(&mut self, sink: &mut dyn FrameSink) -> Result<CycleOutcome> {
        let source = self.source.as_mut().ok_or(KeyError::NoFrameSource)?;
        let Some(mut frame) = source.next_frame()? else {
            return Ok(CycleOutcome::NoFrame);
        };

        if frame.is_empty() {
            self.dropped += 1;
            tracing::warn!(
                width = frame.width,
                height = frame.height,
                dropped = self.dropped,
                "Dropping zero-sized frame"
            );
            return Ok(CycleOutcome::Dropped);
        }

        // Later frames are stretched to the size the session started with
        if let Some((width, height)) = self.compositor.size() {
            if frame.dimensions() != (width, height) {
                self.resampled += 1;
                tracing::warn!(
                    from = ?frame.dimensions(),
                    to = ?(width, height),
                    resampled = self.resampled,
                    "Frame size changed mid-session, resampling"
                );
                frame = frame.resample(width, height)?;
            }
        }

        let config = self.config.snapshot();
        self.profiler.begin_frame();
        let outputs = self.compositor.process(&frame, &config)?;
        self.profiler.end_frame();

        let index = self.processed;
        sink.write(index, outputs)?;
        self.processed += 1;
        tracing::trace!(index, "Frame keyed");
        Ok(CycleOutcome::Processed(index))
    }

    /// Run until `running` is cleared, `max_frames` frames were keyed or a
    /// finite source runs out
    ///
    /// `fps` paces the loop; 0 runs as fast as frames arrive.
    pub fn run(
        &mut self,
        running: &AtomicBool,
        fps: u32,
        max_frames: Option<u64>,
        sink: &mut dyn FrameSink,
    ) -> Result<SessionStats> {
        if self.source.is_none() {
            return Err(KeyError::NoFrameSource);
        }

        let frame_duration = (fps > 0).then(|| Duration::from_nanos(1_000_000_000u64 / fps as u64));
        let mut next_frame_at = Instant::now();
        let mut last_summary = Instant::now();
        let start_count = self.processed;

        tracing::info!(fps, max_frames = ?max_frames, "Keying session started");

        while running.load(Ordering::Acquire) {
            if let Some(frame_duration) = frame_duration {
                let now = Instant::now();
                if now < next_frame_at {
                    std::thread::sleep(next_frame_at - now);
                }
                next_frame_at += frame_duration;

                // Reset if too far behind
                let now_after = Instant::now();
                if now_after > next_frame_at + frame_duration * 2 {
                    next_frame_at = now_after + frame_duration;
                }
            }

            match self.run_cycle(sink)? {
                CycleOutcome::Processed(_) => {
                    if max_frames.is_some_and(|max| self.processed - start_count >= max) {
                        break;
                    }
                }
                CycleOutcome::NoFrame => {
                    if self.source.as_ref().is_some_and(|s| s.is_exhausted()) {
                        tracing::info!("Frame source exhausted");
                        break;
                    }
                    if frame_duration.is_none() {
                        // Live source without pacing: avoid a hot spin
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
                CycleOutcome::Dropped => {}
                CycleOutcome::Skipped => break,
            }

            if last_summary.elapsed() >= SUMMARY_INTERVAL {
                last_summary = Instant::now();
                self.log_summary();
            }
        }

        self.log_summary();
        Ok(self.stats())
    }

    fn log_summary(&self) {
        let timing = self.profiler.stats();
        tracing::info!(
            processed = self.processed,
            skipped = self.skipped,
            idle = self.idle,
            resampled = self.resampled,
            dropped = self.dropped,
            fps = self.profiler.fps(),
            avg_ms = timing.avg_ms,
            p95_ms = timing.p95_ms,
            "Keying summary"
        );
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            processed: self.processed,
            skipped: self.skipped,
            idle: self.idle,
            resampled: self.resampled,
            dropped: self.dropped,
            timing: self.profiler.stats(),
            fps: self.profiler.fps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::keying::{BackgroundImage, HueClass, KeyConfig, Sensitivity};
    use image::{Rgba, RgbaImage};
    use std::collections::VecDeque;
    use std::sync::Arc;

    const BLUE: [u8; 4] = [10, 10, 200, 255];

    /// Finite in-memory source
    struct QueueSource {
        frames: VecDeque<Frame>,
    }

    impl QueueSource {
        fn boxed(frames: impl IntoIterator<Item = Frame>) -> Box<dyn FrameSource> {
            Box::new(Self {
                frames: frames.into_iter().collect(),
            })
        }
    }

    impl FrameSource for QueueSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.pop_front())
        }

        fn name(&self) -> String {
            "queue".to_string()
        }

        fn is_exhausted(&self) -> bool {
            self.frames.is_empty()
        }
    }

    /// Records the combined view of every frame
    #[derive(Default)]
    struct CollectSink {
        frames: Vec<(u64, Frame)>,
    }

    impl FrameSink for CollectSink {
        fn write(&mut self, index: u64, outputs: &KeyOutputs) -> Result<()> {
            self.frames.push((index, outputs.combined().clone()));
            Ok(())
        }
    }

    fn background(rgb: u8) -> Arc<BackgroundImage> {
        let image = RgbaImage::from_pixel(4, 4, Rgba([rgb, rgb, rgb, 255]));
        Arc::new(BackgroundImage::from_rgba(image, "bg").unwrap())
    }

    #[test]
    fn test_cycle_without_source_is_skipped() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        let mut sink = CollectSink::default();
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Skipped);
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Skipped);
        assert!(sink.frames.is_empty());
        assert_eq!(session.stats().skipped, 2);
    }

    #[test]
    fn test_cycles_process_frames() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        let frames = [Frame::filled(2, 2, BLUE), Frame::filled(2, 2, BLUE)];
        session.attach_source(QueueSource::boxed(frames));
        let mut sink = CollectSink::default();

        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Processed(0));
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Processed(1));
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::NoFrame);

        let stats = session.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.timing.sample_count, 2);
        assert_eq!(sink.frames.len(), 2);
    }

    #[test]
    fn test_config_change_applies_to_next_frame() {
        let config = KeyConfig::new().with_background(HueClass::Blue, background(1));
        let shared = SharedKeyConfig::new(config);
        let mut session = KeySession::new(shared.clone());
        let frames = [Frame::filled(2, 2, BLUE), Frame::filled(2, 2, BLUE)];
        session.attach_source(QueueSource::boxed(frames));
        let mut sink = CollectSink::default();

        session.run_cycle(&mut sink).unwrap();
        shared.set_sensitivity(HueClass::Blue, Sensitivity::new(100));
        shared.set_background(HueClass::Blue, Some(background(7)));
        session.run_cycle(&mut sink).unwrap();

        assert_eq!(sink.frames[0].1.pixel(0, 0), Some([1, 1, 1, 255]));
        // b - r = 190 still exceeds 50
        assert_eq!(sink.frames[1].1.pixel(0, 0), Some([7, 7, 7, 255]));
    }

    #[test]
    fn test_reattach_with_new_resolution() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        let mut sink = CollectSink::default();

        session.attach_source(QueueSource::boxed([Frame::filled(4, 4, BLUE)]));
        session.run_cycle(&mut sink).unwrap();
        assert!(session.detach_source().is_some());
        assert!(!session.has_source());

        session.attach_source(QueueSource::boxed([Frame::filled(2, 3, BLUE)]));
        session.run_cycle(&mut sink).unwrap();
        assert_eq!(session.last_outputs().dimensions(), (2, 3));
    }

    #[test]
    fn test_mixed_frame_sizes_are_resampled() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        session.attach_source(QueueSource::boxed([
            Frame::filled(4, 4, BLUE),
            Frame::filled(2, 2, BLUE),
            Frame::filled(4, 4, BLUE),
        ]));
        let mut sink = CollectSink::default();
        let running = AtomicBool::new(true);

        let stats = session.run(&running, 0, None, &mut sink).unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.resampled, 1);
        assert_eq!(sink.frames.len(), 3);
        for (_, frame) in &sink.frames {
            assert_eq!(frame.dimensions(), (4, 4));
            assert_eq!(frame.pixel(3, 3), Some(BLUE));
        }
    }

    #[test]
    fn test_zero_sized_frame_is_dropped() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        session.attach_source(QueueSource::boxed([
            Frame::filled(2, 2, BLUE),
            Frame::blank(0, 0),
            Frame::filled(2, 2, BLUE),
        ]));
        let mut sink = CollectSink::default();

        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Processed(0));
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Dropped);
        assert_eq!(session.run_cycle(&mut sink).unwrap(), CycleOutcome::Processed(1));

        let stats = session.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.processed, 2);
        assert_eq!(sink.frames.len(), 2);
    }

    #[test]
    fn test_run_until_exhausted() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        session.attach_source(QueueSource::boxed((0..5).map(|_| Frame::filled(2, 2, BLUE))));
        let mut sink = CollectSink::default();
        let running = AtomicBool::new(true);

        let stats = session.run(&running, 0, None, &mut sink).unwrap();
        assert_eq!(stats.processed, 5);
        let indices: Vec<u64> = sink.frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_run_respects_max_frames_and_pacing() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        session.attach_source(QueueSource::boxed((0..10).map(|_| Frame::filled(2, 2, BLUE))));
        let mut sink = CollectSink::default();
        let running = AtomicBool::new(true);

        let start = Instant::now();
        let stats = session.run(&running, 100, Some(3), &mut sink).unwrap();
        assert_eq!(stats.processed, 3);
        // Three paced frames at 100 fps take at least two frame intervals
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_run_stops_when_cleared() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        session.attach_source(QueueSource::boxed([Frame::filled(2, 2, BLUE)]));
        let mut sink = CollectSink::default();
        let running = AtomicBool::new(false);

        let stats = session.run(&running, 0, None, &mut sink).unwrap();
        assert_eq!(stats.processed, 0);
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_run_requires_source() {
        let mut session = KeySession::new(SharedKeyConfig::default());
        let mut sink = CollectSink::default();
        let running = AtomicBool::new(true);
        assert!(matches!(
            session.run(&running, 0, None, &mut sink),
            Err(KeyError::NoFrameSource)
        ));
    }
}
