//! Keying time statistics

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Average keying time in milliseconds
    pub avg_ms: f64,
    /// Minimum keying time in milliseconds
    pub min_ms: f64,
    /// Maximum keying time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median)
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Rolling window of per-frame keying durations
#[derive(Debug)]
pub struct FrameProfiler {
    frame_times: VecDeque<Duration>,
    /// 10 seconds at 30 fps by default
    max_samples: usize,
    frame_start: Option<Instant>,
    /// Frame start times for FPS calculation
    frame_starts: VecDeque<Instant>,
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProfiler {
    pub fn new() -> Self {
        Self::with_capacity(300)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            frame_start: None,
            frame_starts: VecDeque::with_capacity(max_samples),
        }
    }

    /// Mark the start of a keyed frame
    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        self.frame_start = Some(now);
        self.frame_starts.push_back(now);
        if self.frame_starts.len() > self.max_samples {
            self.frame_starts.pop_front();
        }
    }

    /// Mark the end of the frame started by [`FrameProfiler::begin_frame`]
    pub fn end_frame(&mut self) {
        if let Some(start) = self.frame_start.take() {
            self.record(start.elapsed());
        }
    }

    /// Add one duration sample
    pub fn record(&mut self, duration: Duration) {
        self.frame_times.push_back(duration);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }

        let mut times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = times.iter().sum();

        FrameStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times[0],
            max_ms: times[times.len() - 1],
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            p99_ms: percentile(&times, 0.99),
            sample_count: times.len(),
        }
    }

    /// Frames started per second across the window
    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.frame_starts.front(), self.frame_starts.back()) else {
            return 0.0;
        };
        let duration = last.duration_since(*first).as_secs_f64();
        if duration > 0.0 {
            (self.frame_starts.len() - 1) as f64 / duration
        } else {
            0.0
        }
    }

    pub fn last_frame_time_ms(&self) -> f64 {
        self.frame_times
            .back()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Percentile of a sorted slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}
