//! Gaze aggregation
//!
//! Each landmark window is summarized by the mean gaze position over a short
//! trailing sub-window ending at the window's end event, when the participant
//! confirmed they were looking at the landmark.

use crate::config::DEFAULT_TRAILING_WINDOW_SECS;
use crate::types::{GazePoint, GazeSample, LandmarkWindow};

/// Aggregator computing one gaze point per landmark window
#[derive(Debug, Clone, Copy)]
pub struct GazeAggregator {
    trailing_window_secs: f64,
}

impl Default for GazeAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TRAILING_WINDOW_SECS)
    }
}

impl GazeAggregator {
    pub fn new(trailing_window_secs: f64) -> Self {
        Self {
            trailing_window_secs,
        }
    }

    pub fn trailing_window_secs(&self) -> f64 {
        self.trailing_window_secs
    }

    /// Aggregate every window, preserving order
    pub fn aggregate(&self, windows: &[LandmarkWindow], samples: &[GazeSample]) -> Vec<GazePoint> {
        windows
            .iter()
            .map(|window| self.aggregate_window(window, samples))
            .collect()
    }

    /// Mean of the samples in `[end - width, end]`, both ends inclusive
    pub fn aggregate_window(&self, window: &LandmarkWindow, samples: &[GazeSample]) -> GazePoint {
        let from = window.end - self.trailing_window_secs;
        let to = window.end;

        // Sample order is not verified upstream, so scan everything
        let (count, sum_x, sum_y) = samples
            .iter()
            .filter(|s| s.time >= from && s.time <= to)
            .fold((0usize, 0.0, 0.0), |(n, sx, sy), s| (n + 1, sx + s.x, sy + s.y));

        let (mean_x, mean_y) = if count > 0 {
            (Some(sum_x / count as f64), Some(sum_y / count as f64))
        } else {
            log::debug!(
                "No gaze samples in [{:.3}, {:.3}] for landmark '{}'",
                from,
                to,
                window.landmark
            );
            (None, None)
        };

        GazePoint {
            identity: window.identity.clone(),
            landmark: window.landmark.clone(),
            mean_x,
            mean_y,
            t_end: window.end,
            sample_count: count,
        }
    }
}
