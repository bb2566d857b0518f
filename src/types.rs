//! Core types for the facegaze pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw events and gaze samples, landmark windows, aggregated gaze
//! points and face-size reports.

use serde::{Deserialize, Serialize};

/// One row of the stimulus runner's event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name (e.g. `landmark_start`)
    pub name: String,
    /// Free-form label, may be empty
    pub label: String,
    /// Event time in seconds (Unix epoch until normalized)
    pub time: f64,
}

impl Event {
    pub fn new(name: impl Into<String>, label: impl Into<String>, time: f64) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            time,
        }
    }
}

/// One eye-tracker sample in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Sample time in seconds (Unix epoch until normalized)
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

impl GazeSample {
    pub fn new(time: f64, x: f64, y: f64) -> Self {
        Self { time, x, y }
    }
}

/// Interval between a `landmark_start` event and the following `landmark_end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkWindow {
    /// Identity being visualized when the window opened
    pub identity: Option<String>,
    /// Landmark label carried by the start event
    pub landmark: String,
    pub start: f64,
    pub end: f64,
}

impl LandmarkWindow {
    /// Window duration in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Mean gaze position over the trailing sub-window of one landmark window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub identity: Option<String>,
    pub landmark: String,
    /// Mean x in pixels, `None` when no sample fell in the trailing window
    pub mean_x: Option<f64>,
    /// Mean y in pixels, `None` when no sample fell in the trailing window
    pub mean_y: Option<f64>,
    /// End time of the source window
    pub t_end: f64,
    /// Number of samples averaged
    pub sample_count: usize,
}

impl GazePoint {
    /// Both coordinates, if the point has data
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.mean_x, self.mean_y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

/// Estimated size of an imagined face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSize {
    /// Visual angle between the ears (degrees)
    pub angular_width_deg: f64,
    /// Visual angle between chin and top of head (degrees)
    pub angular_height_deg: f64,
    /// On-screen ear-to-ear distance (centimeters)
    pub physical_width_cm: f64,
    /// On-screen chin-to-top distance (centimeters)
    pub physical_height_cm: f64,
}

/// Result of a face-size estimate for one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FaceSizeOutcome {
    Measured(FaceSize),
    /// One or more required landmarks had no usable gaze point
    InsufficientData { missing: Vec<String> },
}

impl FaceSizeOutcome {
    pub fn is_measured(&self) -> bool {
        matches!(self, FaceSizeOutcome::Measured(_))
    }

    pub fn measured(&self) -> Option<&FaceSize> {
        match self {
            FaceSizeOutcome::Measured(size) => Some(size),
            FaceSizeOutcome::InsufficientData { .. } => None,
        }
    }
}

/// Face-size report for one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSizeReport {
    pub identity: Option<String>,
    #[serde(flatten)]
    pub outcome: FaceSizeOutcome,
}

/// Screen setup an analysis was computed with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenUsed {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub diagonal_inch: f64,
    pub viewing_dist_cm: f64,
    pub screen_width_cm: f64,
    pub screen_height_cm: f64,
    /// Whether a per-participant hardware specs file was applied
    pub hardware_specs_used: bool,
}

/// Everything computed for one participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantAnalysis {
    pub participant: String,
    /// Unix time of the anchor event
    pub anchor_time: f64,
    pub event_count: usize,
    pub sample_count: usize,
    /// Gaze stream lines dropped by the tolerance policy
    pub skipped_lines: usize,
    pub screen: ScreenUsed,
    pub windows: Vec<LandmarkWindow>,
    pub points: Vec<GazePoint>,
    pub face_sizes: Vec<FaceSizeReport>,
}

/// Producer metadata embedded in reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serialized per-participant report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub trailing_window_secs: f64,
    #[serde(flatten)]
    pub analysis: ParticipantAnalysis,
}

/// Outcome of one participant within a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub participant: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| !e.succeeded).count()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.len() - self.failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaze_point_position_requires_both_means() {
        let mut point = GazePoint {
            identity: None,
            landmark: "nose".to_string(),
            mean_x: Some(1.0),
            mean_y: None,
            t_end: 0.0,
            sample_count: 0,
        };
        assert_eq!(point.position(), None);

        point.mean_y = Some(2.0);
        assert_eq!(point.position(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_face_size_outcome_serializes_with_status_tag() {
        let report = FaceSizeReport {
            identity: Some("Mark".to_string()),
            outcome: FaceSizeOutcome::InsufficientData {
                missing: vec!["left ear".to_string()],
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["identity"], "Mark");
        assert_eq!(value["status"], "insufficient_data");
        assert_eq!(value["missing"][0], "left ear");
    }
}
