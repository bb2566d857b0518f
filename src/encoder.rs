//! Report encoding
//!
//! This module turns analysis results into their on-disk forms: a JSON
//! participant report, flat CSV tables of gaze points and face sizes, and a
//! plain-text summary for the terminal.

use crate::error::AnalysisError;
use crate::types::{
    BatchEntry, BatchSummary, FaceSizeOutcome, GazePoint, ParticipantAnalysis, ParticipantReport,
    ReportProducer,
};
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use uuid::Uuid;

/// Encoder for reports produced by one run
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    pub fn encode(&self, analysis: ParticipantAnalysis, trailing_window_secs: f64) -> ParticipantReport {
        ParticipantReport {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            trailing_window_secs,
            analysis,
        }
    }

    pub fn encode_batch(&self, entries: Vec<BatchEntry>) -> BatchSummary {
        BatchSummary {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            entries,
        }
    }
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, AnalysisError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[derive(Serialize)]
struct GazePointRow<'a> {
    participant: &'a str,
    identity: Option<&'a str>,
    landmark: &'a str,
    mean_x: Option<f64>,
    mean_y: Option<f64>,
    t_end: f64,
    sample_count: usize,
}

#[derive(Serialize)]
struct FaceSizeRow<'a> {
    participant: &'a str,
    identity: Option<&'a str>,
    status: &'static str,
    angular_width_deg: Option<f64>,
    angular_height_deg: Option<f64>,
    physical_width_cm: Option<f64>,
    physical_height_cm: Option<f64>,
    missing: String,
    resolution_x: u32,
    resolution_y: u32,
    viewing_dist_cm: f64,
    screen_width_cm: f64,
    screen_height_cm: f64,
    hardware_specs_used: bool,
}

/// Streaming CSV writer for gaze points, one table across participants
pub struct GazePointTable<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> GazePointTable<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn append(&mut self, participant: &str, points: &[GazePoint]) -> Result<(), AnalysisError> {
        for point in points {
            self.writer.serialize(GazePointRow {
                participant,
                identity: point.identity.as_deref(),
                landmark: &point.landmark,
                mean_x: point.mean_x,
                mean_y: point.mean_y,
                t_end: point.t_end,
                sample_count: point.sample_count,
            })?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), AnalysisError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Streaming CSV writer for face-size reports, one table across participants
pub struct FaceSizeTable<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> FaceSizeTable<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    /// Append one row per identity, stamped with the screen the sizes were computed for
    pub fn append(&mut self, analysis: &ParticipantAnalysis) -> Result<(), AnalysisError> {
        let screen = &analysis.screen;
        for report in &analysis.face_sizes {
            let size = report.outcome.measured();
            let missing = match &report.outcome {
                FaceSizeOutcome::InsufficientData { missing } => missing.join(";"),
                FaceSizeOutcome::Measured(_) => String::new(),
            };
            self.writer.serialize(FaceSizeRow {
                participant: &analysis.participant,
                identity: report.identity.as_deref(),
                status: if size.is_some() { "measured" } else { "insufficient_data" },
                angular_width_deg: size.map(|s| s.angular_width_deg),
                angular_height_deg: size.map(|s| s.angular_height_deg),
                physical_width_cm: size.map(|s| s.physical_width_cm),
                physical_height_cm: size.map(|s| s.physical_height_cm),
                missing,
                resolution_x: screen.resolution_x,
                resolution_y: screen.resolution_y,
                viewing_dist_cm: screen.viewing_dist_cm,
                screen_width_cm: screen.screen_width_cm,
                screen_height_cm: screen.screen_height_cm,
                hardware_specs_used: screen.hardware_specs_used,
            })?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), AnalysisError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Human-readable summary of one participant
pub fn render_text(report: &ParticipantReport) -> String {
    let analysis = &report.analysis;
    let mut out = String::new();

    let _ = writeln!(out, "=== Participant: {} ===", analysis.participant);
    let _ = writeln!(out, "Anchor time:     {:.6}", analysis.anchor_time);
    let _ = writeln!(out, "Events:          {}", analysis.event_count);
    let _ = writeln!(
        out,
        "Gaze samples:    {} ({} lines skipped)",
        analysis.sample_count, analysis.skipped_lines
    );
    let _ = writeln!(out, "Trailing window: {:.3} s", report.trailing_window_secs);

    let screen = &analysis.screen;
    let _ = writeln!(
        out,
        "Screen:          {}x{} px, {:.2} x {:.2} cm, viewed at {:.1} cm",
        screen.resolution_x,
        screen.resolution_y,
        screen.screen_width_cm,
        screen.screen_height_cm,
        screen.viewing_dist_cm
    );
    let _ = writeln!(
        out,
        "                 ({})",
        if screen.hardware_specs_used {
            "using hardware specs from JSON"
        } else {
            "using default hardware parameters"
        }
    );

    let _ = writeln!(out, "\n-- Landmark gaze points (px) --");
    for point in &analysis.points {
        let position = match point.position() {
            Some((x, y)) => format!("({:.1}, {:.1})", x, y),
            None => "no data".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<10} {:<14} {:<18} t_end={:.3}s n={}",
            point.identity.as_deref().unwrap_or("-"),
            point.landmark,
            position,
            point.t_end,
            point.sample_count
        );
    }

    let _ = writeln!(out, "\n-- Face size --");
    for face in &analysis.face_sizes {
        let identity = face.identity.as_deref().unwrap_or("-");
        match &face.outcome {
            FaceSizeOutcome::Measured(size) => {
                let _ = writeln!(
                    out,
                    "  {:<10} width {:.2} deg ({:.2} cm), height {:.2} deg ({:.2} cm)",
                    identity,
                    size.angular_width_deg,
                    size.physical_width_cm,
                    size.angular_height_deg,
                    size.physical_height_cm
                );
            }
            FaceSizeOutcome::InsufficientData { missing } => {
                let _ = writeln!(
                    out,
                    "  {:<10} insufficient data (missing: {})",
                    identity,
                    missing.join(", ")
                );
            }
        }
    }

    out
}
