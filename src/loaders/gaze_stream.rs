//! Gaze stream loader
//!
//! The tracker reader appends one line per device record. Only lines carrying
//! the marker token are gaze samples; everything else (experiment markers,
//! device chatter, truncated writes) is skipped without error.

use crate::error::AnalysisError;
use crate::types::GazeSample;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Samples recovered from a stream plus the number of lines dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GazeStream {
    pub samples: Vec<GazeSample>,
    pub skipped_lines: usize,
}

/// Layout of the raw tracker file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeFormat {
    /// `unix_time<TAB>MARKER device_ts x y`, one Unix timestamp per line
    #[default]
    Timestamped,
    /// First line holds the Unix start time; records are `MARKER device_ms x y`
    Legacy,
}

impl GazeFormat {
    pub fn parser(self, marker: &str) -> Box<dyn GazeLineParser> {
        match self {
            GazeFormat::Timestamped => Box::new(TimestampedParser::new(marker)),
            GazeFormat::Legacy => Box::new(LegacyParser::new(marker)),
        }
    }
}

/// Trait for raw gaze stream parsers
pub trait GazeLineParser {
    /// Parse the whole stream text into samples, in line order
    fn parse(&self, text: &str) -> Result<GazeStream, AnalysisError>;
}

/// Parser for streams where the reader prefixes each line with Unix time
pub struct TimestampedParser {
    marker: String,
}

impl TimestampedParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    fn parse_line(&self, line: &str) -> Option<GazeSample> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || !fields.contains(&self.marker.as_str()) {
            return None;
        }
        let time = parse_finite(fields[0])?;
        let x = parse_finite(fields[3])?;
        let y = parse_finite(fields[4])?;
        Some(GazeSample::new(time, x, y))
    }
}

impl GazeLineParser for TimestampedParser {
    fn parse(&self, text: &str) -> Result<GazeStream, AnalysisError> {
        let mut stream = GazeStream::default();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match self.parse_line(line) {
                Some(sample) => stream.samples.push(sample),
                None => stream.skipped_lines += 1,
            }
        }
        Ok(stream)
    }
}

/// Parser for streams written by the older wrapper, which recorded only the
/// start time and left per-sample timing to the device clock (milliseconds)
pub struct LegacyParser {
    marker: String,
}

impl LegacyParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    fn parse_line(&self, line: &str, start_time: f64) -> Option<GazeSample> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[0] != self.marker {
            return None;
        }
        let device_ms = parse_finite(fields[1])?;
        let x = parse_finite(fields[2])?;
        let y = parse_finite(fields[3])?;
        Some(GazeSample::new(start_time + device_ms / 1000.0, x, y))
    }
}

impl GazeLineParser for LegacyParser {
    fn parse(&self, text: &str) -> Result<GazeStream, AnalysisError> {
        let mut lines = text.lines();
        let first = lines.next().map(str::trim).unwrap_or("");
        let start_time = first.parse::<f64>().map_err(|_| {
            AnalysisError::MalformedLog(format!(
                "legacy gaze stream must start with a Unix start time, found '{}'",
                first
            ))
        })?;

        let mut stream = GazeStream::default();
        for line in lines.filter(|l| !l.trim().is_empty()) {
            match self.parse_line(line, start_time) {
                Some(sample) => stream.samples.push(sample),
                None => stream.skipped_lines += 1,
            }
        }
        Ok(stream)
    }
}

/// Trackers report lost samples as `nan`
fn parse_finite(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Load a gaze stream from disk
pub fn load_gaze_stream<P: AsRef<Path>>(
    path: P,
    format: GazeFormat,
    marker: &str,
) -> Result<GazeStream, AnalysisError> {
    let path = path.as_ref();
    // Tracker output is not guaranteed to be valid UTF-8
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let stream = format.parser(marker).parse(&text)?;
    log::debug!(
        "Loaded {} gaze samples from {} ({} lines skipped)",
        stream.samples.len(),
        path.display(),
        stream.skipped_lines
    );
    Ok(stream)
}
