//! Event log loader
//!
//! Parses the `event,label,unix_time` CSV written by the stimulus runner.

use crate::error::AnalysisError;
use crate::types::Event;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 3] = ["event", "label", "unix_time"];

/// Load an event log from disk
pub fn load_event_log<P: AsRef<Path>>(path: P) -> Result<Vec<Event>, AnalysisError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let events = parse_event_log(file).map_err(|e| match e {
        AnalysisError::MalformedLog(msg) => {
            AnalysisError::MalformedLog(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    log::debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

/// Parse an event log from any reader, preserving row order
pub fn parse_event_log<R: Read>(reader: R) -> Result<Vec<Event>, AnalysisError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut indices = [0usize; 3];
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers.iter().position(|h| h == column).ok_or_else(|| {
            AnalysisError::MalformedLog(format!(
                "header is missing column '{}' (expected {})",
                column,
                REQUIRED_COLUMNS.join(",")
            ))
        })?;
    }
    let [name_idx, label_idx, time_idx] = indices;

    let mut events = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Whitespace-only lines trim down to a single empty field
        if record.iter().all(str::is_empty) {
            continue;
        }

        if record.len() < REQUIRED_COLUMNS.len() {
            return Err(AnalysisError::MalformedLog(format!(
                "line {} has {} fields, expected at least {}",
                line,
                record.len(),
                REQUIRED_COLUMNS.len()
            )));
        }

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let raw_time = field(time_idx);
        let time = raw_time.parse::<f64>().map_err(|_| {
            AnalysisError::MalformedLog(format!("line {}: invalid unix_time '{}'", line, raw_time))
        })?;

        events.push(Event::new(field(name_idx), field(label_idx), time));
    }

    Ok(events)
}
