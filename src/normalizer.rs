//! Clock normalization
//!
//! The tracker reader and the stimulus runner stamp their records with
//! independently read Unix clocks. Both are rebased onto the time of a shared
//! anchor event so that all downstream times are seconds since the anchor.
//!
//! Only a constant translation is applied. No drift or rate correction is
//! performed, so clocks running at different rates will bias window matching.

use crate::error::AnalysisError;
use crate::types::{Event, GazeSample};

/// Events and samples rebased onto the anchor
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSession {
    /// Unix time that became t = 0
    pub anchor_time: f64,
    pub events: Vec<Event>,
    pub samples: Vec<GazeSample>,
}

/// Normalizer for rebasing both streams onto a shared zero point
pub struct ClockNormalizer;

impl ClockNormalizer {
    /// Time of the first event named `anchor_name`
    pub fn find_anchor(events: &[Event], anchor_name: &str) -> Result<f64, AnalysisError> {
        events
            .iter()
            .find(|e| e.name == anchor_name)
            .map(|e| e.time)
            .ok_or_else(|| {
                AnalysisError::MissingAnchor(format!(
                    "no '{}' event among {} events",
                    anchor_name,
                    events.len()
                ))
            })
    }

    /// Subtract `t0` from every sample and event time.
    ///
    /// Not idempotent: the inputs must still be on the Unix clock.
    pub fn normalize(
        samples: &[GazeSample],
        events: &[Event],
        t0: f64,
    ) -> (Vec<GazeSample>, Vec<Event>) {
        let samples = samples
            .iter()
            .map(|s| GazeSample::new(s.time - t0, s.x, s.y))
            .collect();
        let events = events
            .iter()
            .map(|e| Event {
                time: e.time - t0,
                ..e.clone()
            })
            .collect();
        (samples, events)
    }

    /// Locate the anchor and rebase both streams onto it
    pub fn normalize_to_anchor(
        samples: &[GazeSample],
        events: &[Event],
        anchor_name: &str,
    ) -> Result<NormalizedSession, AnalysisError> {
        let anchor_time = Self::find_anchor(events, anchor_name)?;
        let (samples, events) = Self::normalize(samples, events, anchor_time);
        Ok(NormalizedSession {
            anchor_time,
            events,
            samples,
        })
    }
}
