//! Input loaders
//!
//! This module parses the two files the experiment leaves on disk: the event
//! log written by the stimulus runner and the raw stream written by the
//! eye-tracker reader.

mod event_log;
mod gaze_stream;

pub use event_log::{load_event_log, parse_event_log};
pub use gaze_stream::{
    load_gaze_stream, GazeFormat, GazeLineParser, GazeStream, LegacyParser, TimestampedParser,
};
