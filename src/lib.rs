//! facegaze - Offline gaze analysis for face-imagery experiments
//!
//! facegaze aligns a stimulus runner's event log with a raw eye-tracker stream
//! and estimates how large participants imagined a face, through a
//! deterministic pipeline: log loading → clock normalization → landmark window
//! extraction → trailing-window gaze aggregation → face-size estimation.

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod face_size;
pub mod loaders;
pub mod normalizer;
pub mod pipeline;
pub mod types;
pub mod windows;

pub use config::{AnalysisConfig, EventVocabulary, ScreenConfig, ScreenGeometry};
pub use error::AnalysisError;
pub use loaders::GazeFormat;
pub use pipeline::{discover_participants, AnalysisProcessor, BatchOutcome, ParticipantInput};
pub use types::{
    Event, FaceSize, FaceSizeOutcome, FaceSizeReport, GazePoint, GazeSample, LandmarkWindow,
    ParticipantAnalysis, ScreenUsed,
};

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "facegaze";
