//! Pipeline orchestration
//!
//! This module provides the public API for facegaze.
//! It runs the full pipeline from the two raw logs to a participant analysis,
//! and runs batches of participants with per-participant failure isolation.

use crate::aggregator::GazeAggregator;
use crate::config::{AnalysisConfig, HardwareSpecs, ScreenConfig};
use crate::encoder::{FaceSizeTable, GazePointTable};
use crate::error::AnalysisError;
use crate::face_size::FaceSizeEstimator;
use crate::loaders::{load_event_log, load_gaze_stream, GazeStream};
use crate::normalizer::ClockNormalizer;
use crate::types::{BatchEntry, Event, ParticipantAnalysis};
use crate::windows::WindowExtractor;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const EVENT_LOG_SUFFIX: &str = "_event_log.csv";
const GAZE_STREAM_SUFFIX: &str = "Eye_Tracking.txt";

/// Combined gaze point table written by a batch run
pub const COMBINED_POINTS_FILE: &str = "combined_gaze_points.csv";

/// Combined face-size table written by a batch run
pub const COMBINED_FACE_SIZES_FILE: &str = "combined_face_sizes.csv";

/// Files belonging to one participant
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantInput {
    pub participant: String,
    pub events_path: PathBuf,
    pub gaze_path: Option<PathBuf>,
    pub hardware_path: Option<PathBuf>,
}

impl ParticipantInput {
    pub fn new(
        participant: impl Into<String>,
        events_path: impl Into<PathBuf>,
        gaze_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            participant: participant.into(),
            events_path: events_path.into(),
            gaze_path: Some(gaze_path.into()),
            hardware_path: None,
        }
    }
}

/// Results of a batch run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub analyses: Vec<ParticipantAnalysis>,
    pub entries: Vec<BatchEntry>,
}

impl BatchOutcome {
    pub fn all_failed(&self) -> bool {
        !self.entries.is_empty() && self.analyses.is_empty()
    }

    /// Write the combined tables for every successful participant
    pub fn write_tables(&self, output_dir: &Path) -> Result<(), AnalysisError> {
        fs::create_dir_all(output_dir)?;

        let mut points = GazePointTable::new(BufWriter::new(File::create(
            output_dir.join(COMBINED_POINTS_FILE),
        )?));
        let mut faces = FaceSizeTable::new(BufWriter::new(File::create(
            output_dir.join(COMBINED_FACE_SIZES_FILE),
        )?));

        for analysis in &self.analyses {
            points.append(&analysis.participant, &analysis.points)?;
            faces.append(analysis)?;
        }

        points.finish()?;
        faces.finish()
    }
}

/// Processor running the analysis pipeline under one configuration
pub struct AnalysisProcessor {
    config: AnalysisConfig,
}

impl Default for AnalysisProcessor {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisProcessor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the pipeline on already-loaded logs.
    ///
    /// Pipeline stages:
    /// 1. ClockNormalizer - Rebase events and samples onto the anchor event
    /// 2. WindowExtractor - Recover landmark windows
    /// 3. GazeAggregator - Average gaze over each window's trailing sub-window
    /// 4. FaceSizeEstimator - Estimate face size per identity
    pub fn analyze(
        &self,
        participant: &str,
        events: &[Event],
        stream: &GazeStream,
        screen: &ScreenConfig,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        screen.validate()?;

        let session =
            ClockNormalizer::normalize_to_anchor(&stream.samples, events, &self.config.anchor_event)?;

        let windows = WindowExtractor::new(&self.config.vocabulary).extract(&session.events);
        log::debug!("{}: {} landmark windows", participant, windows.len());

        let points = GazeAggregator::new(self.config.trailing_window_secs)
            .aggregate(&windows, &session.samples);

        let face_sizes = FaceSizeEstimator::new(screen.geometry()).estimate_all(&points);

        Ok(ParticipantAnalysis {
            participant: participant.to_string(),
            anchor_time: session.anchor_time,
            event_count: events.len(),
            sample_count: stream.samples.len(),
            skipped_lines: stream.skipped_lines,
            screen: screen.describe(false),
            windows,
            points,
            face_sizes,
        })
    }

    /// Load one participant's files and run the pipeline
    pub fn analyze_files(&self, input: &ParticipantInput) -> Result<ParticipantAnalysis, AnalysisError> {
        let gaze_path = input.gaze_path.as_ref().ok_or_else(|| {
            AnalysisError::MissingInput(format!(
                "no gaze stream found for participant '{}'",
                input.participant
            ))
        })?;

        let events = load_event_log(&input.events_path)?;
        let stream = load_gaze_stream(gaze_path, self.config.gaze_format, &self.config.gaze_marker)?;

        let (screen, hardware_specs_used) = match &input.hardware_path {
            Some(path) => (self.config.screen.with_hardware(&HardwareSpecs::load(path)?)?, true),
            None => (self.config.screen.clone(), false),
        };

        let mut analysis = self.analyze(&input.participant, &events, &stream, &screen)?;
        analysis.screen.hardware_specs_used = hardware_specs_used;
        Ok(analysis)
    }

    /// Analyze every participant; a failure is logged and recorded, never fatal
    pub fn run_batch(&self, inputs: &[ParticipantInput]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for input in inputs {
            log::info!("Processing participant {}", input.participant);
            match self.analyze_files(input) {
                Ok(analysis) => {
                    outcome.entries.push(BatchEntry {
                        participant: input.participant.clone(),
                        succeeded: true,
                        error: None,
                    });
                    outcome.analyses.push(analysis);
                }
                Err(e) => {
                    log::error!("Participant {} failed: {}", input.participant, e);
                    outcome.entries.push(BatchEntry {
                        participant: input.participant.clone(),
                        succeeded: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        outcome
    }
}

/// Find participants under `data_dir` and its immediate sub-directories.
///
/// A participant is identified by a `<name>_event_log.csv` file. Its gaze
/// stream is the `<name>_*Eye_Tracking.txt` file in the same directory, or
/// failing that in `data_dir` itself.
pub fn discover_participants(data_dir: &Path) -> Result<Vec<ParticipantInput>, AnalysisError> {
    if !data_dir.is_dir() {
        return Err(AnalysisError::MissingInput(format!(
            "data directory {} does not exist",
            data_dir.display()
        )));
    }

    let mut dirs = vec![data_dir.to_path_buf()];
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    // (directory, participant, event log)
    let mut logs = Vec::new();
    for dir in &dirs {
        for path in sorted_files(dir)? {
            let Some(participant) = file_name(&path).and_then(|n| n.strip_suffix(EVENT_LOG_SUFFIX))
            else {
                continue;
            };
            if participant.is_empty() {
                continue;
            }
            logs.push((dir.clone(), participant.to_string(), path.clone()));
        }
    }

    let names: Vec<&str> = logs.iter().map(|(_, name, _)| name.as_str()).collect();
    let mut inputs = Vec::new();
    for (dir, participant, events_path) in &logs {
        let gaze_path = match find_gaze_stream(dir, participant, &names)? {
            Some(path) => Some(path),
            None => find_gaze_stream(data_dir, participant, &names)?,
        };
        let hardware_path = Some(dir.join(format!("{}_hardware_specs.json", participant)))
            .filter(|p| p.is_file());

        inputs.push(ParticipantInput {
            participant: participant.clone(),
            events_path: events_path.clone(),
            gaze_path,
            hardware_path,
        });
    }

    inputs.sort_by(|a, b| a.participant.cmp(&b.participant));
    Ok(inputs)
}

/// Pick `participant`'s gaze stream in `dir`.
///
/// Files claimed by a participant with a longer name (`alice_b_...` when
/// `alice_b` is also a participant) never match. Date-stamped names
/// (`<participant>_<MM>_<DD>_...`) are preferred; any other
/// `<participant>_...` candidate is only used as a fallback, with a warning.
fn find_gaze_stream(
    dir: &Path,
    participant: &str,
    participants: &[&str],
) -> Result<Option<PathBuf>, AnalysisError> {
    let prefix = format!("{}_", participant);
    let longer: Vec<String> = participants
        .iter()
        .filter(|other| other.len() > participant.len() && other.starts_with(&prefix))
        .map(|other| format!("{}_", other))
        .collect();

    let mut stamped = Vec::new();
    let mut loose = Vec::new();
    for path in sorted_files(dir)? {
        let Some(rest) = file_name(&path)
            .filter(|n| n.ends_with(GAZE_STREAM_SUFFIX))
            .filter(|n| !longer.iter().any(|l| n.starts_with(l.as_str())))
            .and_then(|n| n.strip_prefix(prefix.as_str()))
        else {
            continue;
        };
        if rest.starts_with(|c: char| c.is_ascii_digit()) || rest == GAZE_STREAM_SUFFIX {
            stamped.push(path);
        } else {
            loose.push(path);
        }
    }

    let (mut matches, exact) = if stamped.is_empty() {
        (loose, false)
    } else {
        (stamped, true)
    };
    if !exact && !matches.is_empty() {
        log::warn!(
            "Gaze stream match for {} in {} is ambiguous: {}",
            participant,
            dir.display(),
            matches
                .iter()
                .filter_map(|p| file_name(p))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    if matches.len() > 1 {
        log::warn!(
            "Found {} gaze streams for {} in {}; using the last by name",
            matches.len(),
            participant,
            dir.display()
        );
    }
    Ok(matches.pop())
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaceSizeOutcome, GazeSample};

    const T0: f64 = 1_700_000_000.0;

    fn make_events() -> Vec<Event> {
        let mut events = vec![
            Event::new("experiment_start", "", T0 - 60.0),
            Event::new("visualization_prompt_mark_start", "", T0 - 5.0),
            Event::new("eyetracking_start", "", T0),
        ];
        let landmarks = ["chin", "top of head", "left ear", "right ear"];
        for (i, land) in landmarks.iter().enumerate() {
            let end = 2.0 * (i as f64 + 1.0);
            events.push(Event::new("landmark_start", *land, T0 + end - 1.5));
            events.push(Event::new("landmark_end", *land, T0 + end));
        }
        events
    }

    fn make_stream() -> GazeStream {
        let targets = [(960.0, 700.0), (960.0, 300.0), (860.0, 500.0), (1060.0, 500.0)];
        let mut samples = Vec::new();
        for (i, (x, y)) in targets.iter().enumerate() {
            let end = 2.0 * (i as f64 + 1.0);
            // Straddle each end time symmetrically so the mean is exact
            samples.push(GazeSample::new(T0 + end - 0.25, x - 4.0, y + 2.0));
            samples.push(GazeSample::new(T0 + end - 0.1, x + 4.0, y - 2.0));
        }
        GazeStream {
            samples,
            skipped_lines: 0,
        }
    }

    #[test]
    fn test_analyze_end_to_end() {
        let processor = AnalysisProcessor::default();
        let analysis = processor
            .analyze("p01", &make_events(), &make_stream(), &ScreenConfig::default())
            .unwrap();

        assert_eq!(analysis.anchor_time, T0);
        assert_eq!(analysis.windows.len(), 4);
        assert_eq!(analysis.points.len(), 4);
        assert_eq!(analysis.points[0].position(), Some((960.0, 700.0)));
        assert_eq!(analysis.points[3].t_end, 8.0);

        assert_eq!(analysis.face_sizes.len(), 1);
        assert_eq!(analysis.face_sizes[0].identity.as_deref(), Some("Mark"));
        let size = analysis.face_sizes[0].outcome.measured().unwrap();
        let pixel_mm = 24.0 * 25.4 / (1920.0f64).hypot(1080.0);
        assert!((size.physical_height_cm - 400.0 * pixel_mm / 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_anchor_fails() {
        let events: Vec<Event> = make_events()
            .into_iter()
            .filter(|e| e.name != "eyetracking_start")
            .collect();
        let result =
            AnalysisProcessor::default().analyze("p01", &events, &make_stream(), &ScreenConfig::default());
        assert!(matches!(result, Err(AnalysisError::MissingAnchor(_))));
    }

    #[test]
    fn test_empty_stream_yields_insufficient_data() {
        let analysis = AnalysisProcessor::default()
            .analyze("p01", &make_events(), &GazeStream::default(), &ScreenConfig::default())
            .unwrap();

        assert_eq!(analysis.points.len(), 4);
        assert!(analysis.points.iter().all(|p| p.position().is_none()));
        assert!(matches!(
            &analysis.face_sizes[0].outcome,
            FaceSizeOutcome::InsufficientData { missing } if missing.len() == 4
        ));
    }

    #[test]
    fn test_invalid_screen_fails() {
        let screen = ScreenConfig {
            viewing_distance_m: 0.0,
            ..Default::default()
        };
        let result = AnalysisProcessor::default().analyze("p01", &make_events(), &make_stream(), &screen);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_analysis_records_screen() {
        let analysis = AnalysisProcessor::default()
            .analyze("p01", &make_events(), &make_stream(), &ScreenConfig::default())
            .unwrap();
        assert_eq!(analysis.screen, ScreenConfig::default().describe(false));
    }

    #[test]
    fn test_missing_gaze_path_fails() {
        let input = ParticipantInput {
            participant: "p02".to_string(),
            events_path: PathBuf::from("does-not-matter.csv"),
            gaze_path: None,
            hardware_path: None,
        };
        let result = AnalysisProcessor::default().analyze_files(&input);
        assert!(matches!(result, Err(AnalysisError::MissingInput(_))));
    }
}
