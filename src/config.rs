//! Analysis configuration
//!
//! All tunables of the pipeline live here: the event names the stimulus runner
//! writes, the anchor event, the trailing averaging width and the screen
//! geometry used for visual-angle conversion. Every field has a default, so a
//! config file only needs to name what it overrides.

use crate::error::AnalysisError;
use crate::loaders::GazeFormat;
use crate::types::ScreenUsed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default monitor diagonal (inches)
pub const DEFAULT_DIAGONAL_INCH: f64 = 24.0;

/// Default screen resolution (pixels)
pub const DEFAULT_RESOLUTION: [u32; 2] = [1920, 1080];

/// Default eye-to-screen distance (meters)
pub const DEFAULT_VIEWING_DISTANCE_M: f64 = 0.5;

/// Default width of the trailing averaging window (seconds)
pub const DEFAULT_TRAILING_WINDOW_SECS: f64 = 0.5;

const MM_PER_INCH: f64 = 25.4;

/// Event names written by the stimulus runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventVocabulary {
    /// Opens a landmark window; its label names the landmark
    pub landmark_start: String,
    /// Closes the open landmark window
    pub landmark_end: String,
    /// Identity prompts are named `<prefix><ID><suffix>`
    pub prompt_prefix: String,
    pub prompt_suffix: String,
}

impl Default for EventVocabulary {
    fn default() -> Self {
        Self {
            landmark_start: "landmark_start".to_string(),
            landmark_end: "landmark_end".to_string(),
            prompt_prefix: "visualization_prompt_".to_string(),
            prompt_suffix: "_start".to_string(),
        }
    }
}

impl EventVocabulary {
    /// Extract `<ID>` from an identity prompt event name
    pub fn prompt_identity<'a>(&self, event_name: &'a str) -> Option<&'a str> {
        event_name
            .strip_prefix(self.prompt_prefix.as_str())?
            .strip_suffix(self.prompt_suffix.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Physical screen setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub diagonal_inch: f64,
    pub resolution: [u32; 2],
    pub viewing_distance_m: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            diagonal_inch: DEFAULT_DIAGONAL_INCH,
            resolution: DEFAULT_RESOLUTION,
            viewing_distance_m: DEFAULT_VIEWING_DISTANCE_M,
        }
    }
}

impl ScreenConfig {
    /// Apply per-participant hardware specs, if they name a resolution.
    ///
    /// The merged setup is validated; a zero resolution in the specs file
    /// fails with `InvalidConfig`.
    pub fn with_hardware(&self, specs: &HardwareSpecs) -> Result<Self, AnalysisError> {
        let mut screen = self.clone();
        if let Some(resolution) = specs.monitor.as_ref().and_then(|m| m.resolution) {
            screen.resolution = resolution;
        }
        screen.validate()?;
        Ok(screen)
    }

    /// Derive the geometry used for visual-angle conversion (square pixels)
    pub fn geometry(&self) -> ScreenGeometry {
        let [res_x, res_y] = self.resolution;
        let diagonal_px = (res_x as f64).hypot(res_y as f64);
        ScreenGeometry {
            pixel_size_mm: self.diagonal_inch * MM_PER_INCH / diagonal_px,
            viewing_distance_mm: self.viewing_distance_m * 1000.0,
        }
    }

    /// Describe this setup for reports, with the physical screen extent
    pub fn describe(&self, hardware_specs_used: bool) -> ScreenUsed {
        let [res_x, res_y] = self.resolution;
        let pixel_size_cm = self.geometry().pixel_size_mm / 10.0;
        ScreenUsed {
            resolution_x: res_x,
            resolution_y: res_y,
            diagonal_inch: self.diagonal_inch,
            viewing_dist_cm: self.viewing_distance_m * 100.0,
            screen_width_cm: res_x as f64 * pixel_size_cm,
            screen_height_cm: res_y as f64 * pixel_size_cm,
            hardware_specs_used,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.diagonal_inch > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "screen diagonal must be positive, got {}",
                self.diagonal_inch
            )));
        }
        if self.resolution.iter().any(|&r| r == 0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "screen resolution must be non-zero, got {}x{}",
                self.resolution[0], self.resolution[1]
            )));
        }
        if !(self.viewing_distance_m > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "viewing distance must be positive, got {}",
                self.viewing_distance_m
            )));
        }
        Ok(())
    }
}

/// Pixel pitch and viewing distance, both in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub pixel_size_mm: f64,
    pub viewing_distance_mm: f64,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        ScreenConfig::default().geometry()
    }
}

/// Top-level analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Event whose time becomes t = 0
    pub anchor_event: String,
    /// Token identifying gaze sample lines in the tracker stream
    pub gaze_marker: String,
    pub gaze_format: GazeFormat,
    pub trailing_window_secs: f64,
    pub vocabulary: EventVocabulary,
    pub screen: ScreenConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anchor_event: "eyetracking_start".to_string(),
            gaze_marker: "TobiiStream".to_string(),
            gaze_format: GazeFormat::Timestamped,
            trailing_window_secs: DEFAULT_TRAILING_WINDOW_SECS,
            vocabulary: EventVocabulary::default(),
            screen: ScreenConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.trailing_window_secs > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "trailing window must be positive, got {}",
                self.trailing_window_secs
            )));
        }
        if self.anchor_event.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "anchor event name is empty".to_string(),
            ));
        }
        if self.gaze_marker.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "gaze marker token is empty".to_string(),
            ));
        }
        self.screen.validate()
    }
}

/// Per-participant hardware description written next to the logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareSpecs {
    #[serde(default)]
    pub monitor: Option<MonitorSpecs>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorSpecs {
    #[serde(default)]
    pub resolution: Option<[u32; 2]>,
}

impl HardwareSpecs {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Load `<participant>_hardware_specs.json` from `dir` if it exists
    pub fn find(dir: &Path, participant: &str) -> Result<Option<Self>, AnalysisError> {
        let path = dir.join(format!("{}_hardware_specs.json", participant));
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let geometry = ScreenGeometry::default();
        let expected_pixel = 24.0 * 25.4 / (1920.0f64).hypot(1080.0);

        assert!((geometry.pixel_size_mm - expected_pixel).abs() < 1e-12);
        assert!((geometry.viewing_distance_mm - 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{"trailing_window_secs": 1.0, "gaze_format": "legacy", "screen": {"viewing_distance_m": 0.6}}"#,
        )
        .unwrap();

        assert_eq!(config.trailing_window_secs, 1.0);
        assert_eq!(config.screen.viewing_distance_m, 0.6);
        assert_eq!(config.screen.resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.gaze_format, GazeFormat::Legacy);
        assert_eq!(config.anchor_event, "eyetracking_start");
        assert_eq!(config.vocabulary, EventVocabulary::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AnalysisConfig::from_json(r#"{"trailing_window_secs": 0.0}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));

        let result = AnalysisConfig::from_json(r#"{"screen": {"resolution": [0, 1080]}}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));

        let result = AnalysisConfig::from_json("not json");
        assert!(matches!(result, Err(AnalysisError::JsonError(_))));
    }

    #[test]
    fn test_prompt_identity() {
        let vocab = EventVocabulary::default();

        assert_eq!(vocab.prompt_identity("visualization_prompt_mark_start"), Some("mark"));
        assert_eq!(vocab.prompt_identity("visualization_prompt_start"), None);
        assert_eq!(vocab.prompt_identity("visualization_prompt_mark_end"), None);
        assert_eq!(vocab.prompt_identity("landmark_start"), None);
    }

    #[test]
    fn test_hardware_specs_override_resolution() {
        let specs: HardwareSpecs =
            serde_json::from_str(r#"{"monitor": {"resolution": [2560, 1440], "name": "x"}}"#).unwrap();
        let screen = ScreenConfig::default().with_hardware(&specs).unwrap();

        assert_eq!(screen.resolution, [2560, 1440]);
        assert_eq!(screen.diagonal_inch, DEFAULT_DIAGONAL_INCH);

        let empty = HardwareSpecs::default();
        assert_eq!(
            ScreenConfig::default().with_hardware(&empty).unwrap(),
            ScreenConfig::default()
        );
    }

    #[test]
    fn test_hardware_specs_with_zero_resolution_rejected() {
        let specs: HardwareSpecs =
            serde_json::from_str(r#"{"monitor": {"resolution": [0, 0]}}"#).unwrap();
        let result = ScreenConfig::default().with_hardware(&specs);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));

        let specs: HardwareSpecs =
            serde_json::from_str(r#"{"monitor": {"resolution": [1920, 0]}}"#).unwrap();
        assert!(ScreenConfig::default().with_hardware(&specs).is_err());
    }

    #[test]
    fn test_describe_screen() {
        let screen = ScreenConfig::default().describe(false);
        let diagonal_cm = 24.0 * 2.54;
        let diagonal_px = (1920.0f64).hypot(1080.0);

        assert_eq!((screen.resolution_x, screen.resolution_y), (1920, 1080));
        assert!((screen.viewing_dist_cm - 50.0).abs() < 1e-12);
        assert!((screen.screen_width_cm - diagonal_cm * 1920.0 / diagonal_px).abs() < 1e-9);
        assert!((screen.screen_height_cm - diagonal_cm * 1080.0 / diagonal_px).abs() < 1e-9);
        assert!(!screen.hardware_specs_used);
    }
}
