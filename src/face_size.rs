//! Face-size estimation
//!
//! Combines the gaze points for four facial landmarks with the screen geometry
//! to estimate how large the participant imagined a face:
//! - angular width and height (visual angle at the eye, degrees)
//! - physical width and height on screen (centimeters)

use crate::config::ScreenGeometry;
use crate::types::{FaceSize, FaceSizeOutcome, FaceSizeReport, GazePoint};

pub const CHIN: &str = "chin";
pub const TOP_OF_HEAD: &str = "top of head";
pub const LEFT_EAR: &str = "left ear";
pub const RIGHT_EAR: &str = "right ear";

/// Landmarks required for an estimate
pub const REQUIRED_LANDMARKS: [&str; 4] = [CHIN, TOP_OF_HEAD, LEFT_EAR, RIGHT_EAR];

/// Canonical form used for every label and identity comparison:
/// trimmed, lowercased, with runs of `_`, `-` and whitespace collapsed to one space
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn same_identity(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => normalize_key(a) == normalize_key(b),
        (None, None) => true,
        _ => false,
    }
}

/// Find the gaze point for `(identity, landmark)`; the latest match wins
pub fn lookup<'a>(
    points: &'a [GazePoint],
    identity: Option<&str>,
    landmark: &str,
) -> Option<&'a GazePoint> {
    let key = normalize_key(landmark);
    points
        .iter()
        .rev()
        .find(|p| same_identity(p.identity.as_deref(), identity) && normalize_key(&p.landmark) == key)
}

/// Visual angle (degrees) subtended by an on-screen extent of `distance_px`
pub fn visual_angle_deg(distance_px: f64, geometry: &ScreenGeometry) -> f64 {
    let extent_mm = distance_px * geometry.pixel_size_mm;
    2.0 * (extent_mm / 2.0).atan2(geometry.viewing_distance_mm).to_degrees()
}

/// Estimator for face size from landmark gaze points
pub struct FaceSizeEstimator {
    geometry: ScreenGeometry,
}

impl Default for FaceSizeEstimator {
    fn default() -> Self {
        Self::new(ScreenGeometry::default())
    }
}

impl FaceSizeEstimator {
    pub fn new(geometry: ScreenGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &ScreenGeometry {
        &self.geometry
    }

    /// Estimate the face size for one identity
    pub fn estimate(&self, points: &[GazePoint], identity: Option<&str>) -> FaceSizeReport {
        let mut positions = Vec::with_capacity(REQUIRED_LANDMARKS.len());
        let mut missing = Vec::new();

        for landmark in REQUIRED_LANDMARKS {
            match lookup(points, identity, landmark).and_then(GazePoint::position) {
                Some(pos) => positions.push(pos),
                None => missing.push(landmark.to_string()),
            }
        }

        let outcome = if missing.is_empty() {
            let (chin, top, left, right) = (positions[0], positions[1], positions[2], positions[3]);
            FaceSizeOutcome::Measured(self.measure(chin, top, left, right))
        } else {
            log::info!(
                "Insufficient data for identity {}: missing {}",
                identity.unwrap_or("<none>"),
                missing.join(", ")
            );
            FaceSizeOutcome::InsufficientData { missing }
        };

        FaceSizeReport {
            identity: identity.map(str::to_string),
            outcome,
        }
    }

    /// One report per distinct identity, in order of first appearance
    pub fn estimate_all(&self, points: &[GazePoint]) -> Vec<FaceSizeReport> {
        let mut identities: Vec<Option<&str>> = Vec::new();
        for point in points {
            let identity = point.identity.as_deref();
            if !identities.iter().any(|seen| same_identity(*seen, identity)) {
                identities.push(identity);
            }
        }

        identities
            .into_iter()
            .map(|identity| self.estimate(points, identity))
            .collect()
    }

    fn measure(
        &self,
        chin: (f64, f64),
        top: (f64, f64),
        left: (f64, f64),
        right: (f64, f64),
    ) -> FaceSize {
        let height_px = distance(chin, top);
        let width_px = distance(left, right);
        let mm_to_cm = 0.1;

        FaceSize {
            angular_width_deg: visual_angle_deg(width_px, &self.geometry),
            angular_height_deg: visual_angle_deg(height_px, &self.geometry),
            physical_width_cm: width_px * self.geometry.pixel_size_mm * mm_to_cm,
            physical_height_cm: height_px * self.geometry.pixel_size_mm * mm_to_cm,
        }
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(identity: &str, landmark: &str, x: f64, y: f64) -> GazePoint {
        GazePoint {
            identity: Some(identity.to_string()),
            landmark: landmark.to_string(),
            mean_x: Some(x),
            mean_y: Some(y),
            t_end: 0.0,
            sample_count: 1,
        }
    }

    fn full_face(identity: &str) -> Vec<GazePoint> {
        vec![
            point(identity, "chin", 960.0, 700.0),
            point(identity, "top_of_head", 960.0, 300.0),
            point(identity, "left ear", 860.0, 500.0),
            point(identity, "Right Ear", 1060.0, 500.0),
        ]
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("top_of_head"), "top of head");
        assert_eq!(normalize_key("  Top  Of-Head "), "top of head");
        assert_eq!(normalize_key("LEFT EAR"), "left ear");
    }

    #[test]
    fn test_closed_form_estimate() {
        let geometry = ScreenGeometry::default();
        let report = FaceSizeEstimator::new(geometry).estimate(&full_face("Mark"), Some("mark"));
        let size = report.outcome.measured().copied().unwrap();

        let pixel_mm = 24.0 * 25.4 / (1920.0f64).hypot(1080.0);
        let expected_height = 2.0 * (400.0 * pixel_mm / 2.0).atan2(500.0).to_degrees();
        let expected_width = 2.0 * (200.0 * pixel_mm / 2.0).atan2(500.0).to_degrees();

        assert!((size.angular_height_deg - expected_height).abs() < 1e-6);
        assert!((size.angular_width_deg - expected_width).abs() < 1e-6);
        assert!((size.physical_height_cm - 400.0 * pixel_mm / 10.0).abs() < 1e-6);
        assert!((size.physical_width_cm - 200.0 * pixel_mm / 10.0).abs() < 1e-6);
        assert_eq!(report.identity.as_deref(), Some("mark"));
    }

    #[test]
    fn test_missing_landmark_is_insufficient() {
        let points: Vec<_> = full_face("Mark")
            .into_iter()
            .filter(|p| p.landmark != "left ear")
            .collect();
        let report = FaceSizeEstimator::default().estimate(&points, Some("Mark"));

        assert_eq!(
            report.outcome,
            FaceSizeOutcome::InsufficientData {
                missing: vec!["left ear".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_point_is_insufficient() {
        let mut points = full_face("Mark");
        points[0].mean_x = None;
        points[0].mean_y = None;
        let report = FaceSizeEstimator::default().estimate(&points, Some("Mark"));
        assert!(!report.outcome.is_measured());
    }

    #[test]
    fn test_lookup_is_restricted_to_identity() {
        let mut points = full_face("Mark");
        points.push(point("Helly", "chin", 0.0, 0.0));
        points.push(point("Helly", "top of head", 0.0, 100.0));

        let helly = FaceSizeEstimator::default().estimate(&points, Some("Helly"));
        match helly.outcome {
            FaceSizeOutcome::InsufficientData { missing } => {
                assert_eq!(missing, vec!["left ear".to_string(), "right ear".to_string()]);
            }
            other => panic!("expected insufficient data, got {:?}", other),
        }

        assert!(lookup(&points, None, "chin").is_none());
    }

    #[test]
    fn test_latest_point_wins() {
        let mut points = full_face("Mark");
        points.push(point("Mark", "chin", 960.0, 900.0));
        let found = lookup(&points, Some("MARK"), "Chin").unwrap();
        assert_eq!(found.mean_y, Some(900.0));
    }

    #[test]
    fn test_estimate_all_per_identity() {
        let mut points = full_face("Mark");
        points.push(point("Donald", "nose", 1.0, 1.0));
        points.push(point("mark", "nose", 1.0, 1.0));
        let reports = FaceSizeEstimator::default().estimate_all(&points);

        assert_eq!(reports.len(), 2);
        assert!(reports[0].outcome.is_measured());
        assert_eq!(reports[1].identity.as_deref(), Some("Donald"));
        assert!(!reports[1].outcome.is_measured());
    }

    #[test]
    fn test_visual_angle_zero_distance() {
        assert_eq!(visual_angle_deg(0.0, &ScreenGeometry::default()), 0.0);
    }
}
