//! Landmark window extraction
//!
//! Recovers `(identity, landmark, start, end)` intervals from the normalized
//! event stream in a single forward scan.

use crate::config::EventVocabulary;
use crate::types::{Event, LandmarkWindow};

/// Window under construction during the scan
struct OpenWindow {
    identity: Option<String>,
    landmark: String,
    start: f64,
}

/// Extractor for landmark windows
pub struct WindowExtractor<'a> {
    vocabulary: &'a EventVocabulary,
}

impl<'a> WindowExtractor<'a> {
    pub fn new(vocabulary: &'a EventVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Pair each start event with the next end event.
    ///
    /// The identity of a window is the one named by the nearest identity
    /// prompt preceding its start event, or `None` if no prompt precedes it.
    /// An end event with no open window is ignored. A start event while a
    /// window is open replaces the open window.
    pub fn extract(&self, events: &[Event]) -> Vec<LandmarkWindow> {
        let mut windows = Vec::new();
        let mut current_identity: Option<String> = None;
        let mut open: Option<OpenWindow> = None;

        for event in events {
            if let Some(id) = self.vocabulary.prompt_identity(&event.name) {
                current_identity = Some(normalize_identity(id));
            } else if event.name == self.vocabulary.landmark_start {
                if let Some(dropped) = open.take() {
                    log::warn!(
                        "Landmark window '{}' opened at {:.3}s was never closed; dropping it",
                        dropped.landmark,
                        dropped.start
                    );
                }
                open = Some(OpenWindow {
                    identity: current_identity.clone(),
                    landmark: event.label.clone(),
                    start: event.time,
                });
            } else if event.name == self.vocabulary.landmark_end {
                match open.take() {
                    Some(window) => windows.push(LandmarkWindow {
                        identity: window.identity,
                        landmark: window.landmark,
                        start: window.start,
                        end: event.time,
                    }),
                    None => log::debug!("Ignoring unmatched landmark end at {:.3}s", event.time),
                }
            }
        }

        if let Some(window) = open {
            log::warn!(
                "Landmark window '{}' opened at {:.3}s has no end event",
                window.landmark,
                window.start
            );
        }

        windows
    }
}

/// Capitalize an identity as a name: `mark` -> `Mark`
pub fn normalize_identity(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(events: &[Event]) -> Vec<LandmarkWindow> {
        let vocabulary = EventVocabulary::default();
        WindowExtractor::new(&vocabulary).extract(events)
    }

    #[test]
    fn test_identity_resolution() {
        let events = vec![
            Event::new("visualization_prompt_mark_start", "", 1.0),
            Event::new("landmark_start", "nose", 2.0),
            Event::new("landmark_end", "", 3.0),
        ];
        let windows = extract(&events);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].identity.as_deref(), Some("Mark"));
        assert_eq!(windows[0].landmark, "nose");
        assert_eq!((windows[0].start, windows[0].end), (2.0, 3.0));
    }

    #[test]
    fn test_one_window_per_pair() {
        let mut events = vec![Event::new("visualization_prompt_LUCIA_start", "", 0.0)];
        for (i, land) in ["nose", "chin", "left ear"].iter().enumerate() {
            let t = 10.0 * (i as f64 + 1.0);
            events.push(Event::new("landmark_start", *land, t));
            events.push(Event::new("landmark_end", *land, t + 2.5));
        }
        let windows = extract(&events);

        assert_eq!(windows.len(), 3);
        assert!(windows.iter().all(|w| w.start < w.end));
        assert!(windows.iter().all(|w| w.identity.as_deref() == Some("Lucia")));
        assert_eq!(windows[2].landmark, "left ear");
    }

    #[test]
    fn test_no_prompt_gives_no_identity() {
        let events = vec![
            Event::new("visualization_prompt_start", "", 0.5),
            Event::new("landmark_start", "nose", 1.0),
            Event::new("landmark_end", "", 2.0),
        ];
        let windows = extract(&events);
        assert_eq!(windows[0].identity, None);
    }

    #[test]
    fn test_identity_carries_to_latest_prompt() {
        let events = vec![
            Event::new("visualization_prompt_mark_start", "", 0.0),
            Event::new("landmark_start", "nose", 1.0),
            Event::new("landmark_end", "", 2.0),
            Event::new("visualization_prompt_donald_start", "", 3.0),
            Event::new("landmark_start", "chin", 4.0),
            Event::new("landmark_end", "", 5.0),
            Event::new("landmark_start", "mouth", 6.0),
            Event::new("landmark_end", "", 7.0),
        ];
        let identities: Vec<_> = extract(&events)
            .into_iter()
            .map(|w| w.identity.unwrap_or_default())
            .collect();
        assert_eq!(identities, vec!["Mark", "Donald", "Donald"]);
    }

    #[test]
    fn test_unmatched_end_is_ignored() {
        let events = vec![
            Event::new("landmark_end", "", 0.5),
            Event::new("landmark_start", "nose", 1.0),
            Event::new("landmark_end", "", 2.0),
            Event::new("landmark_end", "", 2.5),
        ];
        let windows = extract(&events);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end, 2.0);
    }

    #[test]
    fn test_restart_overwrites_open_window() {
        let events = vec![
            Event::new("landmark_start", "nose", 1.0),
            Event::new("landmark_start", "chin", 2.0),
            Event::new("landmark_end", "", 3.0),
        ];
        let windows = extract(&events);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].landmark, "chin");
        assert_eq!(windows[0].start, 2.0);
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocabulary = EventVocabulary {
            landmark_start: "landmark_instruction_start".to_string(),
            landmark_end: "landmark_instruction_end".to_string(),
            ..Default::default()
        };
        let events = vec![
            Event::new("landmark_instruction_start", "mouth", 1.0),
            Event::new("landmark_start", "ignored", 1.5),
            Event::new("landmark_instruction_end", "mouth", 2.0),
        ];
        let windows = WindowExtractor::new(&vocabulary).extract(&events);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].landmark, "mouth");
    }

    #[test]
    fn test_normalize_identity() {
        assert_eq!(normalize_identity("mark"), "Mark");
        assert_eq!(normalize_identity("HELLY"), "Helly");
        assert_eq!(normalize_identity(" donald "), "Donald");
        assert_eq!(normalize_identity(""), "");
    }
}
