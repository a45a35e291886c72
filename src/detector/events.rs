//! # Detector Event Types
//!
//! Wire types for the gesture-detection event feed.
//!
//! The SDK process emits one JSON object per line. Two kinds of events
//! arrive: discrete gesture results and body-tracking lifecycle signals.
//!
//! ```text
//! {"type":"gesture","tracking_id":72057594037928806,"name":"punch_right","detected":true,"confidence":0.91}
//! {"type":"tracking","tracking_id":72057594037928806,"state":"lost"}
//! ```

use serde::Deserialize;

/// Identifier correlating detection results to one physically tracked body.
///
/// Assigned by the SDK when it starts tracking a body and never reused
/// within a session.
pub type TrackingId = u64;

/// Body-tracking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// The SDK started tracking this body
    Acquired,
    /// The SDK lost this body (left the frame, occluded)
    Lost,
}

/// One discrete gesture result from the detector
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GestureResult {
    /// Body this result belongs to
    pub tracking_id: TrackingId,
    /// Gesture name as trained in the SDK's gesture database
    pub name: String,
    /// Whether the gesture is currently detected
    pub detected: bool,
    /// Detector confidence (0.0-1.0), when the SDK reports one
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl GestureResult {
    /// Whether this result counts as detected at the given confidence floor.
    ///
    /// Results without a confidence value pass any threshold; the boolean
    /// flag alone decides.
    #[must_use]
    pub fn detected_with_confidence(&self, min_confidence: f32) -> bool {
        match self.confidence {
            Some(c) => self.detected && c >= min_confidence,
            None => self.detected,
        }
    }
}

/// One event from the detector feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorEvent {
    /// A gesture detection result for one tracked body
    Gesture(GestureResult),
    /// A body-tracking lifecycle transition
    Tracking {
        tracking_id: TrackingId,
        state: TrackingState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gesture_event() {
        let line = r#"{"type":"gesture","tracking_id":42,"name":"punch_right","detected":true,"confidence":0.91}"#;
        let event: DetectorEvent = serde_json::from_str(line).unwrap();

        match event {
            DetectorEvent::Gesture(result) => {
                assert_eq!(result.tracking_id, 42);
                assert_eq!(result.name, "punch_right");
                assert!(result.detected);
                assert_eq!(result.confidence, Some(0.91));
            }
            other => panic!("Expected gesture event, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_gesture_event_without_confidence() {
        let line = r#"{"type":"gesture","tracking_id":7,"name":"guard","detected":false}"#;
        let event: DetectorEvent = serde_json::from_str(line).unwrap();

        match event {
            DetectorEvent::Gesture(result) => {
                assert!(!result.detected);
                assert_eq!(result.confidence, None);
            }
            other => panic!("Expected gesture event, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_tracking_acquired() {
        let line = r#"{"type":"tracking","tracking_id":42,"state":"acquired"}"#;
        let event: DetectorEvent = serde_json::from_str(line).unwrap();

        assert_eq!(
            event,
            DetectorEvent::Tracking {
                tracking_id: 42,
                state: TrackingState::Acquired,
            }
        );
    }

    #[test]
    fn test_decode_tracking_lost() {
        let line = r#"{"type":"tracking","tracking_id":42,"state":"lost"}"#;
        let event: DetectorEvent = serde_json::from_str(line).unwrap();

        assert_eq!(
            event,
            DetectorEvent::Tracking {
                tracking_id: 42,
                state: TrackingState::Lost,
            }
        );
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let line = r#"{"type":"frame","tracking_id":42}"#;
        let result: Result<DetectorEvent, _> = serde_json::from_str(line);
        assert!(result.is_err());
    }

    #[test]
    fn test_detected_with_confidence_threshold() {
        let result = GestureResult {
            tracking_id: 1,
            name: "jump".to_string(),
            detected: true,
            confidence: Some(0.5),
        };

        assert!(result.detected_with_confidence(0.0));
        assert!(result.detected_with_confidence(0.5));
        assert!(!result.detected_with_confidence(0.7));
    }

    #[test]
    fn test_detected_without_confidence_ignores_threshold() {
        let result = GestureResult {
            tracking_id: 1,
            name: "jump".to_string(),
            detected: true,
            confidence: None,
        };

        // No confidence reported: the boolean flag alone decides
        assert!(result.detected_with_confidence(0.99));
    }

    #[test]
    fn test_undetected_never_passes_threshold() {
        let result = GestureResult {
            tracking_id: 1,
            name: "jump".to_string(),
            detected: false,
            confidence: Some(0.99),
        };

        assert!(!result.detected_with_confidence(0.0));
    }
}
