//! # Body Tracking Gate
//!
//! Correlates detector results to the one actively tracked body.
//!
//! The detector reports gestures for whichever bodies it can see. The
//! bridge drives a single game controller, so exactly one body may own it
//! at a time: the first body acquired becomes active, results for any
//! other tracking id are ignored, and losing the active body hands the
//! controller to whoever is acquired next.

use tracing::{debug, info};

use super::events::{TrackingId, TrackingState};

/// What the caller must do after a tracking transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    /// Nothing changed for the active body
    Ignored,
    /// A body took ownership of the controller
    Activated(TrackingId),
    /// The active body was lost; all held pins must be released
    Deactivated(TrackingId),
}

/// Single-active-body gate over tracking ids.
#[derive(Debug, Default)]
pub struct BodyTracking {
    active: Option<TrackingId>,
}

impl BodyTracking {
    /// Creates a gate with no active body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active tracking id, if any.
    #[must_use]
    pub fn active(&self) -> Option<TrackingId> {
        self.active
    }

    /// Whether gesture results for this tracking id should be processed.
    #[must_use]
    pub fn accepts(&self, tracking_id: TrackingId) -> bool {
        self.active == Some(tracking_id)
    }

    /// Apply a tracking lifecycle transition.
    pub fn transition(&mut self, tracking_id: TrackingId, state: TrackingState) -> TrackingOutcome {
        match state {
            TrackingState::Acquired => {
                if self.active.is_some() {
                    debug!(
                        "Ignoring acquired body {} (body {:?} already active)",
                        tracking_id, self.active
                    );
                    return TrackingOutcome::Ignored;
                }
                info!("Body {} acquired, now driving the controller", tracking_id);
                self.active = Some(tracking_id);
                TrackingOutcome::Activated(tracking_id)
            }
            TrackingState::Lost => {
                if self.active != Some(tracking_id) {
                    debug!("Ignoring lost signal for inactive body {}", tracking_id);
                    return TrackingOutcome::Ignored;
                }
                info!("Body {} lost, releasing the controller", tracking_id);
                self.active = None;
                TrackingOutcome::Deactivated(tracking_id)
            }
        }
    }
}
