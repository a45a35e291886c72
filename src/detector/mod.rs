//! # Detector Module
//!
//! Subscription seam to the external gesture-detection SDK.
//!
//! This module handles:
//! - Decoding the JSON Lines event feed the SDK process emits
//! - Delivering events over a tokio channel
//! - Correlating detection results to the one actively tracked body
//!
//! Gesture classification itself happens in the SDK process against its
//! pre-trained gesture database; this side only consumes the results.

pub mod events;
pub mod feed;
pub mod tracking;

pub use events::DetectorEvent;
pub use feed::spawn_feed_reader;
pub use tracking::{BodyTracking, TrackingOutcome};
