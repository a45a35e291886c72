//! # Gesture Bridge Library
//!
//! Turn depth-camera body gestures into button presses on a serial-connected
//! game controller board.
//!
//! This library provides the core functionality for bridging gesture-detection
//! events (delivered by an external depth-camera SDK process) to digital pin
//! writes on a microcontroller that emulates a game controller.

pub mod config;
pub mod error;
pub mod detector;
pub mod mapping;
pub mod board;
pub mod journal;
