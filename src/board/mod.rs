//! # Board Module
//!
//! Digital output to the serial-connected controller board.
//!
//! This module handles:
//! - The [`output::DigitalOut`] seam every pin write goes through
//! - Opening the serial port at the configured baud rate
//! - Emitting the minimal per-pin command bytes (pin mode, digital write)
//!
//! The board firmware owns everything protocol-shaped beyond those two
//! commands; nothing is read back from the link.

pub mod output;
pub mod serial;

pub use output::{DigitalOut, PinLevel};
pub use serial::{LinkOptions, SerialBoard};
