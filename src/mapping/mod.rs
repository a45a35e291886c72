//! # Gesture Mapping Module
//!
//! The dispatch table from gesture name to output pin pattern.
//!
//! ## Patterns
//!
//! | Pattern | Detected | Undetected |
//! |----------|--------------------------------------|--------------------|
//! | tap | pin HIGH, hold `hold_ms`, pin LOW | no-op |
//! | hold | pin HIGH until the gesture ends | pin LOW |
//! | sequence | each step's level, then its delay | no-op |
//!
//! A *tap* is one button press of fixed duration (a punch). A *hold* keeps
//! the button down for as long as the detector reports the gesture (a
//! guard stance). A *sequence* writes several pins with fixed delays in
//! between (a special-move combo).
//!
//! The table is loaded once at startup from the `[gestures]` configuration
//! section, or falls back to the built-in default table. It is never
//! mutated afterwards.

pub mod dispatcher;

use serde::Deserialize;
use std::collections::HashMap;

use crate::board::PinLevel;
use crate::error::{GestureBridgeError, Result};

pub use dispatcher::Dispatcher;

/// Highest digital pin number accepted in a binding (Mega-class boards).
pub const MAX_PIN: u8 = 53;

/// Longest accepted tap hold or step delay in milliseconds.
pub const MAX_DELAY_MS: u64 = 5_000;

/// Most steps accepted in one sequence binding.
pub const MAX_SEQUENCE_STEPS: usize = 16;

/// Default tap hold duration in milliseconds.
pub const DEFAULT_TAP_HOLD_MS: u64 = 40;

fn default_tap_hold_ms() -> u64 {
    DEFAULT_TAP_HOLD_MS
}

/// One step of a sequence pattern: a pin write, then an optional delay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinStep {
    /// Digital pin to write
    pub pin: u8,
    /// Level to write (`"high"` or `"low"` in config)
    pub level: PinLevel,
    /// Fixed delay after the write, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

/// Output pattern bound to one gesture name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum PinPattern {
    /// Press and release one pin with a fixed hold duration
    Tap {
        pin: u8,
        #[serde(default = "default_tap_hold_ms")]
        hold_ms: u64,
    },
    /// Keep one pin HIGH while the gesture stays detected
    Hold { pin: u8 },
    /// Write a fixed series of pin levels with fixed delays
    Sequence { steps: Vec<PinStep> },
}

impl PinPattern {
    /// All pins this pattern touches, in order of first appearance.
    #[must_use]
    pub fn pins(&self) -> Vec<u8> {
        match self {
            PinPattern::Tap { pin, .. } | PinPattern::Hold { pin } => vec![*pin],
            PinPattern::Sequence { steps } => {
                let mut pins = Vec::new();
                for step in steps {
                    if !pins.contains(&step.pin) {
                        pins.push(step.pin);
                    }
                }
                pins
            }
        }
    }

    /// Short label for logs and the dispatch journal.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PinPattern::Tap { .. } => "tap",
            PinPattern::Hold { .. } => "hold",
            PinPattern::Sequence { .. } => "sequence",
        }
    }
}

/// Immutable gesture name -> pin pattern table.
///
/// # Examples
///
/// ```
/// use gesture_bridge::mapping::ActionMap;
///
/// let map = ActionMap::default_table();
/// assert!(map.lookup("punch_right").is_some());
/// assert!(map.lookup("moonwalk").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ActionMap {
    bindings: HashMap<String, PinPattern>,
}

impl ActionMap {
    /// Build a table from configured bindings, validating every entry.
    ///
    /// # Errors
    ///
    /// Returns `Mapping` errors for empty gesture names, out-of-range pins
    /// or delays, empty or oversized sequences, and two hold bindings
    /// sharing one pin (a shared hold pin could not be released exactly
    /// once).
    pub fn from_bindings(bindings: HashMap<String, PinPattern>) -> Result<Self> {
        let mut hold_pins: Vec<u8> = Vec::new();

        for (name, pattern) in &bindings {
            if name.is_empty() {
                return Err(GestureBridgeError::Mapping(
                    "gesture name cannot be empty".to_string(),
                ));
            }

            match pattern {
                PinPattern::Tap { pin, hold_ms } => {
                    validate_pin(name, *pin)?;
                    validate_delay(name, *hold_ms)?;
                }
                PinPattern::Hold { pin } => {
                    validate_pin(name, *pin)?;
                    if hold_pins.contains(pin) {
                        return Err(GestureBridgeError::Mapping(format!(
                            "hold pin {} is bound to more than one gesture",
                            pin
                        )));
                    }
                    hold_pins.push(*pin);
                }
                PinPattern::Sequence { steps } => {
                    if steps.is_empty() {
                        return Err(GestureBridgeError::Mapping(format!(
                            "gesture '{}' has an empty sequence",
                            name
                        )));
                    }
                    if steps.len() > MAX_SEQUENCE_STEPS {
                        return Err(GestureBridgeError::Mapping(format!(
                            "gesture '{}' has {} steps (max {})",
                            name,
                            steps.len(),
                            MAX_SEQUENCE_STEPS
                        )));
                    }
                    let mut last_level: HashMap<u8, PinLevel> = HashMap::new();
                    for step in steps {
                        validate_pin(name, step.pin)?;
                        validate_delay(name, step.delay_ms)?;
                        last_level.insert(step.pin, step.level);
                    }

                    // The final write to each pin must be LOW: a completed
                    // sequence never leaves a button pressed
                    let mut stuck: Vec<u8> = last_level
                        .into_iter()
                        .filter(|&(_, level)| level == PinLevel::High)
                        .map(|(pin, _)| pin)
                        .collect();
                    stuck.sort_unstable();
                    if !stuck.is_empty() {
                        return Err(GestureBridgeError::Mapping(format!(
                            "gesture '{}' sequence would leave pins {:?} high",
                            name, stuck
                        )));
                    }
                }
            }
        }

        Ok(Self { bindings })
    }

    /// The built-in table used when the configuration has no `[gestures]`
    /// section. Pin assignments match the reference controller sketch.
    #[must_use]
    pub fn default_table() -> Self {
        let mut bindings = HashMap::new();

        bindings.insert(
            "punch_left".to_string(),
            PinPattern::Tap { pin: 2, hold_ms: DEFAULT_TAP_HOLD_MS },
        );
        bindings.insert(
            "punch_right".to_string(),
            PinPattern::Tap { pin: 3, hold_ms: DEFAULT_TAP_HOLD_MS },
        );
        bindings.insert(
            "kick_left".to_string(),
            PinPattern::Tap { pin: 4, hold_ms: DEFAULT_TAP_HOLD_MS },
        );
        bindings.insert(
            "kick_right".to_string(),
            PinPattern::Tap { pin: 5, hold_ms: DEFAULT_TAP_HOLD_MS },
        );
        bindings.insert(
            "jump".to_string(),
            PinPattern::Tap { pin: 6, hold_ms: DEFAULT_TAP_HOLD_MS },
        );
        bindings.insert("guard".to_string(), PinPattern::Hold { pin: 7 });
        bindings.insert(
            "special_move".to_string(),
            PinPattern::Sequence {
                steps: vec![
                    PinStep { pin: 8, level: PinLevel::High, delay_ms: 30 },
                    PinStep { pin: 8, level: PinLevel::Low, delay_ms: 30 },
                    PinStep { pin: 3, level: PinLevel::High, delay_ms: 40 },
                    PinStep { pin: 3, level: PinLevel::Low, delay_ms: 0 },
                ],
            },
        );

        // The default table passes its own validation
        Self { bindings }
    }

    /// Look up the pattern bound to a gesture name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&PinPattern> {
        self.bindings.get(name)
    }

    /// Number of bound gestures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All gesture names in the table, sorted.
    #[must_use]
    pub fn gesture_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every pin any binding touches, sorted and deduplicated.
    ///
    /// Used at startup to configure each pin as a digital output.
    #[must_use]
    pub fn output_pins(&self) -> Vec<u8> {
        let mut pins: Vec<u8> = self
            .bindings
            .values()
            .flat_map(|pattern| pattern.pins())
            .collect();
        pins.sort_unstable();
        pins.dedup();
        pins
    }
}

fn validate_pin(gesture: &str, pin: u8) -> Result<()> {
    if pin > MAX_PIN {
        return Err(GestureBridgeError::Mapping(format!(
            "gesture '{}' uses pin {} (max {})",
            gesture, pin, MAX_PIN
        )));
    }
    Ok(())
}

fn validate_delay(gesture: &str, delay_ms: u64) -> Result<()> {
    if delay_ms > MAX_DELAY_MS {
        return Err(GestureBridgeError::Mapping(format!(
            "gesture '{}' uses a {}ms delay (max {}ms)",
            gesture, delay_ms, MAX_DELAY_MS
        )));
    }
    Ok(())
}
