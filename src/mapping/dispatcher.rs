//! # Gesture Dispatcher
//!
//! Executes the pin pattern bound to each gesture result.
//!
//! On a detected transition the bound pattern runs to completion: a tap
//! presses and releases its pin around a fixed sleep, a hold presses its
//! pin and remembers it, a sequence writes each step and sleeps each
//! step's delay. On an undetected transition only a held gesture reacts,
//! releasing its pin. Gesture names with no binding are silently ignored.
//!
//! Events are processed sequentially; the serial link to the board is the
//! one shared resource and press/release ordering must be preserved.

use std::collections::HashMap;
use std::io;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use super::{ActionMap, PinPattern};
use crate::board::{DigitalOut, PinLevel};
use crate::detector::events::GestureResult;

/// Summary of one executed dispatch, for logs and the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Gesture name that triggered the dispatch
    pub gesture: String,
    /// What ran: `tap`, `hold`, `release`, or `sequence`
    pub action: &'static str,
    /// Pins touched, in write order
    pub pins: Vec<u8>,
}

/// Translates gesture results into pin writes on the board.
///
/// Holds the immutable [`ActionMap`] and the set of currently held pins.
/// The board is any [`DigitalOut`] implementation; tests use the recording
/// mock, the binary uses the serial board.
pub struct Dispatcher<B: DigitalOut> {
    board: B,
    map: ActionMap,
    min_confidence: f32,
    /// Gesture name -> pin currently held HIGH
    held: HashMap<String, u8>,
}

impl<B: DigitalOut> Dispatcher<B> {
    /// Creates a dispatcher over a board and a validated action map.
    pub fn new(board: B, map: ActionMap, min_confidence: f32) -> Self {
        Self {
            board,
            map,
            min_confidence,
            held: HashMap::new(),
        }
    }

    /// Configure every mapped pin as a digital output.
    ///
    /// Called once after the board link opens, before any dispatch.
    pub async fn configure_outputs(&mut self) -> io::Result<()> {
        let pins = self.map.output_pins();
        for &pin in &pins {
            self.board.pin_mode_output(pin).await?;
        }
        info!("Configured {} output pins: {:?}", pins.len(), pins);
        Ok(())
    }

    /// Dispatch one gesture result.
    ///
    /// Returns `Ok(Some(outcome))` when a pattern ran, `Ok(None)` when the
    /// result was ignored (unknown gesture, below the confidence floor and
    /// nothing held, repeat of an already-held gesture).
    pub async fn dispatch(&mut self, result: &GestureResult) -> io::Result<Option<DispatchOutcome>> {
        if result.detected_with_confidence(self.min_confidence) {
            self.on_detected(result).await
        } else {
            self.on_undetected(&result.name).await
        }
    }

    async fn on_detected(&mut self, result: &GestureResult) -> io::Result<Option<DispatchOutcome>> {
        let Some(pattern) = self.map.lookup(&result.name).cloned() else {
            debug!("No binding for gesture '{}', ignoring", result.name);
            return Ok(None);
        };

        match pattern {
            PinPattern::Tap { pin, hold_ms } => {
                self.board.digital_write(pin, PinLevel::High).await?;
                sleep(Duration::from_millis(hold_ms)).await;
                if let Err(e) = self.board.digital_write(pin, PinLevel::Low).await {
                    // The pin is HIGH and nothing tracks it after this
                    // point; it must not stay pressed over one lost write
                    self.settle_low(&[pin]).await;
                    return Err(e);
                }

                debug!("Tapped pin {} for '{}' ({}ms)", pin, result.name, hold_ms);
                Ok(Some(DispatchOutcome {
                    gesture: result.name.clone(),
                    action: "tap",
                    pins: vec![pin],
                }))
            }
            PinPattern::Hold { pin } => {
                if self.held.contains_key(&result.name) {
                    // Detector repeats results every frame while a gesture
                    // stays active; the pin is already HIGH
                    return Ok(None);
                }
                self.board.digital_write(pin, PinLevel::High).await?;
                self.held.insert(result.name.clone(), pin);

                debug!("Holding pin {} for '{}'", pin, result.name);
                Ok(Some(DispatchOutcome {
                    gesture: result.name.clone(),
                    action: "hold",
                    pins: vec![pin],
                }))
            }
            PinPattern::Sequence { steps } => {
                let mut pins = Vec::with_capacity(steps.len());
                for step in &steps {
                    if let Err(e) = self.board.digital_write(step.pin, step.level).await {
                        // Pins already driven may be sitting HIGH
                        self.settle_low(&pins).await;
                        return Err(e);
                    }
                    pins.push(step.pin);
                    if step.delay_ms > 0 {
                        sleep(Duration::from_millis(step.delay_ms)).await;
                    }
                }

                debug!(
                    "Ran {}-step sequence for '{}' on pins {:?}",
                    steps.len(),
                    result.name,
                    pins
                );
                Ok(Some(DispatchOutcome {
                    gesture: result.name.clone(),
                    action: "sequence",
                    pins,
                }))
            }
        }
    }

    async fn on_undetected(&mut self, name: &str) -> io::Result<Option<DispatchOutcome>> {
        let Some(&pin) = self.held.get(name) else {
            return Ok(None);
        };

        // Drop the held entry only once the LOW write lands; a failed
        // release stays held and is retried on the next transition
        self.board.digital_write(pin, PinLevel::Low).await?;
        self.held.remove(name);
        debug!("Released pin {} for '{}'", pin, name);
        Ok(Some(DispatchOutcome {
            gesture: name.to_string(),
            action: "release",
            pins: vec![pin],
        }))
    }

    /// Release every held pin (tracking lost, shutdown).
    ///
    /// Each released pin is written LOW exactly once and removed from the
    /// held set as its write lands; entries whose write fails stay held so
    /// a later call can retry them. Pins are released in sorted order for
    /// deterministic logs.
    pub async fn release_all(&mut self) -> io::Result<Vec<DispatchOutcome>> {
        let mut entries: Vec<(String, u8)> = self
            .held
            .iter()
            .map(|(name, &pin)| (name.clone(), pin))
            .collect();
        entries.sort_by_key(|(_, pin)| *pin);

        let mut outcomes = Vec::with_capacity(entries.len());
        for (name, pin) in entries {
            self.board.digital_write(pin, PinLevel::Low).await?;
            self.held.remove(&name);
            info!("Released held pin {} for '{}'", pin, name);
            outcomes.push(DispatchOutcome {
                gesture: name,
                action: "release",
                pins: vec![pin],
            });
        }
        Ok(outcomes)
    }

    /// Best-effort LOW writes to pins possibly left HIGH by a failed
    /// pattern. Write errors here are logged, not propagated; the caller
    /// already has the original error.
    async fn settle_low(&mut self, pins: &[u8]) {
        let mut seen: Vec<u8> = Vec::with_capacity(pins.len());
        for &pin in pins {
            if seen.contains(&pin) {
                continue;
            }
            seen.push(pin);
            if let Err(e) = self.board.digital_write(pin, PinLevel::Low).await {
                warn!("Could not settle pin {} low: {}", pin, e);
            }
        }
    }

    /// Number of pins currently held HIGH.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

}
