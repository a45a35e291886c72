//! # Serial Board Link
//!
//! Opens the serial port to the controller board and emits the two per-pin
//! commands the firmware understands: set pin mode and set digital pin value.
//! Each command is three bytes; nothing is read back from the link.
//!
//! A failed write triggers one reconnect attempt: the port is reopened
//! after the configured interval and the command is retried, covering the
//! USB re-enumeration an Arduino-class board goes through on reset.

use async_trait::async_trait;
use std::io;
use tokio::time::{sleep, Duration};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::output::{DigitalOut, PinLevel};
use crate::error::{GestureBridgeError, Result};

/// Default baud rate for the board link (Arduino-class USB serial)
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Serial link tuning, taken from the `[serial]` configuration section.
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions {
    /// Baud rate for the 8N1 connection
    pub baud_rate: u32,
    /// Port I/O timeout in milliseconds
    pub timeout_ms: u64,
    /// Wait before the reconnect attempt after a failed write
    pub reconnect_interval_ms: u64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 100,
            reconnect_interval_ms: 1000,
        }
    }
}

/// Command byte: set pin mode (followed by pin, mode)
pub const CMD_SET_PIN_MODE: u8 = 0xF4;

/// Command byte: set digital pin value (followed by pin, 0/1)
pub const CMD_SET_DIGITAL_PIN_VALUE: u8 = 0xF5;

/// Pin mode value for digital output
pub const PIN_MODE_OUTPUT: u8 = 0x01;

/// Default board device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (Uno R3/R4, Leonardo)
    "/dev/ttyUSB0", // USB-to-serial adapters (Nano clones)
];

/// Encode a set-pin-mode command
#[must_use]
pub fn encode_pin_mode_output(pin: u8) -> [u8; 3] {
    [CMD_SET_PIN_MODE, pin, PIN_MODE_OUTPUT]
}

/// Encode a set-digital-pin-value command
#[must_use]
pub fn encode_digital_write(pin: u8, level: PinLevel) -> [u8; 3] {
    [CMD_SET_DIGITAL_PIN_VALUE, pin, level.as_byte()]
}

/// Serial link to the controller board
///
/// Manages the connection to the microcontroller that emulates the game
/// controller. Implements [`DigitalOut`] so the dispatcher never sees the
/// serial layer directly.
pub struct SerialBoard {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Link tuning, kept for reconnects
    options: LinkOptions,
}

impl std::fmt::Debug for SerialBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialBoard")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialBoard {
    /// Open a connection to the board, auto-detecting the device path
    ///
    /// Tries the common USB serial paths in order of preference.
    ///
    /// # Errors
    ///
    /// Returns error if no board is found or the connection fails
    pub fn open(options: LinkOptions) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, options)
    }

    /// Open a connection to the board with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `options` - Baud rate, timeout, and reconnect interval
    pub fn open_with_paths(paths: &[&str], options: LinkOptions) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, &options) {
                Ok(port) => {
                    info!("Successfully opened board at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                        options,
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(GestureBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, options: &LinkOptions) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, options.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(std::time::Duration::from_millis(options.timeout_ms))
            .open_native_async()
            .map_err(|e| GestureBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Send a raw command to the board, reconnecting once on failure
    async fn send_command(&mut self, command: &[u8]) -> io::Result<()> {
        if let Err(e) = self.write_command(command).await {
            warn!(
                "Board write failed ({}), reconnecting to {} in {}ms",
                e, self.device_path, self.options.reconnect_interval_ms
            );
            sleep(Duration::from_millis(self.options.reconnect_interval_ms)).await;

            self.port = Self::open_port(&self.device_path, &self.options)
                .map_err(|open_err| io::Error::new(io::ErrorKind::NotConnected, open_err.to_string()))?;
            self.write_command(command).await?;
            info!("Reconnected to board at {}", self.device_path);
        }
        Ok(())
    }

    /// Write one command and flush it
    async fn write_command(&mut self, command: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;

        self.port.write_all(command).await?;
        self.port.flush().await?;

        debug!("Sent board command ({} bytes)", command.len());
        Ok(())
    }

    /// Get the device path of the opened serial port
    ///
    /// Returns the path to the serial device that was successfully opened
    /// (e.g., "/dev/ttyACM0" or "/dev/ttyUSB0").
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl DigitalOut for SerialBoard {
    async fn pin_mode_output(&mut self, pin: u8) -> io::Result<()> {
        self.send_command(&encode_pin_mode_output(pin)).await
    }

    async fn digital_write(&mut self, pin: u8, level: PinLevel) -> io::Result<()> {
        self.send_command(&encode_digital_write(pin, level)).await
    }
}
