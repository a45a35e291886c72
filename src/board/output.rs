//! Trait abstraction for digital pin output to enable testing

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;

/// Digital voltage level of an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLevel {
    /// Low voltage (button released)
    Low,
    /// High voltage (button pressed)
    High,
}

impl PinLevel {
    /// Wire value for the pin level (0 or 1).
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

/// Trait for digital pin output operations
#[async_trait]
pub trait DigitalOut: Send {
    /// Configure a pin as a digital output
    async fn pin_mode_output(&mut self, pin: u8) -> io::Result<()>;

    /// Set a pin to the given level
    async fn digital_write(&mut self, pin: u8, level: PinLevel) -> io::Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_level_as_byte() {
        assert_eq!(PinLevel::Low.as_byte(), 0);
        assert_eq!(PinLevel::High.as_byte(), 1);
    }

    #[test]
    fn test_mock_board_records_operations() {
        tokio_test::block_on(async {
            let mut board = mocks::MockBoard::new();

            board.pin_mode_output(2).await.unwrap();
            board.digital_write(2, PinLevel::High).await.unwrap();
            board.digital_write(2, PinLevel::Low).await.unwrap();

            assert_eq!(board.get_configured_pins(), vec![2]);
            assert_eq!(
                board.get_writes(),
                vec![(2, PinLevel::High), (2, PinLevel::Low)]
            );
        });
    }

    #[test]
    fn test_mock_board_injected_write_error() {
        tokio_test::block_on(async {
            let mut board = mocks::MockBoard::new();
            board.set_write_error(io::ErrorKind::BrokenPipe);

            let result = board.digital_write(3, PinLevel::High).await;
            assert!(result.is_err());
            assert!(board.get_writes().is_empty());

            board.clear_write_error();
            board.digital_write(3, PinLevel::High).await.unwrap();
            assert_eq!(board.get_writes(), vec![(3, PinLevel::High)]);
        });
    }

    #[test]
    fn test_mock_board_nth_write_error_is_one_shot() {
        tokio_test::block_on(async {
            let mut board = mocks::MockBoard::new();
            board.set_write_error_on_nth(2, io::ErrorKind::BrokenPipe);

            board.digital_write(3, PinLevel::High).await.unwrap();
            assert!(board.digital_write(3, PinLevel::Low).await.is_err());
            board.digital_write(3, PinLevel::Low).await.unwrap();

            // Only the successful writes are recorded
            assert_eq!(
                board.get_writes(),
                vec![(3, PinLevel::High), (3, PinLevel::Low)]
            );
        });
    }
}
