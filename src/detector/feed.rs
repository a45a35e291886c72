//! # Detector Event Feed
//!
//! Reads the JSON Lines event stream from the SDK process and delivers
//! decoded [`DetectorEvent`]s over a tokio channel.
//!
//! The feed source is any `AsyncRead`: stdin when the SDK process pipes
//! into the bridge, or a FIFO/socket path from the configuration. Lines
//! that fail to decode are logged and skipped so one garbled line cannot
//! take the stream down. EOF closes the channel, which ends the main loop.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::DetectorEvent;

/// Read buffer chunk size for the feed
const READ_CHUNK_SIZE: usize = 4096;

/// Channel capacity for decoded events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Spawn a task reading detector events from `reader`.
///
/// Returns the receiving half of the event channel and the task handle.
/// The task runs until EOF or until the receiver is dropped.
pub fn spawn_feed_reader<R>(reader: R) -> (mpsc::Receiver<DetectorEvent>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let handle = tokio::spawn(read_events(reader, tx));
    (rx, handle)
}

/// Read loop: accumulate bytes, split on newlines, decode each line.
async fn read_events<R>(mut reader: R, tx: mpsc::Sender<DetectorEvent>)
where
    R: AsyncRead + Unpin + Send,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_SIZE);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                info!("Detector feed closed (EOF)");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Detector feed read error: {}", e);
                break;
            }
        };

        buffer.extend_from_slice(&chunk[..n]);

        while let Some(line) = take_line(&mut buffer) {
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<DetectorEvent>(&line) {
                Ok(event) => {
                    debug!("Decoded detector event: {:?}", event);
                    if tx.send(event).await.is_err() {
                        // Receiver dropped: the bridge is shutting down
                        return;
                    }
                }
                Err(e) => {
                    warn!(
                        "Skipping malformed feed line ({}): {:?}",
                        e,
                        String::from_utf8_lossy(&line)
                    );
                }
            }
        }
    }
}

/// Split one newline-terminated line off the front of the buffer.
///
/// Returns `None` when no complete line is buffered yet. A trailing `\r`
/// is stripped so CRLF feeds decode the same as LF feeds.
fn take_line(buffer: &mut BytesMut) -> Option<BytesMut> {
    let newline = buffer.iter().position(|&b| b == b'\n')?;
    let mut line = buffer.split_to(newline + 1);
    line.truncate(newline);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::events::TrackingState;

    #[test]
    fn test_take_line_splits_at_newline() {
        let mut buffer = BytesMut::from(&b"first\nsecond"[..]);

        let line = take_line(&mut buffer).unwrap();
        assert_eq!(&line[..], b"first");
        assert_eq!(&buffer[..], b"second");

        // No complete second line yet
        assert!(take_line(&mut buffer).is_none());
    }

    #[test]
    fn test_take_line_strips_carriage_return() {
        let mut buffer = BytesMut::from(&b"line\r\n"[..]);
        let line = take_line(&mut buffer).unwrap();
        assert_eq!(&line[..], b"line");
    }

    #[tokio::test]
    async fn test_feed_decodes_events() {
        let input = concat!(
            r#"{"type":"tracking","tracking_id":1,"state":"acquired"}"#,
            "\n",
            r#"{"type":"gesture","tracking_id":1,"name":"jump","detected":true}"#,
            "\n",
        );

        let (mut rx, handle) = spawn_feed_reader(input.as_bytes());

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            DetectorEvent::Tracking {
                tracking_id: 1,
                state: TrackingState::Acquired,
            }
        );

        let second = rx.recv().await.unwrap();
        match second {
            DetectorEvent::Gesture(result) => {
                assert_eq!(result.name, "jump");
                assert!(result.detected);
            }
            other => panic!("Expected gesture event, got: {:?}", other),
        }

        // EOF closes the channel
        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_skips_malformed_lines() {
        let input = concat!(
            "not json at all\n",
            r#"{"type":"gesture","tracking_id":5,"name":"kick_left","detected":true}"#,
            "\n",
        );

        let (mut rx, handle) = spawn_feed_reader(input.as_bytes());

        // The malformed line is skipped; the next valid event still arrives
        let event = rx.recv().await.unwrap();
        match event {
            DetectorEvent::Gesture(result) => assert_eq!(result.name, "kick_left"),
            other => panic!("Expected gesture event, got: {:?}", other),
        }

        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_skips_blank_lines() {
        let input = concat!(
            "\n\n",
            r#"{"type":"tracking","tracking_id":9,"state":"lost"}"#,
            "\n",
        );

        let (mut rx, handle) = spawn_feed_reader(input.as_bytes());

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            DetectorEvent::Tracking {
                tracking_id: 9,
                state: TrackingState::Lost,
            }
        );

        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_handles_incomplete_trailing_line() {
        // Final line has no newline: it must not be delivered
        let input = concat!(
            r#"{"type":"tracking","tracking_id":3,"state":"acquired"}"#,
            "\n",
            r#"{"type":"tracking","tracking_id":3,"#,
        );

        let (mut rx, handle) = spawn_feed_reader(input.as_bytes());

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            DetectorEvent::Tracking {
                tracking_id: 3,
                state: TrackingState::Acquired,
            }
        );

        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
    }
}
