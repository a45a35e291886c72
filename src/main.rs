//! # Gesture Bridge
//!
//! Turn depth-camera body gestures into button presses on a serial-connected
//! game controller board.
//!
//! This application bridges gesture-detection events to digital pin writes
//! on the microcontroller that emulates the game controller.

use anyhow::Result;
use std::os::unix::fs::FileTypeExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod board;
mod config;
mod detector;
mod error;
mod journal;
mod mapping;

use board::{LinkOptions, SerialBoard};
use config::Config;
use detector::{spawn_feed_reader, BodyTracking, DetectorEvent, TrackingOutcome};
use journal::Journal;
use mapping::Dispatcher;

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of feed events between status log messages
const LOG_INTERVAL_EVENTS: u64 = 500;

/// Main entry point for Gesture Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber (console, plus a rolling
///      file in the journal directory when the journal is enabled)
///    - Load configuration (first CLI argument, or `config/default.toml`,
///      or built-in defaults when neither exists)
///    - Open the serial link to the controller board
///    - Configure every mapped pin as a digital output
///    - Spawn the detector feed reader
///
/// 2. **Main Loop**
///    - Gate gesture results through the body-tracking state
///    - Dispatch each accepted result to its pin pattern
///    - Journal executed dispatches
///    - Log status every 500 feed events
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Release every held pin
///    - Log event and dispatch totals
///
/// # Errors
///
/// Returns error if:
/// - Configuration is invalid
/// - No controller board is found on the serial ports
/// - The feed source cannot be opened
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_tracing(&config);

    info!("Gesture Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Gesture database: {} (loaded by the detector process)",
        config.detector.database
    );

    // Build the dispatch table before touching any hardware
    let map = config.action_map()?;
    info!(
        "Loaded {} gesture bindings: {:?}",
        map.len(),
        map.gesture_names()
    );

    // Open the serial link to the controller board
    let link = LinkOptions {
        baud_rate: config.serial.baud_rate,
        timeout_ms: config.serial.timeout_ms,
        reconnect_interval_ms: config.serial.reconnect_interval_ms,
    };
    let board = if config.serial.port.is_empty() {
        SerialBoard::open(link)?
    } else {
        SerialBoard::open_with_paths(&[config.serial.port.as_str()], link)?
    };
    info!("Board serial port opened at: {}", board.device_path());

    let mut dispatcher = Dispatcher::new(board, map, config.detector.min_confidence);
    dispatcher.configure_outputs().await?;

    let mut journal = open_journal(&config);

    // Spawn the detector feed reader
    let (mut events, feed_task) = open_feed(&config).await?;
    info!("Detector feed open ({})", config.detector.feed);
    info!("Press Ctrl+C to exit");

    let mut tracking = BodyTracking::new();
    let mut event_count: u64 = 0;
    let mut dispatch_count: u64 = 0;
    let mut last_log_count: u64 = 0;

    // Main event loop
    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    info!("Detector feed ended");
                    break;
                };
                event_count += 1;

                handle_event(
                    event,
                    &mut tracking,
                    &mut dispatcher,
                    journal.as_mut(),
                    &mut dispatch_count,
                )
                .await;

                // Log status every LOG_INTERVAL_EVENTS
                if event_count - last_log_count >= LOG_INTERVAL_EVENTS {
                    info!(
                        "Processed {} feed events, {} dispatches, {} pins held",
                        event_count, dispatch_count, dispatcher.held_count()
                    );
                    last_log_count = event_count;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Never leave a button pressed on exit
    match dispatcher.release_all().await {
        Ok(released) if !released.is_empty() => {
            info!("Released {} held pins on shutdown", released.len());
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to release held pins on shutdown: {}", e),
    }

    feed_task.abort();
    info!(
        "Total feed events: {}, total dispatches: {}",
        event_count, dispatch_count
    );

    Ok(())
}

/// Process one detector event: tracking transitions gate gesture results.
async fn handle_event(
    event: DetectorEvent,
    tracking: &mut BodyTracking,
    dispatcher: &mut Dispatcher<SerialBoard>,
    mut journal: Option<&mut Journal>,
    dispatch_count: &mut u64,
) {
    match event {
        DetectorEvent::Tracking { tracking_id, state } => {
            if let TrackingOutcome::Deactivated(_) = tracking.transition(tracking_id, state) {
                match dispatcher.release_all().await {
                    Ok(outcomes) => {
                        for outcome in &outcomes {
                            record_outcome(journal.as_deref_mut(), outcome);
                        }
                    }
                    Err(e) => warn!("Failed to release held pins: {}", e),
                }
            }
        }
        DetectorEvent::Gesture(result) => {
            if !tracking.accepts(result.tracking_id) {
                debug!(
                    "Ignoring gesture '{}' from inactive body {}",
                    result.name, result.tracking_id
                );
                return;
            }

            match dispatcher.dispatch(&result).await {
                Ok(Some(outcome)) => {
                    *dispatch_count += 1;
                    record_outcome(journal.as_deref_mut(), &outcome);
                }
                Ok(None) => {}
                Err(e) => {
                    // The board link already retried once; note the miss
                    // and keep the loop running
                    debug!("Failed to dispatch '{}': {}", result.name, e);
                }
            }
        }
    }
}

/// Append an outcome to the journal when one is open.
fn record_outcome(journal: Option<&mut Journal>, outcome: &mapping::dispatcher::DispatchOutcome) {
    if let Some(journal) = journal {
        if let Err(e) = journal.record(outcome) {
            warn!("Failed to journal dispatch: {}", e);
        }
    }
}

/// Load configuration from the CLI argument or the default path.
///
/// Falls back to built-in defaults when no configuration file exists,
/// matching first-run behavior on a fresh checkout.
fn load_config() -> Result<Config> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    if std::path::Path::new(&path).exists() {
        Ok(Config::load(&path)?)
    } else {
        eprintln!("No configuration file at {}, using defaults", path);
        Ok(Config::default())
    }
}

/// Initialize tracing with an env-filtered console layer and, when the
/// journal is enabled, a non-blocking daily-rolling file layer.
///
/// The returned guard must stay alive for the file layer to flush.
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if config.journal.enabled {
        let appender =
            tracing_appender::rolling::daily(&config.journal.log_dir, "gesture-bridge.log");
        let (file_writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_writer),
            )
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    }
}

/// Open the dispatch journal when enabled.
fn open_journal(config: &Config) -> Option<Journal> {
    if !config.journal.enabled {
        return None;
    }

    match Journal::open(
        &config.journal.log_dir,
        config.journal.max_records_per_file,
        config.journal.max_files_to_keep,
    ) {
        Ok(journal) => Some(journal),
        Err(e) => {
            warn!("Could not open dispatch journal: {}", e);
            None
        }
    }
}

/// Open the detector feed source and spawn its reader task.
///
/// The source is stdin, a regular file or FIFO, or a Unix socket the
/// detector process listens on. Sockets need a connect rather than an
/// open, so the file type decides the branch.
async fn open_feed(
    config: &Config,
) -> Result<(mpsc::Receiver<DetectorEvent>, tokio::task::JoinHandle<()>)> {
    if config.detector.feed == "stdin" {
        return Ok(spawn_feed_reader(tokio::io::stdin()));
    }

    let source = &config.detector.feed;
    let feed_err = |e: std::io::Error| {
        error::GestureBridgeError::Feed(format!("Failed to open feed {}: {}", source, e))
    };

    let metadata = std::fs::metadata(source).map_err(feed_err)?;
    if metadata.file_type().is_socket() {
        let stream = tokio::net::UnixStream::connect(source).await.map_err(feed_err)?;
        Ok(spawn_feed_reader(stream))
    } else {
        let file = tokio::fs::File::open(source).await.map_err(feed_err)?;
        Ok(spawn_feed_reader(file))
    }
}
