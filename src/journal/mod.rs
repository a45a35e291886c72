//! # Dispatch Journal Module
//!
//! Logs every executed dispatch to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting dispatch outcomes as JSONL (JSON Lines)
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::mapping::dispatcher::DispatchOutcome;

/// File name prefix for journal files
const FILE_PREFIX: &str = "dispatch";

/// One journal record: a timestamped dispatch outcome.
#[derive(Debug, Serialize)]
struct JournalRecord<'a> {
    /// UTC timestamp, RFC 3339
    ts: String,
    /// Gesture name that triggered the dispatch
    gesture: &'a str,
    /// What ran: tap, hold, release, or sequence
    action: &'a str,
    /// Pins touched, in write order
    pins: &'a [u8],
}

/// JSONL journal writer with record-count rotation.
pub struct Journal {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<File>,
    records_in_current: usize,
    /// Sequence number distinguishing files rotated within one second
    file_seq: u64,
}

impl Journal {
    /// Open a journal in the given directory, creating it if needed.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory for journal files
    /// * `max_records_per_file` - Rotate after this many records
    /// * `max_files_to_keep` - Delete the oldest files beyond this count
    pub fn open<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            max_records_per_file,
            max_files_to_keep,
            current: None,
            records_in_current: 0,
            file_seq: 0,
        })
    }

    /// Append one dispatch outcome to the journal.
    ///
    /// Rotates to a new file when the current one is full. Serialization
    /// of the record itself cannot fail; I/O errors propagate.
    pub fn record(&mut self, outcome: &DispatchOutcome) -> Result<()> {
        if self.current.is_none() || self.records_in_current >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = JournalRecord {
            ts: Utc::now().to_rfc3339(),
            gesture: &outcome.gesture,
            action: outcome.action,
            pins: &outcome.pins,
        };

        // A struct of strings and ints always serializes
        let line = serde_json::to_string(&record)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialize: {}"}}"#, e));

        if let Some(file) = self.current.as_mut() {
            writeln!(file, "{}", line)?;
            self.records_in_current += 1;
        }
        Ok(())
    }

    /// Start a new journal file and prune old ones.
    fn rotate(&mut self) -> Result<()> {
        self.file_seq += 1;
        let name = format!(
            "{}-{}-{:04}.jsonl",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.file_seq
        );
        let path = self.dir.join(&name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Rotated journal to {}", path.display());

        self.current = Some(file);
        self.records_in_current = 0;
        self.prune();
        Ok(())
    }

    /// Delete the oldest journal files beyond the retention limit.
    ///
    /// Pruning failures are logged, never fatal.
    fn prune(&self) {
        let mut files = match self.journal_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list journal dir for pruning: {}", e);
                return;
            }
        };

        if files.len() <= self.max_files_to_keep {
            return;
        }

        // Names sort chronologically (timestamp + sequence in the name)
        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not prune journal file {}: {}", path.display(), e);
            } else {
                debug!("Pruned journal file {}", path.display());
            }
        }
    }

    /// All journal files currently in the directory.
    fn journal_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with(FILE_PREFIX) && name.ends_with(".jsonl") {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }
}
