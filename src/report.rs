//! Run counters and the append-only failure log
//!
//! Process-wide run state lives in an explicit [`RunContext`] with an
//! init-at-start / read-at-end lifecycle: the failure log is recreated empty
//! when the context is built and the counters are snapshotted once at
//! shutdown. Counters are atomics and the log file sits behind a mutex, so a
//! single context can be shared by all in-flight download tasks.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Fixed relative path of the failure log
pub const ERROR_LOG_FILE: &str = "error.log";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Reporting errors
///
/// A failure-log write error is unrecoverable for the run: the tool does not
/// attempt to continue without a working failure log.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Failure log could not be created or appended to
    #[error("failure log write error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure log mutex was poisoned by a panicking task
    #[error("failure log lock poisoned")]
    Poisoned,
}

/// Monotonically increasing per-run counters, read only at process exit
#[derive(Debug, Default)]
pub struct RunCounters {
    downloaded: AtomicU64,
    skipped: AtomicU64,
    errored: AtomicU64,
}

impl RunCounters {
    /// Count one downloaded artifact (verified or not)
    pub fn add_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one skipped artifact (provisional or late duplicate)
    pub fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed or interrupted artifact
    pub fn add_errored(&self) {
        self.errored.fetch_add(1, Ordering::Relaxed);
    }
}

/// Final counter values printed at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Artifacts written to the output directory
    pub downloaded: u64,
    /// Artifacts whose local identity already existed on disk
    pub skipped: u64,
    /// Artifacts that failed or were interrupted
    pub errored: u64,
}

/// Process-wide run state: counters plus the failure log.
///
/// Created once at startup (truncating any previous failure log) and shared
/// by reference across all download tasks.
pub struct RunContext {
    counters: RunCounters,
    failure_log: Mutex<File>,
}

impl RunContext {
    /// Create the run context, recreating the failure log empty and seeding
    /// it with the header row naming the three record fields.
    pub fn create(log_path: &Path) -> Result<Self, ReportError> {
        let mut file = File::create(log_path)?;
        write!(
            file,
            "ReceiptUrl\tHttpStatusCode\tErrorMessage{LINE_ENDING}"
        )?;

        Ok(Self {
            counters: RunCounters::default(),
            failure_log: Mutex::new(file),
        })
    }

    /// Run counters
    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Append one failure record: source URL, status code (empty when the
    /// request never produced a response), and a message with retry context.
    ///
    /// Records are never mutated or deleted; an append failure is fatal for
    /// the whole run.
    pub fn record_failure(
        &self,
        source_url: &str,
        status_code: Option<u16>,
        message: &str,
    ) -> Result<(), ReportError> {
        let status = status_code.map(|c| c.to_string()).unwrap_or_default();
        let mut file = self.failure_log.lock().map_err(|_| ReportError::Poisoned)?;
        write!(file, "{source_url}\t{status}\t{message}{LINE_ENDING}")?;
        Ok(())
    }

    /// Snapshot the counters for the end-of-run statistics block
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            downloaded: self.counters.downloaded.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            errored: self.counters.errored.load(Ordering::Relaxed),
        }
    }
}
