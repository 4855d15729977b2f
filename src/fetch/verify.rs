//! Post-transfer byte-length verification
//!
//! Runs only after the write stream has fully flushed and closed. A missing
//! advertised length is not an error; a mismatch is an interruption and the
//! truncated artifact must never be left on disk under its final name.

use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

use super::TransferOutcome;

/// Compare the advertised content length against the bytes actually written.
///
/// On mismatch the partially written artifact is deleted before returning.
pub fn verify(expected: Option<u64>, written: u64, path: &Path) -> TransferOutcome {
    match expected {
        None => TransferOutcome::DownloadedUnverified,
        Some(expected) if expected == written => TransferOutcome::Downloaded,
        Some(_) => {
            delete_if_exists(path);
            TransferOutcome::Interrupted
        }
    }
}

/// Best-effort removal of a partial artifact
pub(crate) fn delete_if_exists(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to delete partial artifact");
        }
    }
}
