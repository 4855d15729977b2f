//! Fetch orchestration
//!
//! Drives the per-artifact download state machine: dedup check against the
//! provisional identity, authenticated request, identity reconciliation from
//! response headers, streaming write, and byte-length verification. All
//! per-artifact failures are handled locally (logged, counted) and never
//! interrupt processing of subsequent artifacts; only a failure-log write
//! error propagates out of the executor.
//!
//! # Components
//!
//! - [`client`] - Authenticated HTTP client with optional forward-proxy mode
//! - [`executor`] - Per-artifact state machine
//! - [`verify`] - Post-transfer byte-length verification

pub mod client;
pub mod executor;
pub mod verify;

pub use client::{ProxyConfig, ReceiptClient};
pub use executor::download_artifact;

/// Fetch setup errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Terminal state of one artifact's handling. Exactly one outcome is
/// assigned per enumerated URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Local identity (provisional or final) already existed on disk
    Skipped,
    /// Streamed to disk, byte length matches the advertised content length
    Downloaded,
    /// Streamed to disk, no content length was advertised
    DownloadedUnverified,
    /// Byte length mismatch after a 200 response; the partial file was deleted
    Interrupted,
    /// Server answered with a non-200 status
    FailedHttpStatus(u16),
    /// Request failed before or during transfer (connect, transport, write)
    FailedNetworkError,
    /// Inactivity timeout aborted the in-flight request
    FailedTimeout,
}
