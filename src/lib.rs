//! # Receipt Downloader Library
//!
//! Bulk-downloads remote binary artifacts (receipts and vehicle registration
//! certificates) whose locations are enumerated by a structured export file,
//! authenticating each request with a bearer token.
//!
//! ## Features
//!
//! - **Two feed formats**: streaming XML element walk and delimited CSV rows,
//!   both reduced to a lazy sequence of candidate URLs in document order
//! - **Identity reconciliation**: the on-disk name is derived from the URL
//!   path, then reconciled against a server-supplied `Content-Disposition`
//!   filename when the response renames the artifact mid-flight
//! - **Transfer verification**: byte-length comparison after the write stream
//!   closes; truncated artifacts are deleted, never left under the final name
//! - **Failure log**: every failed or interrupted artifact is appended to a
//!   tab-separated `error.log` with enough context to retry later
//! - **Bounded concurrency**: artifacts are fetched as async tasks over a
//!   fixed cap of simultaneous connections (default 20)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::PathBuf;
//! use receipt_downloader::cli::{run, Cli};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cli = Cli {
//!     token: "secret-token".to_string(),
//!     export_file: PathBuf::from("./export.csv"),
//!     output_directory: PathBuf::from("./receipts"),
//!     proxy: None,
//! };
//! cli.validate()?;
//!
//! let summary = run(&cli).await?;
//! println!("downloaded: {}", summary.downloaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`source`] - Feed enumerators producing candidate URLs (XML and CSV)
//! - [`identity`] - Provisional and final local-identity resolution
//! - [`fetch`] - Authenticated fetch orchestration and transfer verification
//! - [`report`] - Run counters and the append-only failure log
//! - [`cli`] - Argument surface and the concurrent run loop

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI argument surface and run loop
pub mod cli;

/// Fetch orchestration, HTTP client, transfer verification
pub mod fetch;

/// Local identity resolution for downloaded artifacts
pub mod identity;

/// Run counters and the failure log
pub mod report;

/// Feed enumerators (XML and CSV)
pub mod source;

// Re-export commonly used types
pub use fetch::TransferOutcome;
pub use identity::LocalIdentity;
pub use report::{RunContext, RunSummary};
