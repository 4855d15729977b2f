//! Per-artifact download state machine
//!
//! One call handles one enumerated URL from start to terminal state. The
//! outcome is echoed to stdout as it happens, counted exactly once, and
//! failure/interruption states append exactly one failure record carrying
//! the original requested URL (never the possibly-renamed final identity).

use futures_util::StreamExt;
use reqwest::{Response, StatusCode};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use super::verify::{self, delete_if_exists};
use super::{ReceiptClient, TransferOutcome};
use crate::identity::LocalIdentity;
use crate::report::{ReportError, RunContext};

/// Failure while the response body was being streamed to storage
struct BodyError {
    /// Bytes written before the stream failed
    written: u64,
    kind: BodyErrorKind,
}

enum BodyErrorKind {
    /// Transport failed mid-stream (includes inactivity timeout)
    Transfer(reqwest::Error),
    /// Local write failed
    Disk(std::io::Error),
}

/// Download one artifact.
///
/// Per-artifact failures are terminal for the artifact only: they are
/// logged, counted, and folded into the returned [`TransferOutcome`]. The
/// only error that propagates is a failure-log write error, which is fatal
/// for the whole run.
pub async fn download_artifact(
    client: &ReceiptClient,
    source_url: &str,
    output_dir: &Path,
    ctx: &RunContext,
) -> Result<TransferOutcome, ReportError> {
    let url = match Url::parse(source_url) {
        Ok(url) => url,
        Err(e) => {
            ctx.record_failure(
                source_url,
                None,
                &format!("Failed to parse the receipt URL: {e}"),
            )?;
            ctx.counters().add_errored();
            println!("{source_url}\tFailed with invalid URL");
            return Ok(TransferOutcome::FailedNetworkError);
        }
    };

    let provisional = match LocalIdentity::provisional(&url, output_dir) {
        Ok(identity) => identity,
        Err(e) => {
            ctx.record_failure(source_url, None, &e.to_string())?;
            ctx.counters().add_errored();
            println!("{source_url}\tFailed with invalid URL");
            return Ok(TransferOutcome::FailedNetworkError);
        }
    };

    // Provisional dedup gate: no network request for known artifacts.
    if provisional.exists() {
        println!("{}\tSkipped", provisional.file_name());
        ctx.counters().add_skipped();
        return Ok(TransferOutcome::Skipped);
    }

    debug!(url = source_url, "Requesting artifact");
    let response = match client.get(&url).await {
        Ok(response) => response,
        Err(e) => {
            let outcome = request_failure(ctx, source_url, &e)?;
            return Ok(outcome);
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        ctx.record_failure(source_url, Some(status.as_u16()), "Response status is not OK")?;
        ctx.counters().add_errored();
        println!("{source_url}\tFailed with http{}", status.as_u16());
        drain(response).await;
        return Ok(TransferOutcome::FailedHttpStatus(status.as_u16()));
    }

    let final_identity = provisional.finalized(&url, response.headers(), output_dir);
    if final_identity.file_name() != provisional.file_name() {
        warn!(
            from = provisional.file_name(),
            to = final_identity.file_name(),
            "Server renamed the artifact via Content-Disposition"
        );

        // Second dedup check under the renamed identity. The body must be
        // consumed before the response is discarded so the connection can be
        // reused instead of leaked.
        if final_identity.exists() {
            warn!(
                name = final_identity.file_name(),
                "Renamed artifact already exists on disk, discarding response"
            );
            drain(response).await;
            println!("{}\tSkipped", final_identity.file_name());
            ctx.counters().add_skipped();
            return Ok(TransferOutcome::Skipped);
        }
    }

    let expected = response.content_length();
    let written = match write_body(response, final_identity.path()).await {
        Ok(written) => written,
        Err(e) => {
            delete_if_exists(final_identity.path());
            let outcome = body_failure(ctx, source_url, &final_identity, e)?;
            return Ok(outcome);
        }
    };

    let outcome = verify::verify(expected, written, final_identity.path());
    match outcome {
        TransferOutcome::Downloaded => {
            println!("{}\tDownloaded", final_identity.file_name());
            ctx.counters().add_downloaded();
        }
        TransferOutcome::DownloadedUnverified => {
            println!("{}\tDownloaded (size not verified)", final_identity.file_name());
            ctx.counters().add_downloaded();
        }
        TransferOutcome::Interrupted => {
            // Interrupted implies an advertised length was present.
            let expected_len = expected.unwrap_or_default();
            ctx.record_failure(
                source_url,
                Some(200),
                &format!(
                    "Interrupted. Deleted the {written}B incomplete file (expected {expected_len}B)."
                ),
            )?;
            ctx.counters().add_errored();
            println!("{}\tInterrupted", final_identity.file_name());
        }
        _ => {}
    }

    Ok(outcome)
}

/// Log and count a body stream that failed after a 200 response.
///
/// The partial file has already been deleted by the caller. An inactivity
/// timeout keeps its timeout classification; any other failure mid-body is
/// an interruption of an accepted transfer and is recorded with status 200,
/// like a post-stream length mismatch.
fn body_failure(
    ctx: &RunContext,
    source_url: &str,
    identity: &LocalIdentity,
    error: BodyError,
) -> Result<TransferOutcome, ReportError> {
    let BodyError { written, kind } = error;
    match kind {
        BodyErrorKind::Transfer(e) if e.is_timeout() => request_failure(ctx, source_url, &e),
        BodyErrorKind::Transfer(e) => {
            ctx.record_failure(
                source_url,
                Some(200),
                &format!("Interrupted. Deleted the {written}B incomplete file (transfer failed: {e})."),
            )?;
            ctx.counters().add_errored();
            println!("{}\tInterrupted", identity.file_name());
            Ok(TransferOutcome::Interrupted)
        }
        BodyErrorKind::Disk(e) => {
            ctx.record_failure(
                source_url,
                Some(200),
                &format!("Failed to write the artifact to disk: {e}"),
            )?;
            ctx.counters().add_errored();
            println!("{}\tInterrupted", identity.file_name());
            Ok(TransferOutcome::Interrupted)
        }
    }
}

/// Log and count a request that failed before or during transfer, keeping
/// the timeout abort distinguishable from a generic network error.
fn request_failure(
    ctx: &RunContext,
    source_url: &str,
    error: &reqwest::Error,
) -> Result<TransferOutcome, ReportError> {
    let (outcome, prefix, echo) = if error.is_timeout() {
        (TransferOutcome::FailedTimeout, "Timeout - ", "Failed with timeout")
    } else {
        (TransferOutcome::FailedNetworkError, "", "Failed with network error")
    };

    ctx.record_failure(
        source_url,
        None,
        &format!("{prefix}Failed to GET the http response: {error}"),
    )?;
    ctx.counters().add_errored();
    println!("{source_url}\t{echo}");
    Ok(outcome)
}

/// Consume the remainder of a response body that will not be written
async fn drain(response: Response) {
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        if chunk.is_err() {
            break;
        }
    }
}

/// Stream the response body to storage, returning the bytes written.
/// The file is flushed and closed before this returns.
async fn write_body(response: Response, path: &Path) -> Result<u64, BodyError> {
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    let mut file = match File::create(path).await {
        Ok(file) => file,
        Err(e) => return Err(BodyError { written, kind: BodyErrorKind::Disk(e) }),
    };

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(BodyError { written, kind: BodyErrorKind::Transfer(e) }),
        };
        if let Err(e) = file.write_all(&chunk).await {
            return Err(BodyError { written, kind: BodyErrorKind::Disk(e) });
        }
        written += chunk.len() as u64;
    }

    if let Err(e) = file.flush().await {
        return Err(BodyError { written, kind: BodyErrorKind::Disk(e) });
    }
    Ok(written)
}
