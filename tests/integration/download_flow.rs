//! End-to-end download flow tests against a local one-shot HTTP server

use std::net::SocketAddr;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use receipt_downloader::fetch::{download_artifact, ReceiptClient};
use receipt_downloader::report::RunContext;
use receipt_downloader::TransferOutcome;

/// Serve exactly one canned HTTP/1.1 response, then close the connection
async fn serve_once(response: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn http_response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    response.push_str("Connection: close\r\n\r\n");

    let mut bytes = response.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

fn context(dir: &Path) -> RunContext {
    RunContext::create(&dir.join("error.log")).unwrap()
}

fn failure_log_lines(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("error.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_download_with_matching_length() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let addr = serve_once(http_response("200 OK", &[], b"hello")).await;
    let url = format!("http://{addr}/invoices/123/receipt.pdf");

    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::Downloaded);
    let artifact = out.path().join("invoices-123-receipt.pdf");
    assert_eq!(std::fs::read(&artifact).unwrap(), b"hello");
    assert_eq!(ctx.summary().downloaded, 1);
    // Nothing was logged as a failure.
    assert_eq!(failure_log_lines(logs.path()).len(), 1);
}

#[tokio::test]
async fn test_second_attempt_skips_existing_artifact() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let addr = serve_once(http_response("200 OK", &[], b"hello")).await;
    let url = format!("http://{addr}/invoices/123/receipt.pdf");

    let first = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();
    assert_eq!(first, TransferOutcome::Downloaded);

    // The server accepted exactly one connection; a second request would
    // fail. The skip happens before any request is issued.
    let second = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();
    assert_eq!(second, TransferOutcome::Skipped);

    let summary = ctx.summary();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errored, 0);
}

#[tokio::test]
async fn test_existing_provisional_identity_issues_no_request() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    std::fs::write(out.path().join("invoices-7-receipt.pdf"), b"previous run").unwrap();

    // Nothing listens on this port; reaching the network would error out.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/invoices/7/receipt.pdf");
    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::Skipped);
    assert_eq!(ctx.summary().skipped, 1);
    assert_eq!(ctx.summary().errored, 0);
}

#[tokio::test]
async fn test_non_200_is_logged_and_creates_no_file() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let addr = serve_once(http_response("404 Not Found", &[], b"not found")).await;
    let url = format!("http://{addr}/invoices/404/receipt.pdf");

    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::FailedHttpStatus(404));
    assert!(!out.path().join("invoices-404-receipt.pdf").exists());
    assert_eq!(ctx.summary().errored, 1);

    let lines = failure_log_lines(logs.path());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], format!("{url}\t404\tResponse status is not OK"));
}

#[tokio::test]
async fn test_content_disposition_rename_stores_final_name() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let addr = serve_once(http_response(
        "200 OK",
        &[("Content-Disposition", "attachment; filename=\"renamed.pdf\"")],
        b"body",
    ))
    .await;
    let url = format!("http://{addr}/invoices/9/original.pdf");

    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::Downloaded);
    assert!(out.path().join("invoices-9-renamed.pdf").is_file());
    assert!(!out.path().join("invoices-9-original.pdf").exists());
    // Rename events are warnings, never failure records.
    assert_eq!(failure_log_lines(logs.path()).len(), 1);
}

#[tokio::test]
async fn test_late_duplicate_after_rename_is_skipped() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    std::fs::write(out.path().join("invoices-9-renamed.pdf"), b"already here").unwrap();

    let addr = serve_once(http_response(
        "200 OK",
        &[("Content-Disposition", "attachment; filename=\"renamed.pdf\"")],
        b"new body",
    ))
    .await;
    let url = format!("http://{addr}/invoices/9/original.pdf");

    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::Skipped);
    // The previously stored artifact is untouched.
    assert_eq!(
        std::fs::read(out.path().join("invoices-9-renamed.pdf")).unwrap(),
        b"already here"
    );
    assert_eq!(ctx.summary().skipped, 1);
    assert_eq!(ctx.summary().downloaded, 0);
}

#[tokio::test]
async fn test_connection_error_is_logged_with_empty_status() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/invoices/1/receipt.pdf");
    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::FailedNetworkError);
    assert_eq!(ctx.summary().errored, 1);

    let lines = failure_log_lines(logs.path());
    assert_eq!(lines.len(), 2);
    let fields: Vec<&str> = lines[1].splitn(3, '\t').collect();
    assert_eq!(fields[0], url);
    assert_eq!(fields[1], "");
    assert!(fields[2].starts_with("Failed to GET the http response:"));
}

#[tokio::test]
async fn test_truncated_transfer_is_interrupted_with_status_200() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    // The server advertises more bytes than it delivers, then closes.
    let addr = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nhello".to_vec(),
    )
    .await;
    let url = format!("http://{addr}/invoices/55/receipt.pdf");

    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::Interrupted);
    // The truncated artifact must not survive under its final name.
    assert!(!out.path().join("invoices-55-receipt.pdf").exists());
    assert_eq!(ctx.summary().errored, 1);

    let lines = failure_log_lines(logs.path());
    assert_eq!(lines.len(), 2);
    let fields: Vec<&str> = lines[1].splitn(3, '\t').collect();
    assert_eq!(fields[0], url);
    assert_eq!(fields[1], "200");
    assert!(fields[2].starts_with("Interrupted."));
}

#[tokio::test]
async fn test_inactivity_timeout_aborts_and_is_distinguishable() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::with_read_timeout(
        "token",
        None,
        std::time::Duration::from_millis(250),
    )
    .unwrap();

    // Send part of the body, then hold the connection open silently.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello")
                .await;
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });

    let url = format!("http://{addr}/invoices/60/receipt.pdf");
    let outcome = download_artifact(&client, &url, out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::FailedTimeout);
    assert!(!out.path().join("invoices-60-receipt.pdf").exists());
    assert_eq!(ctx.summary().errored, 1);

    let lines = failure_log_lines(logs.path());
    assert_eq!(lines.len(), 2);
    let fields: Vec<&str> = lines[1].splitn(3, '\t').collect();
    assert_eq!(fields[1], "");
    assert!(fields[2].starts_with("Timeout - Failed to GET the http response:"));
}

#[tokio::test]
async fn test_invalid_url_is_logged() {
    let out = tempfile::TempDir::new().unwrap();
    let logs = tempfile::TempDir::new().unwrap();
    let ctx = context(logs.path());
    let client = ReceiptClient::new("token", None).unwrap();

    let outcome = download_artifact(&client, "not a url", out.path(), &ctx)
        .await
        .unwrap();

    assert_eq!(outcome, TransferOutcome::FailedNetworkError);
    assert_eq!(ctx.summary().errored, 1);
    assert_eq!(failure_log_lines(logs.path()).len(), 2);
}
