//! CLI argument surface and run loop
//!
//! Three required flags (`-t`, `-f`, `-o`) plus the optional `--proxy`
//! toggle. Argument and filesystem validation are fatal before any network
//! activity; the run loop then schedules one async task per enumerated URL
//! over a fixed cap of simultaneous connections.

use clap::Parser;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::fetch::{self, FetchError, ProxyConfig, ReceiptClient};
use crate::identity::IdentityError;
use crate::report::{self, ReportError, RunContext, RunSummary};
use crate::source::{CsvUrlSource, SourceError, XmlUrlSource};

/// Maximum number of simultaneous outbound connections.
///
/// The only concurrency bound: the enumerator may emit URLs faster than
/// requests complete, and in-flight artifacts are limited solely by this cap.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 20;

/// Usage line printed on argument errors
pub const USAGE: &str =
    "receipt-downloader -t {Authentication Token} -f {Export File} -o {Output Directory}";

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export file missing or not `.xml`/`.csv`
    #[error("Invalid export file")]
    InvalidExportFile,

    /// Output directory missing
    #[error("Invalid output directory")]
    InvalidOutputDirectory,

    /// Feed error
    #[error("feed error: {0}")]
    Source(#[from] SourceError),

    /// Identity error
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Fetch setup error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Reporting error (failure log), fatal for the run
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

/// Receipt downloader CLI
#[derive(Parser, Debug)]
#[command(name = "receipt-downloader")]
#[command(about = "Bulk-download receipt artifacts listed in an export file", long_about = None)]
pub struct Cli {
    /// Bearer authentication token sent with every request
    #[arg(short = 't', value_name = "TOKEN")]
    pub token: String,

    /// Export file enumerating artifact URLs (.xml or .csv)
    #[arg(short = 'f', value_name = "EXPORT_FILE")]
    pub export_file: PathBuf,

    /// Directory receiving the downloaded artifacts
    #[arg(short = 'o', value_name = "OUTPUT_DIR")]
    pub output_directory: PathBuf,

    /// Route the physical connection through a forward proxy, preserving
    /// the logical Host header
    #[arg(long, value_name = "HOST:PORT")]
    pub proxy: Option<ProxyConfig>,
}

/// Feed format, decided by the export file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Xml,
    Csv,
}

impl Cli {
    /// Validate the filesystem preconditions: the export file must exist
    /// with a `.xml`/`.csv` extension (case-insensitive) and the output
    /// directory must exist. Runs before any network activity.
    pub fn validate(&self) -> Result<(), CliError> {
        feed_format(&self.export_file)?;
        if !self.export_file.is_file() {
            return Err(CliError::InvalidExportFile);
        }
        if !self.output_directory.is_dir() {
            return Err(CliError::InvalidOutputDirectory);
        }
        Ok(())
    }
}

fn feed_format(export_file: &Path) -> Result<FeedFormat, CliError> {
    let extension = export_file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(CliError::InvalidExportFile)?;

    match extension.as_str() {
        "xml" => Ok(FeedFormat::Xml),
        "csv" => Ok(FeedFormat::Csv),
        _ => Err(CliError::InvalidExportFile),
    }
}

/// Execute a full run: recreate the failure log, enumerate the feed, and
/// download every artifact with bounded concurrency. Returns the counter
/// snapshot for the statistics block.
pub async fn run(cli: &Cli) -> Result<RunSummary, CliError> {
    let ctx = RunContext::create(Path::new(report::ERROR_LOG_FILE))?;
    let client = ReceiptClient::new(&cli.token, cli.proxy.clone())?;

    let sources: Box<dyn Iterator<Item = Result<String, SourceError>> + Send> =
        match feed_format(&cli.export_file)? {
            FeedFormat::Xml => Box::new(XmlUrlSource::open(&cli.export_file)?),
            FeedFormat::Csv => Box::new(CsvUrlSource::open(&cli.export_file)?),
        };

    println!("Started processing...");
    info!(
        export_file = %cli.export_file.display(),
        concurrency = MAX_CONCURRENT_DOWNLOADS,
        "Run started"
    );

    let results: Vec<Result<(), CliError>> = stream::iter(sources)
        .map(|entry| {
            let client = &client;
            let ctx = &ctx;
            let output_dir = cli.output_directory.as_path();
            async move {
                match entry {
                    Ok(url) => {
                        fetch::download_artifact(client, &url, output_dir, ctx).await?;
                        Ok(())
                    }
                    // Malformed feed content is fatal for the run.
                    Err(e) => Err(CliError::from(e)),
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_DOWNLOADS)
        .collect()
        .await;

    for result in results {
        result?;
    }

    Ok(ctx.summary())
}
