//! Main entry point for the receipt-downloader CLI

use clap::error::ErrorKind;
use clap::Parser;
use std::time::Instant;
use tracing::error;
use tracing_subscriber::EnvFilter;

use receipt_downloader::cli::{self, Cli, USAGE};

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("receipt_downloader=warn"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Argument errors print the usage line on stdout, no statistics
fn print_usage_and_exit() -> ! {
    println!("{USAGE}");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(_) => print_usage_and_exit(),
    };

    if let Err(e) = cli.validate() {
        println!("{e}");
        std::process::exit(2);
    }

    let started = Instant::now();

    match cli::run(&cli).await {
        Ok(summary) => {
            println!();
            println!("Statistics");
            println!("duration: {:.3}s", started.elapsed().as_secs_f64());
            println!("downloaded: {}", summary.downloaded);
            println!("skipped: {}", summary.skipped);
            println!("error: {}", summary.errored);
        }
        Err(e) => {
            error!("Run failed: {e}");
            std::process::exit(1);
        }
    }
}
