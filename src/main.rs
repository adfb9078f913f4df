// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Start the scan and print each finding as it is discovered
// 3. On Ctrl-C, request a cooperative stop
// 4. When the scan ends, optionally export the report and print a summary
// 5. Exit with proper code (0 = clean, 1 = dead links found, 2 = error)
//
// This file is the only place that touches stdout, files and signals; the
// scan itself only ever produces Finding values through its channel.
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod extract; // src/extract.rs - href extraction from raw HTML
mod fetch; // src/fetch.rs - HTTP GET/HEAD access
mod scan; // src/scan/ - the crawl engine and its findings
mod scope; // src/scope.rs - URL normalization and the domain filter

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use scan::{CrawlJob, Finding, ScanOutcome, Scanner};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    println!("🔍 Scanning for dead links: {}", cli.seed_url);
    println!("📊 Max crawl depth: {}\n", cli.max_depth);

    let scanner = Arc::new(Scanner::new());
    let job = CrawlJob::with_limits(&cli.seed_url, cli.max_depth, cli.max_links);
    let mut handle = scanner
        .start_job(job)
        .context("a scan is already running")?;

    // Ctrl-C requests a cooperative stop; the scan ends at its next check
    // point without aborting the in-flight request.
    {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("⏹  Stop requested, waiting for the next check point...");
                scanner.stop_scan();
            }
        });
    }

    // Drain the report channel as findings arrive. Partial results show up
    // while the scan is still running, not only at the end.
    let mut findings = Vec::new();
    let mut report = String::new();
    let mut outcome = ScanOutcome::Completed;

    while let Some(finding) = handle.next_finding().await {
        if !cli.json {
            println!("{}", finding);
        }
        report.push_str(&finding.to_string());
        report.push('\n');

        match finding {
            Finding::Ended { outcome: end } => {
                outcome = end;
                break;
            }
            other => findings.push(other),
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
    }

    if let Some(path) = &cli.output {
        fs::write(path, &report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("💾 Report saved to {}", path.display());
    }

    let problem_count = findings.iter().filter(|f| f.is_problem()).count();

    println!("\n📊 Summary:");
    println!("   ❌ Problems found: {}", problem_count);
    match outcome {
        ScanOutcome::Completed => println!("   ✅ Scan completed"),
        ScanOutcome::Stopped => println!("   ⏹  Scan stopped by user"),
    }

    if problem_count > 0 {
        Ok(1) // Exit code 1 = dead or unreachable links found
    } else {
        Ok(0) // Exit code 0 = all good
    }
}

// Diagnostics go to stderr so stdout stays a clean report/JSON stream.
// RUST_LOG takes precedence over --verbose.
fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "deadlink_finder=debug"
    } else {
        "deadlink_finder=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
