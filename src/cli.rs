// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is a plain Rust struct and
// clap generates the parsing code from the attributes. Doc comments on the
// fields become the --help text.
// =============================================================================

use std::path::PathBuf;

use clap::Parser;

use crate::scan::{MAX_DEPTH, MAX_LINKS};

#[derive(Parser, Debug)]
#[command(
    name = "deadlink-finder",
    version,
    about = "Scan a website for dead links and unreachable pages",
    long_about = "deadlink-finder crawls a website starting from a seed URL, staying on the \
                  seed's domain, and reports every link that answers with an error status \
                  or cannot be reached at all. Press Ctrl-C to stop a running scan; it ends \
                  at the next check point."
)]
pub struct Cli {
    /// Website URL to scan (e.g., https://example.com)
    pub seed_url: String,

    /// Maximum crawl depth from the seed page
    #[arg(long, default_value_t = MAX_DEPTH)]
    pub max_depth: usize,

    /// Maximum number of links extracted per page
    #[arg(long, default_value_t = MAX_LINKS)]
    pub max_links: usize,

    /// Output the findings as JSON instead of report lines
    #[arg(long)]
    pub json: bool,

    /// Write the accumulated report text to this file when the scan ends
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Enable debug logging (to stderr; RUST_LOG overrides)
    #[arg(long, short)]
    pub verbose: bool,
}
