// src/scan/report.rs
// =============================================================================
// This module defines what a scan reports and how the report travels.
//
// Finding is one unit of crawl output: an unreachable page, a dead link
// with its status code, or the single terminal event that closes a scan.
//
// ReportSink is the engine's side of an unbounded FIFO channel. The engine
// hands each Finding off and continues immediately - it never blocks on the
// consumer, and findings are buffered until the consumer drains them. The
// shell's side is the receiver returned by report_channel().
// =============================================================================

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How a scan ended. Exactly one of these is reported per scan, wrapped in
/// [`Finding::Ended`], after which the engine's per-job state is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Traversal exhausted without cancellation.
    Completed,
    /// The cancellation flag was observed at a check point.
    Stopped,
}

/// One reportable event, in discovery order.
///
/// The traversal is single-worker, so the order across findings is total
/// and two runs against an unchanged site produce identical sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The page could not be fetched at all (timeout, refused connection,
    /// DNS or TLS failure). Traversal does not continue past this URL.
    Unreachable { url: String },
    /// The server answered the liveness probe with an error status (>= 400).
    Dead { code: u16, url: String },
    /// Terminal event; always the last finding of a scan.
    Ended { outcome: ScanOutcome },
}

impl Finding {
    /// True for the findings that represent a problem with the site, as
    /// opposed to the terminal event.
    pub fn is_problem(&self) -> bool {
        matches!(self, Finding::Unreachable { .. } | Finding::Dead { .. })
    }
}

// The human-readable report lines. These are the lines the shell prints,
// accumulates, and exports; the core never produces anything richer.
impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Unreachable { url } => write!(f, "Unreachable or missing: {}", url),
            Finding::Dead { code, url } => write!(f, "Dead link ({}): {}", code, url),
            Finding::Ended {
                outcome: ScanOutcome::Completed,
            } => write!(f, "--- Scan complete ---"),
            Finding::Ended {
                outcome: ScanOutcome::Stopped,
            } => write!(f, "--- Scan stopped by user ---"),
        }
    }
}

/// Creates the channel a scan reports through: the engine keeps the sink,
/// the shell keeps the receiver.
pub fn report_channel() -> (ReportSink, UnboundedReceiver<Finding>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ReportSink { tx }, rx)
}

/// The engine's append-only, non-blocking side of the report channel.
#[derive(Clone)]
pub struct ReportSink {
    tx: UnboundedSender<Finding>,
}

impl ReportSink {
    /// Hands a finding off without blocking. If the consumer has gone away
    /// the finding is dropped and the scan keeps going.
    pub fn push(&self, finding: Finding) {
        let _ = self.tx.send(finding);
    }
}
