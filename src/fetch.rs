// src/fetch.rs
// =============================================================================
// This module performs all network I/O for a scan.
//
// Key functionality:
// - fetch_body: HTTP GET returning the full response text
// - probe_status: HTTP HEAD returning the resolved status code (no body)
// - Both share one pooled client, a 10 second timeout, a fixed user-agent,
//   and transparent redirect following
// - Transport failures (timeout, connect, DNS, TLS) are categorized into
//   FetchFailure; an HTTP error status is NOT a FetchFailure
//
// Each call is a single attempt. There are no retries anywhere in the scan;
// a link gets one probe and a page gets one fetch.
// =============================================================================

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

/// Per-request timeout. Applies to the GET fetch and the HEAD probe alike.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed identifying user-agent sent with every request.
pub const USER_AGENT: &str = "DeadLinkFinder/1.0";

/// Why a request produced no HTTP status at all.
///
/// A server that answers 404 or 500 is not a failure here: the transport
/// worked and the caller gets the code. A FetchFailure means the request
/// never resolved to a status: the host could not be reached in time, the
/// connection was refused, the name did not resolve, or the TLS handshake
/// broke. Callers treat every variant as "unreachable".
#[derive(Debug, Clone, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed")]
    Connect,
    #[error("transport error: {0}")]
    Transport(String),
}

/// HTTP access for the crawl: one client, two operations.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        // One pooled client for the whole scan; connections to the target
        // host get reused across page fetches and link probes.
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Issues a GET and returns the full response body as text.
    ///
    /// The status code is deliberately not interpreted: a 404 page still has
    /// a body and that body is still returned. Callers that care about the
    /// status use [`probe_status`](Self::probe_status) instead.
    pub async fn fetch_body(&self, url: &str) -> Result<String, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(categorize)?;
        response.text().await.map_err(categorize)
    }

    /// Issues a HEAD request and returns the resolved final status code.
    ///
    /// Redirects are followed first, so a 301 -> 200 chain reports 200.
    /// No body is transferred.
    pub async fn probe_status(&self, url: &str) -> Result<u16, FetchFailure> {
        let response = self.client.head(url).send().await.map_err(categorize)?;
        Ok(response.status().as_u16())
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

// Maps a reqwest error onto the failure taxonomy. reqwest folds DNS and
// TLS problems into its connect/request errors, so everything that is not
// a timeout or a connect error lands in Transport with the original text.
fn categorize(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout
    } else if error.is_connect() {
        FetchFailure::Connect
    } else {
        FetchFailure::Transport(error.to_string())
    }
}
