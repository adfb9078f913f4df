// src/scan/engine.rs
// =============================================================================
// This module implements the crawl itself.
//
// How a scan runs:
// 1. start_scan spawns exactly one worker task for the whole traversal
// 2. The worker drains an explicit worklist of (url, depth) pairs
// 3. Each popped URL is checked against the cancellation flag, the depth
//    bound and the visited set, then fetched; fetch failures become
//    "unreachable" findings
// 4. Extracted links are normalized and scope-filtered, probed for
//    liveness (dead ones reported), and enqueued one hop deeper
// 5. One terminal finding closes the scan: Completed or Stopped
//
// Every network call is awaited sequentially inside the one worker, so at
// most one fetch or probe is outstanding at any time and the finding order
// is total. Cancellation is cooperative: the flag is read at every worklist
// pop and at every iteration of the per-page candidate loop, and an
// in-flight request is never aborted.
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::extract::extract_links;
use crate::fetch::Fetcher;
use crate::scope::{crawl_origin, in_scope, normalize};

use super::report::{report_channel, Finding, ReportSink, ScanOutcome};
use super::{MAX_DEPTH, MAX_LINKS};

/// The parameters of one scan: the seed URL (which also defines the scope),
/// the traversal limits, and the cancellation flag.
///
/// The flag may be set at most once, from outside the traversal; the
/// traversal only ever reads it.
pub struct CrawlJob {
    seed: String,
    max_depth: usize,
    max_links: usize,
    stop: Arc<AtomicBool>,
}

impl CrawlJob {
    /// A job with the default limits.
    pub fn new(seed: impl Into<String>) -> Self {
        Self::with_limits(seed, MAX_DEPTH, MAX_LINKS)
    }

    pub fn with_limits(seed: impl Into<String>, max_depth: usize, max_links: usize) -> Self {
        Self {
            seed: seed.into(),
            max_depth,
            max_links,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests a cooperative stop. Takes effect at the traversal's next
    /// check point, not immediately.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// The consumer's side of a running scan: a FIFO stream of findings ending
/// with exactly one [`Finding::Ended`].
pub struct ScanHandle {
    findings: UnboundedReceiver<Finding>,
}

impl ScanHandle {
    /// The next finding in discovery order, or None once the stream is
    /// closed (after the terminal finding has been delivered).
    pub async fn next_finding(&mut self) -> Option<Finding> {
        self.findings.recv().await
    }
}

/// Starts and stops scans, one at a time.
///
/// All per-scan state (visited set, cancellation flag) belongs to the job,
/// not to the Scanner, so independent Scanners can run independent scans;
/// a single Scanner refuses to run two at once.
pub struct Scanner {
    fetcher: Arc<Fetcher>,
    running: Arc<AtomicBool>,
    active_stop: Mutex<Option<Arc<AtomicBool>>>,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(Fetcher::new()),
            running: Arc::new(AtomicBool::new(false)),
            active_stop: Mutex::new(None),
        }
    }

    /// Begins a scan of `seed` with the default limits.
    ///
    /// The seed string is passed through unvalidated. Returns None (a
    /// silent no-op) when a scan is already running on this Scanner.
    pub fn start_scan(&self, seed: &str) -> Option<ScanHandle> {
        self.start_job(CrawlJob::new(seed))
    }

    /// Begins a scan with explicit parameters. Must be called from within a
    /// tokio runtime; the traversal runs on its own spawned task.
    pub fn start_job(&self, job: CrawlJob) -> Option<ScanHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        // Remember the new job's flag so stop_scan can reach it.
        if let Ok(mut active) = self.active_stop.lock() {
            *active = Some(job.stop.clone());
        }

        info!(seed = %job.seed, max_depth = job.max_depth, "scan started");

        let (sink, findings) = report_channel();
        let fetcher = self.fetcher.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            let outcome = crawl(&job, &fetcher, &sink).await;
            info!(?outcome, "scan ended");
            sink.push(Finding::Ended { outcome });
            running.store(false, Ordering::SeqCst);
        });

        Some(ScanHandle { findings })
    }

    /// Sets the cancellation flag of the current job, if any.
    pub fn stop_scan(&self) {
        if let Ok(active) = self.active_stop.lock() {
            if let Some(stop) = active.as_ref() {
                stop.store(true, Ordering::SeqCst);
            }
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

// The traversal. Owns the visited set for the lifetime of the scan; the
// insertion into it is the dedup gate and happens before the fetch, so a
// URL discovered twice is only ever processed once.
async fn crawl(job: &CrawlJob, fetcher: &Fetcher, sink: &ReportSink) -> ScanOutcome {
    let origin = crawl_origin(&job.seed);
    let mut visited: HashSet<String> = HashSet::new();
    let mut worklist: VecDeque<(String, usize)> = VecDeque::new();
    worklist.push_back((job.seed.clone(), 0));

    while let Some((url, depth)) = worklist.pop_front() {
        if job.cancelled() {
            return ScanOutcome::Stopped;
        }
        if depth > job.max_depth || visited.contains(&url) {
            continue;
        }
        visited.insert(url.clone());
        debug!(url = %url, depth, "visiting");

        // The page body lives exactly as long as the extraction step.
        let candidates = match fetcher.fetch_body(&url).await {
            Ok(html) => extract_links(&html, job.max_links),
            Err(failure) => {
                debug!(url = %url, error = %failure, "fetch failed");
                sink.push(Finding::Unreachable { url });
                continue;
            }
        };

        for href in candidates {
            // A stop observed mid-page abandons the remaining candidates
            // entirely: not visited, not reported.
            if job.cancelled() {
                return ScanOutcome::Stopped;
            }

            let Some(link) = normalize(&origin, &href) else {
                continue;
            };
            if !in_scope(&origin, &link) {
                continue;
            }

            match fetcher.probe_status(&link).await {
                Ok(code) if code >= 400 => sink.push(Finding::Dead {
                    code,
                    url: link.clone(),
                }),
                Ok(_) => {}
                // A failed probe reports nothing here; if the link is still
                // reachable through the worklist, its unreachability
                // surfaces when it is visited.
                Err(failure) => debug!(url = %link, error = %failure, "probe failed"),
            }

            // Dead links are still traversed into: one-shot probe, then
            // descend. The worklist preconditions bound the recursion.
            worklist.push_back((link, depth + 1));
        }
    }

    if job.cancelled() {
        ScanOutcome::Stopped
    } else {
        ScanOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    async fn drain(handle: &mut ScanHandle) -> Vec<Finding> {
        let mut findings = Vec::new();
        while let Some(finding) = handle.next_finding().await {
            let ended = matches!(finding, Finding::Ended { .. });
            findings.push(finding);
            if ended {
                break;
            }
        }
        findings
    }

    async fn run_to_end(job: CrawlJob) -> Vec<Finding> {
        let scanner = Scanner::new();
        let mut handle = scanner.start_job(job).expect("no scan should be running");
        drain(&mut handle).await
    }

    #[tokio::test]
    async fn reports_exactly_the_dead_links_of_the_site() {
        let site = MockServer::start().await;
        let external = MockServer::start().await;
        // The external host is out of scope and must never be contacted.
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&external)
            .await;

        let body = format!(
            r#"<html><body>
                <a href="/ok">fine</a>
                <a href="/missing">broken</a>
                <a href="{}/x">elsewhere</a>
            </body></html>"#,
            external.uri()
        );
        mount_page(&site, "/", 200, &body).await;
        mount_page(&site, "/ok", 200, "<p>all good</p>").await;
        mount_page(&site, "/missing", 404, "").await;

        let findings = run_to_end(CrawlJob::new(site.uri())).await;

        assert_eq!(
            findings,
            vec![
                Finding::Dead {
                    code: 404,
                    url: format!("{}/missing", site.uri()),
                },
                Finding::Ended {
                    outcome: ScanOutcome::Completed,
                },
            ]
        );
    }

    #[tokio::test]
    async fn depth_zero_probes_seed_links_but_never_fetches_them() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="/ok">a</a><a href="/missing">b</a>"#,
            ))
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&site)
            .await;
        // Depth 0: the links themselves are never visited.
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&site)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&site)
            .await;

        let findings = run_to_end(CrawlJob::with_limits(site.uri(), 0, 1000)).await;

        assert_eq!(
            findings,
            vec![
                Finding::Dead {
                    code: 404,
                    url: format!("{}/missing", site.uri()),
                },
                Finding::Ended {
                    outcome: ScanOutcome::Completed,
                },
            ]
        );
    }

    #[tokio::test]
    async fn linked_pages_are_fetched_exactly_once_despite_cycles() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/b">b</a>"#))
            .expect(1)
            .mount(&site)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/a">a</a>"#))
            .expect(1)
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&site)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&site)
            .await;

        let findings = run_to_end(CrawlJob::new(format!("{}/a", site.uri()))).await;

        assert_eq!(
            findings,
            vec![Finding::Ended {
                outcome: ScanOutcome::Completed,
            }]
        );
        // expect(1) on the GET mocks is verified when `site` drops.
    }

    #[tokio::test]
    async fn dead_links_are_still_descended_into() {
        let site = MockServer::start().await;
        mount_page(&site, "/", 200, r#"<a href="/missing">gone</a>"#).await;
        mount_page(&site, "/missing", 404, r#"<a href="/also-gone">worse</a>"#).await;
        mount_page(&site, "/also-gone", 404, "").await;

        let findings = run_to_end(CrawlJob::new(site.uri())).await;

        assert_eq!(
            findings,
            vec![
                Finding::Dead {
                    code: 404,
                    url: format!("{}/missing", site.uri()),
                },
                Finding::Dead {
                    code: 404,
                    url: format!("{}/also-gone", site.uri()),
                },
                Finding::Ended {
                    outcome: ScanOutcome::Completed,
                },
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_seed_is_reported_and_the_scan_completes() {
        // Nothing listens on port 1.
        let seed = "http://127.0.0.1:1/";
        let findings = run_to_end(CrawlJob::new(seed)).await;

        assert_eq!(
            findings,
            vec![
                Finding::Unreachable {
                    url: seed.to_string(),
                },
                Finding::Ended {
                    outcome: ScanOutcome::Completed,
                },
            ]
        );
    }

    #[tokio::test]
    async fn a_cancelled_job_emits_only_the_stopped_terminal() {
        let site = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&site)
            .await;

        let job = CrawlJob::new(site.uri());
        job.cancel();
        let findings = run_to_end(job).await;

        assert_eq!(
            findings,
            vec![Finding::Ended {
                outcome: ScanOutcome::Stopped,
            }]
        );
    }

    #[tokio::test]
    async fn stop_scan_takes_effect_at_the_next_check_point() {
        let site = MockServer::start().await;
        // The seed fetch is slow; the stop arrives while it is in flight.
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="/trap">t</a>"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&site)
            .await;
        // Would produce a dead-link finding if the stop were ignored.
        mount_page(&site, "/trap", 404, "").await;

        let scanner = Scanner::new();
        let mut handle = scanner.start_scan(&site.uri()).expect("scan should start");

        // A second scan on the same Scanner is a silent no-op while the
        // first is running.
        assert!(scanner.start_scan(&site.uri()).is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        scanner.stop_scan();

        let findings = drain(&mut handle).await;
        assert_eq!(
            findings,
            vec![Finding::Ended {
                outcome: ScanOutcome::Stopped,
            }]
        );
    }

    #[tokio::test]
    async fn rerunning_an_unchanged_site_yields_an_identical_sequence() {
        let site = MockServer::start().await;
        mount_page(
            &site,
            "/",
            200,
            r#"<a href="/one">1</a><a href="/missing">2</a><a href="/two">3</a>"#,
        )
        .await;
        mount_page(&site, "/one", 200, r#"<a href="/broken">4</a>"#).await;
        mount_page(&site, "/two", 200, "").await;
        mount_page(&site, "/missing", 404, "").await;
        mount_page(&site, "/broken", 500, "").await;

        let first = run_to_end(CrawlJob::new(site.uri())).await;
        let second = run_to_end(CrawlJob::new(site.uri())).await;

        assert_eq!(first, second);
        assert_eq!(
            first
                .iter()
                .filter(|finding| finding.is_problem())
                .count(),
            2
        );
    }
}
