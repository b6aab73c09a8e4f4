// Bounded-concurrency candidate enumeration.
//
// Workers drain a shared cursor over the ordered candidate slice, so dispatch
// follows candidate order even though completion does not. Every raw result
// flows through a single aggregator: the only place findings are appended,
// counters move and events fire.

use crate::analyze;
use crate::baseline::{BaselineSignature, signature_for};
use crate::client::candidate_url;
use crate::error::Result;
use crate::result::{Finding, ProbeResult};
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info};
use url::Url;

/// Invoked for every confirmed finding, before it is recorded.
pub type FoundCallback = Arc<dyn Fn(&Finding) + Send + Sync>;

/// Invoked after every completed probe with (completed, total).
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

const BODY_SNIPPET_LEN: usize = 2048;

pub struct Enumerator {
    client: Client,
    base: Url,
    concurrency: usize,
    retries: usize,
    retry_backoff: Duration,
    global_permits: Option<Arc<Semaphore>>,
    cancel: Arc<AtomicBool>,
    found_callback: Option<FoundCallback>,
    progress_callback: Option<ProgressCallback>,
}

/// Final tally of one enumeration run.
#[derive(Debug, Default)]
pub struct EnumerationOutcome {
    pub findings: Vec<Finding>,
    /// Dispatched probes that ran to completion, found or not.
    pub completed: usize,
    /// Candidates never dispatched because cancellation was observed.
    pub skipped: usize,
    pub total: usize,
}

impl Enumerator {
    pub fn new(client: Client, base: Url) -> Self {
        Self {
            client,
            base,
            concurrency: 32,
            retries: 2,
            retry_backoff: Duration::from_millis(250),
            global_permits: None,
            cancel: Arc::new(AtomicBool::new(false)),
            found_callback: None,
            progress_callback: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Process-wide ceiling on outstanding requests, shared across jobs.
    pub fn with_global_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.global_permits = Some(permits);
        self
    }

    /// Cooperative cancellation flag, checked between probe dispatches.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_found_callback(mut self, callback: FoundCallback) -> Self {
        self.found_callback = Some(callback);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn run(
        &self,
        candidates: &[String],
        baseline: &BaselineSignature,
    ) -> Result<EnumerationOutcome> {
        let total = candidates.len();
        if total == 0 {
            return Ok(EnumerationOutcome::default());
        }

        info!(
            "enumerating {} candidates against {} with {} workers",
            total, self.base, self.concurrency
        );

        let candidates: Arc<Vec<String>> = Arc::new(candidates.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(total);
        let (tx, mut rx) = mpsc::channel::<ProbeResult>(workers * 2);

        let mut handles = Vec::new();
        for worker_id in 0..workers {
            let client = self.client.clone();
            let base = self.base.clone();
            let candidates = candidates.clone();
            let cursor = cursor.clone();
            let cancel = self.cancel.clone();
            let permits = self.global_permits.clone();
            let tx = tx.clone();
            let retries = self.retries;
            let backoff = self.retry_backoff;

            handles.push(tokio::spawn(async move {
                debug!("worker {} started", worker_id);
                loop {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let idx = cursor.fetch_add(1, Ordering::Relaxed);
                    if idx >= candidates.len() {
                        break;
                    }

                    let _permit = match &permits {
                        Some(semaphore) => match semaphore.clone().acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => break,
                        },
                        None => None,
                    };

                    let result =
                        probe_candidate(&client, &base, &candidates[idx], retries, backoff).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
                debug!("worker {} finished", worker_id);
            }));
        }
        drop(tx);

        // Single aggregator: classification, accounting and event publication
        // all happen here, sequentially.
        let mut findings = Vec::new();
        let mut completed = 0usize;
        while let Some(result) = rx.recv().await {
            completed += 1;

            if self.cancel.load(Ordering::Relaxed) {
                // Results still in flight when cancellation lands are counted
                // but not classified; nothing is found after a cancel.
                continue;
            }

            if let Some(finding) = classify(&result, baseline) {
                if let Some(ref callback) = self.found_callback {
                    callback(&finding);
                }
                findings.push(finding);
            }

            if let Some(ref callback) = self.progress_callback {
                callback(completed, total);
            }
        }

        for handle in handles {
            handle.await?;
        }

        let skipped = total - completed;
        info!(
            "enumeration done: {} findings, {} completed, {} skipped",
            findings.len(),
            completed,
            skipped
        );

        Ok(EnumerationOutcome {
            findings,
            completed,
            skipped,
            total,
        })
    }
}

/// Probe a single candidate, retrying transport-level failures only.
async fn probe_candidate(
    client: &Client,
    base: &Url,
    path: &str,
    retries: usize,
    backoff: Duration,
) -> ProbeResult {
    let url = match candidate_url(base, path) {
        Ok(url) => url,
        Err(e) => {
            return ProbeResult::transport_failure(
                path,
                base.as_str(),
                e.to_string(),
                Duration::ZERO,
            );
        }
    };

    let start = Instant::now();
    let mut attempt = 0;
    loop {
        match client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let redirected_to = response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                let body = response.bytes().await.unwrap_or_default();
                let snippet =
                    String::from_utf8_lossy(&body[..body.len().min(BODY_SNIPPET_LEN)]).into_owned();

                return ProbeResult {
                    path: path.to_string(),
                    url: url.to_string(),
                    status,
                    size: body.len() as u64,
                    signature: Some(signature_for(status, path, &body)),
                    redirected_to,
                    elapsed: start.elapsed(),
                    body_snippet: snippet,
                    error: None,
                };
            }
            Err(e) if attempt < retries && is_transient(&e) => {
                attempt += 1;
                debug!(
                    "retrying {} after transport error ({}/{}): {}",
                    path, attempt, retries, e
                );
                tokio::time::sleep(backoff * attempt as u32).await;
            }
            Err(e) => {
                return ProbeResult::transport_failure(
                    path,
                    url.as_str(),
                    e.to_string(),
                    start.elapsed(),
                );
            }
        }
    }
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Classify one completed probe against the baseline.
///
/// 2xx/3xx survive unless the baseline recognizes them as the target's
/// generic not-found page; 401/403 are always findings of note; everything
/// else, including exhausted-retry transport failures, is a discard.
fn classify(result: &ProbeResult, baseline: &BaselineSignature) -> Option<Finding> {
    if result.error.is_some() {
        return None;
    }

    match result.status {
        401 | 403 => Some(to_finding(result, Some("auth-required"))),
        status if (200..300).contains(&status) => {
            if let Some(ref signature) = result.signature
                && baseline.matches(signature)
            {
                debug!("suppressing soft-404 match for {}", result.path);
                return None;
            }
            Some(to_finding(result, None))
        }
        status if (300..400).contains(&status) => {
            if let Some(ref signature) = result.signature
                && baseline.matches(signature)
            {
                return None;
            }
            Some(to_finding(result, Some("redirect")))
        }
        _ => None,
    }
}

fn to_finding(result: &ProbeResult, note: Option<&str>) -> Finding {
    Finding {
        path: result.path.clone(),
        url: result.url.clone(),
        status: result.status,
        size: result.size,
        redirected_to: result.redirected_to.clone(),
        note: note.map(|n| n.to_string()),
        issues: analyze::analyze(&result.path, result.status, &result.body_snippet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(path: &str, status: u16, body: &str) -> ProbeResult {
        ProbeResult {
            path: path.to_string(),
            url: format!("http://target.example{}", path),
            status,
            size: body.len() as u64,
            signature: Some(signature_for(status, path, body.as_bytes())),
            redirected_to: None,
            elapsed: Duration::ZERO,
            body_snippet: body.to_string(),
            error: None,
        }
    }

    fn baseline_of(pages: &[(u16, &str)]) -> BaselineSignature {
        let mut baseline = BaselineSignature::default();
        for (i, (status, body)) in pages.iter().enumerate() {
            let path = format!("/zz-absent-{}/", i);
            baseline.insert(signature_for(*status, &path, body.as_bytes()));
        }
        baseline
    }

    #[test]
    fn test_classify_soft_404_suppressed() {
        let baseline = baseline_of(&[(200, "Page Not Found")]);
        let result = probe("/missing1", 200, "Page Not Found");
        assert!(classify(&result, &baseline).is_none());
    }

    #[test]
    fn test_classify_real_200_survives() {
        let baseline = baseline_of(&[(200, "Page Not Found")]);
        let result = probe("/admin", 200, "OK");
        let finding = classify(&result, &baseline).unwrap();
        assert_eq!(finding.status, 200);
        assert!(finding.note.is_none());
    }

    #[test]
    fn test_classify_403_bypasses_baseline() {
        // 403s are findings of note even if the body happens to match.
        let baseline = baseline_of(&[(403, "Forbidden")]);
        let result = probe("/secret", 403, "Forbidden");
        let finding = classify(&result, &baseline).unwrap();
        assert_eq!(finding.note.as_deref(), Some("auth-required"));
    }

    #[test]
    fn test_classify_redirect_noted() {
        let baseline = BaselineSignature::default();
        let result = probe("/old", 301, "");
        let finding = classify(&result, &baseline).unwrap();
        assert_eq!(finding.note.as_deref(), Some("redirect"));
    }

    #[test]
    fn test_classify_server_error_discarded() {
        let baseline = BaselineSignature::default();
        assert!(classify(&probe("/broken", 500, "boom"), &baseline).is_none());
        assert!(classify(&probe("/gone", 404, "nope"), &baseline).is_none());
    }

    #[test]
    fn test_classify_transport_failure_discarded() {
        let baseline = BaselineSignature::default();
        let result = ProbeResult::transport_failure(
            "/dead",
            "http://target.example/dead",
            "connection refused".to_string(),
            Duration::ZERO,
        );
        assert!(classify(&result, &baseline).is_none());
    }
}
