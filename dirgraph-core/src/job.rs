// Job lifecycle management.
//
// One JobManager per process owns the job table, the shared corpus store
// and the global request ceiling. Each submitted job runs its stages
// sequentially in a spawned task, publishing typed events as it goes.
// Cancellation is cooperative: a per-job flag checked at stage boundaries
// and between probe dispatches, never aborting a request in flight.

use crate::candidates::build_candidates;
use crate::config::{CorpusConfig, ScanConfig};
use crate::corpus::CorpusStore;
use crate::event::{EventSink, JobEvent};
use crate::graph::build_graph;
use crate::select::select_wordlists;
use chrono::{DateTime, Utc};
use dirgraph_scanner::baseline::collect_baseline;
use dirgraph_scanner::client::build_scan_client;
use dirgraph_scanner::enumerate::{Enumerator, FoundCallback, ProgressCallback};
use dirgraph_scanner::probe::probe_target;
use dirgraph_scanner::{Finding, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Wordlist corpus unavailable: {0}")]
    CorpusUnavailable(String),

    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl JobError {
    /// Machine-readable reason published with the error event.
    pub fn reason(&self) -> &'static str {
        match self {
            JobError::CorpusUnavailable(_) => "corpus_unavailable",
            JobError::TargetUnreachable(_) => "target_unreachable",
            JobError::InvalidTarget(_) => "invalid_target",
            JobError::Scan(ScanError::TargetUnreachable(_)) => "target_unreachable",
            JobError::Scan(_) => "scan_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    AcquiringCorpus,
    Indexing,
    ProbingTarget,
    SelectingWordlists,
    BuildingCandidates,
    ComputingBaseline,
    Enumerating,
    Done,
    Canceled,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Canceled | JobState::Error)
    }
}

pub type JobId = String;

/// A single scan, owned by the manager.
pub struct Job {
    pub id: JobId,
    pub target: Url,
    pub created_at: DateTime<Utc>,
    pub events: Arc<EventSink>,
    state: Mutex<JobState>,
    cancel: Arc<AtomicBool>,
    total_candidates: AtomicUsize,
    completed: AtomicUsize,
    found: AtomicUsize,
}

impl Job {
    fn new(target: Url) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            target,
            created_at: Utc::now(),
            events: Arc::new(EventSink::new()),
            state: Mutex::new(JobState::Created),
            cancel: Arc::new(AtomicBool::new(false)),
            total_candidates: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            found: AtomicUsize::new(0),
        })
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap()
    }

    /// Advance the state machine. Terminal states are immutable; a
    /// transition out of one is refused.
    fn set_state(&self, next: JobState) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.is_terminal() {
            return false;
        }
        debug!("job {}: {:?} -> {:?}", self.id, *state, next);
        *state = next;
        true
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn counters(&self) -> (usize, usize, usize) {
        (
            self.total_candidates.load(Ordering::Relaxed),
            self.completed.load(Ordering::Relaxed),
            self.found.load(Ordering::Relaxed),
        )
    }
}

/// Cheaply cloneable handle to the process-wide job engine.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    jobs: Mutex<HashMap<JobId, Arc<Job>>>,
    corpus: CorpusStore,
    config: ScanConfig,
    request_permits: Arc<Semaphore>,
}

impl JobManager {
    pub fn new(config: ScanConfig, corpus_config: CorpusConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                jobs: Mutex::new(HashMap::new()),
                corpus: CorpusStore::new(corpus_config),
                request_permits: Arc::new(Semaphore::new(config.global_request_ceiling.max(1))),
                config,
            }),
        }
    }

    /// Validate the target and start a scan. The returned id is live
    /// immediately; events begin flowing from the spawned runner.
    pub fn submit(&self, target: &str) -> Result<JobId, JobError> {
        let url = parse_target(target)?;
        let job = Job::new(url);
        let id = job.id.clone();

        self.inner.jobs.lock().unwrap().insert(id.clone(), job.clone());
        info!("job {} submitted for {}", id, job.target);

        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_job(job).await;
        });

        Ok(id)
    }

    /// Request cancellation. Idempotent; canceling a terminal job is a
    /// no-op. Returns false for an unknown id.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(job) = self.get(id) else {
            return false;
        };
        if !job.state().is_terminal() {
            info!("job {} cancellation requested", id);
            job.request_cancel();
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.inner.jobs.lock().unwrap().get(id).cloned()
    }

    /// Event history plus a live receiver for a job, or None if unknown.
    pub fn subscribe(&self, id: &str) -> Option<(Vec<JobEvent>, broadcast::Receiver<JobEvent>)> {
        self.get(id).map(|job| job.events.subscribe())
    }

    async fn run_job(&self, job: Arc<Job>) {
        if let Err(err) = self.drive(&job).await {
            warn!("job {} failed: {}", job.id, err);
            job.set_state(JobState::Error);
            job.events.emit(JobEvent::Error {
                reason: err.reason().to_string(),
                detail: Some(err.to_string()),
            });
        }
        self.schedule_eviction(job.id.clone());
    }

    /// Advance through the stages. Returns Err only for fatal failures;
    /// cancellation and completion both return Ok after emitting their
    /// terminal event.
    async fn drive(&self, job: &Arc<Job>) -> Result<(), JobError> {
        let events = &job.events;

        if !self.enter_stage(job, JobState::AcquiringCorpus) {
            return Ok(self.finish_canceled(job, &[]));
        }
        self.inner.corpus.ensure(events).await?;

        if !self.enter_stage(job, JobState::Indexing) {
            return Ok(self.finish_canceled(job, &[]));
        }
        let index = self.inner.corpus.index()?;

        if !self.enter_stage(job, JobState::ProbingTarget) {
            return Ok(self.finish_canceled(job, &[]));
        }
        let client = build_scan_client(self.inner.config.timeout_secs)?;
        let profile = probe_target(&client, &job.target).await;

        if !self.enter_stage(job, JobState::SelectingWordlists) {
            return Ok(self.finish_canceled(job, &[]));
        }
        let selected = select_wordlists(&index, &profile, self.inner.config.max_candidates);

        if !self.enter_stage(job, JobState::BuildingCandidates) {
            return Ok(self.finish_canceled(job, &[]));
        }
        let candidates = build_candidates(&selected, &profile, &self.inner.config);
        job.total_candidates.store(candidates.len(), Ordering::Relaxed);
        events.emit(JobEvent::Meta {
            wordlists: selected.iter().map(|e| e.name.clone()).collect(),
            total_candidates: candidates.len(),
            extensions: profile
                .extension_hints()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        });

        if !self.enter_stage(job, JobState::ComputingBaseline) {
            return Ok(self.finish_canceled(job, &[]));
        }
        let baseline = collect_baseline(&client, &job.target, self.inner.config.baseline_probes)
            .await
            .map_err(|e| match e {
                ScanError::TargetUnreachable(t) => JobError::TargetUnreachable(t),
                other => JobError::Scan(other),
            })?;

        if !self.enter_stage(job, JobState::Enumerating) {
            return Ok(self.finish_canceled(job, &[]));
        }

        let found_events = events.clone();
        let found_job = job.clone();
        let found_callback: FoundCallback = Arc::new(move |finding: &Finding| {
            found_job.found.fetch_add(1, Ordering::Relaxed);
            found_events.emit(JobEvent::Found {
                path: finding.path.clone(),
                url: finding.url.clone(),
                status: finding.status,
                size: finding.size,
                note: finding.note.clone(),
                issues: finding.issues.clone(),
            });
        });

        let progress_events = events.clone();
        let progress_job = job.clone();
        let progress_callback: ProgressCallback = Arc::new(move |completed, total| {
            progress_job.completed.store(completed, Ordering::Relaxed);
            progress_events.emit(JobEvent::Progress {
                value: completed as f64 / total as f64,
            });
        });

        let enumerator = Enumerator::new(client, job.target.clone())
            .with_concurrency(self.inner.config.concurrency)
            .with_retries(self.inner.config.retries)
            .with_global_permits(self.inner.request_permits.clone())
            .with_cancel_flag(job.cancel.clone())
            .with_found_callback(found_callback)
            .with_progress_callback(progress_callback);

        let outcome = enumerator.run(&candidates, &baseline).await?;

        if job.cancel_requested() {
            self.finish_canceled(job, &outcome.findings);
        } else {
            let graph = build_graph(&outcome.findings, &job.target);
            job.set_state(JobState::Done);
            events.emit(JobEvent::Done { graph });
            info!(
                "job {} done: {} findings of {} candidates",
                job.id,
                outcome.findings.len(),
                outcome.total
            );
        }
        Ok(())
    }

    /// Enter a transient stage unless cancellation was observed first.
    fn enter_stage(&self, job: &Arc<Job>, stage: JobState) -> bool {
        if job.cancel_requested() {
            return false;
        }
        job.set_state(stage);
        job.events.emit(JobEvent::stage(stage));
        true
    }

    fn finish_canceled(&self, job: &Arc<Job>, findings: &[Finding]) {
        let graph = build_graph(findings, &job.target);
        job.set_state(JobState::Canceled);
        job.events.emit(JobEvent::Canceled {
            reason: None,
            graph,
        });
        info!("job {} canceled with {} findings", job.id, findings.len());
    }

    /// Drop a terminal job from the table after the retention window.
    fn schedule_eviction(&self, id: JobId) {
        let manager = self.clone();
        let retention = Duration::from_secs(self.inner.config.retention_secs);
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            manager.inner.jobs.lock().unwrap().remove(&id);
            debug!("job {} evicted", id);
        });
    }
}

/// Reject anything that is not an absolute http(s) URL with a host.
pub fn parse_target(raw: &str) -> Result<Url, JobError> {
    let url = Url::parse(raw).map_err(|e| JobError::InvalidTarget(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(JobError::InvalidTarget(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(JobError::InvalidTarget("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_accepts_http_and_https() {
        assert!(parse_target("http://example.com").is_ok());
        assert!(parse_target("https://example.com:8443/app").is_ok());
    }

    #[test]
    fn test_parse_target_rejects_other_schemes() {
        assert!(parse_target("ftp://example.com").is_err());
        assert!(parse_target("file:///etc/passwd").is_err());
        assert!(parse_target("not a url").is_err());
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        let job = Job::new(Url::parse("http://example.com").unwrap());
        assert!(job.set_state(JobState::Enumerating));
        assert!(job.set_state(JobState::Done));
        assert!(!job.set_state(JobState::Error));
        assert_eq!(job.state(), JobState::Done);
    }
}
