// Typed event stream published by a running job.
//
// Each job owns one EventSink: an ordered log plus a broadcast channel. A
// subscriber gets the log replayed first and the live feed after, with no
// gap and no duplicate in between, so consumers can attach (or re-attach)
// at any point of the job's life.

use crate::graph::SiteGraph;
use crate::job::JobState;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The job entered a stage. Corpus acquisition attaches progress fields.
    Stage {
        stage: JobState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes_downloaded: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes_total: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        files_extracted: Option<u64>,
    },
    /// Emitted once, after candidate building.
    Meta {
        wordlists: Vec<String>,
        total_candidates: usize,
        extensions: Vec<String>,
    },
    /// Fraction of candidates completed, non-decreasing.
    Progress { value: f64 },
    /// A confirmed finding.
    Found {
        path: String,
        url: String,
        status: u16,
        size: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        issues: Vec<String>,
    },
    /// Terminal: the scan ran to completion.
    Done { graph: SiteGraph },
    /// Terminal: the scan was canceled; the graph holds whatever was
    /// confirmed before cancellation was observed.
    Canceled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        graph: SiteGraph,
    },
    /// Terminal: the scan failed. Partial findings are not reported.
    Error {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl JobEvent {
    pub fn stage(stage: JobState) -> Self {
        JobEvent::Stage {
            stage,
            bytes_downloaded: None,
            bytes_total: None,
            files_extracted: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::Done { .. } | JobEvent::Canceled { .. } | JobEvent::Error { .. }
        )
    }
}

/// Ordered event log plus live broadcast for one job.
pub struct EventSink {
    log: Mutex<Vec<JobEvent>>,
    tx: broadcast::Sender<JobEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Append to the log and fan out to live subscribers.
    pub fn emit(&self, event: JobEvent) {
        let mut log = self.log.lock().unwrap();
        log.push(event.clone());
        // send while holding the lock so subscribe() can't observe a gap
        let _ = self.tx.send(event);
    }

    /// Snapshot of everything emitted so far plus a receiver for what comes
    /// next. Taken under the log lock, so the two never overlap or gap.
    pub fn subscribe(&self) -> (Vec<JobEvent>, broadcast::Receiver<JobEvent>) {
        let log = self.log.lock().unwrap();
        let rx = self.tx.subscribe();
        (log.clone(), rx)
    }

    /// Events emitted so far.
    pub fn history(&self) -> Vec<JobEvent> {
        self.log.lock().unwrap().clone()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
