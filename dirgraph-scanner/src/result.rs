use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Comparable fingerprint of a single HTTP response.
///
/// Two responses with the same status, a body length in the same bucket and
/// an identical normalized body hash are considered "the same page" for the
/// purposes of soft-404 filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseSignature {
    pub status: u16,
    pub length_bucket: u64,
    pub body_hash: String,
}

/// Raw outcome of probing a single candidate path.
///
/// A transport failure after retries yields `status == 0` and a populated
/// `error`, mirroring how a failed fetch is recorded rather than raised.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub path: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub signature: Option<ResponseSignature>,
    pub redirected_to: Option<String>,
    pub elapsed: Duration,
    pub body_snippet: String,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn transport_failure(path: &str, url: &str, error: String, elapsed: Duration) -> Self {
        Self {
            path: path.to_string(),
            url: url.to_string(),
            status: 0,
            size: 0,
            signature: None,
            redirected_to: None,
            elapsed,
            body_snippet: String::new(),
            error: Some(error),
        }
    }
}

/// A probe result that survived classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub path: String,
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub redirected_to: Option<String>,
    /// Classification note, e.g. "auth-required" for 401/403 responses.
    pub note: Option<String>,
    pub issues: Vec<String>,
}
