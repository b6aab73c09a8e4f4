// Soft-404 baseline detection.
//
// Many servers answer every unknown path with HTTP 200 and a generic page.
// Before enumeration starts we request a handful of paths that cannot exist
// and record their response fingerprints; any later probe whose fingerprint
// matches the baseline is a false positive regardless of status code.

use crate::client::candidate_url;
use crate::error::{Result, ScanError};
use crate::result::ResponseSignature;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// How much of the body participates in the fingerprint.
const SIGNATURE_WINDOW: usize = 2048;

/// Responses whose lengths fall in the same bucket of this many bytes are
/// treated as equal in size.
const LENGTH_BUCKET: u64 = 256;

const PROBE_TOKEN_LEN: usize = 18;

/// The set of distinct response fingerprints observed for nonexistent paths.
#[derive(Debug, Clone, Default)]
pub struct BaselineSignature {
    buckets: HashSet<ResponseSignature>,
}

impl BaselineSignature {
    pub fn matches(&self, signature: &ResponseSignature) -> bool {
        self.buckets.contains(signature)
    }

    pub fn insert(&mut self, signature: ResponseSignature) -> bool {
        self.buckets.insert(signature)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Fingerprint one response.
///
/// The body is lowercased, stripped of the requested path (servers commonly
/// echo it back), digit runs (timestamps, request ids) and whitespace, then
/// hashed over the first [`SIGNATURE_WINDOW`] bytes.
pub fn signature_for(status: u16, path: &str, body: &[u8]) -> ResponseSignature {
    let window = &body[..body.len().min(SIGNATURE_WINDOW)];
    let text = String::from_utf8_lossy(window).to_lowercase();

    let echoed = path.trim_matches('/').to_lowercase();
    let mut normalized = if echoed.is_empty() {
        text
    } else {
        text.replace(&echoed, "")
    };
    normalized.retain(|c| !c.is_ascii_digit() && !c.is_whitespace());

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());

    ResponseSignature {
        status,
        length_bucket: body.len() as u64 / LENGTH_BUCKET,
        body_hash: format!("{:x}", hasher.finalize()),
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Probe `probes` randomly generated, virtually-certain-to-be-absent paths
/// and collect the distinct response signatures.
///
/// Fails with [`ScanError::TargetUnreachable`] when no probe gets any
/// response at all; a target we cannot baseline cannot be scanned.
pub async fn collect_baseline(
    client: &Client,
    base: &Url,
    probes: usize,
) -> Result<BaselineSignature> {
    let mut buckets = HashSet::new();
    let mut reachable = false;

    for _ in 0..probes.max(1) {
        let path = format!("/{}/", random_token(PROBE_TOKEN_LEN));
        let url = candidate_url(base, &path)?;

        match client.get(url).send().await {
            Ok(response) => {
                reachable = true;
                let status = response.status().as_u16();
                let body = response.bytes().await.unwrap_or_default();
                let signature = signature_for(status, &path, &body);
                debug!(
                    "baseline probe {} -> {} ({} bytes)",
                    path,
                    status,
                    body.len()
                );
                buckets.insert(signature);
            }
            Err(e) => {
                debug!("baseline probe {} failed: {}", path, e);
            }
        }
    }

    if !reachable {
        return Err(ScanError::TargetUnreachable(base.to_string()));
    }

    Ok(BaselineSignature { buckets })
}
