use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunables applied to every scan job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Worker pool size per job.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport-level retries per probe. Application statuses never retry.
    pub retries: usize,
    /// Nonexistent paths requested when computing the soft-404 baseline.
    pub baseline_probes: usize,
    /// Ceiling on the candidate set size per job.
    pub max_candidates: usize,
    /// Extension variants generated per base word.
    pub max_extensions_per_word: usize,
    /// Seconds a terminal job stays queryable before eviction.
    pub retention_secs: u64,
    /// Process-wide ceiling on outstanding requests across all jobs.
    pub global_request_ceiling: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 64,
            timeout_secs: 10,
            retries: 2,
            baseline_probes: 3,
            max_candidates: 50_000,
            max_extensions_per_word: 2,
            retention_secs: 900,
            global_request_ceiling: 256,
        }
    }
}

/// Where the wordlist corpus lives and where it is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Local directory the corpus is extracted into.
    pub root: PathBuf,
    /// Gzipped tarball the corpus is fetched from on cold start.
    pub archive_url: String,
    /// Path prefix inside the archive (below its top-level directory) that
    /// holds the wordlists worth extracting.
    pub content_prefix: String,
}

/// SecLists pinned to a known commit so candidate sets stay reproducible.
const SECLISTS_COMMIT: &str = "617ecd9393ecd12925bde2467201c51e6baa7cdb";

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/wordlists"),
            archive_url: format!(
                "https://codeload.github.com/danielmiessler/SecLists/tar.gz/{}",
                SECLISTS_COMMIT
            ),
            content_prefix: "Discovery/Web-Content".to_string(),
        }
    }
}
