// Wordlist corpus acquisition.
//
// Process-wide, lazily-initialized state: a readiness flag plus a mutex
// around the one-time download/extract path. Concurrent jobs calling
// ensure() during a cold start await the in-flight acquisition instead of
// duplicating the download. Extraction lands in a staging directory renamed
// into place on success, so a crash mid-extract never passes for a warm
// corpus.

use crate::config::CorpusConfig;
use crate::event::{EventSink, JobEvent};
use crate::index::WordlistIndex;
use crate::job::{JobError, JobState};
use flate2::read::GzDecoder;
use futures::StreamExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

const DOWNLOAD_TIMEOUT_SECS: u64 = 600;
const DOWNLOAD_PROGRESS_STEP: u64 = 1 << 20;
const EXTRACT_PROGRESS_STEP: u64 = 250;

/// Proof that the corpus is on disk; points at the extracted lists.
#[derive(Debug, Clone)]
pub struct CorpusHandle {
    pub root: PathBuf,
}

pub struct CorpusStore {
    config: CorpusConfig,
    ready: AtomicBool,
    acquire: Mutex<()>,
    index: RwLock<Option<Arc<WordlistIndex>>>,
}

impl CorpusStore {
    pub fn new(config: CorpusConfig) -> Self {
        Self {
            config,
            ready: AtomicBool::new(false),
            acquire: Mutex::new(()),
            index: RwLock::new(None),
        }
    }

    /// Directory the extracted wordlists live in.
    pub fn lists_dir(&self) -> PathBuf {
        self.config.root.join("web-content")
    }

    /// Make sure the corpus is present, downloading and extracting it on
    /// first use. Idempotent and safe to call from any number of jobs;
    /// download progress is emitted to `sink`.
    pub async fn ensure(&self, sink: &Arc<EventSink>) -> Result<CorpusHandle, JobError> {
        let dir = self.lists_dir();
        if self.ready.load(Ordering::Acquire) {
            return Ok(CorpusHandle { root: dir });
        }

        let _guard = self.acquire.lock().await;
        if self.ready.load(Ordering::Acquire) {
            return Ok(CorpusHandle { root: dir });
        }

        if dir_has_content(&dir) {
            info!("wordlist corpus present at {}", dir.display());
            self.ready.store(true, Ordering::Release);
            return Ok(CorpusHandle { root: dir });
        }

        self.acquire_cold(sink).await?;
        *self.index.write().unwrap() = None;
        self.ready.store(true, Ordering::Release);
        Ok(CorpusHandle { root: dir })
    }

    /// The cached wordlist index, built on first use after the corpus is
    /// ready and rebuilt only after a fresh extraction.
    pub fn index(&self) -> Result<Arc<WordlistIndex>, JobError> {
        if let Some(index) = self.index.read().unwrap().as_ref() {
            return Ok(index.clone());
        }

        let index = WordlistIndex::build(&self.lists_dir())
            .map_err(|e| JobError::CorpusUnavailable(format!("index build failed: {}", e)))?;
        if index.is_empty() {
            return Err(JobError::CorpusUnavailable(
                "corpus contains no wordlists".to_string(),
            ));
        }

        let index = Arc::new(index);
        *self.index.write().unwrap() = Some(index.clone());
        Ok(index)
    }

    async fn acquire_cold(&self, sink: &Arc<EventSink>) -> Result<(), JobError> {
        info!("downloading wordlist corpus from {}", self.config.archive_url);
        fs::create_dir_all(&self.config.root)
            .map_err(|e| JobError::CorpusUnavailable(format!("cannot create corpus dir: {}", e)))?;

        let archive = self.download(sink).await?;

        let staging = self.config.root.join(".staging");
        let prefix = self.config.content_prefix.clone();
        let extract_sink = sink.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_wordlists(&archive, &staging, &prefix, &extract_sink)
        })
        .await
        .map_err(|e| JobError::CorpusUnavailable(format!("extraction task failed: {}", e)))?
        .map_err(|e| JobError::CorpusUnavailable(format!("extraction failed: {}", e)))?;

        if extracted == 0 {
            let _ = fs::remove_dir_all(self.config.root.join(".staging"));
            return Err(JobError::CorpusUnavailable(
                "archive contained no wordlists".to_string(),
            ));
        }

        let dir = self.lists_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| JobError::CorpusUnavailable(format!("cannot replace corpus: {}", e)))?;
        }
        fs::rename(self.config.root.join(".staging"), &dir)
            .map_err(|e| JobError::CorpusUnavailable(format!("cannot finalize corpus: {}", e)))?;

        sink.emit(JobEvent::Stage {
            stage: JobState::AcquiringCorpus,
            bytes_downloaded: None,
            bytes_total: None,
            files_extracted: Some(extracted),
        });
        info!("extracted {} wordlists to {}", extracted, dir.display());
        Ok(())
    }

    async fn download(&self, sink: &Arc<EventSink>) -> Result<Vec<u8>, JobError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| JobError::CorpusUnavailable(e.to_string()))?;

        let response = client
            .get(&self.config.archive_url)
            .send()
            .await
            .map_err(|e| JobError::CorpusUnavailable(format!("download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(JobError::CorpusUnavailable(format!(
                "archive fetch returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let total = response.content_length();
        sink.emit(JobEvent::Stage {
            stage: JobState::AcquiringCorpus,
            bytes_downloaded: Some(0),
            bytes_total: total,
            files_extracted: None,
        });

        let mut archive = Vec::new();
        let mut downloaded = 0u64;
        let mut last_reported = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| JobError::CorpusUnavailable(format!("download failed: {}", e)))?;
            downloaded += chunk.len() as u64;
            archive.extend_from_slice(&chunk);

            if downloaded - last_reported >= DOWNLOAD_PROGRESS_STEP {
                last_reported = downloaded;
                sink.emit(JobEvent::Stage {
                    stage: JobState::AcquiringCorpus,
                    bytes_downloaded: Some(downloaded),
                    bytes_total: total,
                    files_extracted: None,
                });
            }
        }

        if archive.is_empty() {
            return Err(JobError::CorpusUnavailable("downloaded archive is empty".to_string()));
        }

        sink.emit(JobEvent::Stage {
            stage: JobState::AcquiringCorpus,
            bytes_downloaded: Some(downloaded),
            bytes_total: total,
            files_extracted: None,
        });
        debug!("downloaded {} bytes", downloaded);
        Ok(archive)
    }
}

fn dir_has_content(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Unpack `.txt` wordlists below the archive's content prefix into `staging`,
/// skipping the archive's top-level directory component.
fn extract_wordlists(
    archive: &[u8],
    staging: &Path,
    prefix: &str,
    sink: &EventSink,
) -> io::Result<u64> {
    if staging.exists() {
        fs::remove_dir_all(staging)?;
    }
    fs::create_dir_all(staging)?;

    let mut tarball = tar::Archive::new(GzDecoder::new(archive));
    let mut extracted = 0u64;

    for entry in tarball.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        let mut components = path.components();
        components.next(); // "<repo>-<ref>/"
        let Ok(relative) = components.as_path().strip_prefix(prefix) else {
            continue;
        };
        if relative.as_os_str().is_empty()
            || relative.extension().and_then(|e| e.to_str()) != Some("txt")
        {
            continue;
        }

        let target = staging.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
        extracted += 1;

        if extracted % EXTRACT_PROGRESS_STEP == 0 {
            sink.emit(JobEvent::Stage {
                stage: JobState::AcquiringCorpus,
                bytes_downloaded: None,
                bytes_total: None,
                files_extracted: Some(extracted),
            });
        }
    }

    Ok(extracted)
}
