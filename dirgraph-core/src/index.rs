// Wordlist catalog built from the extracted corpus.
//
// A synchronous walk over the corpus directory; entries carry tags inferred
// from directory names and filename keywords, and an approximate candidate
// count derived from file size. Nothing here reads file bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Estimated bytes per wordlist line, for approximate counts.
const AVG_LINE_BYTES: u64 = 10;

/// One cataloged wordlist. Immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordlistEntry {
    pub path: PathBuf,
    pub name: String,
    pub tags: BTreeSet<String>,
    pub approx_count: usize,
}

#[derive(Debug, Default)]
pub struct WordlistIndex {
    entries: Vec<WordlistEntry>,
}

impl WordlistIndex {
    /// Walk `root` and catalog every `.txt` wordlist under it.
    ///
    /// Deterministic for a given corpus: entries are sorted by path.
    pub fn build(root: &Path) -> io::Result<WordlistIndex> {
        let mut entries = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }

                let size = entry.metadata()?.len();
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();

                entries.push(WordlistEntry {
                    tags: infer_tags(root, &path),
                    approx_count: (size / AVG_LINE_BYTES).max(1) as usize,
                    name,
                    path,
                });
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("indexed {} wordlists under {}", entries.len(), root.display());

        Ok(WordlistIndex { entries })
    }

    pub fn entries(&self) -> &[WordlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directory names below the corpus root become category tags; filename
/// keywords add technology tags.
fn infer_tags(root: &Path, path: &Path) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components().rev().skip(1) {
            if let Some(segment) = component.as_os_str().to_str() {
                tags.insert(segment.to_lowercase());
            }
        }
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    for (keyword, tag) in [
        ("directory-list", "common"),
        ("common", "common"),
        ("raft-", "common"),
        ("php", "php"),
        ("asp", "asp"),
        ("iis", "asp"),
        ("api", "api"),
        ("wordpress", "wordpress"),
        ("wp-", "wordpress"),
        ("drupal", "drupal"),
        ("joomla", "joomla"),
        ("jsp", "java"),
        ("java", "java"),
    ] {
        if name.contains(keyword) {
            tags.insert(tag.to_string());
        }
    }

    tags
}
