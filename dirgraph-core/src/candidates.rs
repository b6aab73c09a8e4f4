// Candidate path expansion.
//
// Selected wordlists are flattened into one deduplicated, ordered candidate
// sequence. Order matters: it is the probe dispatch order, and stable order
// keeps partial runs reproducible for the same inputs.

use crate::config::ScanConfig;
use crate::index::WordlistEntry;
use dirgraph_scanner::TargetProfile;
use std::collections::HashSet;
use std::fs;
use tracing::{debug, warn};

/// Expand the selected wordlists into the job's candidate set.
///
/// Blank lines, comments and malformed lines are skipped, never fatal;
/// an unreadable list is skipped whole. Every path is normalized to a
/// single leading slash and deduplicated in first-seen order. When the
/// profile suggests a scripting stack, extension variants are appended per
/// base word, bounded by `max_extensions_per_word`.
pub fn build_candidates(
    entries: &[WordlistEntry],
    profile: &TargetProfile,
    config: &ScanConfig,
) -> Vec<String> {
    let extensions = profile.extension_hints();
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<String> = Vec::new();

    'lists: for entry in entries {
        let raw = match fs::read(&entry.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping unreadable wordlist {}: {}", entry.path.display(), e);
                continue;
            }
        };
        let content = String::from_utf8_lossy(&raw);

        for line in content.lines() {
            if candidates.len() >= config.max_candidates {
                break 'lists;
            }

            let Some(path) = normalize_line(line) else {
                continue;
            };

            if seen.insert(path.clone()) {
                candidates.push(path.clone());
            }

            if extensions.is_empty() || path.contains('.') {
                continue;
            }
            for extension in extensions.iter().take(config.max_extensions_per_word) {
                if candidates.len() >= config.max_candidates {
                    break 'lists;
                }
                let variant = format!("{}{}", path.trim_end_matches('/'), extension);
                if seen.insert(variant.clone()) {
                    candidates.push(variant);
                }
            }
        }
    }

    debug!(
        "built {} candidates from {} wordlists",
        candidates.len(),
        entries.len()
    );
    candidates
}

/// Normalize one wordlist line, or reject it.
fn normalize_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    // embedded whitespace or traversal sequences mean a malformed entry
    if trimmed.contains(char::is_whitespace) || trimmed.contains("..") {
        return None;
    }

    let stripped = trimmed.trim_start_matches('/');
    if stripped.is_empty() {
        return None;
    }
    Some(format!("/{}", stripped))
}
