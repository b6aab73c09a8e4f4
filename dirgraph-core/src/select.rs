// Wordlist selection: which lists a job will actually probe from.

use crate::index::{WordlistEntry, WordlistIndex};
use dirgraph_scanner::TargetProfile;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Pick the wordlists for a job.
///
/// Generic lists are always in; technology-specific lists join when their
/// tags intersect the profile. When the combined approximate volume exceeds
/// `max_candidates`, smaller lists win and the largest are dropped until the
/// selection fits (at least one list always survives).
pub fn select_wordlists(
    index: &WordlistIndex,
    profile: &TargetProfile,
    max_candidates: usize,
) -> Vec<WordlistEntry> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut picked: Vec<WordlistEntry> = Vec::new();

    for entry in index.entries() {
        if entry.tags.contains("common") && seen.insert(entry.path.clone()) {
            picked.push(entry.clone());
        }
    }

    for entry in index.entries() {
        let matches_tech = entry.tags.iter().any(|tag| profile.has_tech(tag));
        if matches_tech && seen.insert(entry.path.clone()) {
            picked.push(entry.clone());
        }
    }

    let total: usize = picked.iter().map(|e| e.approx_count).sum();
    if total <= max_candidates {
        return picked;
    }

    // Over budget: keep the smallest, most specific lists.
    picked.sort_by_key(|e| e.approx_count);
    let mut kept = Vec::new();
    let mut budget = 0usize;
    for entry in picked {
        if kept.is_empty() || budget + entry.approx_count <= max_candidates {
            budget += entry.approx_count;
            kept.push(entry);
        }
    }

    debug!(
        "selection capped: {} lists kept, ~{} candidates (ceiling {})",
        kept.len(),
        budget,
        max_candidates
    );
    kept
}
