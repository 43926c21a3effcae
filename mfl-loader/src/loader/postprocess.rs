//! Final ordering and deduplication
//!
//! Entries are stably sorted by file name, then collapsed by identity
//! `(file_name, file_size)`: the first entry in sorted order survives and
//! later duplicates are handed back so the caller can report and drop them.

use std::collections::HashSet;

use crate::models::Entry;

/// Sorted, deduplicated entries plus the duplicates that were removed
#[derive(Debug, Default)]
pub struct Finalized {
    pub entries: Vec<Entry>,
    pub duplicates: Vec<Entry>,
}

/// Sort by file name (stable), then dedup by identity
pub fn finalize(mut entries: Vec<Entry>) -> Finalized {
    entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut seen: HashSet<(String, u64)> = HashSet::with_capacity(entries.len());
    let mut finalized = Finalized::default();

    for entry in entries {
        if seen.insert((entry.file_name.clone(), entry.file_size)) {
            finalized.entries.push(entry);
        } else {
            tracing::debug!(
                file = %entry.file_name,
                size = entry.file_size,
                "Dropping duplicate entry"
            );
            finalized.duplicates.push(entry);
        }
    }

    finalized
}
