//! Sidecar matching
//!
//! Built once per load session from every caption and analysis-text file,
//! then shared read-only by all enrichment operations.
//!
//! Resolution for one primary base name:
//! 1. Exact pass: first caption and first analysis file (scan order) whose
//!    normalized base name equals the primary's.
//! 2. Fuzzy pass, only for a field the exact pass left empty: scan the full
//!    list for that category and keep the best-scoring candidate. A candidate
//!    must score at least the threshold, and replaces the current best only
//!    when its score is strictly greater, so ties keep the first candidate in
//!    scan order.
//! 3. No eligible candidate leaves the field empty; that is not an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::FileHandle;
use crate::services::classifier::Category;

/// Matching key for a file name
///
/// Strips the final extension segment, trims whitespace, lower-cases.
pub fn normalize_base_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };
    stem.trim().to_lowercase()
}

/// Edit-distance similarity in [0, 1]
///
/// `(maxLen - levenshtein) / maxLen` over characters; two empty strings score
/// 1.0. Symmetric in its arguments.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// How a sidecar was matched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// Base names equal
    Exact,
    /// Best fuzzy candidate with its score
    Fuzzy(f64),
}

/// Resolved companions for one primary file
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub caption: Option<FileHandle>,
    pub analysis: Option<FileHandle>,
    pub caption_match: Option<MatchKind>,
    pub analysis_match: Option<MatchKind>,
}

#[derive(Debug, Clone)]
struct Sidecar {
    base_name: String,
    category: Category,
    file: FileHandle,
}

/// Lookup structure over sidecar files
#[derive(Debug)]
pub struct MatchIndex {
    by_base_name: HashMap<String, Vec<Sidecar>>,
    captions: Vec<Sidecar>,
    analyses: Vec<Sidecar>,
    threshold: f64,
    fuzzy_comparisons: AtomicUsize,
}

impl MatchIndex {
    /// Build the index from classified files
    ///
    /// Files categorized as anything other than Caption or AnalysisText are
    /// ignored. Iteration order is the scan order used for tie-breaks.
    pub fn build<I>(sidecars: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = (Category, FileHandle)>,
    {
        let mut by_base_name: HashMap<String, Vec<Sidecar>> = HashMap::new();
        let mut captions = Vec::new();
        let mut analyses = Vec::new();

        for (category, file) in sidecars {
            let list = match category {
                Category::Caption => &mut captions,
                Category::AnalysisText => &mut analyses,
                Category::Primary | Category::Unknown => continue,
            };
            let sidecar = Sidecar {
                base_name: normalize_base_name(file.name()),
                category,
                file,
            };
            by_base_name
                .entry(sidecar.base_name.clone())
                .or_default()
                .push(sidecar.clone());
            list.push(sidecar);
        }

        tracing::debug!(
            captions = captions.len(),
            analyses = analyses.len(),
            base_names = by_base_name.len(),
            threshold,
            "Match index built"
        );

        Self {
            by_base_name,
            captions,
            analyses,
            threshold,
            fuzzy_comparisons: AtomicUsize::new(0),
        }
    }

    /// Resolve companions for a normalized primary base name
    pub fn resolve(&self, primary_base_name: &str) -> MatchResult {
        let mut result = MatchResult::default();

        if let Some(exact) = self.by_base_name.get(primary_base_name) {
            if let Some(s) = exact.iter().find(|s| s.category == Category::Caption) {
                result.caption = Some(s.file.clone());
                result.caption_match = Some(MatchKind::Exact);
            }
            if let Some(s) = exact.iter().find(|s| s.category == Category::AnalysisText) {
                result.analysis = Some(s.file.clone());
                result.analysis_match = Some(MatchKind::Exact);
            }
        }

        if result.caption.is_none() {
            if let Some((s, score)) = self.best_fuzzy(primary_base_name, &self.captions) {
                result.caption = Some(s.file.clone());
                result.caption_match = Some(MatchKind::Fuzzy(score));
            }
        }

        if result.analysis.is_none() {
            if let Some((s, score)) = self.best_fuzzy(primary_base_name, &self.analyses) {
                result.analysis = Some(s.file.clone());
                result.analysis_match = Some(MatchKind::Fuzzy(score));
            }
        }

        result
    }

    /// Resolve companions for a primary file name (normalizes first)
    pub fn resolve_file(&self, primary_file_name: &str) -> MatchResult {
        self.resolve(&normalize_base_name(primary_file_name))
    }

    fn best_fuzzy<'a>(&self, base_name: &str, candidates: &'a [Sidecar]) -> Option<(&'a Sidecar, f64)> {
        let mut best: Option<(&Sidecar, f64)> = None;

        for candidate in candidates {
            self.fuzzy_comparisons.fetch_add(1, Ordering::Relaxed);
            let score = similarity(base_name, &candidate.base_name);
            if score < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }

        if let Some((s, score)) = best {
            tracing::debug!(
                primary = base_name,
                sidecar = %s.file.name(),
                score,
                "Fuzzy sidecar match"
            );
        }

        best
    }

    /// Similarity computations performed so far
    pub fn fuzzy_comparisons(&self) -> usize {
        self.fuzzy_comparisons.load(Ordering::Relaxed)
    }

    /// Configured fuzzy threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of indexed sidecars
    pub fn len(&self) -> usize {
        self.captions.len() + self.analyses.len()
    }

    /// True when no sidecars were indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryFile;

    fn caption(name: &str) -> (Category, FileHandle) {
        (Category::Caption, MemoryFile::new(name, Vec::new()).into_handle())
    }

    fn analysis(name: &str) -> (Category, FileHandle) {
        (Category::AnalysisText, MemoryFile::new(name, Vec::new()).into_handle())
    }

    fn name_of(file: &Option<FileHandle>) -> Option<String> {
        file.as_ref().map(|f| f.name().to_string())
    }

    #[test]
    fn test_normalize_base_name() {
        assert_eq!(normalize_base_name("My Song (Live).mp3"), "my song (live)");
        assert_eq!(normalize_base_name("  Padded .vtt"), "padded");
        assert_eq!(normalize_base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(normalize_base_name("NoExtension"), "noextension");
    }

    #[test]
    fn test_similarity_properties() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("same", "same"), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
        assert!((similarity("hello", "hallo") - 0.8).abs() < 1e-9);

        let pairs = [
            ("", ""),
            ("", "x"),
            ("my song (live)", "my song live"),
            ("kitten", "sitting"),
            ("ümlaut", "umlaut"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "{} / {}", a, b);
        }
    }

    #[test]
    fn test_exact_match_needs_no_fuzzy_pass() {
        let index = MatchIndex::build(vec![caption("song.vtt"), analysis("song.txt")], 0.8);
        let result = index.resolve_file("song.mp3");

        assert_eq!(name_of(&result.caption).as_deref(), Some("song.vtt"));
        assert_eq!(name_of(&result.analysis).as_deref(), Some("song.txt"));
        assert_eq!(result.caption_match, Some(MatchKind::Exact));
        assert_eq!(index.fuzzy_comparisons(), 0);
    }

    #[test]
    fn test_exact_match_beats_better_fuzzy_candidates() {
        // "songs" is a near-perfect fuzzy match but the exact name wins
        let index = MatchIndex::build(vec![caption("songs.vtt"), caption("Song.srt")], 0.5);
        let result = index.resolve_file("song.mp3");
        assert_eq!(name_of(&result.caption).as_deref(), Some("Song.srt"));
        assert_eq!(result.caption_match, Some(MatchKind::Exact));
    }

    #[test]
    fn test_exact_pass_takes_first_in_scan_order() {
        let index = MatchIndex::build(vec![caption("song.srt"), caption("song.vtt")], 0.8);
        let result = index.resolve_file("song.mp3");
        assert_eq!(name_of(&result.caption).as_deref(), Some("song.srt"));
    }

    #[test]
    fn test_fuzzy_match_live_variant() {
        let index = MatchIndex::build(vec![caption("My Song Live.vtt")], 0.8);
        let result = index.resolve_file("My Song (Live).mp3");

        assert_eq!(name_of(&result.caption).as_deref(), Some("My Song Live.vtt"));
        assert!(result.analysis.is_none());
        assert_eq!(index.fuzzy_comparisons(), 1);
        match result.caption_match {
            Some(MatchKind::Fuzzy(score)) => assert!((score - 12.0 / 14.0).abs() < 1e-9),
            other => panic!("Expected fuzzy match, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_controls_selection() {
        let score = similarity("my song (live)", "my song live");

        let below = MatchIndex::build(vec![caption("My Song Live.vtt")], score - 0.01);
        assert!(below.resolve_file("My Song (Live).mp3").caption.is_some());

        let equal = MatchIndex::build(vec![caption("My Song Live.vtt")], score);
        assert!(equal.resolve_file("My Song (Live).mp3").caption.is_some());

        let above = MatchIndex::build(vec![caption("My Song Live.vtt")], score + 0.01);
        assert!(above.resolve_file("My Song (Live).mp3").caption.is_none());
    }

    #[test]
    fn test_fuzzy_picks_highest_score() {
        let index = MatchIndex::build(
            vec![caption("track one demo.vtt"), caption("track one.vtt"), caption("track 1.vtt")],
            0.5,
        );
        let result = index.resolve_file("track ones.mp3");
        assert_eq!(name_of(&result.caption).as_deref(), Some("track one.vtt"));
        assert_eq!(index.fuzzy_comparisons(), 3);
    }

    #[test]
    fn test_fuzzy_tie_keeps_first_candidate() {
        // Both are one substitution away from "abcd"
        let index = MatchIndex::build(vec![caption("abcx.vtt"), caption("abcy.vtt")], 0.7);
        let result = index.resolve_file("abcd.mp3");
        assert_eq!(name_of(&result.caption).as_deref(), Some("abcx.vtt"));

        let reversed = MatchIndex::build(vec![caption("abcy.vtt"), caption("abcx.vtt")], 0.7);
        let result = reversed.resolve_file("abcd.mp3");
        assert_eq!(name_of(&result.caption).as_deref(), Some("abcy.vtt"));
    }

    #[test]
    fn test_fields_resolved_independently() {
        let index = MatchIndex::build(vec![caption("intro.vtt"), analysis("intro notes.txt")], 0.4);
        let result = index.resolve_file("intro.mp3");
        assert_eq!(result.caption_match, Some(MatchKind::Exact));
        assert!(matches!(result.analysis_match, Some(MatchKind::Fuzzy(_))));
        // Only the analysis list was scanned
        assert_eq!(index.fuzzy_comparisons(), 1);
    }

    #[test]
    fn test_no_candidate_leaves_fields_empty() {
        let index = MatchIndex::build(vec![caption("completely different.vtt")], 0.8);
        let result = index.resolve_file("song.mp3");
        assert!(result.caption.is_none());
        assert!(result.analysis.is_none());
        assert!(result.caption_match.is_none());
    }

    #[test]
    fn test_non_sidecar_categories_ignored() {
        let primary = (Category::Primary, MemoryFile::new("song.mp3", Vec::new()).into_handle());
        let unknown = (Category::Unknown, MemoryFile::new("song.jpg", Vec::new()).into_handle());
        let index = MatchIndex::build(vec![primary, unknown], 0.8);
        assert!(index.is_empty());
        assert!(index.resolve_file("song.mp3").caption.is_none());
    }
}
