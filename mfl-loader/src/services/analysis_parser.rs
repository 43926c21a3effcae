//! Analysis-text sidecar parsing
//!
//! Analysis sidecars are free-form text produced by external tools: mostly
//! `key: value` (or `key = value`) lines such as `BPM: 128` or
//! `Key = A minor`, interleaved with prose. Fields keep file order; anything
//! that is not a field is kept as a note.

use serde::Serialize;

/// Parsed analysis sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredAnalysis {
    /// `key: value` pairs in file order
    pub fields: Vec<(String, String)>,
    /// Non-field lines
    pub notes: Vec<String>,
}

impl StructuredAnalysis {
    /// First value for `key` (case-insensitive)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// True when nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.notes.is_empty()
    }
}

/// Turns analysis text into structured data
pub trait AnalysisTextParser: Send + Sync {
    /// `None` when the text carries nothing usable
    fn parse(&self, text: &str) -> Option<StructuredAnalysis>;
}

/// Line-oriented `key: value` parser
#[derive(Debug, Clone, Default)]
pub struct KeyValueAnalysisParser;

impl KeyValueAnalysisParser {
    pub fn new() -> Self {
        Self
    }

    fn split_field(line: &str) -> Option<(String, String)> {
        let idx = line.find(&[':', '='][..])?;
        let key = line[..idx].trim();
        let value = line[idx + 1..].trim();

        // Keys are short labels; a long or spaced-out prefix is prose
        if key.is_empty() || key.len() > 40 || key.split_whitespace().count() > 4 {
            return None;
        }

        Some((key.to_string(), value.to_string()))
    }
}

impl AnalysisTextParser for KeyValueAnalysisParser {
    fn parse(&self, text: &str) -> Option<StructuredAnalysis> {
        let mut analysis = StructuredAnalysis::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::split_field(line) {
                Some(field) => analysis.fields.push(field),
                None => analysis.notes.push(line.to_string()),
            }
        }

        if analysis.is_empty() {
            None
        } else {
            Some(analysis)
        }
    }
}
