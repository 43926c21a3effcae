//! Pipeline services

pub mod analysis_parser;
pub mod classifier;
pub mod custom_metadata;
pub mod duration_probe;
pub mod file_scanner;
pub mod match_index;
pub mod metadata_extractor;
pub mod retry;
pub mod scheduler;

pub use analysis_parser::{AnalysisTextParser, KeyValueAnalysisParser, StructuredAnalysis};
pub use classifier::{Category, Classifier};
pub use custom_metadata::{CustomMetadataStore, OverrideStore};
pub use duration_probe::{probe_with_timeout, DurationProbe, LoftyDurationProbe};
pub use file_scanner::{FileScanner, ScanError};
pub use match_index::{normalize_base_name, similarity, MatchIndex, MatchKind, MatchResult};
pub use metadata_extractor::{LoftyMetadataExtractor, MetadataExtractor};
pub use retry::{with_retry, ErrorClass, Retried, RetryError, RetryPolicy};
pub use scheduler::ConcurrencyScheduler;
