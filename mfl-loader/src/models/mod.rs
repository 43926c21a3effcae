//! Data models for mfl-loader
//!
//! - Raw input file handles and adapters
//! - Entries (pipeline output unit)
//! - Load session state machine
//! - Issue reporting

pub mod entry;
pub mod load_issue;
pub mod load_session;
pub mod parameters;
pub mod raw_file;

pub use entry::{Artwork, Entry, MetadataOverrides, MetadataSource, TrackMetadata};
pub use load_issue::{IssueKind, IssueSeverity, LoadIssue};
pub use load_session::{LoadMode, LoadSession, LoadState, StateTransition};
pub use parameters::LoadParameters;
pub use raw_file::{FileHandle, FsFile, MemoryFile, RawFile};
