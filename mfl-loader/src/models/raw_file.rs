//! Raw input file handles
//!
//! The pipeline never touches the filesystem directly: every input is a
//! `RawFile`, which may be backed by a path on disk, an in-memory blob, or
//! anything else able to report a name, size and timestamp and hand out its
//! bytes. Handles are immutable and shared (`Arc`) between the entry that
//! owns them and any in-flight enrichment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared handle to a raw input file
pub type FileHandle = Arc<dyn RawFile>;

/// Capability set required of every input file
#[async_trait]
pub trait RawFile: Send + Sync + fmt::Debug {
    /// File name including extension (no directory component)
    fn name(&self) -> &str;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Last modification time
    fn last_modified(&self) -> DateTime<Utc>;

    /// Optional MIME type hint (e.g. "audio/mpeg")
    fn mime_hint(&self) -> Option<&str> {
        None
    }

    /// Read the whole file
    ///
    /// Each call starts from scratch; no state is carried between calls.
    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;

    /// Read the whole file as text (lossy UTF-8)
    async fn read_text(&self) -> std::io::Result<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// File on the local filesystem
#[derive(Debug, Clone)]
pub struct FsFile {
    path: PathBuf,
    name: String,
    size: u64,
    last_modified: DateTime<Utc>,
    mime_hint: Option<String>,
}

impl FsFile {
    /// Stat a path and build a handle for it
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            last_modified,
            mime_hint: None,
        })
    }

    /// Attach a MIME type hint
    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Full path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RawFile for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// In-memory blob
#[derive(Clone)]
pub struct MemoryFile {
    name: String,
    bytes: Arc<Vec<u8>>,
    last_modified: DateTime<Utc>,
    mime_hint: Option<String>,
}

impl MemoryFile {
    /// Create a blob named `name` holding `bytes`
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::new(bytes.into()),
            last_modified: Utc::now(),
            mime_hint: None,
        }
    }

    /// Attach a MIME type hint
    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Override the modification timestamp
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = at;
        self
    }

    /// Wrap in a shared handle
    pub fn into_handle(self) -> FileHandle {
        Arc::new(self)
    }
}

impl fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("mime_hint", &self.mime_hint)
            .finish()
    }
}

#[async_trait]
impl RawFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.as_ref().clone())
    }
}
