//! Directory scanner
//!
//! Walks a folder and yields a `FsFile` handle for every regular file, primary
//! media and sidecars alike; classification happens later in the pipeline.
//! MIME hints come from magic-byte sniffing so that files with misleading or
//! missing extensions still classify correctly.
//!
//! Symlinks are never descended into. A symlink to a regular file is
//! included under the link's name; any other symlink is logged and skipped.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::models::{FileHandle, FsFile};

/// Directory scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Directory scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
    skip_hidden: bool,
}

impl FileScanner {
    /// Create new scanner with default ignore names
    ///
    /// Ignores system files like .DS_Store, Thumbs.db, .git, etc.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "desktop.ini".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            max_depth: None,
            skip_hidden: true,
        }
    }

    /// Only scan the top level of the folder
    pub fn non_recursive(mut self) -> Self {
        self.max_depth = Some(1);
        self
    }

    /// Include dot-files and dot-directories
    pub fn include_hidden(mut self) -> Self {
        self.skip_hidden = false;
        self
    }

    /// Skip files and directories with exactly this name
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Scan a directory and return a handle for every regular file
    ///
    /// Files are returned in walk order with entries in each directory sorted
    /// by name, so repeated scans of the same tree produce the same batch.
    /// Unreadable entries are logged and skipped.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<FileHandle>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut files: Vec<FileHandle> = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .sort_by_file_name()
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                // `is_file` follows the link
                if !entry.path().is_file() {
                    tracing::info!(
                        path = %entry.path().display(),
                        "Skipping symlink that does not point to a regular file"
                    );
                    continue;
                }
            } else if !file_type.is_file() {
                continue;
            }

            match self.open(entry.path()) {
                Ok(file) => files.push(file),
                Err(e) => tracing::warn!("Skipping unreadable file: {}", e),
            }
        }

        tracing::debug!(
            root = %root_path.display(),
            files = files.len(),
            "Directory scan complete"
        );

        Ok(files)
    }

    fn open(&self, path: &Path) -> Result<FileHandle, ScanError> {
        let file = FsFile::open(path)
            .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

        let file = match sniff_mime(path) {
            Some(mime) => file.with_mime_hint(mime),
            None => file,
        };

        Ok(std::sync::Arc::new(file))
    }

    /// Check if entry should be processed
    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        // The root itself is always walked, even if its name looks hidden
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();

        if self.skip_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.ignore_patterns.iter().any(|name| file_name == name.as_str()) {
            tracing::debug!(path = %entry.path().display(), "Ignored by name");
            return false;
        }

        true
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// MIME type from magic bytes, if recognizable
fn sniff_mime(path: &Path) -> Option<&'static str> {
    match infer::get_from_path(path) {
        Ok(kind) => kind.map(|k| k.mime_type()),
        Err(e) => {
            tracing::debug!("MIME sniff failed for {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new();
        match scanner.scan(Path::new("/nonexistent/path")) {
            Err(ScanError::PathNotFound(_)) => {}
            other => panic!("Expected PathNotFound error, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("song.mp3");
        fs::write(&path, b"not audio").unwrap();

        match FileScanner::new().scan(&path) {
            Err(ScanError::NotADirectory(_)) => {}
            other => panic!("Expected NotADirectory error, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn test_scan_returns_sidecars_and_skips_ignored() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.vtt"), "WEBVTT\n").unwrap();
        fs::write(temp_dir.path().join("a.mp3"), b"ID3\x03\x00\x00\x00\x00\x00\x00").unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), b"junk").unwrap();
        fs::write(temp_dir.path().join(".hidden.txt"), b"junk").unwrap();

        let files = FileScanner::new().scan(temp_dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.mp3", "b.vtt"]);
        assert_eq!(files[0].mime_hint(), Some("audio/mpeg"));
        assert_eq!(files[1].mime_hint(), None);
    }

    #[test]
    fn test_ignore_matches_whole_name() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        fs::write(temp_dir.path().join("Live.gitaar.mp3"), b"x").unwrap();
        fs::write(temp_dir.path().join("Thumbs.db"), b"x").unwrap();
        fs::write(temp_dir.path().join("Thumbs.db notes.txt"), b"x").unwrap();
        fs::create_dir(temp_dir.path().join("outtakes")).unwrap();
        fs::write(temp_dir.path().join("outtakes").join("take1.mp3"), b"x").unwrap();

        let files = FileScanner::new()
            .ignore("outtakes")
            .scan(temp_dir.path())
            .unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["Live.gitaar.mp3", "Thumbs.db notes.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_kept_and_directories_skipped() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("real.mp3"), b"audio").unwrap();
        symlink(root.join("real.mp3"), root.join("linked.mp3")).unwrap();
        // Points back at the root; must not be walked
        symlink(&root, root.join("loop")).unwrap();
        symlink(root.join("missing.mp3"), root.join("dangling.mp3")).unwrap();

        let files = FileScanner::new().scan(&root).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["linked.mp3", "real.mp3"]);
        assert_eq!(files[0].size(), 5);
    }

    #[test]
    fn test_non_recursive_stays_at_top_level() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("disc2")).unwrap();
        fs::write(temp_dir.path().join("top.txt"), "x").unwrap();
        fs::write(temp_dir.path().join("disc2").join("nested.txt"), "y").unwrap();

        let recursive = FileScanner::new().scan(temp_dir.path()).unwrap();
        assert_eq!(recursive.len(), 2);

        let flat = FileScanner::new().non_recursive().scan(temp_dir.path()).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].name(), "top.txt");
    }

    #[test]
    fn test_include_hidden() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".notes.txt"), "x").unwrap();

        assert!(FileScanner::new().scan(temp_dir.path()).unwrap().is_empty());
        assert_eq!(
            FileScanner::new().include_hidden().scan(temp_dir.path()).unwrap().len(),
            1
        );
    }
}
