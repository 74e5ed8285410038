//! File source collaborator
//!
//! Supplies `{id, name}` descriptors for one folder and the raw bytes of a file.
//! [`LocalFolderSource`] serves a directory on the local filesystem.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// File source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Specified folder does not exist
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// Folder path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Cannot read a file
    #[error("File access error {0}: {1}")]
    FileAccess(String, String),
}

/// One file in a source folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Opaque id understood by the source that listed it
    pub id: String,
    /// File name (the format is derived from its extension)
    pub name: String,
}

/// Folder listing and content retrieval
#[async_trait::async_trait]
pub trait FileSource: Send + Sync {
    async fn list_files(&self, folder: &str) -> Result<Vec<FileDescriptor>, SourceError>;

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, SourceError>;
}

/// Directory on the local filesystem
///
/// Only the folder's direct children are listed unless a depth is set. Hidden
/// entries and common system files are ignored. Ids are file paths.
pub struct LocalFolderSource {
    ignore_patterns: Vec<String>,
    max_depth: usize,
}

impl LocalFolderSource {
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "desktop.ini".to_string(),
            ],
            max_depth: 1,
        }
    }

    /// Descend into subfolders up to `depth` levels
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with('.') || file_name.starts_with("~$") {
            return false;
        }

        !self.ignore_patterns.iter().any(|p| file_name == p.as_str())
    }
}

impl Default for LocalFolderSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FileSource for LocalFolderSource {
    async fn list_files(&self, folder: &str) -> Result<Vec<FileDescriptor>, SourceError> {
        let root = PathBuf::from(folder);
        if !root.exists() {
            return Err(SourceError::FolderNotFound(folder.to_string()));
        }
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(folder.to_string()));
        }

        let max_depth = self.max_depth;
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push(descriptor_for(entry.path()));
                }
                Ok(_) => {}
                Err(e) => {
                    // Unreadable entries are skipped, listing continues
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(folder = %folder, files = files.len(), "Listed source folder");
        Ok(files)
    }

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(file_id)
            .await
            .map_err(|e| SourceError::FileAccess(file_id.to_string(), e.to_string()))
    }
}

fn descriptor_for(path: &Path) -> FileDescriptor {
    FileDescriptor {
        id: path.to_string_lossy().into_owned(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
