//! FileProvider trait for abstracting access to the files under the engine root.
//!
//! Paths handed to a provider are absolute *within the root*: `/etc/hosts`
//! names `<root>/etc/hosts`. This keeps the engine independent of where the
//! root lives, or whether it lives on disk at all.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::RwLock;
use thiserror::Error;

/// Error type for file operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },
}

impl FileError {
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        FileError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    fn poisoned(path: &str) -> Self {
        FileError::Io {
            path: path.to_string(),
            message: "file store lock poisoned".to_string(),
        }
    }
}

/// A trait for reading and writing the files a tree is loaded from.
///
/// # Implementations
///
/// - `FilesystemFileProvider` (in `treelens-resource`): a directory on disk
/// - `InMemoryFileProvider`: a map from path to contents, for tests and embedding
pub trait FileProvider: Send + Sync + Debug {
    /// Reads a whole file as UTF-8 text.
    fn read(&self, path: &str) -> Result<String, FileError>;

    /// Replaces the contents of a file, creating it if needed. A reader never
    /// observes a partially written file.
    fn write(&self, path: &str, contents: &str) -> Result<(), FileError>;

    /// Check if a regular file exists.
    fn exists(&self, path: &str) -> bool;

    /// Check if a directory exists.
    fn is_dir(&self, path: &str) -> bool;

    /// Names of the entries directly inside a directory, sorted.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, FileError>;

    fn rename(&self, from: &str, to: &str) -> Result<(), FileError>;

    fn remove(&self, path: &str) -> Result<(), FileError>;

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// Puts a path into the `/a/b` form: one leading slash, no trailing slash,
/// no empty or `.` components.
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    format!("/{}", parts.join("/"))
}

/// An in-memory file provider.
///
/// Directories exist implicitly as the parents of stored files.
#[derive(Debug, Default)]
pub struct InMemoryFileProvider {
    files: RwLock<BTreeMap<String, String>>,
}

impl InMemoryFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Io` if the internal lock is poisoned.
    pub fn add(&self, path: &str, contents: impl Into<String>) -> Result<(), FileError> {
        let mut files = self.files.write().map_err(|_| FileError::poisoned(path))?;
        files.insert(normalize_path(path), contents.into());
        Ok(())
    }

    /// Builder-style [`add`](Self::add) for setting up fixtures.
    pub fn with_file(self, path: &str, contents: impl Into<String>) -> Self {
        if let Ok(mut files) = self.files.write() {
            files.insert(normalize_path(path), contents.into());
        }
        self
    }

    /// A copy of a file's contents, `None` if absent or the lock is poisoned.
    pub fn contents(&self, path: &str) -> Option<String> {
        self.files.read().ok()?.get(&normalize_path(path)).cloned()
    }

    /// Get the number of files in the store.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    ///
    /// Returns `true` if the lock is poisoned (safe default).
    pub fn is_empty(&self) -> bool {
        self.files.read().map(|f| f.is_empty()).unwrap_or(true)
    }
}

impl FileProvider for InMemoryFileProvider {
    fn read(&self, path: &str) -> Result<String, FileError> {
        let files = self.files.read().map_err(|_| FileError::poisoned(path))?;
        files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| FileError::NotFound(path.to_string()))
    }

    fn write(&self, path: &str, contents: &str) -> Result<(), FileError> {
        self.add(path, contents)
    }

    fn exists(&self, path: &str) -> bool {
        self.files
            .read()
            .map(|f| f.contains_key(&normalize_path(path)))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        self.files
            .read()
            .map(|f| f.keys().any(|k| k.starts_with(&prefix)))
            .unwrap_or(false)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, FileError> {
        let prefix = dir_prefix(path);
        let files = self.files.read().map_err(|_| FileError::poisoned(path))?;
        let entries: BTreeSet<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        if entries.is_empty() {
            return Err(FileError::NotFound(path.to_string()));
        }
        Ok(entries.into_iter().collect())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FileError> {
        let mut files = self.files.write().map_err(|_| FileError::poisoned(from))?;
        let contents = files
            .remove(&normalize_path(from))
            .ok_or_else(|| FileError::NotFound(from.to_string()))?;
        files.insert(normalize_path(to), contents);
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), FileError> {
        let mut files = self.files.write().map_err(|_| FileError::poisoned(path))?;
        files
            .remove(&normalize_path(path))
            .map(|_| ())
            .ok_or_else(|| FileError::NotFound(path.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryFileProvider"
    }
}

fn dir_prefix(path: &str) -> String {
    let dir = normalize_path(path);
    if dir == "/" { dir } else { format!("{}/", dir) }
}
