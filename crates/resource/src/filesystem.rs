//! Filesystem-based file provider for native platforms.
//!
//! Paths are interpreted relative to the provider's root directory, so that
//! `/etc/hosts` under a root of `/srv/image` names `/srv/image/etc/hosts`.
//!
//! # Security
//!
//! The provider validates that all resolved paths remain within the root
//! to prevent directory traversal attacks (e.g., `/../../etc/passwd`).

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use treelens_traits::{FileError, FileProvider};

/// A file provider backed by a directory on the local filesystem.
///
/// Writes go to a temporary file in the target's directory which is then
/// renamed over the target, so a crash never leaves a truncated file.
#[derive(Debug)]
pub struct FilesystemFileProvider {
    root: PathBuf,
    /// Canonicalized root for security checks
    canonical_root: Option<PathBuf>,
}

impl FilesystemFileProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        // Try to canonicalize for security checks; may fail if path doesn't exist yet
        let canonical = root.canonicalize().ok();
        Self {
            root,
            canonical_root: canonical,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a root-relative path onto the filesystem.
    ///
    /// Fails if the path would escape the root, either through `..` or
    /// through a symlink that resolves outside of it.
    fn resolve_path_safe(&self, path: &str) -> Result<PathBuf, FileError> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            if let Component::ParentDir | Component::Prefix(_) = component {
                return Err(FileError::InvalidPath {
                    path: path.to_string(),
                    message: "path traversal blocked".to_string(),
                });
            }
        }

        let full_path = self.root.join(relative);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_root
            && !canonical.starts_with(base)
        {
            return Err(FileError::InvalidPath {
                path: path.to_string(),
                message: "resolves outside of the root".to_string(),
            });
        }

        Ok(full_path)
    }

    fn map_io(path: &str, err: std::io::Error) -> FileError {
        if err.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(path.to_string())
        } else {
            FileError::io(path, &err)
        }
    }
}

impl FileProvider for FilesystemFileProvider {
    fn read(&self, path: &str) -> Result<String, FileError> {
        let full_path = self.resolve_path_safe(path)?;
        std::fs::read_to_string(&full_path).map_err(|e| Self::map_io(path, e))
    }

    fn write(&self, path: &str, contents: &str) -> Result<(), FileError> {
        let full_path = self.resolve_path_safe(path)?;
        let dir = full_path.parent().ok_or_else(|| FileError::InvalidPath {
            path: path.to_string(),
            message: "has no parent directory".to_string(),
        })?;
        std::fs::create_dir_all(dir).map_err(|e| FileError::io(path, &e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FileError::io(path, &e))?;
        tmp.write_all(contents.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| FileError::io(path, &e))?;

        // Keep the permissions of the file being replaced.
        if let Ok(metadata) = std::fs::metadata(&full_path) {
            if let Err(e) = std::fs::set_permissions(tmp.path(), metadata.permissions()) {
                log::warn!("could not keep permissions of {}: {}", full_path.display(), e);
            }
        }

        tmp.persist(&full_path)
            .map_err(|e| FileError::io(path, &e.error))?;
        log::debug!("wrote {} bytes to {}", contents.len(), full_path.display());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path_safe(path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve_path_safe(path)
            .map(|p| p.is_dir())
            .unwrap_or(false)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, FileError> {
        let full_path = self.resolve_path_safe(path)?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&full_path).map_err(|e| Self::map_io(path, e))? {
            let entry = entry.map_err(|e| FileError::io(path, &e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FileError> {
        let source = self.resolve_path_safe(from)?;
        let target = self.resolve_path_safe(to)?;
        std::fs::rename(&source, &target).map_err(|e| Self::map_io(from, e))
    }

    fn remove(&self, path: &str) -> Result<(), FileError> {
        let full_path = self.resolve_path_safe(path)?;
        std::fs::remove_file(&full_path).map_err(|e| Self::map_io(path, e))
    }

    fn name(&self) -> &'static str {
        "FilesystemFileProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_filesystem_provider_read_existing_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("etc")).unwrap();
        fs::write(dir.path().join("etc/hosts"), "127.0.0.1 localhost\n").unwrap();

        let provider = FilesystemFileProvider::new(dir.path());
        assert_eq!(provider.read("/etc/hosts").unwrap(), "127.0.0.1 localhost\n");
    }

    #[test]
    fn test_filesystem_provider_not_found() {
        let dir = tempdir().unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        let result = provider.read("/nonexistent.txt");
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[test]
    fn test_filesystem_provider_write_creates_directories() {
        let dir = tempdir().unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        provider.write("/etc/new/file.conf", "a = 1\n").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("etc/new/file.conf")).unwrap(),
            "a = 1\n"
        );
        assert!(provider.is_dir("/etc/new"));
        assert!(provider.exists("/etc/new/file.conf"));
    }

    #[test]
    fn test_filesystem_provider_write_replaces_contents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), "old").unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        provider.write("/f", "new").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("f")).unwrap(), "new");
        // No temporary files are left behind.
        assert_eq!(provider.list_dir("/").unwrap(), vec!["f"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_filesystem_provider_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let target = dir.path().join("f");
        fs::write(&target, "old").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        provider.write("/f", "new").unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_filesystem_provider_rename_and_remove() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("f"), "x").unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        provider.rename("/f", "/f.augsave").unwrap();
        assert!(!provider.exists("/f"));
        assert!(provider.exists("/f.augsave"));
        provider.remove("/f.augsave").unwrap();
        assert!(provider.list_dir("/").unwrap().is_empty());
    }

    // Security tests for path traversal prevention

    #[test]
    fn test_filesystem_provider_blocks_path_traversal() {
        let dir = tempdir().unwrap();
        let provider = FilesystemFileProvider::new(dir.path());

        let result = provider.read("/../../../etc/passwd");
        assert!(matches!(result, Err(FileError::InvalidPath { .. })));
        assert!(!provider.exists("../../../etc/passwd"));
        assert!(provider.write("/../escape", "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_filesystem_provider_blocks_symlink_escape() {
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("secret"), "s").unwrap();
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let provider = FilesystemFileProvider::new(dir.path());
        assert!(provider.read("/link/secret").is_err());
    }
}
