use std::io;
use std::path::{Path, PathBuf};

use crate::monitor::TaskMonitor;

pub mod hashing;
pub mod virtual_fs;

mod errors;
pub use self::errors::{FSInteractionError, Result};
use self::hashing::ContentHash;

/// Read-only access to the local disk for the offline scan.
///
/// Everything is routed through a virtual_fs::FS implementation, so scans can run against the
/// real disk (WrapperFS) or a fully controlled in-memory tree (InMemoryFS) in tests.
pub struct FSInteraction<FS: virtual_fs::FS> {
    fs: FS,
}
pub type DefaultFSInteraction = FSInteraction<virtual_fs::WrapperFS>;

impl<FS: virtual_fs::FS> FSInteraction<FS> {
    pub fn new() -> Self {
        Self::with_fs(FS::default())
    }

    pub fn with_fs(fs: FS) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &FS {
        &self.fs
    }

    /// Metadata of the item at path (links are not followed), None if nothing is there.
    pub fn metadata(&self, path: &Path) -> Result<Option<virtual_fs::Metadata>> {
        match self.fs.metadata(path) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FSInteractionError::io(path, e)),
        }
    }

    pub fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.metadata(path)?.is_some())
    }

    /// The local path with a canonical parent directory (if possible) or its absolute path
    /// (otherwise). The last element is kept as is, so a symbolic link stays the link itself.
    pub fn canonical_path(&self, path: &Path) -> PathBuf {
        let absolute = absolute_path(path);
        match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => match self.fs.canonicalize(parent) {
                Ok(parent) => parent.join(name),
                Err(_) => absolute,
            },
            _ => self.fs.canonicalize(&absolute).unwrap_or(absolute),
        }
    }

    /// Lists the entries of a directory, sorted by path to keep scans deterministic.
    pub fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = self
            .fs
            .list_dir(path)
            .map_err(|e| FSInteractionError::io(path, e))?
            .into_iter()
            .map(|entry| entry.path)
            .collect();
        entries.sort();

        Ok(entries)
    }

    pub fn calculate_hash(&self, path: &Path, monitor: &dyn TaskMonitor) -> Result<ContentHash> {
        let mut reader = self
            .fs
            .read_file(path)
            .map_err(|e| FSInteractionError::io(path, e))?;

        hashing::hash_file_reader(path, &mut *reader, monitor)
    }

    /// Symbolic links are versioned by their target, so we hash the target string.
    pub fn calculate_symlink_hash(&self, path: &Path) -> Result<ContentHash> {
        let target = self
            .fs
            .read_link(path)
            .map_err(|e| FSInteractionError::io(path, e))?;

        Ok(hashing::hash_string(&target.to_string_lossy()))
    }
}

/// Makes a path absolute (relative to the current working directory) without touching links.
fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
