use std::io;
use std::path::{Path, PathBuf};

/// Virtual abstraction layer above the actual FS implementation and API.
///
/// Two implementations exist:
/// 1) thin wrapper around actual FS API providing all functionality we require
/// 2) in-memory mock that allows testing scans with exact control over permission bits,
///    executable flags and symbolic links (things that are awkward to set up on a real disk)
///
/// We only wrap/implement the read-only queries the offline scan actually requires.
/// The scan never modifies the local disk.
pub trait FS: Clone {
    fn default() -> Self;

    fn canonicalize<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf>;

    /// Metadata of the entry itself, symbolic links are NOT followed.
    /// Returns an io::ErrorKind::NotFound error if nothing exists at the path.
    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata>;

    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>>;

    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>>;

    /// The target string stored in a symbolic link.
    fn read_link<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf>;
}

/// Represents a single entry in a directory.
/// Has the bare minimum information it needs attached to it.
pub struct DirEntry {
    pub path: PathBuf,
}

/// A wrapper around the metadata we require to detect offline changes.
#[derive(Debug, Clone)]
pub struct Metadata {
    file_type: FileType,
    read_only: bool,
    executable: bool,
}
impl Metadata {
    pub fn new(file_type: FileType, read_only: bool, executable: bool) -> Self {
        Self {
            file_type,
            read_only,
            executable,
        }
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }
    pub fn read_only(&self) -> bool {
        self.read_only
    }
    pub fn writable(&self) -> bool {
        !self.read_only
    }
    pub fn executable(&self) -> bool {
        self.executable
    }
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Link
    }
}
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FileType {
    File,
    Dir,
    Link,
}

// Actual Implementations in Sub-Modules
mod wrapper_fs;
pub use self::wrapper_fs::WrapperFS;

mod in_memory_fs;
pub use self::in_memory_fs::InMemoryFS;
