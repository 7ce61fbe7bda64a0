use super::*;
use std::fs;

#[derive(Clone)]
pub struct WrapperFS {}
impl FS for WrapperFS {
    fn default() -> Self {
        Self {}
    }

    fn canonicalize<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
    fn metadata<P: AsRef<Path>>(&self, path: P) -> io::Result<Metadata> {
        let native_metadata = fs::symlink_metadata(path)?;

        let file_type = match native_metadata.file_type() {
            t if t.is_symlink() => FileType::Link,
            t if t.is_file() => FileType::File,
            t if t.is_dir() => FileType::Dir,
            _ => return Err(io::Error::from(io::ErrorKind::Other)),
        };

        Ok(Metadata {
            read_only: native_metadata.permissions().readonly(),
            executable: file_type == FileType::File && is_executable(&native_metadata),
            file_type,
        })
    }

    fn list_dir<P: AsRef<Path>>(&self, path: P) -> io::Result<Vec<DirEntry>> {
        let result: Result<Vec<_>, _> = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| DirEntry { path: entry.path() }))
            .collect();

        result
    }

    fn read_file<P: AsRef<Path>>(&self, path: P) -> io::Result<Box<dyn io::Read>> {
        let reader = fs::OpenOptions::new()
            .create(false)
            .read(true)
            .write(false)
            .open(path.as_ref())?;

        Ok(Box::new(reader))
    }

    fn read_link<P: AsRef<Path>>(&self, path: P) -> io::Result<PathBuf> {
        fs::read_link(path)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}
