use super::errors::{FSInteractionError, Result};
use crate::monitor::TaskMonitor;
use data_encoding::HEXLOWER;
use std::fmt;
use std::io;

/// Files are hashed in chunks of this size, the task monitor is polled between chunks.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Digest of an item's content as reported by the server (MD5).
///
/// Folders carry an empty hash, which is also what we synthesize for parent directories
/// that the server did not report explicitly.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    pub fn empty() -> Self {
        ContentHash(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", HEXLOWER.encode(&self.0))
        }
    }
}
impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

/// Hashes the given bytes in one go.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash(md5::compute(bytes).0.to_vec())
}

/// Hashes a string (e.g. the target of a symbolic link) by its UTF-8 bytes.
pub fn hash_string(value: &str) -> ContentHash {
    hash_bytes(value.as_bytes())
}

/// Hashes everything readable from the reader, polling the monitor before each chunk.
pub fn hash_reader<R: io::Read + ?Sized>(
    reader: &mut R,
    monitor: &dyn TaskMonitor,
) -> io::Result<Option<ContentHash>> {
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        if monitor.is_canceled() {
            return Ok(None);
        }

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        context.consume(&buffer[..read]);
    }

    Ok(Some(ContentHash(context.compute().0.to_vec())))
}

/// Same as hash_reader, but maps cancellation and io issues to FSInteractionErrors.
pub(crate) fn hash_file_reader<R: io::Read + ?Sized>(
    path: &std::path::Path,
    reader: &mut R,
    monitor: &dyn TaskMonitor,
) -> Result<ContentHash> {
    match hash_reader(reader, monitor) {
        Ok(Some(hash)) => Ok(hash),
        Ok(None) => Err(FSInteractionError::Canceled),
        Err(e) => Err(FSInteractionError::io(path, e)),
    }
}
