use super::*;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum FSInteractionError {
    /// The task monitor requested cancellation while we were reading from disk.
    Canceled,
    // IOError is simply our 'catch all' error type for 'non-special' issues
    IOError {
        source: io::Error,
        kind: std::io::ErrorKind,
        path: PathBuf,
    },
}
pub type Result<T> = std::result::Result<T, FSInteractionError>;

impl FSInteractionError {
    pub fn io<P: AsRef<Path>>(path: P, error: io::Error) -> Self {
        Self::IOError {
            kind: error.kind(),
            source: error,
            path: path.as_ref().to_path_buf(),
        }
    }
}
impl fmt::Display for FSInteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "Reading from the FS was canceled"),
            Self::IOError { source, path, .. } => {
                write!(f, "Error when accessing {:?} ({})", path, source)
            }
        }
    }
}
impl Error for FSInteractionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IOError { ref source, .. } => Some(source),
            Self::Canceled => None,
        }
    }
}
