use crate::fs_interaction::FSInteractionError;
use crate::workspace::WorkspaceError;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SynchronizerError {
    /// The task monitor requested cancellation, no partial result exists.
    Canceled,
    Workspace { source: WorkspaceError },
    FSInteraction { source: FSInteractionError },
}
pub type Result<T> = std::result::Result<T, SynchronizerError>;

impl SynchronizerError {
    pub fn is_canceled(&self) -> bool {
        match self {
            Self::Canceled => true,
            _ => false,
        }
    }
}

impl From<WorkspaceError> for SynchronizerError {
    fn from(error: WorkspaceError) -> Self {
        SynchronizerError::Workspace { source: error }
    }
}
impl From<FSInteractionError> for SynchronizerError {
    fn from(error: FSInteractionError) -> Self {
        match error {
            // Hashing got interrupted by the monitor, report it as a regular cancellation.
            FSInteractionError::Canceled => SynchronizerError::Canceled,
            error => SynchronizerError::FSInteraction { source: error },
        }
    }
}

// Error Boilerplate (Error display and source)
impl fmt::Display for SynchronizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "Detecting offline changes was canceled"),
            Self::Workspace { source } => write!(f, "Workspace error ({})", source),
            Self::FSInteraction { source } => write!(f, "Local disk error ({})", source),
        }
    }
}
impl Error for SynchronizerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Canceled => None,
            Self::Workspace { ref source } => Some(source),
            Self::FSInteraction { ref source } => Some(source),
        }
    }
}
