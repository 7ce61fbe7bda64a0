use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum WorkspaceError {
    /// The server could not be reached or rejected the request.
    Communication { message: String },
    /// The server answered an item query with a different number of item sets.
    MismatchedResultCount { expected: usize, actual: usize },
}
pub type Result<T> = std::result::Result<T, WorkspaceError>;

// Error Boilerplate (Error display and source)
impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Communication { message } => {
                write!(f, "Error communicating with the server ({})", message)
            }
            Self::MismatchedResultCount { expected, actual } => write!(
                f,
                "Server returned {} item sets for {} queried items",
                actual, expected
            ),
        }
    }
}
impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
