//! Error taxonomy shared by every backend operation.

/// Errors surfaced by backends, state stores and folder state.
///
/// Each variant is a distinct failure kind so the protocol engine can choose
/// between retrying, aborting and continuing with a partial sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// A required construction parameter is missing or unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced folder or item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend does not support this capability.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Serialized folder state could not be parsed.
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Transport or I/O failure talking to the real store.
    #[error("Backend fault: {0}")]
    BackendFault(String),
}

/// Payload-free discriminant of [`BackendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    NotImplemented,
    CorruptState,
    BackendFault,
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::CorruptState(_) => ErrorKind::CorruptState,
            Self::BackendFault(_) => ErrorKind::BackendFault,
        }
    }

    /// Only transport faults are worth retrying; the engine decides when.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::BackendFault
    }

    pub(crate) fn not_implemented(operation: &str) -> Self {
        Self::NotImplemented(format!("{} is not supported by this backend", operation))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        Self::BackendFault(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
