//! Error types for selstore-core
//!
//! Provides a unified error type that keeps enough structure (status codes,
//! failed item identities, checksum values) to act on programmatically, and
//! that can be converted to appropriate exit codes.

use std::fmt;

use thiserror::Error;

/// Result type alias for selstore-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// The remote operation an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authenticate,
    Upload,
    Delete,
    Symlink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Authenticate => "authenticate",
            Operation::Upload => "upload",
            Operation::Delete => "delete",
            Operation::Symlink => "symlink",
        };
        f.write_str(name)
    }
}

/// Network-level failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established; the request was not sent
    Connect,
    /// The request or response timed out
    Timeout,
    /// Any other I/O or protocol failure below HTTP status level
    Other,
}

/// A failure raised by the HTTP transport before a status was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} transport failure: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }
}

/// One failed item of a batch
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the item in the input sequence
    pub index: usize,
    /// Server-side name of the item
    pub name: String,
    /// Why it failed
    pub error: Error,
}

/// Aggregate failure of a strict-mode batch
#[derive(Debug)]
pub struct BatchFailure {
    /// Number of items in the batch
    pub total: usize,
    /// Every failed item, in input order
    pub failures: Vec<ItemFailure>,
    /// Server names of the items that did succeed, in input order
    pub succeeded: Vec<String>,
}

impl BatchFailure {
    /// Server names of the failed items
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} operations failed",
            self.failures.len(),
            self.total
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({})", failure.name, failure.error)?;
        }
        Ok(())
    }
}

/// Error types for selstore-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account already exists
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value could not be encoded
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Authentication backend rejected us or answered malformed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service answered with a status other than the expected one
    #[error("Unexpected HTTP status {status} for {operation} of {target}")]
    UnexpectedHttpStatus {
        operation: Operation,
        target: String,
        status: u16,
    },

    /// Checksum reported by the service differs from the local one
    #[error(
        "Checksum mismatch for {target}: local {local}, remote {}",
        .remote.as_deref().unwrap_or("<none>")
    )]
    IntegrityMismatch {
        target: String,
        local: String,
        remote: Option<String>,
    },

    /// Strict batch with at least one failed item
    #[error("{0}")]
    Batch(BatchFailure),

    /// Network-level failure (retryable)
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    /// Descriptor has no local content to upload
    #[error("No local content for {0}")]
    MissingLocalContent(String),

    /// Worker pool fault
    #[error("Worker pool failure: {0}")]
    Pool(String),
}

impl Error {
    /// True when the service reported the object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnexpectedHttpStatus { status: 404, .. })
    }

    /// True for failures where retrying later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::UnexpectedHttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedHttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) => 2, // UsageError
            Error::Transport(_) => 3,                      // NetworkError
            Error::AuthenticationFailed(_) => 4,           // AuthError
            Error::UnexpectedHttpStatus {
                status: 401 | 403, ..
            } => 4,
            Error::UnexpectedHttpStatus { status: 404, .. } | Error::AccountNotFound(_) => 5,
            Error::IntegrityMismatch { .. } | Error::AccountExists(_) => 6, // Conflict
            _ => 1,                                                         // GeneralError
        }
    }
}
