//! Error types for RingCopy
//!
//! Setup failures (bad configuration, unopenable files, allocation) and
//! data-path failures (read/write errors, short writes) share one enum so
//! embedding callers can decide whether to abort or carry on.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for RingCopy operations
#[derive(Error, Debug)]
pub enum RingCopyError {
    /// I/O error while opening or inspecting a file
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// The ring buffer could not be allocated
    #[error("Failed to allocate buffer of {bytes} bytes")]
    AllocationFailed { bytes: usize },

    /// Source read failed mid-copy
    #[error("Read error at offset {offset}: {source}")]
    ReadFailed {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Destination write failed mid-copy
    #[error("Write error at offset {offset}: {source}")]
    WriteFailed {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Destination accepted fewer bytes than the slot held
    #[error("Short write at offset {offset}: wrote {written} of {expected} bytes")]
    ShortWrite {
        offset: u64,
        expected: usize,
        written: usize,
    },

    /// A blocking wait on the ring buffer was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Report could not be rendered
    #[error("Report error: {0}")]
    ReportError(String),

    /// A worker thread panicked
    #[error("{0} task panicked")]
    TaskPanicked(&'static str),
}

impl RingCopyError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True for errors raised before any copy task starts
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::InvalidConfig(_) | Self::AllocationFailed { .. }
        )
    }

    /// Byte offset at which a data-path error happened, if any
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::ReadFailed { offset, .. }
            | Self::WriteFailed { offset, .. }
            | Self::ShortWrite { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Result type alias for RingCopy operations
pub type Result<T> = std::result::Result<T, RingCopyError>;

impl From<serde_json::Error> for RingCopyError {
    fn from(err: serde_json::Error) -> Self {
        RingCopyError::ReportError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| RingCopyError::io(path, e))
    }
}
