//! Error types for PS_FS_V1 parsing and extraction.
//!
//! Every failure keeps enough detail for a caller to tell a foreign file
//! (`Format`), a truncated one (`UnexpectedEof`), a corrupted table entry
//! (`Validation`) and an environmental I/O problem (`Io`) apart.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for psfs operations
pub type Result<T> = std::result::Result<T, Error>;

/// A decoded table entry that cannot form a valid resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("resource name cannot be empty")]
    EmptyName,

    #[error("resource size must be > 0, got {0}")]
    NonPositiveSize(i64),

    #[error("resource offset must be > 0, got {0}")]
    NonPositiveOffset(i64),
}

/// Error type for all psfs operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The magic header does not read `PS_FS_V1`
    #[error("'{path}' is not a PS_FS_V1 archive (wrong header)")]
    Format {
        /// Archive that failed the check
        path: PathBuf,
    },

    /// A fixed-width field ended before all of its bytes were read
    #[error("end of file reached while reading {field}")]
    UnexpectedEof {
        /// Name of the field being read
        field: &'static str,
    },

    /// A table entry violates the resource invariants
    #[error("invalid resource entry: {0}")]
    Validation(#[from] ValidationError),

    /// Open, read, seek or write failure
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File the operation was performed on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing extracted data to a caller-supplied writer failed
    #[error("failed to write resource data: {source}")]
    Write {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Resource name would place the output outside the destination directory
    #[error("refusing to extract '{name}': not a plain file name")]
    UnsafeName {
        /// The offending resource name
        name: String,
    },
}

/// Copyable discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    UnexpectedEof,
    Validation,
    Io,
    UnsafeName,
}

impl Error {
    /// Creates a new I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Maps a failed fixed-width read: a short read becomes `UnexpectedEof`,
    /// anything else stays an I/O error.
    pub fn read_field(
        field: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof { field }
        } else {
            Self::io(path, source)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format { .. } => ErrorKind::Format,
            Self::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Io { .. } | Self::Write { .. } => ErrorKind::Io,
            Self::UnsafeName { .. } => ErrorKind::UnsafeName,
        }
    }

    /// Only environmental failures can succeed on a retry of the same file.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Write { .. })
    }
}
