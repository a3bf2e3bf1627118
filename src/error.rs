use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectError {
    // Configuration
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    // Resolution
    #[error("This data type contains a circular reference: {0}")]
    CircularReference(String),

    #[error("Reference {0} not found.")]
    UnknownReference(String),

    #[error("{id} doesn't denote a {expected}")]
    WrongReferenceType { id: String, expected: &'static str },

    #[error("{0} allows only filesystem resources.")]
    NotFilesystemOnly(String),

    #[error("resource {0} is not backed by a file")]
    NotFilesystemBacked(String),

    // I/O
    #[error("{} does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("symlink loop at {}", .0.display())]
    SymlinkLoop(PathBuf),

    #[error("problem reading archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid build description: {0}")]
    Parse(String),
}

/// Coarse classification of a [`SelectError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Raised eagerly by a setter; fix the build description.
    Configuration,

    /// Raised by a selector the first time it is evaluated.
    Validation,

    /// Raised while following references or rendering paths.
    Resolution,

    /// Raised by the filesystem or an archive reader.
    Io,
}

impl SelectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => return Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => return Self::PermissionDenied(path.into()),
            _ => {}
        }
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::SymlinkLoop(p)
            | Self::Archive { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Where in the configure/validate/resolve/read pipeline this error arose.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Parse(_) => ErrorCategory::Configuration,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::CircularReference(_)
            | Self::UnknownReference(_)
            | Self::WrongReferenceType { .. }
            | Self::NotFilesystemOnly(_)
            | Self::NotFilesystemBacked(_) => ErrorCategory::Resolution,
            Self::NotFound(_)
            | Self::PermissionDenied(_)
            | Self::SymlinkLoop(_)
            | Self::Archive { .. }
            | Self::Io { .. } => ErrorCategory::Io,
        }
    }

    /// Whether a directory walk can continue past this error.
    ///
    /// Recoverable errors are collected into
    /// [`ScanResult::errors`](crate::ScanResult::errors) and the walk keeps
    /// going; everything else aborts the scan.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::SymlinkLoop(_) | Self::Io { .. }
        )
    }
}
