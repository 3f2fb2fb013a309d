use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the mergefiles library.
///
/// Every variant here is fatal for a run. Recoverable per-file problems are
/// logged as warnings and never surface as an `Error`.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// The directory walk could not continue at all.
    #[error("Failed to walk source directory '{path}': {message}")]
    Walk {
        /// Directory being walked
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Creating, resizing, mapping or flushing the output file failed.
    #[error("Failed to {operation} output file '{path}': {message}")]
    Mapping {
        /// Output file path
        path: PathBuf,
        /// Operation that failed (create, resize, map, flush)
        operation: &'static str,
        /// Error message
        message: String,
    },

    /// Prompt store could not be read, created or decoded.
    #[error("Prompt store '{path}': {message}")]
    PromptStore {
        /// Path of the prompt store file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Worker pool could not be started.
    #[error("Failed to start worker pool: {message}")]
    ThreadPool {
        /// Error message
        message: String,
    },

    /// Planned output does not fit in this platform's address space.
    #[error("Planned output size of {size} bytes is not addressable on this platform")]
    TooLarge {
        /// Planned size in bytes
        size: u64,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a walk error for the given root.
    #[must_use]
    pub fn walk(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Walk {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an output mapping error.
    #[must_use]
    pub fn mapping(
        path: impl Into<PathBuf>,
        operation: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::Mapping {
            path: path.into(),
            operation,
            message: source.to_string(),
        }
    }

    /// Creates a prompt store error.
    #[must_use]
    pub fn prompt_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PromptStore {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if this error came from the output file.
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool {
            message: e.to_string(),
        }
    }
}
