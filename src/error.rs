//! Error types and handling for jpegtrim

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for jpegtrim operations
pub type Result<T> = std::result::Result<T, ResizeError>;

/// Main error type for jpegtrim operations
#[derive(Debug, Error)]
pub enum ResizeError {
    /// Input directory could not be walked
    #[error("Cannot read directory {path:?}: {message}")]
    Discovery { path: PathBuf, message: String },

    /// Content is not a decodable JPEG
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// JPEG encoding failed
    #[error("Failed to encode {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Open/create/stat/rename/set-times failure
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decoded image cannot be resized to the requested width
    #[error("Cannot resize {path:?} from {width}x{height} to width {target_width}")]
    Dimensions {
        path: PathBuf,
        width: u32,
        height: u32,
        target_width: u32,
    },

    /// Invalid run configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A worker task panicked or was aborted
    #[error("Worker task failed for {path:?}: {message}")]
    Task { path: PathBuf, message: String },
}

impl ResizeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new discovery error
    pub fn discovery<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Self::Discovery {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    pub fn encode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Encode {
            path: path.into(),
            source,
        }
    }

    pub fn task<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Self::Task {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Per-item or per-directory: logged and skipped
            Self::Discovery { .. }
            | Self::Decode { .. }
            | Self::Encode { .. }
            | Self::Io { .. }
            | Self::Dimensions { .. }
            | Self::Task { .. } => true,

            // Stops the run before any work starts
            Self::Config { .. } => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::Discovery { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. }
            | Self::Io { path, .. }
            | Self::Dimensions { path, .. }
            | Self::Task { path, .. } => Some(path),
            Self::Config { .. } => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode { path, .. } => {
                format!("{} is not a valid JPEG image", path.display())
            }
            Self::Encode { path, source } => {
                format!("Could not write JPEG to {}: {}", path.display(), source)
            }
            Self::Io { path, source } => {
                format!("File system error on {}: {}", path.display(), source)
            }
            Self::Config { message } => {
                format!("{}. Run with --help for usage information", message)
            }
            other => other.to_string(),
        }
    }
}

/// Error context extension for attaching the offending path to I/O errors
pub trait ErrorContext<T> {
    /// Convert the error into [`ResizeError::Io`] for `path`
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| ResizeError::io(path, e))
    }
}
