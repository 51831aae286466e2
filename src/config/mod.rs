//! Run configuration for jpegtrim

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::error::{Result, ResizeError};

/// Default JPEG quality when none is given
pub const DEFAULT_QUALITY: u8 = 100;

/// Default number of concurrent transforms
pub const DEFAULT_THREADS: usize = 2;

/// Default suffix inserted before the extension of non-overwritten outputs
pub const DEFAULT_SUFFIX: &str = "_r";

/// Main configuration structure, built once per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory to scan for JPEG files
    pub input_dir: PathBuf,

    /// Target width in pixels (0 = not given)
    pub width: u32,

    /// Output JPEG quality (1-100)
    pub quality: u8,

    /// Replace the source files in place
    pub overwrite: bool,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Leave the output with the current time instead of the source mtime
    pub new_date: bool,

    /// Maximum concurrent transforms
    pub threads: usize,

    /// Suffix for output names when not overwriting
    pub suffix: String,

    /// Resize even images that are already narrow enough
    pub force: bool,

    /// Discover only, transform nothing
    pub dry_run: bool,

    /// Draw a progress bar on stderr
    pub show_progress: bool,

    /// Report format
    pub output: OutputMode,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            width: 0,
            quality: DEFAULT_QUALITY,
            overwrite: false,
            recursive: false,
            new_date: false,
            threads: DEFAULT_THREADS,
            suffix: DEFAULT_SUFFIX.to_string(),
            force: false,
            dry_run: false,
            show_progress: true,
            output: OutputMode::Human,
            logging: LoggingConfig::default(),
        }
    }
}

/// How the final report is printed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Styled summary block with a progress bar
    Human,
    /// Single JSON document on stdout, no progress bar
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Immutable per-item parameters, shared read-only by every worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Target width in pixels (> 0)
    pub target_width: u32,
    /// Output JPEG quality (1-100)
    pub quality: u8,
    /// Write the result over the source file
    pub overwrite: bool,
    /// Copy the source mtime/atime onto the output
    pub preserve_timestamp: bool,
    /// Skip images whose width is already <= target_width
    pub skip_narrow: bool,
    /// Suffix for output names when not overwriting
    pub suffix: String,
}

impl TransformRequest {
    /// Create a request with default quality, naming and policies
    pub fn new(target_width: u32) -> Self {
        Self {
            target_width,
            quality: DEFAULT_QUALITY,
            overwrite: false,
            preserve_timestamp: true,
            skip_narrow: true,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// Set the output quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set overwrite mode
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set whether the source timestamp is carried over
    pub fn preserve_timestamp(mut self, preserve: bool) -> Self {
        self.preserve_timestamp = preserve;
        self
    }

    /// Set whether narrow images are skipped
    pub fn skip_narrow(mut self, skip: bool) -> Self {
        self.skip_narrow = skip;
        self
    }

    /// Set the output name suffix
    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl RunConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(ResizeError::config("Width must be greater than 0"));
        }

        if !(1..=100).contains(&self.quality) {
            return Err(ResizeError::config(format!(
                "Quality must be between 1 and 100, got {}",
                self.quality
            )));
        }

        if self.threads == 0 {
            return Err(ResizeError::config("Thread count must be greater than 0"));
        }

        if !self.overwrite && self.suffix.is_empty() {
            return Err(ResizeError::config(
                "Suffix must not be empty unless overwriting",
            ));
        }

        if self.suffix.contains(std::path::is_separator) {
            return Err(ResizeError::config(format!(
                "Suffix must not contain a path separator: {:?}",
                self.suffix
            )));
        }

        Ok(())
    }

    /// Build the per-item request shared by all workers
    pub fn transform_request(&self) -> TransformRequest {
        TransformRequest::new(self.width)
            .quality(self.quality)
            .overwrite(self.overwrite)
            .preserve_timestamp(!self.new_date)
            .skip_narrow(!self.force)
            .suffix(self.suffix.clone())
    }
}
