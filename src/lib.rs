//! jpegtrim - Batch JPEG Resizer
//!
//! Shrinks every JPEG under a directory to a target width, a few files at a
//! time, and reports how many bytes were saved.
//!
//! # Features
//!
//! - **Bounded Parallelism**: at most `threads` files are decoded/encoded at once
//! - **Failure Isolation**: a corrupt or unwritable file never stops the batch
//! - **Safe Overwrite**: outputs are written to a temp file and renamed into place
//! - **Timestamp Preservation**: resized files keep the original modification time
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jpegtrim::RunConfig;
//! use std::path::PathBuf;
//!
//! # async fn example() -> jpegtrim::Result<()> {
//! let config = RunConfig {
//!     input_dir: PathBuf::from("photos"),
//!     width: 1920,
//!     quality: 85,
//!     ..RunConfig::default()
//! };
//!
//! let report = jpegtrim::run(&config).await?;
//! println!("Resized {} files, saved {:.2} MB",
//!          report.statistics.processed, report.statistics.saved_mb());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{LoggingConfig, OutputMode, RunConfig, TransformRequest};
pub use error::{Result, ResizeError};
pub use parallel::{run, run_with_cancel, BatchReport, BatchRunner, Limiter, Statistics};
pub use processing::{discover, transform, ImageFile, TransformOutcome};

use tracing::info;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set up logging to stderr at `config.level`
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("jpegtrim v{} initialized", VERSION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init_logging() {
        // Should not fail on multiple calls
        init_logging(&LoggingConfig::default());
        init_logging(&LoggingConfig {
            level: "not a [valid filter".to_string(),
        });
    }
}
