//! Discovery of candidate JPEG files under an input directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ResizeError;
use crate::processing::formats::is_jpeg_path;

/// A JPEG file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    /// Size in bytes at discovery time
    pub size: u64,
}

/// Everything discovery found
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files sorted by path
    pub files: Vec<ImageFile>,
    pub total_bytes: u64,
    /// Paths that could not be read, including a bad root
    pub errors: Vec<ResizeError>,
}

impl Discovery {
    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Walk `root` and collect JPEG files
///
/// Only direct children are considered unless `recursive` is set. Unreadable
/// directories are logged and skipped, never fatal. A root that is missing or
/// not a directory gives an empty result with a single recorded error.
pub fn discover(root: &Path, recursive: bool) -> Discovery {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut discovery = Discovery::default();

    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            warn!("Input {:?} is not a directory", root);
            discovery
                .errors
                .push(ResizeError::discovery(root, "not a directory"));
            return discovery;
        }
        Err(e) => {
            warn!("Cannot read input directory {:?}: {}", root, e);
            discovery.errors.push(ResizeError::discovery(root, e.to_string()));
            return discovery;
        }
    }

    for entry in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!("Skipping unreadable path {:?}: {}", path, e);
                discovery.errors.push(ResizeError::discovery(path, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_jpeg_path(entry.path()) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Cannot stat {:?}: {}", entry.path(), e);
                discovery
                    .errors
                    .push(ResizeError::discovery(entry.path(), e.to_string()));
                continue;
            }
        };

        discovery.total_bytes += metadata.len();
        discovery.files.push(ImageFile {
            path: entry.into_path(),
            size: metadata.len(),
        });
    }

    // Sort files for consistent processing order
    discovery.files.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        "Discovered {} JPEG files ({} bytes) under {:?}",
        discovery.count(),
        discovery.total_bytes,
        root
    );

    discovery
}
