//! Per-file transform: decode, resize, encode, re-timestamp

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use filetime::FileTime;
use serde::Serialize;
use tracing::debug;

use crate::config::TransformRequest;
use crate::error::{ErrorContext, Result, ResizeError};

pub mod discovery;
pub mod formats;
pub mod resize;

pub use discovery::*;
pub use formats::*;
pub use resize::*;

/// Result of a transform that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TransformOutcome {
    /// A resized file was written
    Resized(ResizeReport),
    /// Image already fits the target width, nothing written
    Skipped { width: u32 },
}

/// Details of one successfully resized file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub original_dimensions: (u32, u32),
    pub new_dimensions: (u32, u32),
    pub processing_time: Duration,
}

impl ResizeReport {
    /// Get size reduction percentage
    pub fn size_reduction(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        let reduction = self.input_bytes.saturating_sub(self.output_bytes);
        (reduction as f64 / self.input_bytes as f64) * 100.0
    }
}

/// Resize one JPEG file according to `request`
///
/// Any failure concerns this file only. The source is read fully and its
/// handle closed before the destination is touched, and the destination is
/// replaced by rename so it is never left half written.
pub fn transform(path: &Path, request: &TransformRequest) -> Result<TransformOutcome> {
    let start_time = Instant::now();

    let metadata = std::fs::metadata(path).with_path(path)?;
    let input_bytes = metadata.len();
    let modified = FileTime::from_last_modification_time(&metadata);
    let data = std::fs::read(path).with_path(path)?;

    let image = decode_jpeg(&data, path)?;
    drop(data);
    let original_dimensions = (image.width(), image.height());

    if request.skip_narrow && image.width() <= request.target_width {
        debug!(
            "Skipping {:?}: width {} <= {}",
            path,
            image.width(),
            request.target_width
        );
        return Ok(TransformOutcome::Skipped { width: image.width() });
    }

    let resized = resize_to_width(&image, request.target_width, path)?;
    drop(image);
    let new_dimensions = (resized.width(), resized.height());
    let encoded = encode_jpeg(&resized, request.quality, path)?;

    let output_path = output_path(path, &request.suffix, request.overwrite);
    write_atomically(&output_path, &encoded, &metadata.permissions())?;

    if request.preserve_timestamp {
        filetime::set_file_times(&output_path, modified, modified).with_path(&output_path)?;
    }

    let output_bytes = std::fs::metadata(&output_path)
        .with_path(&output_path)?
        .len();

    Ok(TransformOutcome::Resized(ResizeReport {
        input_path: path.to_path_buf(),
        output_path,
        input_bytes,
        output_bytes,
        original_dimensions,
        new_dimensions,
        processing_time: start_time.elapsed(),
    }))
}

/// Write `data` to a temporary sibling of `destination`, then rename over it
fn write_atomically(
    destination: &Path,
    data: &[u8],
    permissions: &std::fs::Permissions,
) -> Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".jpegtrim-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_path(dir)?;
    temp.write_all(data).with_path(temp.path())?;
    temp.as_file().sync_all().with_path(temp.path())?;
    std::fs::set_permissions(temp.path(), permissions.clone()).with_path(temp.path())?;

    temp.persist(destination)
        .map_err(|e| ResizeError::io(destination, e.error))?;

    debug!("Wrote {} bytes to {:?}", data.len(), destination);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_images {
    use std::path::Path;

    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, ImageBuffer, Rgb};

    /// Write a real JPEG of the given size
    pub fn write_jpeg(path: &Path, width: u32, height: u32) {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
        }));
        let mut file = std::fs::File::create(path).unwrap();
        image
            .write_with_encoder(JpegEncoder::new_with_quality(&mut file, 95))
            .unwrap();
    }

    pub fn dimensions(path: &Path) -> (u32, u32) {
        image::image_dimensions(path).unwrap()
    }
}
