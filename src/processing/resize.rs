//! JPEG codec and width-based resizing

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::error::{DecodingError, ImageFormatHint};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use tracing::debug;

use crate::error::{Result, ResizeError};
use crate::processing::formats::has_jpeg_header;

/// Resampling filter used for every resize (Lanczos, radius 3)
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Calculate the output size for a width-based, aspect-preserving resize
///
/// Height is `round(height * target_width / width)` with halves rounded up,
/// and never less than one pixel. `None` when either size is zero or the
/// height does not fit in 32 bits.
pub fn target_dimensions(width: u32, height: u32, target_width: u32) -> Option<(u32, u32)> {
    if target_width == 0 || width == 0 || height == 0 {
        return None;
    }

    let (w, h, t) = (u64::from(width), u64::from(height), u64::from(target_width));
    let new_height = (h * t + w / 2) / w;
    let new_height = u32::try_from(new_height.max(1)).ok()?;

    Some((target_width, new_height))
}

/// Decode an in-memory JPEG
pub fn decode_jpeg(data: &[u8], path: &Path) -> Result<DynamicImage> {
    if !has_jpeg_header(data) {
        let error = DecodingError::new(
            ImageFormatHint::Exact(ImageFormat::Jpeg),
            "missing JPEG start-of-image marker",
        );
        return Err(ResizeError::decode(path, ImageError::Decoding(error)));
    }

    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| ResizeError::decode(path, e))
}

/// Resize to `target_width`, preserving aspect ratio
///
/// A zero target is a configuration mistake; an image that cannot be scaled
/// to it is a problem with `path` alone.
pub fn resize_to_width(image: &DynamicImage, target_width: u32, path: &Path) -> Result<DynamicImage> {
    if target_width == 0 {
        return Err(ResizeError::config("Width must be greater than 0"));
    }
    let (width, height) = target_dimensions(image.width(), image.height(), target_width)
        .ok_or_else(|| ResizeError::Dimensions {
            path: path.to_path_buf(),
            width: image.width(),
            height: image.height(),
            target_width,
        })?;

    debug!(
        "Resizing {}x{} -> {}x{} using {:?}",
        image.width(),
        image.height(),
        width,
        height,
        RESIZE_FILTER
    );

    Ok(image.resize_exact(width, height, RESIZE_FILTER))
}

/// Encode as JPEG at `quality` into a byte buffer
pub fn encode_jpeg(image: &DynamicImage, quality: u8, path: &Path) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);

    // JPEG has no alpha channel
    let result = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
            image.write_with_encoder(encoder)
        }
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder),
    };
    result.map_err(|e| ResizeError::encode(path, e))?;

    Ok(buffer)
}
