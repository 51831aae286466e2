//! JPEG file recognition and output naming

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Extensions accepted as JPEG input, compared case-insensitively
pub fn jpeg_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg"]
}

/// Check if a file extension names a JPEG
pub fn is_jpeg_extension(extension: &str) -> bool {
    jpeg_extensions()
        .iter()
        .any(|&ext| ext.eq_ignore_ascii_case(extension))
}

/// Check if a path has a JPEG extension
pub fn is_jpeg_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_jpeg_extension)
}

/// Detect JPEG content from its SOI marker (FF D8 FF)
pub fn has_jpeg_header(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// Destination for a resized file
///
/// With `overwrite` the destination is the source itself. Otherwise the
/// suffix goes between the stem and the extension, keeping the extension's
/// original spelling: `photos/IMG 1.JPG` becomes `photos/IMG 1_r.JPG`.
pub fn output_path(source: &Path, suffix: &str, overwrite: bool) -> PathBuf {
    if overwrite {
        return source.to_path_buf();
    }

    let mut name = OsString::new();
    if let Some(stem) = source.file_stem() {
        name.push(stem);
    }
    name.push(suffix);
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext);
    }

    source.with_file_name(name)
}
