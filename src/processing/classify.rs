//! # File Classification
//!
//! Decides whether a path holds a supported image by sniffing its content,
//! never by looking at the extension. A file counts as an image when its
//! magic bytes match a supported container and its header parses far enough
//! to yield dimensions.

use std::path::Path;

use image::ImageFormat;

/// Containers accepted as encryption or steganography sources.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// Sniff the container format of the file at `path`.
///
/// Returns `None` when the file cannot be opened, the format is unknown or
/// unsupported, or the header does not parse.
pub fn sniff_format(path: &Path) -> Option<ImageFormat> {
    let reader = image::io::Reader::open(path).ok()?.with_guessed_format().ok()?;
    let format = reader.format()?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return None;
    }

    reader.into_dimensions().ok()?;
    Some(format)
}

/// Whether `path` is a decodable image in one of the supported containers.
pub fn is_supported_image(path: &Path) -> bool {
    sniff_format(path).is_some()
}
