//! # Pixel Codec
//!
//! Thin layer over the `image` crate that converts between on-disk containers
//! and an uncompressed RGBA pixel buffer.
//!
//! ## Canonical Plaintext
//! Before encryption every image is re-encoded to PNG, whatever its source
//! container was. Decryption therefore always yields PNG bytes, which can then
//! be re-encoded into whichever [`OutputFormat`] the caller asks for.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::{DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// Width × height grid of 8-bit RGBA samples, row-major, top to bottom.
pub type PixelBuffer = image::RgbaImage;

/// Fixed JPEG encode quality.
pub const JPEG_QUALITY: u8 = 90;

/// Container formats an image can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl OutputFormat {
    /// File extension (without the dot) conventionally used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Whether LSB edits survive encoding into this format.
    pub fn is_lossless(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(ImageError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn map_decode_error(err: image::ImageError) -> ImageError {
    match err {
        image::ImageError::Unsupported(e) => ImageError::UnsupportedFormat(e.to_string()),
        other => ImageError::CorruptImage(other.to_string()),
    }
}

/// Decode any supported container into an RGBA pixel buffer.
///
/// # Errors
/// - [`ImageError::UnsupportedFormat`] if the container is not recognised
/// - [`ImageError::CorruptImage`] if the data cannot be decoded
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
    let img = image::load_from_memory(bytes).map_err(map_decode_error)?;
    Ok(img.to_rgba8())
}

/// Encode a pixel buffer into `format`.
///
/// JPEG has no alpha channel, so the buffer is flattened to RGB first.
pub fn encode(buffer: &PixelBuffer, format: OutputFormat) -> Result<Vec<u8>, ImageError> {
    let mut output_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut output_bytes);

    let result = match format {
        OutputFormat::Png => buffer.write_to(&mut cursor, ImageOutputFormat::Png),
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(buffer.clone()).to_rgb8();
            DynamicImage::ImageRgb8(rgb)
                .write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        }
    };
    result.map_err(|e| ImageError::EncodeFailed(e.to_string()))?;

    Ok(output_bytes)
}

/// Re-encode an image of any supported container into canonical PNG bytes.
pub fn to_canonical_bytes(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let buffer = decode(bytes)?;
    encode(&buffer, OutputFormat::Png)
}

/// Decode canonical PNG bytes. Anything that is not PNG is rejected.
pub fn from_canonical_bytes(bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(map_decode_error)?;
    Ok(img.to_rgba8())
}
