//! # LSB Steganography Implementation
//!
//! Hides a text message in the least significant bits of an RGBA pixel buffer.
//!
//! ## Nibble Layout
//! Every scheme below stores four bits per pixel, one in the LSB of each
//! channel, most significant bit first:
//!
//! ```text
//! R.lsb = bit 3   G.lsb = bit 2   B.lsb = bit 1   A.lsb = bit 0
//! ```
//!
//! Pixels are visited in row-major order (left to right, top to bottom).
//!
//! ## Legacy Scheme
//! One message byte per pixel. Only the byte's high nibble (bits 7..4) is
//! stored, and the message is terminated by a NUL byte. [`reveal`] rebuilds
//! each byte as `high_nibble << 4`, so the low nibble always reads back as
//! zero, and stops at the first zero byte. There is no marker: a carrier with
//! no hidden message yields whatever its LSBs happen to spell.
//!
//! ### Capacity
//! `width * height - 1` message bytes.
//!
//! ## Framed Scheme
//! ```text
//! [ "PXL1" (4 bytes) | length (u16, big-endian) | UTF-8 message ]
//! ```
//! Each framed byte spans two pixels (high nibble, then low nibble), so the
//! message reads back exactly, and a missing marker is reported as
//! [`StegoError::NoMessage`].
//!
//! ### Capacity
//! `width * height / 2 - 6` message bytes.
//!
//! Both schemes cap messages at [`MAX_MESSAGE_CHARS`] characters, whatever
//! the image size.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pixels::PixelBuffer;
use crate::error::StegoError;

/// Application-level limit on message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Marker opening a framed payload.
pub const FRAME_MAGIC: &[u8; 4] = b"PXL1";

/// Marker plus the 16-bit length.
const FRAME_HEADER_LEN: usize = FRAME_MAGIC.len() + 2;

/// Largest byte length a message of [`MAX_MESSAGE_CHARS`] characters can have.
const MAX_MESSAGE_BYTES: usize = MAX_MESSAGE_CHARS * 4;

/// How a message is laid out in the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StegoScheme {
    /// High nibble per pixel, NUL terminated.
    Legacy,
    /// Magic + length prefix, full bytes over two pixels each.
    #[default]
    Framed,
}

impl FromStr for StegoScheme {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(StegoScheme::Legacy),
            "framed" => Ok(StegoScheme::Framed),
            other => Err(StegoError::CorruptPayload(format!(
                "unknown scheme '{}'",
                other
            ))),
        }
    }
}

/// A message recovered from a carrier, and the scheme it was found with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revealed {
    pub message: String,
    pub scheme: StegoScheme,
}

// ============================================================================
// PIXEL-LEVEL HELPERS
// ============================================================================

fn pixel_count(buffer: &PixelBuffer) -> usize {
    let (width, height) = buffer.dimensions();
    width as usize * height as usize
}

fn check_message_len(message: &str) -> Result<(), StegoError> {
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(StegoError::MessageTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}

/// Write one nibble per pixel, starting at the first pixel. Pixels past the
/// last nibble are left untouched.
fn write_nibbles(img: &mut PixelBuffer, nibbles: &[u8]) {
    let (width, height) = img.dimensions();
    let mut index = 0;

    'outer: for y in 0..height {
        for x in 0..width {
            if index >= nibbles.len() {
                break 'outer;
            }

            let nibble = nibbles[index];
            let pixel = img.get_pixel_mut(x, y);

            // R, G, B, A take bits 3, 2, 1, 0
            for channel in 0..4 {
                let bit = (nibble >> (3 - channel)) & 1;
                pixel[channel] = (pixel[channel] & 0xFE) | bit;
            }

            index += 1;
        }
    }
}

/// Read one nibble per pixel, in row-major order.
fn read_nibbles(img: &PixelBuffer) -> impl Iterator<Item = u8> + '_ {
    img.pixels().map(|pixel| {
        ((pixel[0] & 1) << 3) | ((pixel[1] & 1) << 2) | ((pixel[2] & 1) << 1) | (pixel[3] & 1)
    })
}

// ============================================================================
// LEGACY SCHEME
// ============================================================================

/// Embed `message` with the legacy scheme, returning a new buffer.
///
/// # Arguments
/// - `buffer`: Carrier pixels. Not modified.
/// - `message`: Text to hide, at most [`MAX_MESSAGE_CHARS`] characters
///
/// # Errors
/// - [`StegoError::MessageTooLong`] if the message exceeds the character cap
/// - [`StegoError::InsufficientCapacity`] if `len(message) + 1 > width * height`
///
/// # Example
/// ```ignore
/// let carrier = pixels::decode(&std::fs::read("cat.png")?)?;
/// let stego = hide(&carrier, "meet at dawn")?;
/// ```
pub fn hide(buffer: &PixelBuffer, message: &str) -> Result<PixelBuffer, StegoError> {
    check_message_len(message)?;

    let mut data = message.as_bytes().to_vec();
    data.push(0);

    let available = pixel_count(buffer);
    if data.len() > available {
        return Err(StegoError::InsufficientCapacity {
            needed: data.len(),
            available,
        });
    }

    let nibbles: Vec<u8> = data.iter().map(|byte| byte >> 4).collect();

    let mut img = buffer.clone();
    write_nibbles(&mut img, &nibbles);
    Ok(img)
}

/// Extract a legacy-scheme message.
///
/// Scans every pixel, rebuilds one byte per pixel from the four LSBs (low
/// nibble zero), and truncates at the first zero byte. Never fails; bytes
/// that are not valid UTF-8 are replaced with U+FFFD.
pub fn reveal(buffer: &PixelBuffer) -> String {
    let bytes: Vec<u8> = read_nibbles(buffer)
        .map(|nibble| nibble << 4)
        .take_while(|&byte| byte != 0)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// FRAMED SCHEME
// ============================================================================

/// Embed `message` with the framed scheme, returning a new buffer.
///
/// # Errors
/// - [`StegoError::MessageTooLong`] if the message exceeds the character cap
/// - [`StegoError::InsufficientCapacity`] if the frame needs more pixels than
///   the image has
pub fn hide_framed(buffer: &PixelBuffer, message: &str) -> Result<PixelBuffer, StegoError> {
    check_message_len(message)?;

    let text = message.as_bytes();
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + text.len());
    frame.extend_from_slice(FRAME_MAGIC);
    frame.extend_from_slice(&(text.len() as u16).to_be_bytes());
    frame.extend_from_slice(text);

    let needed = frame.len() * 2;
    let available = pixel_count(buffer);
    if needed > available {
        return Err(StegoError::InsufficientCapacity { needed, available });
    }

    let nibbles: Vec<u8> = frame
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0x0F])
        .collect();

    let mut img = buffer.clone();
    write_nibbles(&mut img, &nibbles);
    Ok(img)
}

/// Extract a framed-scheme message.
///
/// # Errors
/// - [`StegoError::NoMessage`] if the carrier does not start with the marker
/// - [`StegoError::CorruptPayload`] if the length is out of range or the text
///   is not UTF-8
pub fn reveal_framed(buffer: &PixelBuffer) -> Result<String, StegoError> {
    let available = pixel_count(buffer);
    if available < FRAME_HEADER_LEN * 2 {
        return Err(StegoError::NoMessage);
    }

    let mut nibbles = read_nibbles(buffer);
    let mut next_byte = move || {
        let high = nibbles.next()?;
        let low = nibbles.next()?;
        Some((high << 4) | low)
    };

    let mut header = [0u8; FRAME_HEADER_LEN];
    for slot in header.iter_mut() {
        *slot = next_byte().ok_or(StegoError::NoMessage)?;
    }
    if &header[..FRAME_MAGIC.len()] != FRAME_MAGIC {
        return Err(StegoError::NoMessage);
    }

    let len = u16::from_be_bytes([header[4], header[5]]) as usize;
    if len > MAX_MESSAGE_BYTES || (FRAME_HEADER_LEN + len) * 2 > available {
        return Err(StegoError::CorruptPayload(format!(
            "declared length {} does not fit the carrier",
            len
        )));
    }

    let mut text = Vec::with_capacity(len);
    for _ in 0..len {
        text.push(next_byte().ok_or_else(|| {
            StegoError::CorruptPayload("payload truncated".to_string())
        })?);
    }

    String::from_utf8(text)
        .map_err(|_| StegoError::CorruptPayload("message is not valid UTF-8".to_string()))
}

// ============================================================================
// SCHEME DISPATCH
// ============================================================================

/// Embed `message` with the given scheme.
pub fn hide_with(
    buffer: &PixelBuffer,
    message: &str,
    scheme: StegoScheme,
) -> Result<PixelBuffer, StegoError> {
    match scheme {
        StegoScheme::Legacy => hide(buffer, message),
        StegoScheme::Framed => hide_framed(buffer, message),
    }
}

/// Extract a message, preferring the framed scheme.
///
/// Falls back to the legacy scheme only when no frame marker is present; a
/// frame that is present but damaged is reported as an error.
pub fn reveal_auto(buffer: &PixelBuffer) -> Result<Revealed, StegoError> {
    match reveal_framed(buffer) {
        Ok(message) => Ok(Revealed {
            message,
            scheme: StegoScheme::Framed,
        }),
        Err(StegoError::NoMessage) => Ok(Revealed {
            message: reveal(buffer),
            scheme: StegoScheme::Legacy,
        }),
        Err(e) => Err(e),
    }
}

/// Largest message, in bytes, that `scheme` can hide in `buffer` (ignoring
/// the character cap).
pub fn capacity(buffer: &PixelBuffer, scheme: StegoScheme) -> usize {
    let pixels = pixel_count(buffer);
    match scheme {
        StegoScheme::Legacy => pixels.saturating_sub(1),
        StegoScheme::Framed => (pixels / 2).saturating_sub(FRAME_HEADER_LEN),
    }
}
