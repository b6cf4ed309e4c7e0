//! # Image Processing and Steganography
//!
//! - [`pixels`]: container decode/encode and the canonical PNG plaintext
//! - [`classify`]: content-sniffing image detection
//! - [`steganography`]: LSB message embedding and extraction

pub mod classify;
pub mod pixels;
pub mod steganography;

// Re-export main functions for convenience
pub use classify::is_supported_image;
pub use pixels::{OutputFormat, PixelBuffer};
pub use steganography::{hide, hide_with, reveal, reveal_auto, Revealed, StegoScheme};
