//! # Key Management
//!
//! Generates and decodes the fixed-length symmetric key used by the cipher.
//!
//! The key length is pinned to [`KEY_SIZE`] (256 bits). It is never
//! negotiated and never persisted by the library; the binary is responsible
//! for writing key files if the user asks for one.
//!
//! ## External Encoding
//! Keys travel as standard base64 text (`A-Z a-z 0-9 + /`, padded), which is
//! what `keygen` prints and what `--key` / `PIXELLOCK_KEY` accept.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// A 256-bit symmetric key.
///
/// The bytes are wiped when the key is dropped, and `Debug` never prints them.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// Generate a fresh key from the operating system's secure random source.
    ///
    /// # Errors
    /// - [`KeyError::EntropyUnavailable`] if the random source fails
    ///
    /// # Example
    /// ```ignore
    /// let key = Key::generate()?;
    /// println!("{}", key.to_base64());
    /// ```
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| KeyError::EntropyUnavailable)?;
        let key = Key(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Decode a key from its base64 text form.
    ///
    /// Surrounding whitespace (e.g. the trailing newline of a key file) is
    /// ignored.
    ///
    /// # Errors
    /// - [`KeyError::FormatInvalid`] if the text is not base64
    /// - [`KeyError::LengthInvalid`] if it does not decode to exactly 32 bytes
    pub fn decode(encoded: &str) -> Result<Self, KeyError> {
        let mut raw = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::FormatInvalid)?;

        let key = Self::from_slice(&raw);
        raw.zeroize();
        key
    }

    /// Build a key from raw bytes, checking the length.
    pub fn from_slice(raw: &[u8]) -> Result<Self, KeyError> {
        if raw.len() != KEY_SIZE {
            return Err(KeyError::LengthInvalid {
                expected: KEY_SIZE,
                actual: raw.len(),
            });
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(raw);
        Ok(Key(bytes))
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Key(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encode the key as base64 text.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_has_fixed_size_and_differs() {
        let a = Key::generate().unwrap();
        let b = Key::generate().unwrap();
        assert_eq!(a.as_bytes().len(), KEY_SIZE);
        assert_ne!(a, b);
    }

    #[test]
    fn test_base64_roundtrip() {
        let key = Key::generate().unwrap();
        let text = key.to_base64();
        assert_eq!(Key::decode(&text).unwrap(), key);
        // Key files usually end with a newline
        assert_eq!(Key::decode(&format!("{}\n", text)).unwrap(), key);
    }

    #[test]
    fn test_decode_rejects_bad_text() {
        assert_eq!(Key::decode("not base64!!"), Err(KeyError::FormatInvalid));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let short = general_purpose::STANDARD.encode([7u8; 16]);
        assert_eq!(
            Key::decode(&short),
            Err(KeyError::LengthInvalid {
                expected: 32,
                actual: 16
            })
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = Key::from_bytes([0xAB; KEY_SIZE]);
        let shown = format!("{:?}", key);
        assert_eq!(shown, "Key([REDACTED])");
        assert!(!shown.contains("171"));
    }
}
