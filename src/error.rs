//! # Error Types
//!
//! Every fallible operation in the library returns [`Result<T>`], whose error
//! side is [`PixelLockError`]. The umbrella enum wraps one error family per
//! component so callers can match on the family they care about:
//!
//! - [`KeyError`]: key generation and decoding
//! - [`CryptoError`]: malformed or unauthenticated ciphertext
//! - [`ImageError`]: undecodable, unsupported or unencodable images
//! - [`StegoError`]: message/capacity violations and missing payloads
//! - `Io`: filesystem access, tagged with the path and the operation
//!
//! Error messages never include key bytes or plaintext.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PixelLockError>;

/// Failures while producing or decoding a key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The operating system random source could not supply bytes.
    #[error("secure random source unavailable")]
    EntropyUnavailable,

    /// The external text encoding could not be decoded.
    #[error("key is not valid base64")]
    FormatInvalid,

    /// The decoded key has the wrong size.
    #[error("key must decode to {expected} bytes, got {actual}")]
    LengthInvalid { expected: usize, actual: usize },
}

/// Failures of the authenticated cipher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The blob cannot even hold a nonce.
    #[error("ciphertext too short: {len} bytes")]
    CiphertextTooShort { len: usize },

    /// Tag check failed. Covers both a wrong key and a corrupted blob.
    #[error("authentication failed (wrong key or corrupted data)")]
    AuthenticationFailed,

    /// Nonce could not be drawn from the random source.
    #[error("secure random source unavailable for nonce")]
    NonceUnavailable,

    #[error("encryption failed")]
    EncryptionFailed,
}

/// Failures of the pixel codec and the classifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt image data: {0}")]
    CorruptImage(String),

    #[error("failed to encode image: {0}")]
    EncodeFailed(String),
}

/// Failures of the steganographic codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StegoError {
    #[error("message too long: {len} characters (max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("image too small: need {needed} pixels, have {available}")]
    InsufficientCapacity { needed: usize, available: usize },

    /// No framed payload marker was found in the carrier.
    #[error("no hidden message found")]
    NoMessage,

    #[error("hidden payload is corrupt: {0}")]
    CorruptPayload(String),
}

/// Umbrella error for the whole crate.
#[derive(Debug, Error)]
pub enum PixelLockError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Stego(#[from] StegoError),

    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The batch root could not be enumerated.
    #[error("failed to enumerate {}: {reason}", path.display())]
    Enumeration { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A batch worker died before reporting an outcome.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl PixelLockError {
    /// Wrap an I/O error with the operation and the path it concerned.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PixelLockError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Short, stable label for the error family. Used to bucket failures in
    /// batch statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            PixelLockError::Key(_) => "key",
            PixelLockError::Crypto(_) => "crypto",
            PixelLockError::Image(_) => "image",
            PixelLockError::Stego(_) => "stego",
            PixelLockError::Io { .. } => "io",
            PixelLockError::Enumeration { .. } => "enumeration",
            PixelLockError::Config(_) => "config",
            PixelLockError::Worker(_) => "worker",
        }
    }
}
