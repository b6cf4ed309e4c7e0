//! # Authenticated Encryption
//!
//! AES-256-GCM with a fresh random 96-bit nonce per call and no associated data.
//!
//! ## Blob Layout
//! ```text
//! [ nonce (12 bytes) | ciphertext (len(plaintext) bytes) | tag (16 bytes) ]
//! ```
//! There is no magic number, version byte or key identifier. A blob is only
//! meaningful to someone who already knows the key.
//!
//! Wrong keys and corrupted blobs both surface as
//! [`CryptoError::AuthenticationFailed`]; the two cases are not told apart.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use super::key::Key;
use crate::error::CryptoError;

/// GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Smallest well-formed blob: a nonce and a tag around an empty plaintext.
pub const MIN_BLOB_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// Encrypt `plaintext` under `key`, returning `nonce || ciphertext || tag`.
///
/// # Errors
/// - [`CryptoError::NonceUnavailable`] if the random source fails
///
/// # Example
/// ```ignore
/// let blob = encrypt(&key, b"AB")?;
/// assert_eq!(blob.len(), 12 + 2 + 16);
/// ```
pub fn encrypt(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::NonceUnavailable)?;
    seal(key, &nonce, plaintext)
}

/// Seal with an explicit nonce. Callers must never repeat a nonce for a key.
pub(crate) fn seal(
    key: &Key,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let sealed = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a `nonce || ciphertext || tag` blob.
///
/// # Errors
/// - [`CryptoError::CiphertextTooShort`] if the blob cannot hold a nonce
/// - [`CryptoError::AuthenticationFailed`] on a wrong key, a truncated tag, or
///   any modified byte
pub fn decrypt(key: &Key, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_SIZE {
        return Err(CryptoError::CiphertextTooShort { len: blob.len() });
    }
    let (nonce, body) = blob.split_at(NONCE_SIZE);

    // A body shorter than the tag can never authenticate
    if body.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::AuthenticationFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
