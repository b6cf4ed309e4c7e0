//! # Cryptography
//!
//! - [`key`]: 256-bit key generation and base64 decoding
//! - [`cipher`]: AES-256-GCM encrypt/decrypt of opaque byte payloads

pub mod cipher;
pub mod key;

pub use cipher::{decrypt, encrypt, MIN_BLOB_SIZE, NONCE_SIZE, TAG_SIZE};
pub use key::{Key, KEY_SIZE};
