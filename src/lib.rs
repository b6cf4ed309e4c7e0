//! # pixellock
//!
//! Image protection with AES-256-GCM and LSB steganography, for single files
//! or whole directory trees.
//!
//! - [`crypto`]: key handling and the authenticated cipher
//! - [`processing`]: pixel codec, image sniffing, steganography
//! - [`files`]: single-file operations with atomic commits
//! - [`batch`]: bounded-concurrency directory processing
//! - [`common`]: configuration and logging

pub mod batch;
pub mod common;
pub mod crypto;
pub mod error;
pub mod files;
pub mod processing;

pub use crypto::Key;
pub use error::{PixelLockError, Result};
