//! # Configuration Utilities
//!
//! Optional TOML configuration for the command-line tool. Every field has a
//! default, so an empty file (or no file at all) is valid.
//!
//! ```toml
//! [batch]
//! max_workers = 4
//! encrypted_ext = ".enc"
//! recursive = false
//! overwrite = false
//!
//! [output]
//! format = "png"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PixelLockError, Result};
use crate::processing::OutputFormat;

/// Suffix appended to encrypted files.
pub const DEFAULT_ENCRYPTED_EXT: &str = ".enc";

/// In-flight item limit used when nothing else is configured.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: PixelLockConfig = load_config("pixellock.toml")?;
/// ```
pub fn load_config<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PixelLockError::io("read", path, e))?;
    toml::from_str(&content)
        .map_err(|e| PixelLockError::Config(format!("{}: {}", path.display(), e)))
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelLockConfig {
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Directory-run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of files processed at once
    pub max_workers: usize,
    /// Suffix identifying encrypted files (e.g. ".enc")
    pub encrypted_ext: String,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Replace existing destination files
    pub overwrite: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            encrypted_ext: DEFAULT_ENCRYPTED_EXT.to_string(),
            recursive: false,
            overwrite: false,
        }
    }
}

/// Output image settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}
