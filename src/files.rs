//! # Single-File Operations
//!
//! Glue between the filesystem and the engines. Each function reads one
//! source, runs one engine, and commits one destination.
//!
//! ## Commit Protocol
//! Destinations are never written in place. [`write_atomic`] writes into a
//! uniquely named temporary sibling, syncs it, and renames it over the
//! destination, so an interrupted run leaves either the old file or the new
//! one, never a torn one.
//!
//! Without `overwrite`, the commit goes through [`write_new`] instead: the
//! temporary file is hard-linked into place, so a destination created by a
//! concurrent writer after the up-front existence check is still never
//! replaced. The item is reported as skipped.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{self, Key};
use crate::error::{PixelLockError, Result};
use crate::processing::pixels::{self, OutputFormat};
use crate::processing::steganography::{self, Revealed, StegoScheme};

/// Why an item was not processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The destination exists and overwriting was not requested.
    AlreadyExists,
    /// An earlier item of the same batch maps to the same destination.
    DuplicateDestination,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => f.write_str("destination already exists"),
            SkipReason::DuplicateDestination => {
                f.write_str("another item already writes this destination")
            }
        }
    }
}

/// Result of a single-file operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Written { bytes: u64 },
    Skipped(SkipReason),
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| PixelLockError::io("read", path, e))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PixelLockError::io("create directory", parent, e))?;
    }
    Ok(())
}

/// Write and sync `data` into a fresh temporary sibling of `path`.
fn write_temp(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let temp = temp_sibling(path);
    let written = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp)?;
        file.write_all(data)?;
        file.sync_all()
    })();

    if let Err(e) = written {
        // Best effort: the temp file may not exist if create failed
        let _ = fs::remove_file(&temp);
        return Err(PixelLockError::io("write", path, e));
    }
    Ok(temp)
}

/// Write `data` to `path` via a temporary file and a rename, replacing any
/// existing file.
///
/// Missing parent directories are created. Creation is idempotent, so any
/// number of workers may race to create the same parent.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<u64> {
    create_parent(path)?;
    let temp = write_temp(path, data)?;

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(PixelLockError::io("write", path, e));
    }
    Ok(data.len() as u64)
}

/// Like [`write_atomic`], but never replaces an existing file.
///
/// The temporary file is hard-linked into place, which fails if `path`
/// appeared in the meantime, even when another worker created it after any
/// earlier existence check.
///
/// # Returns
/// - `Some(bytes)` when `path` was created
/// - `None` when `path` already existed and was left untouched
pub fn write_new(path: &Path, data: &[u8]) -> Result<Option<u64>> {
    create_parent(path)?;
    let temp = write_temp(path, data)?;

    let linked = fs::hard_link(&temp, path);
    let _ = fs::remove_file(&temp);

    match linked {
        Ok(()) => Ok(Some(data.len() as u64)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(PixelLockError::io("write", path, e)),
    }
}

fn blocked_by_existing(output: &Path, overwrite: bool) -> bool {
    !overwrite && output.exists()
}

/// Commit `data` to `output`, honouring the overwrite policy at commit time.
fn commit(output: &Path, data: &[u8], overwrite: bool) -> Result<FileOutcome> {
    let written = if overwrite {
        Some(write_atomic(output, data)?)
    } else {
        write_new(output, data)?
    };

    Ok(match written {
        Some(bytes) => FileOutcome::Written { bytes },
        None => FileOutcome::Skipped(SkipReason::AlreadyExists),
    })
}

/// Encrypt the image at `input` into `output`.
///
/// The image is decoded and re-encoded to canonical PNG before encryption,
/// whatever its source container.
///
/// # Returns
/// - `Written` with the blob size
/// - `Skipped` when `output` exists and `overwrite` is false
pub fn encrypt_file(input: &Path, output: &Path, key: &Key, overwrite: bool) -> Result<FileOutcome> {
    if blocked_by_existing(output, overwrite) {
        return Ok(FileOutcome::Skipped(SkipReason::AlreadyExists));
    }

    let source = read(input)?;
    let canonical = pixels::to_canonical_bytes(&source)?;
    let blob = crypto::encrypt(key, &canonical)?;

    commit(output, &blob, overwrite)
}

/// Decrypt the blob at `input` and write the image to `output` as `format`.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    key: &Key,
    format: OutputFormat,
    overwrite: bool,
) -> Result<FileOutcome> {
    if blocked_by_existing(output, overwrite) {
        return Ok(FileOutcome::Skipped(SkipReason::AlreadyExists));
    }

    let blob = read(input)?;
    let canonical = crypto::decrypt(key, &blob)?;
    let buffer = pixels::from_canonical_bytes(&canonical)?;
    let encoded = pixels::encode(&buffer, format)?;

    commit(output, &encoded, overwrite)
}

/// Hide `message` in the image at `input` and write the carrier to `output`.
///
/// Lossy formats destroy LSB payloads; callers should prefer PNG.
pub fn hide_file(
    input: &Path,
    output: &Path,
    message: &str,
    scheme: StegoScheme,
    format: OutputFormat,
    overwrite: bool,
) -> Result<FileOutcome> {
    if blocked_by_existing(output, overwrite) {
        return Ok(FileOutcome::Skipped(SkipReason::AlreadyExists));
    }

    let carrier = pixels::decode(&read(input)?)?;
    let stego = steganography::hide_with(&carrier, message, scheme)?;
    let encoded = pixels::encode(&stego, format)?;

    commit(output, &encoded, overwrite)
}

/// Recover a hidden message from the image at `input`.
pub fn reveal_file(input: &Path) -> Result<Revealed> {
    let carrier = pixels::decode(&read(input)?)?;
    Ok(steganography::reveal_auto(&carrier)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path, width: u32, height: u32) -> RgbaImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 13) as u8, (y * 7) as u8, 99, 255])
        });
        img.save(path).unwrap();
        img
    }

    #[test]
    fn test_write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.bin");
        assert_eq!(write_atomic(&target, b"hello").unwrap(), 5);
        assert_eq!(fs::read(&target).unwrap(), b"hello");

        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("x.bin");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[test]
    fn test_write_new_never_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/x.bin");
        assert_eq!(write_new(&target, b"first").unwrap(), Some(5));
        assert_eq!(write_new(&target, b"second").unwrap(), None);
        assert_eq!(fs::read(&target).unwrap(), b"first");

        let names: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("x.bin")]);
    }

    #[test]
    fn test_commit_skips_destination_that_appeared_late() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("late.png");
        // Created after any up-front check would have run
        fs::write(&target, b"winner").unwrap();

        assert_eq!(
            commit(&target, b"loser", false).unwrap(),
            FileOutcome::Skipped(SkipReason::AlreadyExists)
        );
        assert_eq!(fs::read(&target).unwrap(), b"winner");

        assert_eq!(
            commit(&target, b"forced", true).unwrap(),
            FileOutcome::Written { bytes: 6 }
        );
        assert_eq!(fs::read(&target).unwrap(), b"forced");
    }

    #[test]
    fn test_encrypt_decrypt_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        let original = write_png(&input, 9, 6);
        let key = Key::generate().unwrap();

        let sealed = dir.path().join("photo.png.enc");
        let outcome = encrypt_file(&input, &sealed, &key, false).unwrap();
        assert!(matches!(outcome, FileOutcome::Written { bytes } if bytes > 28));

        let restored = dir.path().join("restored.png");
        decrypt_file(&sealed, &restored, &key, OutputFormat::Png, false).unwrap();
        let decoded = image::open(&restored).unwrap().to_rgba8();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_existing_output_is_skipped_unless_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        write_png(&input, 4, 4);
        let key = Key::generate().unwrap();

        let sealed = dir.path().join("photo.enc");
        fs::write(&sealed, b"keep me").unwrap();

        assert_eq!(
            encrypt_file(&input, &sealed, &key, false).unwrap(),
            FileOutcome::Skipped(SkipReason::AlreadyExists)
        );
        assert_eq!(fs::read(&sealed).unwrap(), b"keep me");

        assert!(matches!(
            encrypt_file(&input, &sealed, &key, true).unwrap(),
            FileOutcome::Written { .. }
        ));
        assert_ne!(fs::read(&sealed).unwrap(), b"keep me");
    }

    #[test]
    fn test_wrong_key_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        write_png(&input, 4, 4);

        let sealed = dir.path().join("photo.enc");
        encrypt_file(&input, &sealed, &Key::generate().unwrap(), false).unwrap();

        let restored = dir.path().join("restored.png");
        let err = decrypt_file(
            &sealed,
            &restored,
            &Key::generate().unwrap(),
            OutputFormat::Png,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PixelLockError::Crypto(CryptoError::AuthenticationFailed)
        ));
        assert!(!restored.exists());
    }

    #[test]
    fn test_hide_reveal_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cover.png");
        write_png(&input, 30, 30);

        let output = dir.path().join("out/stego.png");
        hide_file(
            &input,
            &output,
            "the eagle lands",
            StegoScheme::Framed,
            OutputFormat::Png,
            false,
        )
        .unwrap();

        let revealed = reveal_file(&output).unwrap();
        assert_eq!(revealed.message, "the eagle lands");
        assert_eq!(revealed.scheme, StegoScheme::Framed);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        let err = reveal_file(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.png"));
    }
}
