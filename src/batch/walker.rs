//! # Directory Discovery
//!
//! Walks a batch root depth-first and turns qualifying files into
//! [`BatchItem`]s with their destination already mapped under the output root.
//!
//! ## Traversal Policy
//! - [`TraversalPolicy::RootOnly`]: files directly inside the root; nested
//!   directories are listed but never entered
//! - [`TraversalPolicy::Unlimited`]: the whole tree
//!
//! ## Selection
//! - [`Selection::Images`]: files whose *content* is a supported image
//! - [`Selection::Suffix`]: files whose name ends with the given suffix
//!   (encrypted blobs are opaque, so their content is not inspected)
//!
//! Unreadable roots are fatal. Unreadable entries below the root are returned
//! as walk errors so the runner can record them without stopping the batch.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PixelLockError, Result};
use crate::processing::classify;

/// How deep discovery descends below the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalPolicy {
    #[default]
    RootOnly,
    Unlimited,
}

impl TraversalPolicy {
    pub fn from_recursive(recursive: bool) -> Self {
        if recursive {
            TraversalPolicy::Unlimited
        } else {
            TraversalPolicy::RootOnly
        }
    }

    fn max_depth(&self) -> usize {
        match self {
            TraversalPolicy::RootOnly => 1,
            TraversalPolicy::Unlimited => usize::MAX,
        }
    }
}

/// Which files qualify for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Images,
    Suffix(String),
}

impl Selection {
    fn accepts(&self, path: &Path) -> bool {
        match self {
            Selection::Images => classify::is_supported_image(path),
            Selection::Suffix(suffix) => strip_suffix_name(path, suffix).is_some(),
        }
    }
}

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Everything found under a root.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Qualifying files, relative path kept for destination mapping
    pub candidates: Vec<(PathBuf, PathBuf)>,
    /// Entries that could not be read, with the reason
    pub walk_errors: Vec<(PathBuf, String)>,
}

/// File name of `path` without `suffix`, if it carries that suffix and
/// something remains once it is removed.
fn strip_suffix_name(path: &Path, suffix: &str) -> Option<String> {
    if suffix.is_empty() {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(suffix)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Walk `root` and collect qualifying files.
///
/// Entries under `exclude` (typically an output root nested inside the input
/// root) are skipped entirely.
///
/// # Errors
/// - [`PixelLockError::Enumeration`] if the root is missing, not a directory,
///   or cannot be listed
pub fn discover(
    root: &Path,
    policy: TraversalPolicy,
    selection: &Selection,
    exclude: Option<&Path>,
) -> Result<Discovery> {
    let metadata = fs::metadata(root).map_err(|e| PixelLockError::Enumeration {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(PixelLockError::Enumeration {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let exclude = exclude.filter(|excluded| *excluded != root);

    let walker = WalkDir::new(root)
        .min_depth(0)
        .max_depth(policy.max_depth())
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match exclude {
            Some(excluded) => entry.depth() == 0 || !entry.path().starts_with(excluded),
            None => true,
        });

    let mut discovery = Discovery::default();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(PixelLockError::Enumeration {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                discovery.walk_errors.push((path, e.to_string()));
                continue;
            }
        };

        // Links are not followed into directories, but a link to a regular
        // file is judged by its target
        if entry.file_type().is_dir() || !entry.path().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        if selection.accepts(entry.path()) {
            discovery
                .candidates
                .push((entry.path().to_path_buf(), relative.to_path_buf()));
        }
    }

    Ok(discovery)
}

/// Resolve `path` like `fs::canonicalize`, tolerating a tail that does not
/// exist yet: the deepest existing ancestor is canonicalized and the missing
/// components are appended unchanged.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Some(resolved);
            }
            Err(_) => {
                missing.push(existing.file_name()?.to_os_string());
                existing = existing.parent()?;
            }
        }
    }
}

/// If `output_root` lies strictly inside `root`, return it spelled the way
/// the walk under `root` will spell it, ready to pass as `exclude` to
/// [`discover`].
///
/// Both paths are resolved first, so `in` and `./in/out` or a symlinked
/// spelling of the same directory are recognised.
pub fn nested_exclusion(root: &Path, output_root: &Path) -> Option<PathBuf> {
    let resolved_root = canonicalize_lenient(root)?;
    let resolved_output = canonicalize_lenient(output_root)?;

    let relative = resolved_output.strip_prefix(&resolved_root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}

/// `output_root/relative` with `suffix` appended to the file name.
pub fn encrypted_destination(output_root: &Path, relative: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(relative.as_os_str());
    name.push(suffix);
    output_root.join(name)
}

/// `output_root/relative` with `suffix` removed from the file name.
pub fn decrypted_destination(output_root: &Path, relative: &Path, suffix: &str) -> Option<PathBuf> {
    let stem = strip_suffix_name(relative, suffix)?;
    Some(output_root.join(relative.with_file_name(stem)))
}

/// `output_root/relative` with the extension replaced by `extension`.
pub fn replaced_extension_destination(output_root: &Path, relative: &Path, extension: &str) -> PathBuf {
    output_root.join(relative.with_extension(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        png(&dir.path().join("a.png"));
        png(&dir.path().join("sub/b.png"));
        png(&dir.path().join("sub/deeper/c.png"));
        fs::write(dir.path().join("readme.txt"), b"hello").unwrap();
        fs::write(dir.path().join("x.png.enc"), b"blob").unwrap();
        fs::write(dir.path().join("sub/y.png.enc"), b"blob").unwrap();
        dir
    }

    fn relatives(discovery: &Discovery) -> Vec<PathBuf> {
        discovery.candidates.iter().map(|(_, rel)| rel.clone()).collect()
    }

    #[test]
    fn test_root_only_skips_nested_directories() {
        let dir = tree();
        let found = discover(dir.path(), TraversalPolicy::RootOnly, &Selection::Images, None).unwrap();
        assert_eq!(relatives(&found), vec![PathBuf::from("a.png")]);
    }

    #[test]
    fn test_unlimited_walks_whole_tree() {
        let dir = tree();
        let found = discover(dir.path(), TraversalPolicy::Unlimited, &Selection::Images, None).unwrap();
        assert_eq!(
            relatives(&found),
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("sub/b.png"),
                PathBuf::from("sub/deeper/c.png"),
            ]
        );
    }

    #[test]
    fn test_suffix_selection_ignores_content() {
        let dir = tree();
        let selection = Selection::Suffix(".enc".to_string());
        let found = discover(dir.path(), TraversalPolicy::Unlimited, &selection, None).unwrap();
        assert_eq!(
            relatives(&found),
            vec![PathBuf::from("sub/y.png.enc"), PathBuf::from("x.png.enc")]
        );
    }

    #[test]
    fn test_excluded_output_root() {
        let dir = tree();
        let out = dir.path().join("sub");
        let found = discover(dir.path(), TraversalPolicy::Unlimited, &Selection::Images, Some(&out)).unwrap();
        assert_eq!(relatives(&found), vec![PathBuf::from("a.png")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("in");
        png(&root.join("a.png"));
        png(&dir.path().join("elsewhere/real.png"));
        fs::write(dir.path().join("elsewhere/real.png.enc"), b"blob").unwrap();
        fs::create_dir_all(dir.path().join("elsewhere/sub")).unwrap();
        png(&dir.path().join("elsewhere/sub/hidden.png"));

        symlink(dir.path().join("elsewhere/real.png"), root.join("linked.png")).unwrap();
        symlink(dir.path().join("elsewhere/real.png.enc"), root.join("linked.png.enc")).unwrap();
        // Directory links are listed but never entered
        symlink(dir.path().join("elsewhere/sub"), root.join("subdir")).unwrap();
        // Dangling links are ignored
        symlink(dir.path().join("nowhere.png"), root.join("broken.png")).unwrap();

        let images = discover(&root, TraversalPolicy::Unlimited, &Selection::Images, None).unwrap();
        assert_eq!(
            relatives(&images),
            vec![PathBuf::from("a.png"), PathBuf::from("linked.png")]
        );
        assert!(images.walk_errors.is_empty());

        let selection = Selection::Suffix(".enc".to_string());
        let sealed = discover(&root, TraversalPolicy::RootOnly, &selection, None).unwrap();
        assert_eq!(relatives(&sealed), vec![PathBuf::from("linked.png.enc")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_a_walk_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tree();
        let locked = dir.path().join("sub");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let found = discover(dir.path(), TraversalPolicy::Unlimited, &Selection::Images, None);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let found = found.unwrap();

        assert_eq!(relatives(&found), vec![PathBuf::from("a.png")]);
        assert_eq!(found.walk_errors.len(), 1);
        assert_eq!(found.walk_errors[0].0, locked);
    }

    #[test]
    fn test_nested_exclusion_resolves_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("in");
        fs::create_dir_all(root.join("sub")).unwrap();

        // Output does not exist yet and is spelled through `..`
        let output = root.join("sub/../out");
        assert_eq!(nested_exclusion(&root, &output), Some(root.join("out")));

        assert_eq!(nested_exclusion(&root, &root.join("sub/..")), None);
        assert_eq!(nested_exclusion(&root, &dir.path().join("elsewhere")), None);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(
            &dir.path().join("absent"),
            TraversalPolicy::RootOnly,
            &Selection::Images,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PixelLockError::Enumeration { .. }));
    }

    #[test]
    fn test_destination_mapping() {
        let out = Path::new("/out");
        let rel = Path::new("sub/b.png");
        assert_eq!(
            encrypted_destination(out, rel, ".enc"),
            PathBuf::from("/out/sub/b.png.enc")
        );
        assert_eq!(
            decrypted_destination(out, Path::new("sub/b.png.enc"), ".enc"),
            Some(PathBuf::from("/out/sub/b.png"))
        );
        assert_eq!(decrypted_destination(out, Path::new(".enc"), ".enc"), None);
        assert_eq!(
            replaced_extension_destination(out, Path::new("sub/b.jpeg"), "png"),
            PathBuf::from("/out/sub/b.png")
        );
    }
}
