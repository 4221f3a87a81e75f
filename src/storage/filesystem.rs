//! File system operations
//!
//! Thin wrappers over the directory and rename primitives used by the
//! workspace operations, including the copy fallback for moves that cross
//! a volume boundary.

use log::{info, warn};
use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::lifecycle::CancellationToken;

// Windows reports sharing violations on freshly closed files as
// PermissionDenied. Elsewhere the error is final.
#[cfg(windows)]
const RENAME_RETRIES: u32 = 3;
#[cfg(not(windows))]
const RENAME_RETRIES: u32 = 1;

/// How an entry ended up at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    /// Single atomic rename.
    Renamed,
    /// Copy, verify, then delete the source. Not atomic.
    Copied,
}

/// Create exactly one directory, failing with `AlreadyExists` if anything
/// already occupies the path.
pub fn create_directory_exclusive(path: &Path) -> io::Result<()> {
    fs::create_dir(path)
}

/// Create a directory and any missing ancestors.
pub fn ensure_directory(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Rename within one volume, retrying transient permission failures on
/// Windows.
pub fn rename_with_retry(from: &Path, to: &Path) -> io::Result<()> {
    let mut attempt = 1;
    loop {
        match fs::rename(from, to) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < RENAME_RETRIES && e.kind() == io::ErrorKind::PermissionDenied => {
                thread::sleep(Duration::from_millis(100 * attempt as u64));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Move an entry, falling back to copy-then-delete when the destination
/// lives on another volume.
pub fn move_path(from: &Path, to: &Path, cancel: &CancellationToken) -> io::Result<MoveMethod> {
    match rename_with_retry(from, to) {
        Ok(()) => Ok(MoveMethod::Renamed),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            warn!(
                "Atomic rename unavailable for {} -> {}, copying instead",
                from.display(),
                to.display()
            );
            copy_then_remove(from, to, cancel)?;
            Ok(MoveMethod::Copied)
        }
        Err(e) => Err(e),
    }
}

/// Copy `from` to `to`, verify the copy, then remove `from`.
///
/// Any copy failure, cancellation included, removes whatever was written
/// at `to` and leaves the source untouched.
pub fn copy_then_remove(from: &Path, to: &Path, cancel: &CancellationToken) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }

    let copied = copy_recursive(from, to, cancel).and_then(|()| {
        let expected = tree_footprint(from)?;
        let actual = tree_footprint(to)?;
        if expected != actual {
            return Err(io::Error::other(format!(
                "copy verification failed: expected {:?}, found {:?}",
                expected, actual
            )));
        }
        ensure_live(cancel)
    });

    if let Err(e) = copied {
        if let Err(cleanup) = remove_entry(to) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!("Failed to clean up partial copy {}: {}", to.display(), cleanup);
            }
        }
        return Err(e);
    }

    remove_entry(from)?;
    info!("Copied {} to {} and removed source", from.display(), to.display());
    Ok(())
}

/// Remove a file, symlink or directory tree.
pub fn remove_entry(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn ensure_live(cancel: &CancellationToken) -> io::Result<()> {
    if cancel.is_cancelled() {
        return Err(io::Error::other("operation cancelled"));
    }
    Ok(())
}

fn copy_recursive(from: &Path, to: &Path, cancel: &CancellationToken) -> io::Result<()> {
    ensure_live(cancel)?;
    let metadata = fs::symlink_metadata(from)?;
    if metadata.is_dir() {
        fs::create_dir(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()), cancel)?;
        }
        Ok(())
    } else if metadata.file_type().is_symlink() {
        copy_symlink(from, to)
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot copy symlink {}", from.display()),
    ))
}

/// (entry count, total file bytes) of a tree, without following symlinks.
fn tree_footprint(path: &Path) -> io::Result<(u64, u64)> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        let bytes = if metadata.is_file() { metadata.len() } else { 0 };
        return Ok((1, bytes));
    }

    let mut entries = 1;
    let mut bytes = 0;
    for entry in fs::read_dir(path)? {
        let (child_entries, child_bytes) = tree_footprint(&entry?.path())?;
        entries += child_entries;
        bytes += child_bytes;
    }
    Ok((entries, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::CancellationSource;

    #[test]
    fn exclusive_create_refuses_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("once");
        create_directory_exclusive(&path).unwrap();
        let err = create_directory_exclusive(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn copy_fallback_moves_a_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.bin"), [1u8, 2, 3]).unwrap();
        fs::write(src.join("nested/b.txt"), b"hello").unwrap();

        let dst = dir.path().join("dst");
        copy_then_remove(&src, &dst, &CancellationToken::none()).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("a.bin")).unwrap(), vec![1u8, 2, 3]);
        assert_eq!(fs::read(dst.join("nested/b.txt")).unwrap(), b"hello");
    }

    #[test]
    fn copy_refuses_occupied_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.txt"), b"a").unwrap();

        let dst = dir.path().join("dst");
        fs::write(&dst, b"occupied").unwrap();
        let err = copy_then_remove(&src, &dst, &CancellationToken::none()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(src.join("a.txt").exists());
        assert_eq!(fs::read(&dst).unwrap(), b"occupied");
    }

    #[test]
    fn move_path_renames_on_same_volume() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("file.txt");
        fs::write(&src, b"content").unwrap();
        let dst = dir.path().join("moved.txt");

        assert_eq!(
            move_path(&src, &dst, &CancellationToken::none()).unwrap(),
            MoveMethod::Renamed
        );
        assert_eq!(fs::read(&dst).unwrap(), b"content");
    }

    #[test]
    fn cancelled_copy_keeps_source_and_cleans_destination() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.txt"), b"a").unwrap();
        let dst = dir.path().join("dst");

        let source = CancellationSource::new();
        source.cancel();
        assert!(copy_then_remove(&src, &dst, &source.token()).is_err());

        assert_eq!(fs::read(src.join("a.txt")).unwrap(), b"a");
        assert!(!dst.exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn rename_failures_are_not_retried() {
        assert_eq!(RENAME_RETRIES, 1);

        let dir = tempfile::tempdir().unwrap();
        let started = std::time::Instant::now();
        let err = rename_with_retry(&dir.path().join("absent"), &dir.path().join("b")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
