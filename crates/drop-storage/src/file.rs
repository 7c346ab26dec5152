// File helpers shared by the engines: locking, temp siblings, replacement

use drop_core::{Error, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix of the lock file kept beside a database
pub(crate) const LOCK_SUFFIX: &str = ".lock";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opens (creating if needed) a database file for read-write.
///
/// The parent directory is never created; a missing one is an error.
pub(crate) fn open_rw(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

/// Exclusive advisory lock on `<db>.lock`, held until dropped.
///
/// The engines rename fresh files over the database, so the lock sits on
/// a sidecar that is never replaced or removed.
#[derive(Debug)]
pub(crate) struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Takes the lock without blocking; contention is `Error::Locked(db)`.
    pub(crate) fn acquire(db: &Path) -> Result<Self> {
        let file = open_rw(&sibling_path(db, LOCK_SUFFIX))?;
        file.try_lock_exclusive().map_err(|e| {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                Error::Locked(db.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// `drop.dbm` + `.tmp` -> `drop.dbm.tmp`, in the same directory
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// A temp sibling no other store handle will pick:
/// `drop.tcb` + `.tmp` -> `drop.tcb.<pid>-<seq>.tmp`
pub(crate) fn temp_path(path: &Path, suffix: &str) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    sibling_path(path, &format!(".{}-{}{}", std::process::id(), seq, suffix))
}

/// Atomically moves a fully written temp file over the target.
pub(crate) fn replace(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target).map_err(|e| {
        let _ = fs::remove_file(tmp);
        Error::Storage(format!(
            "Failed to replace {}: {}",
            target.display(),
            e
        ))
    })
}

/// fsync a file by path
pub(crate) fn sync_path(path: &Path) -> Result<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sibling_path() {
        let p = sibling_path(Path::new("/data/drop.dbm"), ".tmp");
        assert_eq!(p, PathBuf::from("/data/drop.dbm.tmp"));
    }

    #[test]
    fn test_temp_paths_are_unique() {
        let db = Path::new("/data/drop.tcb");
        let a = temp_path(db, ".tmp");
        let b = temp_path(db, ".tmp");
        assert_ne!(a, b);
        assert_eq!(a.parent(), db.parent());
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_open_rw_missing_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("drop.dbm");
        assert!(open_rw(&path).is_err());
    }

    #[test]
    fn test_lock_contention() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drop.dbm");
        let first = StoreLock::acquire(&path).unwrap();

        assert!(matches!(StoreLock::acquire(&path), Err(Error::Locked(_))));

        drop(first);
        assert!(StoreLock::acquire(&path).is_ok());
        assert!(sibling_path(&path, LOCK_SUFFIX).exists());
    }

    #[test]
    fn test_lock_survives_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drop.tcb");
        fs::write(&path, b"old").unwrap();
        let _held = StoreLock::acquire(&path).unwrap();

        let tmp = temp_path(&path, ".tmp");
        fs::write(&tmp, b"new").unwrap();
        replace(&tmp, &path).unwrap();

        assert!(matches!(StoreLock::acquire(&path), Err(Error::Locked(_))));
    }

    #[test]
    fn test_replace_moves_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("drop.tcb");
        let tmp = temp_path(&target, ".tmp");
        fs::write(&target, b"old").unwrap();
        fs::write(&tmp, b"new").unwrap();

        replace(&tmp, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!tmp.exists());
    }
}
