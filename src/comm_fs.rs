// comm_fs
// > file utility, crash-safe replace protocol
//
// Replace protocol for a durable file P:
//   1. rename P -> P.old
//   2. create fresh P, write, fsync
//   3. remove P.old
// At any instant at least one of {P, P.old} is a complete snapshot. A stray
// P.old found on the next access is the last complete one and is restored.
//
// Precondition: a single writer per P at a time. Nothing here locks across
// processes.
use crate::comm::{SnRst, SnTimeDuration};
use crate::error::Error;
use crate::SnPathBufToString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const BACKUP_SUFFIX: &str = ".old";

pub fn backup_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(BACKUP_SUFFIX);
    PathBuf::from(s)
}

pub fn create_dir_sync<P: AsRef<Path>>(path: &P) -> SnRst<()> {
    if let Ok(attr) = fs::metadata(path) {
        if attr.is_dir() {
            return Ok(());
        }

        return Err(Error::InvalidPath(format!(
            "path is not directory,{}",
            path.as_ref().display()
        )));
    }

    fs::create_dir_all(path).map_err(|e| Error::IoError(e.to_string()))?;

    Ok(())
}

//
// recovery
//

/// Restores `P.old` over `P` if a previous replace was interrupted.
///
/// Returns `true` when a backup was promoted. Whatever `P` held at that point
/// (nothing, a truncated write, or an unconfirmed new state) is discarded.
pub fn recover_replaced(path: &Path) -> SnRst<bool> {
    let backup = backup_path(path);

    if !backup.exists() {
        return Ok(false);
    }

    log::warn!(
        "[comm_fs::recover_replaced] interrupted replace detected, restoring backup, path={}",
        SnPathBufToString!(backup)
    );

    fs::rename(&backup, path).map_err(|e| {
        Error::StoreUnavailable(format!(
            "failed to restore backup, path={}, e={}",
            backup.display(),
            e
        ))
    })?;

    sync_parent_dir(path);

    Ok(true)
}

//
// write
//

/// Creates `path` with `bytes`. Fails if the file already exists.
pub fn create_new_file(path: &Path, bytes: &[u8]) -> SnRst<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| Error::IoError(format!("failed to create {}, e={}", path.display(), e)))?;

    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::IoError(format!("failed to write {}, e={}", path.display(), e)))?;

    sync_parent_dir(path);

    Ok(())
}

/// Replaces the content of an existing `path` with `bytes` using the
/// rename-write-delete sequence.
pub fn safe_replace(path: &Path, bytes: &[u8]) -> SnRst<()> {
    let backup = backup_path(path);

    if backup.exists() {
        return Err(Error::StoreBusy(SnPathBufToString!(backup)));
    }

    // 1. keep the current snapshot under the backup name
    fs::rename(path, &backup).map_err(|e| {
        Error::StoreUnavailable(format!(
            "failed to begin replace, path={}, e={}",
            path.display(),
            e
        ))
    })?;

    // 2. write the new snapshot
    if let Err(e) = create_new_file(path, bytes) {
        log::error!(
            "[comm_fs::safe_replace] write failed, restoring backup, path={}, e={}",
            path.display(),
            e
        );

        let _ = fs::remove_file(path);
        fs::rename(&backup, path).map_err(|re| {
            Error::StoreUnavailable(format!(
                "failed to restore backup, path={}, e={}",
                backup.display(),
                re
            ))
        })?;

        return Err(e);
    }

    // 3. the new snapshot is on disk, drop the backup
    fs::remove_file(&backup).map_err(|e| {
        Error::IoError(format!(
            "failed to remove backup, path={}, e={}",
            backup.display(),
            e
        ))
    })?;

    sync_parent_dir(path);

    log::debug!(
        "[comm_fs::safe_replace] replaced, path={}, bytes={}",
        path.display(),
        bytes.len()
    );

    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

//
// rename with retry
//

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: SnTimeDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 20,
            backoff: crate::SN_TIME_DURATION_MS!(250),
        }
    }
}

// a file held open by another process is reported as access denied
#[cfg(windows)]
fn is_access_denied_lock(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied
}

// EACCES, EPERM are permanent
#[cfg(not(windows))]
fn is_access_denied_lock(_e: &io::Error) -> bool {
    false
}

fn is_transient_busy(e: &io::Error) -> bool {
    if is_access_denied_lock(e) {
        return true;
    }

    match e.raw_os_error() {
        // EBUSY, ETXTBSY
        #[cfg(unix)]
        Some(16) | Some(26) => true,
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        #[cfg(windows)]
        Some(32) | Some(33) => true,
        _ => false,
    }
}

fn to_rename_err(from: &Path, to: &Path, e: io::Error) -> Error {
    let em = format!("from={}, to={}, e={}", from.display(), to.display(), e);
    if is_transient_busy(&e) {
        Error::TransientFileBusy(em)
    } else {
        Error::IoError(em)
    }
}

/// Renames `from` to `to`, retrying while the file is held by another
/// process. Never overwrites an existing `to`.
pub fn rename_with_retry(from: &Path, to: &Path, policy: RetryPolicy) -> SnRst<()> {
    rename_with_retry_by(from, to, policy, |from, to| fs::rename(from, to))
}

fn rename_with_retry_by<F>(
    from: &Path,
    to: &Path,
    policy: RetryPolicy,
    mut rename_fn: F,
) -> SnRst<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    if to.exists() {
        return Err(Error::InvalidPath(format!(
            "rename target already exists,{}",
            to.display()
        )));
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut last_err = String::new();

    for attempt in 1..=max_attempts {
        match rename_fn(from, to).map_err(|e| to_rename_err(from, to, e)) {
            Ok(()) => {
                log::debug!(
                    "[comm_fs::rename_with_retry] renamed, attempt={}, to={}",
                    attempt,
                    to.display()
                );
                return Ok(());
            }
            Err(Error::TransientFileBusy(em)) => {
                log::warn!(
                    "[comm_fs::rename_with_retry] file is busy, attempt={}/{}, {}",
                    attempt,
                    max_attempts,
                    em
                );
                last_err = em;

                if attempt < max_attempts {
                    std::thread::sleep(policy.backoff * attempt);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::RenameRetryExhausted(max_attempts, last_err))
}
