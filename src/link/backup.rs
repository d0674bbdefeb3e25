// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Timestamped backups of displaced files.
//!
//! Whenever something already exists at a path where a symlink must go, it
//! gets renamed out of the way instead of being deleted. The new name is the
//! original path plus a `.bak.<timestamp>` suffix, where the timestamp has
//! second granularity and is formatted as `YYYYMMDDThhmmss` so that sorting
//! backups by name also sorts them by age.
//!
//! If the suffixed path is already taken, e.g., two backups within the same
//! second, then the same suffix is appended again until a free path is found:
//!
//! ```text
//! .bashrc.bak.20250314T151234
//! .bashrc.bak.20250314T151234.bak.20250314T151234
//! ```
//!
//! Checking for a free path and renaming into it are two separate steps.
//! Dotlink is a single user tool that runs sequentially, so the race between
//! them is not guarded against.

use chrono::{Local, NaiveDateTime};
use std::{
    ffi::OsString,
    fs::{read_dir, rename, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf, MAIN_SEPARATOR},
};
use tracing::{debug, info, instrument};

/// Marker placed between original path and timestamp.
pub const BACKUP_MARKER: &str = ".bak.";

/// Format of timestamp placed after [`BACKUP_MARKER`].
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

const TIMESTAMP_LEN: usize = 15;

/// Determine free backup path for target path using current local time.
///
/// Target path should exist. Returned path does not exist at the moment of
/// checking.
pub fn backup_path(path: impl AsRef<Path>) -> PathBuf {
    backup_path_at(path, Local::now().naive_local())
}

/// Determine free backup path for target path using given timestamp.
pub fn backup_path_at(path: impl AsRef<Path>, timestamp: NaiveDateTime) -> PathBuf {
    let suffix = format!("{BACKUP_MARKER}{}", timestamp.format(TIMESTAMP_FORMAT));

    // INVARIANT: Strip one trailing separator so directories do not produce
    // "dir/.bak.<timestamp>".
    let mut candidate = path.as_ref().as_os_str().to_os_string();
    if let Some(stripped) = candidate
        .to_str()
        .and_then(|raw| raw.strip_suffix(MAIN_SEPARATOR))
        .filter(|raw| !raw.is_empty())
    {
        candidate = OsString::from(stripped);
    }

    loop {
        candidate.push(&suffix);
        if !occupied(Path::new(&candidate)) {
            return PathBuf::from(candidate);
        }
    }
}

/// Move target path to a fresh backup path.
///
/// Returns the backup path that target path was moved to.
///
/// # Errors
///
/// - Return [`BackupError::Missing`] if nothing exists at target path.
/// - Return [`BackupError::Rename`] if target path cannot be moved.
#[instrument(skip(path), level = "debug")]
pub fn back_up(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let backup = backup_path(path);
    rename(path, &backup).map_err(|err| match err.kind() {
        ErrorKind::NotFound => BackupError::Missing {
            path: path.to_path_buf(),
        },
        _ => BackupError::Rename {
            source: err,
            from: path.to_path_buf(),
            to: backup.clone(),
        },
    })?;
    info!("backed up {:?} to {:?}", path.display(), backup.display());

    Ok(backup)
}

/// Recover original path from backup path.
///
/// Strips every trailing `.bak.<timestamp>` suffix.
///
/// # Errors
///
/// - Return [`BackupError::NotABackup`] if path carries no backup suffix.
pub fn original_path(backup: impl AsRef<Path>) -> Result<PathBuf> {
    let backup = backup.as_ref();
    let not_a_backup = || BackupError::NotABackup {
        path: backup.to_path_buf(),
    };

    let mut raw = backup.to_str().ok_or_else(not_a_backup)?;
    let mut stripped = false;
    while let Some(rest) = strip_backup_suffix(raw) {
        raw = rest;
        stripped = true;
    }

    if !stripped || raw.is_empty() {
        return Err(not_a_backup());
    }

    Ok(PathBuf::from(raw))
}

/// Find most recent backup of target path.
///
/// Backups live next to their original, so only the parent directory of
/// target path is searched.
///
/// # Errors
///
/// - Return [`BackupError::ReadDir`] if parent directory cannot be listed.
pub fn most_recent_backup(original: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let original = original.as_ref();
    let parent = match original.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let read_err = |err| BackupError::ReadDir {
        source: err,
        path: parent.to_path_buf(),
    };

    let Some(name) = original.file_name() else {
        return Ok(None);
    };

    let mut newest: Option<OsString> = None;
    for entry in read_dir(parent).map_err(read_err)? {
        let candidate = entry.map_err(read_err)?.file_name();
        let is_backup = original_path(&candidate)
            .map(|path| path.as_os_str() == name)
            .unwrap_or(false);
        if is_backup && newest.as_ref().is_none_or(|newest| candidate > *newest) {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|name| original.with_file_name(name)))
}

/// Restore most recent backup of target path.
///
/// A symlink sitting at target path is removed first, since that is what
/// synchronization put there. Anything else at target path is left alone,
/// and the restore is refused.
///
/// Returns the backup path that was moved back into place.
///
/// # Errors
///
/// - Return [`BackupError::Metadata`] if target path cannot be inspected.
/// - Return [`BackupError::NoBackup`] if no backup exists.
/// - Return [`BackupError::Occupied`] if target path exists and is not a
///   symlink.
/// - Return [`BackupError::RemoveLink`] if symlink cannot be removed.
/// - Return [`BackupError::Rename`] if backup cannot be moved back.
#[instrument(skip(original), level = "debug")]
pub fn restore(original: impl AsRef<Path>) -> Result<PathBuf> {
    let original = original.as_ref();
    let existing = match symlink_metadata(original) {
        Ok(meta) => Some(meta.file_type().is_symlink()),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            return Err(BackupError::Metadata {
                source: err,
                path: original.to_path_buf(),
            })
        }
    };

    let backup = most_recent_backup(original)?.ok_or_else(|| BackupError::NoBackup {
        path: original.to_path_buf(),
    })?;

    match existing {
        Some(true) => {
            info!("remove symlink {:?}", original.display());
            std::fs::remove_file(original).map_err(|err| BackupError::RemoveLink {
                source: err,
                path: original.to_path_buf(),
            })?;
        }
        Some(false) => {
            return Err(BackupError::Occupied {
                path: original.to_path_buf(),
            })
        }
        None => debug!("nothing at {:?}", original.display()),
    }

    info!("restore {:?} to {:?}", backup.display(), original.display());
    rename(&backup, original).map_err(|err| BackupError::Rename {
        source: err,
        from: backup.clone(),
        to: original.to_path_buf(),
    })?;

    Ok(backup)
}

fn strip_backup_suffix(raw: &str) -> Option<&str> {
    let split = raw.len().checked_sub(BACKUP_MARKER.len() + TIMESTAMP_LEN)?;
    let rest = raw.get(..split)?;
    let timestamp = raw.get(split..)?.strip_prefix(BACKUP_MARKER)?;
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;

    Some(rest)
}

fn occupied(path: &Path) -> bool {
    symlink_metadata(path).is_ok()
}

/// Backup error types.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Entry cannot be moved.
    #[error("failed to move {:?} to {:?}", from.display(), to.display())]
    Rename {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Nothing exists at path to back up.
    #[error("nothing to back up at {:?}", path.display())]
    Missing { path: PathBuf },

    /// Path cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Metadata {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Path carries no backup suffix.
    #[error("{:?} is not a backup path", path.display())]
    NotABackup { path: PathBuf },

    /// No backup exists for path.
    #[error("no backup found for {:?}", path.display())]
    NoBackup { path: PathBuf },

    /// Restore would overwrite something that is not a symlink.
    #[error("refusing to restore over existing non-symlink {:?}", path.display())]
    Occupied { path: PathBuf },

    /// Directory holding backups cannot be listed.
    #[error("failed to list backups in {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Symlink in the way of restore cannot be removed.
    #[error("failed to remove symlink {:?}", path.display())]
    RemoveLink {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = BackupError> = std::result::Result<T, E>;
