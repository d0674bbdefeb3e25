// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system access for the link reconciler.
//!
//! The reconciler never touches [`std::fs`] directly. Every query and
//! mutation it needs goes through [`LinkFs`], so its decisions can be checked
//! against a recording implementation without touching a real disk.

use crate::link::backup;

use std::{
    fs::{metadata, read_dir, read_link, remove_file, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// What currently sits at a path, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Nothing exists at the path.
    Absent,

    /// A symlink, dangling or not.
    Symlink,

    /// A real directory.
    Dir,

    /// A regular file, or anything else that is neither directory nor
    /// symlink.
    File,
}

impl EntryKind {
    /// Check if something exists at the path.
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// File system operations required by link reconciliation.
pub trait LinkFs {
    /// List entries of a directory, sorted by file name.
    fn list_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>>;

    /// Determine kind of entry at path without following symlinks.
    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind>;

    /// Check if path is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> std::io::Result<bool>;

    /// Read target of symlink.
    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf>;

    /// Remove symlink itself, never its target.
    fn remove_link(&self, path: &Path) -> std::io::Result<()>;

    /// Move entry at path to a fresh backup path, returning that path.
    fn back_up(&self, path: &Path) -> backup::Result<PathBuf>;

    /// Create directory along with any missing parents.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Create symlink at `link` pointing to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()>;
}

impl<F> LinkFs for &F
where
    F: LinkFs + ?Sized,
{
    fn list_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        (**self).list_dir(dir)
    }

    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind> {
        (**self).entry_kind(path)
    }

    fn is_dir(&self, path: &Path) -> std::io::Result<bool> {
        (**self).is_dir(path)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        (**self).read_link(path)
    }

    fn remove_link(&self, path: &Path) -> std::io::Result<()> {
        (**self).remove_link(path)
    }

    fn back_up(&self, path: &Path) -> backup::Result<PathBuf> {
        (**self).back_up(path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()> {
        (**self).symlink(target, link)
    }
}

/// Operate on the real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl LinkFs for RealFs {
    fn list_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(entries)
    }

    fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind> {
        match symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => Ok(EntryKind::Symlink),
            Ok(meta) if meta.is_dir() => Ok(EntryKind::Dir),
            Ok(_) => Ok(EntryKind::File),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(EntryKind::Absent),
            Err(err) => Err(err),
        }
    }

    fn is_dir(&self, path: &Path) -> std::io::Result<bool> {
        match metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
        read_link(path)
    }

    fn remove_link(&self, path: &Path) -> std::io::Result<()> {
        remove_file(path)
    }

    fn back_up(&self, path: &Path) -> backup::Result<PathBuf> {
        backup::back_up(path)
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        mkdirp::mkdirp(path)?;
        Ok(())
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()> {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }
}
