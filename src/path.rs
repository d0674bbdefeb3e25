// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Component, Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/dotlink/dotlink.toml` as
/// the default. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotlink").join("dotlink.toml"))
        .ok_or(NoWayHome)
}

/// Resolve user supplied path into an absolute path.
///
/// Performs shell expansion, so a leading `~` and environment variables are
/// replaced. The result is made absolute against the current working
/// directory, then normalized. Does not touch the file system, so symlinks
/// are left alone.
///
/// # Errors
///
/// - Return [`ResolveError::ShellExpansion`] if a variable cannot be
///   expanded.
/// - Return [`ResolveError::Absolute`] if current working directory cannot
///   be determined.
pub fn resolve(path: impl AsRef<Path>) -> Result<PathBuf, ResolveError> {
    let raw = path.as_ref().to_string_lossy();
    let expanded = PathBuf::from(shellexpand::full(&*raw)?.into_owned());
    let absolute = std::path::absolute(&expanded).map_err(|err| ResolveError::Absolute {
        source: err,
        path: expanded.clone(),
    })?;

    Ok(normalize(absolute))
}

/// Lexically normalize a path.
///
/// Drops `.` components and trailing separators. Does not touch the file
/// system, so `..` and symlinks are left alone.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref()
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Failed to perform shell expansion on path.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Path cannot be made absolute.
    #[error("cannot make {:?} absolute", path.display())]
    Absolute {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
