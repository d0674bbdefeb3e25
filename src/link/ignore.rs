// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Ignore rules for source entries.
//!
//! The source tree is a Git repository, so the natural place to declare what
//! should never be linked is gitignore itself. By default Dotlink asks Git
//! directly through `git check-ignore`, which means every gitignore source
//! Git knows about is honored: the repository's own ignore files, the global
//! excludes file, and `info/exclude`.
//!
//! A static pattern listing is available for source trees that are not under
//! Git, along with a matcher that ignores nothing at all.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::{
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, warn};

/// Entry names that are never linked, no matter what the predicate says.
pub const ALWAYS_EXCLUDED: &[&str] = &[".git"];

/// Check if entry name is excluded regardless of ignore rules.
pub fn is_always_excluded(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .is_some_and(|name| ALWAYS_EXCLUDED.iter().any(|excluded| name == *excluded))
}

/// Decide whether a source entry should be skipped.
pub trait IgnoreCheck {
    /// Check if path is ignored.
    fn is_ignored(&self, path: &Path) -> bool;
}

impl<I> IgnoreCheck for &I
where
    I: IgnoreCheck + ?Sized,
{
    fn is_ignored(&self, path: &Path) -> bool {
        (**self).is_ignored(path)
    }
}

impl IgnoreCheck for Box<dyn IgnoreCheck> {
    fn is_ignored(&self, path: &Path) -> bool {
        self.as_ref().is_ignored(path)
    }
}

/// Ask Git whether a path is ignored.
///
/// Runs `git check-ignore --quiet` from the parent directory of the path.
/// Exit status 0 means ignored. Any other outcome, including Git not being
/// installed or the path not being inside a repository, means not ignored.
#[derive(Debug, Clone)]
pub struct GitCheckIgnore {
    program: String,
}

impl GitCheckIgnore {
    /// Construct new Git ignore checker using `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Construct new Git ignore checker using a specific Git binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCheckIgnore {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreCheck for GitCheckIgnore {
    fn is_ignored(&self, path: &Path) -> bool {
        let mut command = Command::new(&self.program);
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            command.arg("-C").arg(parent);
        }

        let status = command
            .args(["check-ignore", "--quiet", "--"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => {
                debug!("git check-ignore {:?}: {status}", path.display());
                status.success()
            }
            Err(error) => {
                warn!("cannot run {:?}, treating {:?} as not ignored: {error}", self.program, path.display());
                false
            }
        }
    }
}

/// Match paths against static gitignore patterns.
///
/// Patterns are anchored at the source directory, so `/foo` only matches an
/// entry at the top of the source tree, while `foo` matches at any depth.
#[derive(Debug, Clone)]
pub struct PatternIgnore {
    matcher: Gitignore,
}

impl PatternIgnore {
    /// Construct new pattern matcher rooted at source directory.
    ///
    /// # Errors
    ///
    /// - Return [`IgnoreError::Pattern`] if a pattern is malformed.
    pub fn new(
        source_dir: impl AsRef<Path>,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(source_dir.as_ref());
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }

        Ok(Self {
            matcher: builder.build()?,
        })
    }
}

impl IgnoreCheck for PatternIgnore {
    fn is_ignored(&self, path: &Path) -> bool {
        self.matcher
            .matched_path_or_any_parents(path, path.is_dir())
            .is_ignore()
    }
}

/// Ignore nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverIgnore;

impl IgnoreCheck for NeverIgnore {
    fn is_ignored(&self, _: &Path) -> bool {
        false
    }
}

/// Ignore rule error types.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// Ignore pattern cannot be parsed.
    #[error(transparent)]
    Pattern(#[from] ignore::Error),
}

/// Friendly result alias :3
pub type Result<T, E = IgnoreError> = std::result::Result<T, E>;
