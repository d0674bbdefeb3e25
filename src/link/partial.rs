// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Partial directory handling.
//!
//! A __partial__ directory is a destination directory that must stay a real
//! directory, because it holds (or may come to hold) files that are not part
//! of the source tree. Instead of replacing it with one symlink, its contents
//! are linked one by one.
//!
//! Marking `~/a/b/c` as partial also makes `~/a/b` and `~/a` partial.
//! Otherwise `~/a` would be linked wholesale, and `~/a/b/c` would end up
//! inside the source tree instead of the destination tree. So the configured
//! listing is expanded once, before synchronization starts, into a set that
//! contains every ancestor of every configured entry up to the destination
//! root.

use crate::path::{normalize, resolve, ResolveError};

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// Effective set of partial directories.
///
/// # Invariant
///
/// - Closed under "ancestor of" for every configured entry, stopping below
///   the anchor directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartialSet {
    paths: HashSet<PathBuf>,
}

impl PartialSet {
    /// Construct empty partial set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand configured partial directories into effective partial set.
    ///
    /// Each configured path is inserted along with every ancestor that lies
    /// strictly inside the anchor, which is normally the destination root.
    /// A path that is not inside the anchor contributes all its ancestors
    /// except the file system root. Every path, anchor included, goes
    /// through [`resolve`], so `~` and relative paths are accepted.
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError`] if a path cannot be resolved.
    pub fn expand(
        configured: impl IntoIterator<Item = impl AsRef<Path>>,
        anchor: impl AsRef<Path>,
    ) -> Result<Self, ResolveError> {
        let anchor = resolve(anchor)?;
        let mut partials = Self::new();
        for path in configured {
            partials.insert(resolve(path)?, &anchor);
        }

        Ok(partials)
    }

    fn insert(&mut self, path: PathBuf, anchor: &Path) {
        let inside = path.starts_with(anchor);
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() || ancestor.parent().is_none() {
                break;
            }

            if inside && ancestor == anchor {
                break;
            }

            // INVARIANT: Stop early once an ancestor chain is already known.
            if !self.paths.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    /// Check if path is a partial directory.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(&normalize(path))
    }

    /// Number of effective partial directories.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if there are no partial directories.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate effective partial directories in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for PartialSet {
    /// Collect paths as-is, without ancestor expansion.
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().map(normalize).collect(),
        }
    }
}
