// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Link reconciliation.
//!
//! The __linker__ makes a destination tree mirror a source tree through
//! symbolic links. It walks the source tree depth-first, and decides for each
//! entry what to do with the matching destination path:
//!
//! 1. Ignored entry? Skip it entirely.
//! 2. Destination is a symlink that already points at the entry? Nothing to
//!    do. Points somewhere else? Remove the stale symlink.
//! 3. Destination exists, and is not a partial directory? Back it up.
//! 4. Destination is a partial directory? Make sure it exists as a real
//!    directory, and repeat this whole procedure for every entry inside the
//!    source directory.
//! 5. Otherwise, symlink destination to entry.
//!
//! Every decision depends only on the entry, its destination, the partial
//! set, and the ignore rules. So running synchronization twice in a row does
//! nothing the second time, and a run that failed part way through can just
//! be repeated.
//!
//! # See Also
//!
//! 1. [`backup`]
//! 2. [`partial`]
//! 3. [`ignore`]

pub mod backup;
pub mod fs;
pub mod ignore;
pub mod partial;

use crate::{
    link::{
        fs::{EntryKind, LinkFs, RealFs},
        ignore::{is_always_excluded, GitCheckIgnore, IgnoreCheck},
        partial::PartialSet,
    },
    path::normalize,
};

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Synchronize destination tree with source tree on the real file system.
///
/// Ignored entries are detected through `git check-ignore`.
///
/// # Errors
///
/// - Return [`LinkError`] on the first file system or configuration error.
pub fn synchronize(
    source_root: impl AsRef<Path>,
    destination_root: impl AsRef<Path>,
    partials: PartialSet,
) -> Result<Summary> {
    Linker::new(partials).synchronize(source_root, destination_root)
}

/// Symlink reconciler.
///
/// Holds everything that stays fixed during a synchronization run: the file
/// system to operate on, the ignore rules, the effective partial set, and
/// pointers remapping source entries to other destination paths.
#[derive(Debug)]
pub struct Linker<I = GitCheckIgnore, F = RealFs>
where
    I: IgnoreCheck,
    F: LinkFs,
{
    fs: F,
    ignore: I,
    partials: PartialSet,
    pointers: BTreeMap<PathBuf, PathBuf>,
}

impl Linker {
    /// Construct new linker over real file system that asks Git about
    /// ignored entries.
    pub fn new(partials: PartialSet) -> Self {
        Self::with_parts(RealFs, GitCheckIgnore::new(), partials)
    }
}

impl<I, F> Linker<I, F>
where
    I: IgnoreCheck,
    F: LinkFs,
{
    /// Construct new linker from its parts.
    pub fn with_parts(fs: F, ignore: I, partials: PartialSet) -> Self {
        Self {
            fs,
            ignore,
            partials,
            pointers: BTreeMap::new(),
        }
    }

    /// Remap source entries to other destination paths.
    ///
    /// Keys are relative to the source root, and values are relative to the
    /// destination root.
    pub fn with_pointers(
        mut self,
        pointers: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<PathBuf>)>,
    ) -> Self {
        self.pointers = pointers
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        self
    }

    /// Effective partial set used by this linker.
    pub fn partials(&self) -> &PartialSet {
        &self.partials
    }

    /// Synchronize destination tree with source tree.
    ///
    /// Entries are processed in file name order. Stops at the first error,
    /// leaving work done so far in place. Relative roots are made absolute
    /// against the current working directory.
    ///
    /// Returns a tally of what was done.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Absolute`] if a root cannot be made absolute.
    /// - Return [`LinkError::PartialIsFile`] if a partial destination maps to
    ///   a source that is not a directory.
    /// - Return [`LinkError::PartialOccupied`] if a partial destination
    ///   exists as a file.
    /// - Return any other [`LinkError`] if a file system operation fails.
    #[instrument(skip(self, source_root, destination_root), level = "debug")]
    pub fn synchronize(
        &self,
        source_root: impl AsRef<Path>,
        destination_root: impl AsRef<Path>,
    ) -> Result<Summary> {
        let source_root = absolute(source_root.as_ref())?;
        let destination_root = absolute(destination_root.as_ref())?;
        info!(
            "synchronize {:?} -> {:?}",
            source_root.display(),
            destination_root.display()
        );

        let roots = Roots {
            source: &source_root,
            destination: &destination_root,
        };
        let mut summary = Summary::default();
        self.link_dir(&roots, &mut summary, &source_root, &destination_root)?;
        info!(
            "{} linked, {} backed up, {} unchanged, {} ignored",
            summary.linked, summary.backed_up, summary.unchanged, summary.ignored
        );

        Ok(summary)
    }

    fn link_dir(
        &self,
        roots: &Roots<'_>,
        summary: &mut Summary,
        source_dir: &Path,
        destination_dir: &Path,
    ) -> Result<()> {
        let entries = self.fs.list_dir(source_dir).map_err(|err| LinkError::ReadDir {
            source: err,
            path: source_dir.to_path_buf(),
        })?;

        for source in entries {
            let Some(name) = source.file_name() else {
                continue;
            };

            let destination = self.destination_for(roots, &source, destination_dir.join(name));
            let action = self.link_entry(roots, summary, &source, &destination)?;
            summary.record(action);
        }

        Ok(())
    }

    fn destination_for(&self, roots: &Roots<'_>, source: &Path, default: PathBuf) -> PathBuf {
        source
            .strip_prefix(roots.source)
            .ok()
            .and_then(|relative| self.pointers.get(relative))
            .map(|pointer| {
                let destination = roots.destination.join(pointer);
                debug!(
                    "{:?} points to {:?}",
                    source.display(),
                    destination.display()
                );
                destination
            })
            .unwrap_or(default)
    }

    /// Reconcile one source entry with its destination path.
    ///
    /// Returns the action taken.
    fn link_entry(
        &self,
        roots: &Roots<'_>,
        summary: &mut Summary,
        source: &Path,
        destination: &Path,
    ) -> Result<LinkAction> {
        if is_always_excluded(source) || self.ignore.is_ignored(source) {
            debug!("{:?} is ignored", source.display());
            return Ok(LinkAction::Ignored);
        }

        let mut kind = self.entry_kind(destination)?;

        if kind == EntryKind::Symlink {
            let current = self.fs.read_link(destination).map_err(|err| LinkError::ReadLink {
                source: err,
                path: destination.to_path_buf(),
            })?;

            if current == source {
                debug!(
                    "{:?} already points to {:?}",
                    destination.display(),
                    source.display()
                );
                return Ok(LinkAction::AlreadyLinked);
            }

            info!(
                "remove stale symlink {:?} -> {:?}",
                destination.display(),
                current.display()
            );
            self.fs.remove_link(destination).map_err(|err| LinkError::RemoveLink {
                source: err,
                path: destination.to_path_buf(),
            })?;
            kind = EntryKind::Absent;
        }

        if self.partials.contains(destination) {
            return self.link_partial(roots, summary, source, destination, kind);
        }

        let backed_up = kind.exists();
        if backed_up {
            self.fs.back_up(destination)?;
        }

        self.ensure_parent(destination)?;
        info!(
            "symlink {:?} -> {:?}",
            destination.display(),
            source.display()
        );
        self.fs.symlink(source, destination).map_err(|err| LinkError::Symlink {
            source: err,
            target: source.to_path_buf(),
            link: destination.to_path_buf(),
        })?;

        Ok(LinkAction::Linked { backed_up })
    }

    fn link_partial(
        &self,
        roots: &Roots<'_>,
        summary: &mut Summary,
        source: &Path,
        destination: &Path,
        kind: EntryKind,
    ) -> Result<LinkAction> {
        debug!("{:?} is partial, linking its contents", destination.display());

        // INVARIANT: Never link a file over a directory declared partial.
        let is_dir = self.fs.is_dir(source).map_err(|err| LinkError::Metadata {
            source: err,
            path: source.to_path_buf(),
        })?;
        if !is_dir {
            return Err(LinkError::PartialIsFile {
                source_path: source.to_path_buf(),
                destination_path: destination.to_path_buf(),
            });
        }

        match kind {
            EntryKind::Dir => {}
            EntryKind::Absent => {
                info!("create partial directory {:?}", destination.display());
                self.create_dir_all(destination)?;
            }
            EntryKind::File | EntryKind::Symlink => {
                return Err(LinkError::PartialOccupied {
                    destination_path: destination.to_path_buf(),
                });
            }
        }

        self.link_dir(roots, summary, source, destination)?;

        Ok(LinkAction::Recursed)
    }

    fn ensure_parent(&self, destination: &Path) -> Result<()> {
        match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                if self.entry_kind(parent)? == EntryKind::Absent {
                    debug!("create parent directory {:?}", parent.display());
                    self.create_dir_all(parent)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn entry_kind(&self, path: &Path) -> Result<EntryKind> {
        self.fs.entry_kind(path).map_err(|err| LinkError::Metadata {
            source: err,
            path: path.to_path_buf(),
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.fs.create_dir_all(path).map_err(|err| LinkError::CreateDir {
            source: err,
            path: path.to_path_buf(),
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map(normalize)
        .map_err(|err| LinkError::Absolute {
            source: err,
            path: path.to_path_buf(),
        })
}

/// Tally of what one synchronization run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Symlinks created.
    pub linked: usize,

    /// Existing entries moved to backups before linking.
    pub backed_up: usize,

    /// Symlinks that already pointed at their source.
    pub unchanged: usize,

    /// Source entries skipped by ignore rules.
    pub ignored: usize,

    /// Partial directories descended into.
    pub partials: usize,
}

impl Summary {
    fn record(&mut self, action: LinkAction) {
        match action {
            LinkAction::Ignored => self.ignored += 1,
            LinkAction::AlreadyLinked => self.unchanged += 1,
            LinkAction::Recursed => self.partials += 1,
            LinkAction::Linked { backed_up } => {
                self.linked += 1;
                if backed_up {
                    self.backed_up += 1;
                }
            }
        }
    }
}

/// Roots of the current synchronization run.
struct Roots<'a> {
    source: &'a Path,
    destination: &'a Path,
}

/// Outcome of reconciling one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkAction {
    Ignored,
    AlreadyLinked,
    Recursed,
    Linked { backed_up: bool },
}

/// Link reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Root directory cannot be made absolute.
    #[error("cannot make {:?} absolute", path.display())]
    Absolute {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Destination is partial, but source is not a directory.
    #[error(
        "partial directory expected at {:?}, but source {:?} is not a directory",
        destination_path.display(),
        source_path.display()
    )]
    PartialIsFile {
        source_path: PathBuf,
        destination_path: PathBuf,
    },

    /// Destination is partial, but a file sits where the directory should be.
    #[error(
        "partial directory expected at {:?}, but a file is in the way",
        destination_path.display()
    )]
    PartialOccupied { destination_path: PathBuf },

    /// Source directory cannot be listed.
    #[error("failed to list directory {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Path cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Metadata {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Symlink target cannot be read.
    #[error("failed to read symlink {:?}", path.display())]
    ReadLink {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Stale symlink cannot be removed.
    #[error("failed to remove symlink {:?}", path.display())]
    RemoveLink {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Symlink cannot be created.
    #[error("failed to symlink {:?} -> {:?}", link.display(), target.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
        link: PathBuf,
    },

    /// Existing entry cannot be backed up.
    #[error(transparent)]
    Backup(#[from] crate::link::backup::BackupError),
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{backup, ignore::NeverIgnore};
    use pretty_assertions::assert_eq;
    use std::{
        cell::RefCell,
        collections::{BTreeMap, HashSet},
        io::{Error, ErrorKind},
    };

    /// Recorded file system mutation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        RemoveLink(PathBuf),
        BackUp(PathBuf),
        CreateDirAll(PathBuf),
        Symlink(PathBuf, PathBuf),
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Node {
        File,
        Dir,
        Link(PathBuf),
    }

    /// In-memory file system that records every mutation.
    #[derive(Debug, Default)]
    struct MockFs {
        nodes: RefCell<BTreeMap<PathBuf, Node>>,
        calls: RefCell<Vec<Call>>,
    }

    impl MockFs {
        fn with(nodes: impl IntoIterator<Item = (&'static str, Node)>) -> Self {
            let fs = Self::default();
            fs.nodes
                .borrow_mut()
                .extend(nodes.into_iter().map(|(path, node)| (PathBuf::from(path), node)));
            fs
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn node(&self, path: &str) -> Option<Node> {
            self.nodes.borrow().get(Path::new(path)).cloned()
        }

        /// Follow symlinks until a non-link path is reached.
        fn follow(&self, path: &Path) -> PathBuf {
            let nodes = self.nodes.borrow();
            let mut current = path.to_path_buf();
            while let Some(Node::Link(target)) = nodes.get(&current) {
                current = target.clone();
            }
            current
        }
    }

    impl LinkFs for MockFs {
        fn list_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
            let real = self.follow(dir);
            match self.nodes.borrow().get(&real) {
                Some(Node::Dir) => {}
                _ => return Err(Error::from(ErrorKind::NotFound)),
            }

            Ok(self
                .nodes
                .borrow()
                .keys()
                .filter(|path| path.parent() == Some(real.as_path()))
                .filter_map(|path| path.file_name().map(|name| dir.join(name)))
                .collect())
        }

        fn entry_kind(&self, path: &Path) -> std::io::Result<EntryKind> {
            Ok(match self.nodes.borrow().get(path) {
                None => EntryKind::Absent,
                Some(Node::File) => EntryKind::File,
                Some(Node::Dir) => EntryKind::Dir,
                Some(Node::Link(_)) => EntryKind::Symlink,
            })
        }

        fn is_dir(&self, path: &Path) -> std::io::Result<bool> {
            let real = self.follow(path);
            Ok(matches!(self.nodes.borrow().get(&real), Some(Node::Dir)))
        }

        fn read_link(&self, path: &Path) -> std::io::Result<PathBuf> {
            match self.nodes.borrow().get(path) {
                Some(Node::Link(target)) => Ok(target.clone()),
                _ => Err(Error::from(ErrorKind::InvalidInput)),
            }
        }

        fn remove_link(&self, path: &Path) -> std::io::Result<()> {
            self.calls.borrow_mut().push(Call::RemoveLink(path.into()));
            self.nodes.borrow_mut().remove(path);
            Ok(())
        }

        fn back_up(&self, path: &Path) -> backup::Result<PathBuf> {
            self.calls.borrow_mut().push(Call::BackUp(path.into()));
            let mut nodes = self.nodes.borrow_mut();
            let backup = PathBuf::from(format!("{}.bak.20150101T010101", path.display()));
            let moved = nodes
                .keys()
                .filter(|key| key.starts_with(path))
                .cloned()
                .collect::<Vec<_>>();
            for key in moved {
                let node = nodes.remove(&key).unwrap();
                let relative = key.strip_prefix(path).unwrap();
                let new_key = if relative.as_os_str().is_empty() {
                    backup.clone()
                } else {
                    backup.join(relative)
                };
                nodes.insert(new_key, node);
            }
            Ok(backup)
        }

        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            self.calls.borrow_mut().push(Call::CreateDirAll(path.into()));
            let mut nodes = self.nodes.borrow_mut();
            for ancestor in path.ancestors() {
                nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
            }
            Ok(())
        }

        fn symlink(&self, target: &Path, link: &Path) -> std::io::Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Symlink(target.into(), link.into()));
            self.nodes
                .borrow_mut()
                .insert(link.into(), Node::Link(target.into()));
            Ok(())
        }
    }

    /// Ignore exactly the listed paths, counting how often it gets asked.
    #[derive(Debug, Default)]
    struct ListIgnore {
        ignored: HashSet<PathBuf>,
        asked: RefCell<Vec<PathBuf>>,
    }

    impl ListIgnore {
        fn new(paths: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                ignored: paths.into_iter().map(PathBuf::from).collect(),
                asked: RefCell::default(),
            }
        }
    }

    impl IgnoreCheck for ListIgnore {
        fn is_ignored(&self, path: &Path) -> bool {
            self.asked.borrow_mut().push(path.into());
            self.ignored.contains(path)
        }
    }

    fn partials(paths: impl IntoIterator<Item = &'static str>) -> PartialSet {
        PartialSet::expand(paths, "/home").unwrap()
    }

    fn src_tree() -> Vec<(&'static str, Node)> {
        vec![("/src", Node::Dir), ("/home", Node::Dir)]
    }

    #[test]
    fn link_into_empty_destination() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![Call::Symlink("/src/.bashrc".into(), "/home/.bashrc".into())]
        );

        Ok(())
    }

    #[test]
    fn correct_symlink_is_left_alone() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        nodes.push(("/home/.bashrc", Node::Link("/src/.bashrc".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(fs.calls(), Vec::new());

        Ok(())
    }

    #[test]
    fn stale_symlink_is_replaced() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        nodes.push(("/home/.bashrc", Node::Link("/elsewhere/.bashrc".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::RemoveLink("/home/.bashrc".into()),
                Call::Symlink("/src/.bashrc".into(), "/home/.bashrc".into()),
            ]
        );

        Ok(())
    }

    #[test]
    fn existing_file_is_backed_up_before_linking() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        nodes.push(("/home/.bashrc", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::BackUp("/home/.bashrc".into()),
                Call::Symlink("/src/.bashrc".into(), "/home/.bashrc".into()),
            ]
        );
        assert_eq!(fs.node("/home/.bashrc.bak.20150101T010101"), Some(Node::File));

        Ok(())
    }

    #[test]
    fn existing_directory_is_backed_up_when_not_partial() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.vim", Node::Dir));
        nodes.push(("/src/.vim/vimrc", Node::File));
        nodes.push(("/home/.vim", Node::Dir));
        nodes.push(("/home/.vim/old", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::BackUp("/home/.vim".into()),
                Call::Symlink("/src/.vim".into(), "/home/.vim".into()),
            ]
        );
        assert_eq!(
            fs.node("/home/.vim.bak.20150101T010101/old"),
            Some(Node::File)
        );

        Ok(())
    }

    #[test]
    fn ignored_entry_is_untouched() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.DS_Store", Node::File));
        nodes.push(("/src/.git", Node::Dir));
        nodes.push(("/home/.DS_Store", Node::File));
        let fs = MockFs::with(nodes);
        let ignore = ListIgnore::new(["/src/.DS_Store"]);
        let linker = Linker::with_parts(&fs, &ignore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(fs.calls(), Vec::new());
        assert_eq!(fs.node("/home/.DS_Store"), Some(Node::File));
        assert_eq!(*ignore.asked.borrow(), vec![PathBuf::from("/src/.DS_Store")]);

        Ok(())
    }

    #[test]
    fn ignore_is_asked_once_per_top_level_entry() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.vim", Node::Dir));
        nodes.push(("/src/.vim/vimrc", Node::File));
        nodes.push(("/src/.vim/colors", Node::Dir));
        let fs = MockFs::with(nodes);
        let ignore = ListIgnore::default();
        let linker = Linker::with_parts(&fs, &ignore, PartialSet::new());

        linker.synchronize("/src", "/home")?;

        assert_eq!(*ignore.asked.borrow(), vec![PathBuf::from("/src/.vim")]);

        Ok(())
    }

    #[test]
    fn partial_directory_is_created_and_recursed() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app", Node::Dir));
        nodes.push(("/src/.config/app/settings.toml", Node::File));
        nodes.push(("/src/.config/other", Node::Dir));
        let fs = MockFs::with(nodes);
        let ignore = ListIgnore::default();
        let linker = Linker::with_parts(&fs, &ignore, partials(["/home/.config/app"]));

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::CreateDirAll("/home/.config".into()),
                Call::CreateDirAll("/home/.config/app".into()),
                Call::Symlink(
                    "/src/.config/app/settings.toml".into(),
                    "/home/.config/app/settings.toml".into()
                ),
                Call::Symlink("/src/.config/other".into(), "/home/.config/other".into()),
            ]
        );
        assert_eq!(
            *ignore.asked.borrow(),
            vec![
                PathBuf::from("/src/.config"),
                PathBuf::from("/src/.config/app"),
                PathBuf::from("/src/.config/app/settings.toml"),
                PathBuf::from("/src/.config/other"),
            ]
        );

        Ok(())
    }

    #[test]
    fn partial_directory_that_exists_is_not_backed_up() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app.toml", Node::File));
        nodes.push(("/home/.config", Node::Dir));
        nodes.push(("/home/.config/untracked", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![Call::Symlink(
                "/src/.config/app.toml".into(),
                "/home/.config/app.toml".into()
            )]
        );
        assert_eq!(fs.node("/home/.config/untracked"), Some(Node::File));

        Ok(())
    }

    #[test]
    fn partial_with_source_file_fails() {
        let mut nodes = src_tree();
        nodes.push(("/src/.config", Node::File));
        nodes.push(("/home/.config", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        let result = linker.synchronize("/src", "/home");

        assert!(matches!(result, Err(LinkError::PartialIsFile { .. })));
        assert_eq!(fs.calls(), Vec::new());
    }

    #[test]
    fn partial_with_destination_file_fails() {
        let mut nodes = src_tree();
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app.toml", Node::File));
        nodes.push(("/home/.config", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        let result = linker.synchronize("/src", "/home");

        assert!(matches!(result, Err(LinkError::PartialOccupied { .. })));
        assert_eq!(fs.calls(), Vec::new());
        assert_eq!(fs.node("/home/.config"), Some(Node::File));
    }

    #[test]
    fn stale_symlink_at_partial_is_replaced_by_directory() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app.toml", Node::File));
        nodes.push(("/home/.config", Node::Link("/old/.config".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::RemoveLink("/home/.config".into()),
                Call::CreateDirAll("/home/.config".into()),
                Call::Symlink(
                    "/src/.config/app.toml".into(),
                    "/home/.config/app.toml".into()
                ),
            ]
        );

        Ok(())
    }

    #[test]
    fn second_run_changes_nothing() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app.toml", Node::File));
        nodes.push(("/home/.bashrc", Node::File));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        linker.synchronize("/src", "/home")?;
        let first = fs.calls();
        let state = fs.nodes.borrow().clone();

        linker.synchronize("/src", "/home")?;

        assert_eq!(fs.calls(), first);
        assert_eq!(*fs.nodes.borrow(), state);

        Ok(())
    }

    #[test]
    fn pointer_remaps_destination() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/sublime_text", Node::Dir));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new())
            .with_pointers([("sublime_text", "Library/Sublime/User")]);

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::CreateDirAll("/home/Library/Sublime".into()),
                Call::Symlink(
                    "/src/sublime_text".into(),
                    "/home/Library/Sublime/User".into()
                ),
            ]
        );

        Ok(())
    }

    #[test]
    fn link_entry_reports_action() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/a", Node::File));
        nodes.push(("/home/a", Node::Link("/src/a".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, PartialSet::new());
        let roots = Roots {
            source: Path::new("/src"),
            destination: Path::new("/home"),
        };

        let mut summary = Summary::default();

        let result =
            linker.link_entry(&roots, &mut summary, Path::new("/src/a"), Path::new("/home/a"))?;
        assert_eq!(result, LinkAction::AlreadyLinked);

        let result =
            linker.link_entry(&roots, &mut summary, Path::new("/src/.git"), Path::new("/home/.git"))?;
        assert_eq!(result, LinkAction::Ignored);

        Ok(())
    }

    #[test]
    fn summary_tallies_every_action() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/src/.bashrc", Node::File));
        nodes.push(("/src/.config", Node::Dir));
        nodes.push(("/src/.config/app.toml", Node::File));
        nodes.push(("/src/.git", Node::Dir));
        nodes.push(("/src/.vimrc", Node::File));
        nodes.push(("/home/.bashrc", Node::File));
        nodes.push(("/home/.vimrc", Node::Link("/src/.vimrc".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        let result = linker.synchronize("/src", "/home")?;
        let expect = Summary {
            linked: 2,
            backed_up: 1,
            unchanged: 1,
            ignored: 1,
            partials: 1,
        };
        assert_eq!(result, expect);

        let result = linker.synchronize("/src", "/home")?;
        let expect = Summary {
            linked: 0,
            backed_up: 0,
            unchanged: 3,
            ignored: 1,
            partials: 1,
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn partial_source_may_be_symlink_to_directory() -> anyhow::Result<()> {
        let mut nodes = src_tree();
        nodes.push(("/shared", Node::Dir));
        nodes.push(("/shared/cfg", Node::Dir));
        nodes.push(("/shared/cfg/app.toml", Node::File));
        nodes.push(("/src/.config", Node::Link("/shared/cfg".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        linker.synchronize("/src", "/home")?;

        assert_eq!(
            fs.calls(),
            vec![
                Call::CreateDirAll("/home/.config".into()),
                Call::Symlink(
                    "/src/.config/app.toml".into(),
                    "/home/.config/app.toml".into()
                ),
            ]
        );

        Ok(())
    }

    #[test]
    fn partial_source_symlink_to_file_fails() {
        let mut nodes = src_tree();
        nodes.push(("/shared", Node::Dir));
        nodes.push(("/shared/cfg", Node::File));
        nodes.push(("/src/.config", Node::Link("/shared/cfg".into())));
        let fs = MockFs::with(nodes);
        let linker = Linker::with_parts(&fs, NeverIgnore, partials(["/home/.config"]));

        let result = linker.synchronize("/src", "/home");

        assert!(matches!(result, Err(LinkError::PartialIsFile { .. })));
        assert_eq!(fs.calls(), Vec::new());
    }
}
