// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative symlink farm for dotfiles.
//!
//! Dotlink reconciles a version-controlled __source tree__ against a
//! __destination tree__ (usually the user's home directory) by way of
//! symbolic links. Every entry at the top of the source tree becomes a symlink
//! in the destination tree, unless the destination is marked as a
//! __partial__ directory. Partial directories are kept as real directories so
//! that files not under version control can live next to linked ones. Their
//! contents are linked one by one instead.
//!
//! Anything already sitting where a link must go is renamed to a timestamped
//! backup first. Nothing is ever deleted outright, except symlinks that point
//! somewhere else. Synchronization is idempotent, so an interrupted run can
//! simply be repeated.
//!
//! # See Also
//!
//! 1. [`Linker`](crate::link::Linker)
//! 2. [`PartialSet`](crate::link::partial::PartialSet)
//! 3. [`backup`](crate::link::backup)

pub mod config;
pub mod link;
pub mod path;

pub use config::{ConfigDefinition, IgnoreMode, SyncSettings};
pub use link::{synchronize, Linker, Summary};
