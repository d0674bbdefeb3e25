// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the configuration file that Dotlink uses to simplify
//! the process of serialization and deserialization. Reading the main
//! configuration file is left to the caller, but the optional partials file
//! it references is read here. Settings also know how to assemble the
//! [`Linker`] they describe.

use crate::{
    link::{
        fs::RealFs,
        ignore::{GitCheckIgnore, IgnoreCheck, IgnoreError, NeverIgnore, PatternIgnore},
        partial::PartialSet,
        Linker,
    },
    path::{resolve, ResolveError},
};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Configuration file layout.
///
/// # General Layout
///
/// The configuration is composed of two parts: settings and pointers. The
/// settings section defines where the source tree lives, where it should be
/// linked to, which destination directories are partial, and how ignored
/// entries are detected. The pointers section optionally remaps entries of
/// the source tree to a different spot in the destination tree.
///
/// ```toml
/// [settings]
/// source_directory = "~/setup/HOME"
/// destination_directory = "~"
/// partials = ["~/.config"]
/// ignore = "git"
///
/// [pointers]
/// sublime_text = "Library/Application Support/Sublime Text 3/Packages/User"
/// ```
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConfigDefinition {
    /// Settings for synchronization.
    pub settings: SyncSettings,

    /// Remap source entries to other destination paths.
    ///
    /// Keys are relative to the source directory, values relative to the
    /// destination directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pointers: BTreeMap<String, PathBuf>,
}

impl ConfigDefinition {
    /// Load configuration file from target path.
    ///
    /// Also pulls in the partials file if the settings name one.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadFile`] if configuration cannot be read.
    /// - Return [`ConfigError::ReadPartialsFile`] if the partials file cannot
    ///   be read.
    /// - Return [`ConfigError::Deserialize`] or [`ConfigError::Resolve`] if
    ///   parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_to_string(path).map_err(|err| ConfigError::ReadFile {
            source: err,
            path: path.to_path_buf(),
        })?;

        let mut definition: ConfigDefinition = data.parse()?;
        definition.settings.merge_partials_file()?;

        Ok(definition)
    }

    /// Assemble linker described by this configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Resolve`] if a partial directory cannot be
    ///   resolved.
    /// - Return [`ConfigError::Ignore`] if an ignore pattern is malformed.
    pub fn linker(&self) -> Result<Linker<Box<dyn IgnoreCheck>, RealFs>> {
        Ok(Linker::with_parts(
            RealFs,
            self.settings.ignore_check()?,
            self.settings.partial_set()?,
        )
        .with_pointers(self.pointers.clone()))
    }
}

impl FromStr for ConfigDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: ConfigDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Every path field is absolute after shell expansion.
        let settings = &mut definition.settings;
        settings.source_directory = expand(&settings.source_directory)?;
        settings.destination_directory = expand(&settings.destination_directory)?;
        settings.partials = settings
            .partials
            .iter()
            .map(expand)
            .collect::<Result<Vec<_>>>()?;
        settings.partials_file = settings.partials_file.as_ref().map(expand).transpose()?;

        Ok(definition)
    }
}

impl Display for ConfigDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Synchronization settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Version-controlled tree to link from.
    pub source_directory: PathBuf,

    /// Tree to place symlinks in.
    pub destination_directory: PathBuf,

    /// Destination directories that are never replaced by a single symlink.
    #[serde(default)]
    pub partials: Vec<PathBuf>,

    /// File listing additional partial directories, one per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partials_file: Option<PathBuf>,

    /// How ignored source entries are detected.
    #[serde(default)]
    pub ignore: IgnoreMode,

    /// Gitignore style patterns used by [`IgnoreMode::Patterns`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,
}

impl SyncSettings {
    /// Append partials listed in partials file to partials listing.
    ///
    /// Does nothing if no partials file is configured.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadPartialsFile`] if partials file cannot be
    ///   read.
    /// - Return [`ConfigError::Resolve`] if an entry cannot be resolved.
    pub fn merge_partials_file(&mut self) -> Result<()> {
        let Some(path) = &self.partials_file else {
            return Ok(());
        };

        let data = read_to_string(path).map_err(|err| ConfigError::ReadPartialsFile {
            source: err,
            path: path.clone(),
        })?;

        for line in parse_partials(&data) {
            self.partials.push(expand(line)?);
        }

        Ok(())
    }

    /// Replace configured source directory.
    ///
    /// The path is resolved the same way as paths read from configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Resolve`] if path cannot be resolved.
    pub fn set_source_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.source_directory = expand(path)?;
        Ok(())
    }

    /// Replace configured destination directory.
    ///
    /// The path is resolved the same way as paths read from configuration.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Resolve`] if path cannot be resolved.
    pub fn set_destination_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.destination_directory = expand(path)?;
        Ok(())
    }

    /// Expand configured partials into effective partial set.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Resolve`] if a partial cannot be resolved.
    pub fn partial_set(&self) -> Result<PartialSet> {
        Ok(PartialSet::expand(&self.partials, &self.destination_directory)?)
    }

    /// Construct ignore check for configured ignore mode.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Ignore`] if an ignore pattern is malformed.
    pub fn ignore_check(&self) -> Result<Box<dyn IgnoreCheck>> {
        let check: Box<dyn IgnoreCheck> = match self.ignore {
            IgnoreMode::Git => Box::new(GitCheckIgnore::new()),
            IgnoreMode::Patterns => Box::new(PatternIgnore::new(
                &self.source_directory,
                &self.ignore_patterns,
            )?),
            IgnoreMode::None => Box::new(NeverIgnore),
        };

        Ok(check)
    }
}

/// Strategy used to detect ignored source entries.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreMode {
    /// Ask `git check-ignore` about each entry.
    #[default]
    Git,

    /// Match entries against `ignore_patterns`.
    Patterns,

    /// Never ignore anything.
    None,
}

/// Parse lines of a partials file.
///
/// Skips empty lines and lines starting with '#'.
pub fn parse_partials(data: &str) -> impl Iterator<Item = &str> {
    data.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn expand(path: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(resolve(path)?)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to resolve path in configuration.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Failed to build ignore rules.
    #[error(transparent)]
    Ignore(#[from] IgnoreError),

    /// Configuration file cannot be read.
    #[error("failed to read configuration file at {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Partials file cannot be read.
    #[error("failed to read partials file at {:?}", path.display())]
    ReadPartialsFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
