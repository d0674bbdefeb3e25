// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotlink::{
    config::ConfigDefinition,
    link::backup,
    path::{default_config_path, home_dir, resolve},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use inquire::Confirm;
use std::{fs::write, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotlink [options] <dotlink-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Show debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = match self.config {
            Some(path) => path,
            None => default_config_path()?,
        };

        match self.command {
            Command::Sync(opts) => run_sync(config, opts),
            Command::Init(opts) => run_init(config, opts),
            Command::Backup(opts) => run_backup(opts),
            Command::Restore(opts) => run_restore(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Symlink source tree into destination tree.
    #[command(override_usage = "dotlink sync [options]")]
    Sync(SyncOptions),

    /// Write starter configuration file.
    #[command(override_usage = "dotlink init [options]")]
    Init(InitOptions),

    /// Move files out of the way into timestamped backups.
    #[command(override_usage = "dotlink backup <path>...")]
    Backup(BackupOptions),

    /// Move most recent backups back into place.
    #[command(override_usage = "dotlink restore [options] <path>...")]
    Restore(RestoreOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Use this source directory instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub source: Option<PathBuf>,

    /// Use this destination directory instead of the configured one.
    #[arg(short, long, value_name = "path")]
    pub destination: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Source directory to link from.
    #[arg(short, long, value_name = "path")]
    pub source: PathBuf,

    /// Destination directory to link into, defaults to home directory.
    #[arg(short, long, value_name = "path")]
    pub destination: Option<PathBuf>,

    /// Destination directories to treat as partial.
    #[arg(short, long, value_name = "path")]
    pub partial: Vec<PathBuf>,

    /// Overwrite existing configuration file.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BackupOptions {
    /// Paths to back up.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RestoreOptions {
    /// Paths to restore most recent backup of.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<PathBuf>,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run_sync(config: PathBuf, opts: SyncOptions) -> Result<()> {
    let mut definition = ConfigDefinition::load(&config)
        .with_context(|| format!("cannot load configuration {:?}", config.display()))?;
    if let Some(source) = opts.source {
        definition.settings.set_source_directory(source)?;
    }
    if let Some(destination) = opts.destination {
        definition.settings.set_destination_directory(destination)?;
    }

    let linker = definition.linker()?;
    info!("{} effective partial directories", linker.partials().len());

    let settings = &definition.settings;
    linker.synchronize(&settings.source_directory, &settings.destination_directory)?;

    Ok(())
}

fn run_init(config: PathBuf, opts: InitOptions) -> Result<()> {
    if config.exists() && !opts.force {
        bail!(
            "configuration {:?} already exists, use --force to overwrite",
            config.display()
        );
    }

    let mut definition = ConfigDefinition::default();
    definition.settings.source_directory = resolve(opts.source)?;
    definition.settings.destination_directory = match opts.destination {
        Some(path) => resolve(path)?,
        None => home_dir()?,
    };
    definition.settings.partials = opts
        .partial
        .iter()
        .map(resolve)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(parent) = config.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        mkdirp::mkdirp(parent)?;
    }
    write(&config, definition.to_string())
        .with_context(|| format!("cannot write configuration {:?}", config.display()))?;
    info!("wrote configuration {:?}", config.display());

    Ok(())
}

fn run_backup(opts: BackupOptions) -> Result<()> {
    for path in opts.paths {
        let backup = backup::back_up(&path)?;
        println!("{}", backup.display());
    }

    Ok(())
}

fn run_restore(opts: RestoreOptions) -> Result<()> {
    for path in opts.paths {
        let Some(backup) = backup::most_recent_backup(&path)? else {
            warn!("no backup found for {:?}", path.display());
            continue;
        };

        if !opts.yes {
            let prompt = format!("restore {:?} from {:?}?", path.display(), backup.display());
            if !Confirm::new(&prompt).with_default(false).prompt()? {
                info!("skip {:?}", path.display());
                continue;
            }
        }

        backup::restore(&path)?;
    }

    Ok(())
}
