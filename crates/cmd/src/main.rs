// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use retention::DELETE_USAGE;

use cmd::commands::{backup_fetch_command, backup_list_command, delete_command};
use cmd::common::BackupContext;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "basekeeper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to $BASEKEEPER_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List backups, newest first
    BackupList,
    /// Restore a backup into a directory
    BackupFetch {
        /// Directory to restore into
        dest: PathBuf,
        /// Backup name, or LATEST
        name: String,
    },
    /// Delete backups and WAL older than a target
    #[command(after_help = DELETE_USAGE)]
    Delete {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let backend = BackupContext::new(cli.config).open().await?;
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Commands::BackupList => backup_list_command(&backend, &mut stdout).await?,
        Commands::BackupFetch { dest, name } => backup_fetch_command(&backend, dest, name).await?,
        Commands::Delete { args } => delete_command(&backend, args, &mut stdout).await?,
    }
    stdout.flush()?;
    Ok(())
}
