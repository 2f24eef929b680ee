//! Operator CLI for the localization engine.
//!
//! # Responsibility
//! - Probe `polyglot_core` linkage (`ping`).
//! - Inspect one entry's locale group (`show`).
//! - Re-run link sync and shared-field propagation for one entry (`resync`),
//!   the recovery path after a partially applied update.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyglot_core::db::{open_db, with_immediate_transaction};
use polyglot_core::{
    init_logging, ContentModel, EngineConfig, EntryId, EntryLifecycle, LifecycleError,
    SqliteEntryRepository, SyncReport,
};
use std::path::{Path, PathBuf};

/// Localization consistency engine CLI
#[derive(Parser, Debug)]
#[command(name = "polyglot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage and version
    Ping,
    /// Print an entry and its siblings as JSON
    Show {
        /// Engine config file (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Content model descriptor file (JSON)
        #[arg(long)]
        model: PathBuf,
        /// Entry id
        #[arg(long)]
        entry: EntryId,
    },
    /// Re-sync localizations and shared fields from one entry
    Resync {
        /// Engine config file (JSON)
        #[arg(long)]
        config: PathBuf,
        /// Content model descriptor file (JSON)
        #[arg(long)]
        model: PathBuf,
        /// Entry whose persisted state is authoritative for its group
        #[arg(long)]
        entry: EntryId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ping => {
            println!("polyglot_core ping={}", polyglot_core::ping());
            println!("polyglot_core version={}", polyglot_core::core_version());
            Ok(())
        }
        Command::Show {
            config,
            model,
            entry,
        } => show(&config, &model, entry),
        Command::Resync {
            config,
            model,
            entry,
        } => resync(&config, &model, entry),
    }
}

fn show(config_path: &Path, model_path: &Path, entry: EntryId) -> Result<()> {
    let config = load_config(config_path)?;
    let model = load_model(model_path)?;
    let conn = open_db(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    let repo = SqliteEntryRepository::try_new(&conn)?;
    let lifecycle = EntryLifecycle::new(model, repo, config.locale_provider());
    let group = lifecycle
        .load_group(entry)
        .with_context(|| format!("loading group of entry {entry}"))?;

    println!("{}", serde_json::to_string_pretty(&group)?);
    Ok(())
}

fn resync(config_path: &Path, model_path: &Path, entry: EntryId) -> Result<()> {
    let config = load_config(config_path)?;
    let model = load_model(model_path)?;
    let conn = open_db(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    let report = with_immediate_transaction(&conn, |tx| -> Result<SyncReport, LifecycleError> {
        let repo = SqliteEntryRepository::try_new(tx)?;
        EntryLifecycle::new(model, repo, config.locale_provider()).resync_entry(entry)
    })
    .with_context(|| format!("resyncing entry {entry}"))?;

    log::info!(
        "event=cli_resync module=cli status=ok entry_id={entry} links_updated={} fields_propagated={}",
        report.links_updated,
        report.fields_propagated
    );
    println!(
        "entry={entry} links_updated={} fields_propagated={}",
        report.links_updated, report.fields_propagated
    );
    Ok(())
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let config = EngineConfig::load(path)?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, &log_dir.to_string_lossy())
            .map_err(anyhow::Error::msg)
            .context("initializing logging")?;
    }
    Ok(config)
}

fn load_model(path: &Path) -> Result<ContentModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading model {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing model {}", path.display()))
}
