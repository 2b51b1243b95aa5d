//! MirrorBot - incremental branch mirror
//!
//! CLI entry point for running mirrors and syncing remotes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use mirrorbot::cli::{Cli, Command};
use mirrorbot::config::{Config, MirrorConfig};
use mirrorbot::mirror::{MirrorBot, MirrorPath};
use mirrorbot::repository::Repository;
use mirrorbot::scheduler::{Bot, BotRunner, WorkItem};
use mirrorbot::sync::{SyncError, SyncOptions, sync};

use markstore::{FileMarkStorage, MarkStorage};

fn parse_level(s: &str) -> tracing::Level {
    match s.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", s);
            tracing::Level::WARN
        }
    }
}

/// Log to stderr with priority: --debug > --verbose > config > WARN
fn setup_logging(cli_level: Option<tracing::Level>, config_level: &str) {
    let level = cli_level.unwrap_or_else(|| parse_level(config_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    debug!(?level, "Logging initialized");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        let code = e.downcast_ref::<SyncError>().map_or(1, SyncError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level(), &config.log_level);
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "run: dispatching command");
    match cli.command {
        Command::Run { once } => cmd_run(&config, once).await,
        Command::Mirror {
            from,
            branch,
            to,
            marks_file,
        } => cmd_mirror(&config, from, branch, to, marks_file).await,
        Command::Sync {
            from,
            to,
            branches,
            pull,
        } => {
            let options = SyncOptions {
                from,
                to,
                branches,
                pull,
            };
            tokio::task::spawn_blocking(move || cmd_sync(options)).await?
        }
    }
}

async fn cmd_run(config: &Config, once: bool) -> Result<()> {
    let bots = config.bots()?;
    if bots.is_empty() {
        println!("No mirrors configured");
        return Ok(());
    }
    info!(mirrors = bots.len(), once, "Starting mirrors");

    if once {
        let items: Vec<Arc<dyn WorkItem>> = bots.into_iter().map(|b| Arc::new(b) as Arc<dyn WorkItem>).collect();
        let runner = BotRunner::new(config.runner.clone(), Vec::new());
        runner.run_until_idle(items).await;

        let stats = runner.stats().await;
        println!(
            "{} {} mirrors completed, {} failed",
            "✓".green(),
            stats.total_completed,
            stats.total_failed
        );
        if stats.total_failed > 0 {
            eyre::bail!("{} mirrors failed", stats.total_failed);
        }
        return Ok(());
    }

    let bots: Vec<Arc<dyn Bot>> = bots.into_iter().map(|b| Arc::new(b) as Arc<dyn Bot>).collect();
    let runner = Arc::new(BotRunner::new(config.runner.clone(), bots));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run_periodic(shutdown_rx).await })
    };

    tokio::signal::ctrl_c().await.context("Failed to wait for ctrl-c")?;
    info!("ctrl-c received, waiting for running mirrors");
    let _ = shutdown_tx.send(true);
    task.await.context("Runner task failed")?;
    Ok(())
}

async fn cmd_mirror(
    config: &Config,
    from: String,
    branch: String,
    to: PathBuf,
    marks_file: Option<PathBuf>,
) -> Result<()> {
    let marks: Arc<dyn MarkStorage> = match marks_file {
        Some(path) => Arc::new(FileMarkStorage::new(std::path::absolute(&path)?)),
        None => config.mark_storage_for(&MirrorConfig {
            from: from.clone(),
            branch: branch.clone(),
            to: to.clone(),
            namespace: None,
        })?,
    };

    let bot = MirrorBot::new(from, branch, to, &config.storage, marks);
    let scratch = config.runner.scratch_dir.clone();
    let name = bot.to_string();
    let outcome = tokio::task::spawn_blocking(move || bot.sync_once(&scratch))
        .await?
        .context(format!("{} failed", name))?;

    let path = match outcome.path {
        MirrorPath::Initial => "created",
        MirrorPath::Incremental => "updated",
    };
    println!(
        "{} {} {} ({} new marks)",
        "✓".green(),
        name.cyan(),
        path,
        outcome.persisted.appended
    );
    Ok(())
}

fn cmd_sync(options: SyncOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let repo = Repository::find(&cwd)?.ok_or_else(|| SyncError::NoRepository(cwd.clone()))?;

    let report = sync(&repo, &options)?;
    for branch in &report.synced {
        println!(
            "Syncing {}/{} to {}/{}... {}",
            report.from,
            branch,
            report.to,
            branch,
            "done".green()
        );
    }
    for branch in &report.skipped {
        debug!(%branch, "Skipped branch");
    }
    Ok(())
}
