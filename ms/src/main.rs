use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use markstore::cli::{Cli, Command};
use markstore::{Author, FileMarkStorage, GitMarkStorage, MarkStorage};

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Show { file } => {
            let marks = FileMarkStorage::new(&file)
                .read()
                .context(format!("Failed to read {}", file.display()))?;
            for mark in marks.marks() {
                println!(
                    "{} {} -> {}",
                    mark.key.to_string().yellow(),
                    mark.source.abbreviate(),
                    mark.target.abbreviate().cyan()
                );
            }
        }
        Command::Migrate {
            file,
            repo,
            namespace,
            name,
            email,
            work_dir,
        } => {
            let legacy = FileMarkStorage::new(&file)
                .read()
                .context(format!("Failed to read {}", file.display()))?;

            let work_dir = match work_dir {
                Some(dir) => dir,
                None => tempfile::tempdir()?.keep(),
            };
            info!(?work_dir, %repo, "Migrating marks");

            let storage = GitMarkStorage::new(&repo, Author::new(name, email), &namespace);
            let mut handle = storage
                .materialize(&work_dir)
                .context(format!("Failed to materialize mark store {}", repo))?;
            let report = handle.put(legacy.marks()).context("Failed to publish marks")?;
            println!(
                "{} Migrated {} marks ({} already present) to {}",
                "✓".green(),
                report.appended,
                report.skipped,
                repo.cyan()
            );
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
