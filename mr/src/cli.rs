//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MirrorBot - incremental branch mirror
#[derive(Parser, Debug)]
#[command(
    name = "mr",
    about = "Keep branches of one repository mirrored into another",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Turn on verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Turn on debugging output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Level requested on the command line, `--debug` winning over `--verbose`
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.debug {
            Some(tracing::Level::TRACE)
        } else if self.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every configured mirror
    Run {
        /// Run each mirror once and exit instead of repeating every period
        #[arg(long)]
        once: bool,
    },

    /// Run a single mirror once
    Mirror {
        /// Source repository URI
        #[arg(long)]
        from: String,

        /// Branch to mirror
        #[arg(long)]
        branch: String,

        /// Local target repository
        #[arg(long)]
        to: PathBuf,

        /// Keep marks in this file instead of the configured store
        #[arg(long)]
        marks_file: Option<PathBuf>,
    },

    /// Sync branches from one remote to another in the current repository
    Sync {
        /// Fetch changes from this remote
        #[arg(long, value_name = "REMOTE")]
        from: Option<String>,

        /// Push changes to this remote
        #[arg(long, value_name = "REMOTE")]
        to: Option<String>,

        /// Comma separated list of branches to sync
        #[arg(long, value_name = "BRANCHES")]
        branches: Option<String>,

        /// Pull current branch from origin after successful sync
        #[arg(long)]
        pull: bool,
    },
}
