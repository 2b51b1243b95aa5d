//! CLI argument parsing for markstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ms")]
#[command(author, version, about = "Inspect and migrate commit mark stores", long_about = None)]
pub struct Cli {
    /// Turn on debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the marks in a marks file
    Show {
        /// Path to marks.txt
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Copy a legacy marks file into a git-backed mark store
    Migrate {
        /// Path to the legacy marks.txt
        #[arg(long)]
        file: PathBuf,

        /// URL of the repository backing the store
        #[arg(long)]
        repo: String,

        /// Namespace label of the mirror inside the store
        #[arg(long)]
        namespace: String,

        /// Author name for the mark commit
        #[arg(long, default_value = "mirrorbot")]
        name: String,

        /// Author email for the mark commit
        #[arg(long, default_value = "mirrorbot@localhost")]
        email: String,

        /// Working directory for the local copy of the store
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
}
