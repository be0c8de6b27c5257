// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Chunked bookmark import into a personal record repository
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Disable colored output
    #[arg(long = "no-color", help = "disable colored output")]
    pub no_color: bool,

    /// Owner identifier, overrides MARKPORT_OWNER
    #[arg(long = "owner", value_name = "DID")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the import job database
    CreateDb {
        /// Path of the database to create, defaults to the configured db_url
        path: Option<String>,
    },
    /// Deduplicate a candidate file and import the remainder in chunks
    Import {
        /// JSON array of normalized candidate bookmarks
        path: PathBuf,

        #[arg(
            short = 'f',
            long = "format",
            default_value = "json",
            help = "source format label recorded on the job"
        )]
        format: String,

        #[arg(short = 't', long = "tags", help = "tags applied to every bookmark, comma separated list")]
        tags: Option<String>,

        #[arg(
            long = "no-drive",
            conflicts_with = "dry_run",
            help = "only prepare the job, do not process chunks"
        )]
        no_drive: bool,

        #[arg(long = "dry-run", help = "write into an in-memory repository, leaving the job database untouched")]
        dry_run: bool,
    },
    /// Process the next pending chunk of a job
    Process {
        job_id: String,
    },
    /// Show the progress of a job without advancing it
    Status {
        job_id: String,
    },
    /// List the owner's import jobs, newest first
    Jobs,
    /// Merge tag records that differ only in letter case
    MergeTags,
    /// Delete import jobs older than the configured age
    Sweep,
    /// Print the default configuration
    Config,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for (bash, zsh, fish)
        shell: String,
    },
}
