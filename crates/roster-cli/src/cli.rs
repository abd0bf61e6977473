use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "roster",
    about = "Replay operation scripts against observable lists",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Plain vector, duplicate keys allowed
    Vec,
    /// Vector with a key index
    VecMap,
    /// Key-to-value map plus key order
    Map,
    /// Values held in a shared, ref-counted store
    Share,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a script of list operations and print the outcome
    Replay(ReplayArgs),
    /// Parse a script and list its operations without running them
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ReplayArgs {
    /// JSON file holding an array of operations
    pub script: PathBuf,
    #[arg(short, long, value_enum, default_value = "vec-map")]
    pub backend: BackendKind,
    /// JSON file with list configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Print the change events emitted by each step
    #[arg(short, long)]
    pub events: bool,
    /// Stop at the first failing step
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    pub script: PathBuf,
}
