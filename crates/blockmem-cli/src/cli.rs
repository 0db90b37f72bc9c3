use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blockmem",
    about = "Block-backed in-memory object storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the resolved disk configuration as TOML
    Config(DiskArgs),
    /// Show the geometry and accounting of a fresh disk
    Inspect(DiskArgs),
    /// Run a write/append/shrink/copy/remove workload and report usage
    Exercise(ExerciseArgs),
}

/// Disk geometry: a TOML file, optionally overridden by flags.
#[derive(Args, Clone, Debug, Default)]
pub struct DiskArgs {
    /// TOML file with `number_of_blocks` and `block_size`
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Override the number of blocks
    #[arg(long)]
    pub blocks: Option<usize>,
    /// Override the block size in bytes
    #[arg(long)]
    pub block_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExerciseArgs {
    #[command(flatten)]
    pub disk: DiskArgs,
    /// Number of objects to create
    #[arg(long, default_value = "16")]
    pub objects: u64,
    /// Initial content size per object, in bytes
    #[arg(long, default_value = "10000")]
    pub size: usize,
    /// Bytes appended to each object
    #[arg(long, default_value = "1000")]
    pub append: usize,
    /// Size every other object is overwritten down to
    #[arg(long, default_value = "100")]
    pub shrink_to: usize,
}
