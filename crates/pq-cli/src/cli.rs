use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pq",
    about = "Persisted GraphQL query storage administration",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Storage configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured bucket
    #[arg(long, global = true)]
    pub bucket: Option<String>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the storage key for query ids
    Key(KeyArgs),
    /// Fetch a persisted query
    Get(GetArgs),
    /// Register a query document under an id
    Put(PutArgs),
    /// Verify that the configured bucket is reachable
    Check(CheckArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub id: String,
    /// Query file, or `-` for stdin
    pub file: PathBuf,
    /// Store the text without parsing it first
    #[arg(long)]
    pub no_validate: bool,
}

#[derive(Args)]
pub struct CheckArgs {}
