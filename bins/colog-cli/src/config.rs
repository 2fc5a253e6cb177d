use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "colog", about = "Protobuf log files stored as Parquet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every record of a log file as `offset<TAB>json`
    Dump(DumpArgs),
    /// Write JSON lines into a new log file
    Import(ImportArgs),
}

#[derive(Args, Clone, Debug)]
pub struct DumpArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "colog.toml", env = "COLOG_CONFIG")]
    pub config: PathBuf,

    /// Topic whose message type renders the records
    #[arg(long)]
    pub topic: String,

    /// Offset of the first record in the file
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Stop after this many records
    #[arg(long)]
    pub limit: Option<usize>,

    /// Parquet log file to read
    pub file: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct ImportArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "colog.toml", env = "COLOG_CONFIG")]
    pub config: PathBuf,

    /// Topic the records belong to
    #[arg(long)]
    pub topic: String,

    /// Offset of the first record
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// JSON lines input, one message per line
    #[arg(long)]
    pub input: PathBuf,

    /// Log file to create; must not exist yet
    #[arg(long)]
    pub output: PathBuf,

    /// Compression codec, short name or Hadoop codec class
    #[arg(long)]
    pub codec: Option<String>,
}
