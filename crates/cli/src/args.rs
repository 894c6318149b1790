//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// epo-reputation: hash files and submit their reputations to McAfee ePO / TIE
#[derive(Parser, Debug)]
#[command(name = "epo-reputation")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hash files in a directory and print the digest records
    Hash(HashArgs),

    /// Hash files and submit their reputations to ePO
    Send(SendArgs),

    /// Hash files and write a semicolon separated CSV export
    Export(ExportArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Options shared by every command that scans a directory
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan recursively
    pub dir: PathBuf,

    /// File types to include: all, exe, dll, exe+dll, or a comma separated list
    #[arg(long)]
    pub file_types: Option<String>,

    /// Reputation to stamp on every record (label, kebab-case name, or score)
    #[arg(long)]
    pub reputation: Option<String>,
}

#[derive(Args, Debug)]
pub struct HashArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output as JSON (the `fileReps` wire objects)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Log the calls instead of contacting the server
    #[arg(long)]
    pub dry_run: bool,

    /// Override the ePO server URL
    #[arg(long)]
    pub url: Option<String>,

    /// Override the ePO username
    #[arg(long)]
    pub username: Option<String>,

    /// Verify the server's TLS certificate
    #[arg(long)]
    pub verify_tls: bool,

    /// Maximum records per request
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output file (default: output_<YYYYMMDD>.csv)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also fetch a security token from the server
    #[arg(long)]
    pub token: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
