use std::path::PathBuf;

use clap::Parser;

/// Summarize every article linked from a folder of saved HTML pages into a
/// single French HTML report.
#[derive(Debug, Parser)]
#[command(name = "digest")]
#[command(version)]
pub struct Cli {
    /// RON run configuration; flags below override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the saved HTML snapshots
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Report file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of articles processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-page request timeout
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Model name served by the model service
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the Ollama-compatible model service
    #[arg(long)]
    pub model_url: Option<String>,

    /// Also save the collected URL list to this file
    #[arg(long)]
    pub urls_out: Option<PathBuf>,

    /// Extra URL substring to skip (repeatable)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Mirror the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not probe the model service before starting
    #[arg(long)]
    pub skip_preflight: bool,
}
