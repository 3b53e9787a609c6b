use clap::Parser;
use std::path::PathBuf;

use crate::pool::DEFAULT_WORKERS;

/// e12pack - pack every directory listed in a pack root's manifest into PBOs
#[derive(Parser, Debug)]
#[command(name = "e12pack")]
#[command(about = "Batch-pack mod directories into PBO archives in parallel")]
#[command(version)]
pub struct Cli {
    /// Pack root containing `.e12pack` and `.e12pack_settings`
    #[arg(short, long, value_parser = non_empty_path)]
    pub pack: PathBuf,

    /// Number of concurrent packer processes
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, value_parser = worker_count)]
    pub workers: usize,

    /// Fail the run when any single directory fails to pack.
    ///
    /// Without this flag failed jobs are logged but the exit code stays 0.
    #[arg(long)]
    pub strict: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

fn non_empty_path(value: &str) -> Result<PathBuf, String> {
    if value.trim().is_empty() {
        Err("pack path must not be empty".to_string())
    } else {
        Ok(PathBuf::from(value))
    }
}

fn worker_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("worker count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
