//! mfsmirror — mirror a local directory tree into IPFS MFS.
//!
//! # Usage
//!
//! ```text
//! mfsmirror [--flush-depth N] [--api URL] [--cache xattr|json] [--cache-file PATH]
//!           [--dry-run] [--config PATH] <SOURCE> <DESTINATION>
//! ```
//!
//! Exit status: 0 on success, 1 when the sync fails, 2 on usage errors.

mod logging;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mfsmirror_core::{CacheBackend, MfsPath};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mfsmirror",
    version,
    about = "Mirror a local directory into an IPFS MFS directory",
    long_about = None,
)]
pub struct Cli {
    /// Local directory to mirror.
    #[arg(value_parser = existing_dir)]
    pub source: PathBuf,

    /// Absolute MFS path that will mirror SOURCE.
    #[arg(value_parser = destination)]
    pub destination: MfsPath,

    /// Levels below DESTINATION, inclusive, whose writes are flushed [default: 4].
    #[arg(long, value_name = "N")]
    pub flush_depth: Option<u32>,

    /// IPFS RPC endpoint, e.g. http://127.0.0.1:5001.
    #[arg(long, value_name = "URL")]
    pub api: Option<String>,

    /// Where last-published hashes are kept: xattr or json [default: xattr].
    #[arg(long, value_name = "BACKEND")]
    pub cache: Option<CacheBackend>,

    /// JSON cache location [default: ~/.mfsmirror/hashes.json].
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Report what would change without touching MFS or the cache.
    #[arg(long)]
    pub dry_run: bool,

    /// Read settings from this file instead of ~/.mfsmirror/config.yaml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Argument validation. clap exits with status 2 when these fail.
// ---------------------------------------------------------------------------

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Ok(path),
        Ok(_) => Err(format!("'{raw}' is not a directory")),
        Err(err) => Err(format!("cannot access '{raw}': {err}")),
    }
}

fn destination(raw: &str) -> Result<MfsPath, String> {
    MfsPath::parse(raw).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing();

    match sync::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
