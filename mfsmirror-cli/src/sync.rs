//! The sync run: resolve settings, connect, mirror, summarize.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use mfsmirror_core::config::{self, DEFAULT_TIMEOUT_SECS};
use mfsmirror_core::{CacheBackend, Config, FlushDepth};
use mfsmirror_ipfs::IpfsClient;
use mfsmirror_sync::{cache, synchronize, SyncOptions, SyncReport};

use crate::Cli;

/// Flags merged over the config file, merged over defaults.
#[derive(Debug)]
struct Settings {
    api_url: String,
    timeout: Duration,
    options: SyncOptions,
    cache: CacheBackend,
    cache_file: PathBuf,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self> {
        let home = config::home();
        let config = match (&cli.config, &home) {
            (Some(path), _) => config::load_from(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            (None, Ok(home)) => config::load_at(home).context("failed to load config")?,
            (None, Err(_)) => Config::default(),
        };

        let ipfs_path = std::env::var("IPFS_PATH").ok();
        let repo = match &home {
            Ok(home) => config::ipfs_repo_at(home, ipfs_path.as_deref()),
            Err(_) => PathBuf::from(ipfs_path.unwrap_or_default()),
        };
        let api_url = config::resolve_api_url(cli.api.as_deref(), &config, &repo);

        let cache = cli.cache.or(config.cache).unwrap_or_default();
        let cache_file = match cli.cache_file.clone().or_else(|| config.cache_file.clone()) {
            Some(path) => path,
            None => match &home {
                Ok(home) => config::default_cache_file_at(home),
                // The xattr backend never opens a file.
                Err(_) if cache == CacheBackend::Xattr => PathBuf::new(),
                Err(err) => bail!("{err}; pass --cache-file"),
            },
        };

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            options: SyncOptions {
                flush_depth: cli
                    .flush_depth
                    .or(config.flush_depth)
                    .unwrap_or(FlushDepth::DEFAULT),
                dry_run: cli.dry_run,
            },
            cache,
            cache_file,
        })
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::resolve(cli)?;
    tracing::debug!(?settings, "resolved settings");

    let client = IpfsClient::new(&settings.api_url, settings.timeout);
    let mut hashes = cache::open(settings.cache, &settings.cache_file)
        .with_context(|| format!("failed to open {} hash cache", settings.cache))?;

    let report = synchronize(
        &client,
        hashes.as_mut(),
        &cli.source,
        &cli.destination,
        settings.options,
    )
    .with_context(|| {
        format!(
            "sync of {} to {} via {} failed",
            cli.source.display(),
            cli.destination,
            settings.api_url
        )
    })?;

    print_summary(cli, &report);
    Ok(())
}

fn print_summary(cli: &Cli, report: &SyncReport) {
    let prefix = if cli.dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}✓ {} -> {} ({} published, {} unchanged, {} deleted, {} flushed)",
        cli.source.display(),
        cli.destination,
        report.published(),
        report.unchanged(),
        report.deleted(),
        report.flushed()
    );
}
