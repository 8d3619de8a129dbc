//! Optional YAML configuration and API endpoint discovery.
//!
//! # Storage layout
//!
//! ```text
//! ~/.mfsmirror/
//!   config.yaml   (optional; every field may be omitted)
//!   hashes.json   (default location of the JSON hash cache)
//! ```
//!
//! # API pattern
//!
//! Functions that touch the home directory come in two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Used when neither flags, config, nor the IPFS repo name an endpoint.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the last-published hash of each file is remembered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// `user.ipfs-hash` extended attribute on each file.
    #[default]
    Xattr,
    /// One JSON document keyed by absolute path.
    Json,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xattr" => Ok(Self::Xattr),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown cache backend '{other}'; expected: xattr, json"
            )),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xattr => f.write_str("xattr"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Contents of `config.yaml`. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_url: Option<String>,
    pub flush_depth: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub cache: Option<CacheBackend>,
    pub cache_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.mfsmirror/`
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".mfsmirror")
}

/// `<home>/.mfsmirror/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("config.yaml")
}

/// `<home>/.mfsmirror/hashes.json`
pub fn default_cache_file_at(home: &Path) -> PathBuf {
    config_dir_at(home).join("hashes.json")
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load `config.yaml` from an explicit file. A missing file yields defaults.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(io_err(path, err)),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<home>/.mfsmirror/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// API endpoint discovery
// ---------------------------------------------------------------------------

/// The local IPFS repository: `$IPFS_PATH`, else `<home>/.ipfs`.
pub fn ipfs_repo_at(home: &Path, ipfs_path_env: Option<&str>) -> PathBuf {
    match ipfs_path_env {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => home.join(".ipfs"),
    }
}

/// Read the `api` file a running daemon leaves in its repository.
///
/// Returns `None` when the file is missing or unparseable.
pub fn api_url_from_repo(repo: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(repo.join("api")).ok()?;
    multiaddr_to_url(contents.trim())
}

/// Convert an API multiaddr such as `/ip4/127.0.0.1/tcp/5001` to an URL.
///
/// Plain `http://` / `https://` values pass through unchanged.
pub fn multiaddr_to_url(addr: &str) -> Option<String> {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return Some(addr.trim_end_matches('/').to_owned());
    }
    let parts: Vec<&str> = addr.trim_start_matches('/').split('/').collect();
    match parts.as_slice() {
        ["ip4" | "dns" | "dns4" | "dns6", host, "tcp", port, ..] => {
            port.parse::<u16>().ok()?;
            Some(format!("http://{host}:{port}"))
        }
        ["ip6", host, "tcp", port, ..] => {
            port.parse::<u16>().ok()?;
            Some(format!("http://[{host}]:{port}"))
        }
        _ => None,
    }
}

/// Pick the API endpoint: flag, then config, then the IPFS repo, then the default.
pub fn resolve_api_url(flag: Option<&str>, config: &Config, repo: &Path) -> String {
    flag.map(str::to_owned)
        .or_else(|| config.api_url.clone())
        .or_else(|| api_url_from_repo(repo))
        .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
        .trim_end_matches('/')
        .to_owned()
}
