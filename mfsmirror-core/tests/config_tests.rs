//! Config loading and API endpoint discovery against a throwaway home.

use assert_fs::prelude::*;
use mfsmirror_core::{
    config::{self, DEFAULT_API_URL},
    CacheBackend, Config, ConfigError,
};
use predicates::prelude::predicate;
use predicates::Predicate;

// ---------------------------------------------------------------------------
// 1. Loading
// ---------------------------------------------------------------------------

#[test]
fn full_config_is_loaded_from_home() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".mfsmirror/config.yaml")
        .write_str(
            "api_url: http://10.0.0.5:5001\n\
             flush_depth: 2\n\
             timeout_secs: 30\n\
             cache: json\n\
             cache_file: /var/lib/mfsmirror/hashes.json\n",
        )
        .expect("write config");

    let config = config::load_at(home.path()).expect("load");
    assert_eq!(config.api_url.as_deref(), Some("http://10.0.0.5:5001"));
    assert_eq!(config.flush_depth, Some(2));
    assert_eq!(config.timeout_secs, Some(30));
    assert_eq!(config.cache, Some(CacheBackend::Json));
    assert_eq!(
        config.cache_file.as_deref(),
        Some(std::path::Path::new("/var/lib/mfsmirror/hashes.json"))
    );
}

#[test]
fn empty_config_file_yields_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".mfsmirror/config.yaml")
        .write_str("\n")
        .expect("write config");

    assert_eq!(config::load_at(home.path()).expect("load"), Config::default());
}

#[test]
fn unknown_key_is_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".mfsmirror/config.yaml")
        .write_str("flush_dpeth: 3\n")
        .expect("write config");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
    let source_msg = match &err {
        ConfigError::Parse { source, .. } => source.to_string(),
        _ => unreachable!(),
    };
    assert!(source_msg.contains("flush_dpeth"), "got: {source_msg}");
}

#[test]
fn negative_flush_depth_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child("custom.yaml");
    file.write_str("flush_depth: -1\n").expect("write config");

    assert!(matches!(
        config::load_from(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn default_cache_file_lives_next_to_config() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cache_file = config::default_cache_file_at(home.path());
    let config_file = config::config_path_at(home.path());
    assert_eq!(cache_file.parent(), config_file.parent());
    assert!(predicate::str::ends_with("hashes.json").eval(&cache_file.to_string_lossy()));
}

// ---------------------------------------------------------------------------
// 2. API endpoint discovery
// ---------------------------------------------------------------------------

#[test]
fn api_file_in_ipfs_repo_is_used_when_nothing_else_is_set() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ipfs/api")
        .write_str("/ip4/192.168.1.7/tcp/5002\n")
        .expect("write api file");

    let repo = config::ipfs_repo_at(home.path(), None);
    let url = config::resolve_api_url(None, &Config::default(), &repo);
    assert_eq!(url, "http://192.168.1.7:5002");
}

#[test]
fn ipfs_path_overrides_home_repo() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let custom = home.child("elsewhere");
    custom
        .child("api")
        .write_str("/dns4/ipfs.local/tcp/5001")
        .expect("write api file");

    let repo = config::ipfs_repo_at(home.path(), custom.path().to_str());
    assert!(repo.exists());
    assert_eq!(
        config::resolve_api_url(None, &Config::default(), &repo),
        "http://ipfs.local:5001"
    );
}

#[test]
fn precedence_is_flag_then_config_then_repo_then_default() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ipfs/api")
        .write_str("/ip4/127.0.0.2/tcp/5001")
        .expect("write api file");
    let repo = config::ipfs_repo_at(home.path(), None);
    let with_url = Config {
        api_url: Some("http://from-config:5001/".to_owned()),
        ..Config::default()
    };

    assert_eq!(
        config::resolve_api_url(Some("http://from-flag:5001"), &with_url, &repo),
        "http://from-flag:5001"
    );
    assert_eq!(
        config::resolve_api_url(None, &with_url, &repo),
        "http://from-config:5001"
    );
    assert_eq!(
        config::resolve_api_url(None, &Config::default(), &repo),
        "http://127.0.0.2:5001"
    );

    let empty_home = assert_fs::TempDir::new().expect("tempdir");
    let no_repo = config::ipfs_repo_at(empty_home.path(), None);
    assert_eq!(
        config::resolve_api_url(None, &Config::default(), &no_repo),
        DEFAULT_API_URL
    );
}
