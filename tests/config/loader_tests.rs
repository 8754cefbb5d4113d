use std::env;
use std::fs;

use serial_test::serial;
use taskdash::config::{Config, ConfigError};
use taskdash::core::network::{Backend, NetworkKind};

use crate::common::create_temp_dir;

const ENV_VARS: [&str; 8] = [
    "TASKDASH_DOWNLOAD_PUBLIC_URL",
    "TASKDASH_DOWNLOAD_PRIVATE_URL",
    "TASKDASH_TRANSCRIPTION_PUBLIC_URL",
    "TASKDASH_TRANSCRIPTION_PRIVATE_URL",
    "TASKDASH_HEALTH_CHECK_TIMEOUT_MS",
    "TASKDASH_PROXY_TIMEOUT_MS",
    "TASKDASH_CACHE_INTERVAL_MS",
    "TASKDASH_BIND",
];

/// Clears every override on creation and again on drop
struct CleanEnv;

impl CleanEnv {
    fn new() -> Self {
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::remove_var("TASKDASH_CONFIG");
        CleanEnv
    }
}

impl Drop for CleanEnv {
    fn drop(&mut self) {
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::remove_var("TASKDASH_CONFIG");
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.timeouts.health_check_ms, 3_000);
    assert_eq!(config.timeouts.proxy_attempt_ms, 5_000);
    assert_eq!(config.timeouts.api_request_ms, 30_000);
    assert_eq!(config.network.cache_interval_ms, 30_000);
    assert_eq!(config.polling.interval_ms, 30_000);
    assert_eq!(config.polling.recent_tasks, 5);
    assert!(config.check().is_ok());
}

#[test]
fn test_base_url_trims_trailing_slash() {
    let mut config = Config::default();
    config.backends.download.public_url = "http://gw.example/dv/".to_string();
    assert_eq!(
        config.backends.endpoint(Backend::Download).base_url(NetworkKind::Public),
        "http://gw.example/dv"
    );
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    let _env = CleanEnv::new();
    let dir = create_temp_dir();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[backends.transcription]
public_url = "https://gw.example/tv"
private_url = "http://10.0.0.3:6789"

[timeouts]
health_check_ms = 1500
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.backends.transcription.public_url, "https://gw.example/tv");
    assert_eq!(config.timeouts.health_check_ms, 1_500);
    assert_eq!(config.timeouts.proxy_attempt_ms, 5_000);
    assert_eq!(config.backends.download, Config::default().backends.download);
}

#[test]
#[serial]
fn test_env_overrides_apply_after_file() {
    let _env = CleanEnv::new();
    let dir = create_temp_dir();
    let path = dir.path().join("config.toml");
    Config::init_at(&path).unwrap();

    env::set_var("TASKDASH_DOWNLOAD_PRIVATE_URL", "http://10.0.0.2:3456");
    env::set_var("TASKDASH_HEALTH_CHECK_TIMEOUT_MS", "1000");
    env::set_var("TASKDASH_CACHE_INTERVAL_MS", "5000");
    env::set_var("TASKDASH_BIND", "127.0.0.1:8080");

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.backends.download.private_url, "http://10.0.0.2:3456");
    assert_eq!(config.timeouts.health_check_ms, 1_000);
    assert_eq!(config.network.cache_interval_ms, 5_000);
    assert_eq!(config.server.bind, "127.0.0.1:8080");
}

#[test]
#[serial]
fn test_bad_numeric_override_is_rejected() {
    let _env = CleanEnv::new();
    env::set_var("TASKDASH_PROXY_TIMEOUT_MS", "five seconds");

    let mut config = Config::default();
    let error = config.apply_env_overrides().unwrap_err();
    assert!(matches!(error, ConfigError::Invalid(_)));
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let _env = CleanEnv::new();
    let dir = create_temp_dir();
    env::set_var("TASKDASH_CONFIG", dir.path().join("absent.toml"));

    let config = Config::load().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_init_writes_parseable_defaults_once() {
    let _env = CleanEnv::new();
    let dir = create_temp_dir();
    let path = dir.path().join("nested").join("config.toml");

    Config::init_at(&path).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[backends.download]"));
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());

    // Existing file is left alone
    fs::write(&path, "[server]\nbind = \"127.0.0.1:1\"\n").unwrap();
    Config::init_at(&path).unwrap();
    assert_eq!(Config::load_from(&path).unwrap().server.bind, "127.0.0.1:1");
}

#[test]
fn test_check_rejects_bad_values() {
    let mut config = Config::default();
    config.backends.transcription.private_url = "ftp://10.0.0.3".to_string();
    assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));

    let mut config = Config::default();
    config.network.cache_interval_ms = 0;
    assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));

    let mut config = Config::default();
    config.server.bind = "localhost".to_string();
    assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));

    let mut config = Config::default();
    config.backends.download.public_url = "not a url".to_string();
    assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));
}
