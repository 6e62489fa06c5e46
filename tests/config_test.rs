//! Configuration loading, env overrides and persistence.

use std::env;
use std::fs;
use std::sync::Mutex;

use proxy_dashboard::Config;
use tempfile::TempDir;

// Global lock to prevent env var pollution between tests
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Point the config dir at a fresh temp directory and clear overrides.
fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let temp_dir = TempDir::new().unwrap();

    env::remove_var("PROXY_DASHBOARD_ORIGIN");
    env::remove_var("PROXY_DASHBOARD_TIMEOUT_SECS");
    env::set_var("PROXY_DASHBOARD_CONFIG_DIR", temp_dir.path());

    (temp_dir, guard)
}

#[test]
fn test_load_without_file_uses_defaults() {
    let (_dir, _guard) = setup_test_env();

    let config = Config::load().unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn test_save_then_load_round_trip() {
    let (dir, _guard) = setup_test_env();

    let config = Config {
        origin: "http://nas.lan:9000".to_string(),
        request_timeout_secs: 3,
    };
    config.save().unwrap();

    assert!(dir.path().join("config.json").exists());
    assert_eq!(Config::load().unwrap(), config);
}

#[cfg(unix)]
#[test]
fn test_saved_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let (dir, _guard) = setup_test_env();

    Config::default().save().unwrap();

    let mode = fs::metadata(dir.path().join("config.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_env_overrides_file() {
    let (dir, _guard) = setup_test_env();
    fs::write(
        dir.path().join("config.json"),
        r#"{"origin":"http://file.lan","request_timeout_secs":7}"#,
    )
    .unwrap();

    env::set_var("PROXY_DASHBOARD_ORIGIN", "https://env.lan");
    env::set_var("PROXY_DASHBOARD_TIMEOUT_SECS", "30");
    let config = Config::load().unwrap();
    env::remove_var("PROXY_DASHBOARD_ORIGIN");
    env::remove_var("PROXY_DASHBOARD_TIMEOUT_SECS");

    assert_eq!(config.origin, "https://env.lan");
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
fn test_invalid_timeout_override_is_ignored() {
    let (_dir, _guard) = setup_test_env();

    env::set_var("PROXY_DASHBOARD_TIMEOUT_SECS", "soon");
    let config = Config::load().unwrap();
    env::remove_var("PROXY_DASHBOARD_TIMEOUT_SECS");

    assert_eq!(config.request_timeout_secs, 10);
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let (dir, _guard) = setup_test_env();
    fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    let config = Config::load().unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn test_zero_timeout_is_rejected() {
    let (dir, _guard) = setup_test_env();
    fs::write(
        dir.path().join("config.json"),
        r#"{"origin":"http://file.lan","request_timeout_secs":0}"#,
    )
    .unwrap();

    let from_file = Config::load().unwrap();

    env::set_var("PROXY_DASHBOARD_TIMEOUT_SECS", "0");
    let from_env = Config::load().unwrap();
    env::remove_var("PROXY_DASHBOARD_TIMEOUT_SECS");

    assert_eq!(from_file.request_timeout_secs, 10);
    assert_eq!(from_file.origin, "http://file.lan");
    assert_eq!(from_env.request_timeout_secs, 10);
}
