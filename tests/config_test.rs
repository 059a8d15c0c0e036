// Environment-driven configuration
// Tests mutate process env, so they run serially

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use farm_weather_service::config::{Config, DEFAULT_GEMINI_MODEL, DEFAULT_OPENWEATHER_BASE_URL};
use serial_test::serial;

const VARS: &[&str] = &[
    "SERVER_HOST",
    "SERVER_PORT",
    "OPENWEATHER_API_KEY",
    "OPENWEATHER_BASE_URL",
    "GEMINI_API_KEY",
    "GEMINI_BASE_URL",
    "GEMINI_MODEL",
    "UPSTREAM_TIMEOUT_SECS",
    "UPSTREAM_MAX_RETRIES",
    "UPSTREAM_RETRY_DELAY_MS",
    "PREFERENCES_PATH",
    "REFRESH_INTERVAL_MINUTES",
    "FORECAST_PLACEHOLDER_ON_ERROR",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_missing_weather_key_is_an_error() {
    clear_env();
    assert!(Config::from_env().is_err());
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    env::set_var("OPENWEATHER_API_KEY", "abc123");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server_addr(), "0.0.0.0:8080");
    assert_eq!(config.openweather_api_key, "abc123");
    assert_eq!(config.openweather_base_url, DEFAULT_OPENWEATHER_BASE_URL);
    assert_eq!(config.gemini_api_key, None);
    assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
    assert_eq!(config.upstream.timeout, Duration::from_secs(10));
    assert_eq!(config.upstream.max_retries, 1);
    assert_eq!(config.preferences_path, PathBuf::from("preferences.json"));
    assert_eq!(config.refresh_interval_minutes, 15);
    assert!(!config.forecast_placeholder_on_error);

    clear_env();
}

#[test]
#[serial]
fn test_overrides() {
    clear_env();
    env::set_var("OPENWEATHER_API_KEY", "abc123");
    env::set_var("SERVER_HOST", "127.0.0.1");
    env::set_var("SERVER_PORT", "9090");
    env::set_var("GEMINI_API_KEY", "gem-key");
    env::set_var("UPSTREAM_TIMEOUT_SECS", "3");
    env::set_var("UPSTREAM_MAX_RETRIES", "0");
    env::set_var("UPSTREAM_RETRY_DELAY_MS", "50");
    env::set_var("PREFERENCES_PATH", "/var/lib/farm-weather/prefs.json");
    env::set_var("REFRESH_INTERVAL_MINUTES", "5");
    env::set_var("FORECAST_PLACEHOLDER_ON_ERROR", "TRUE");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server_addr(), "127.0.0.1:9090");
    assert_eq!(config.gemini_api_key.as_deref(), Some("gem-key"));
    assert_eq!(config.upstream.timeout, Duration::from_secs(3));
    assert_eq!(config.upstream.max_retries, 0);
    assert_eq!(config.upstream.retry_delay, Duration::from_millis(50));
    assert_eq!(
        config.preferences_path,
        PathBuf::from("/var/lib/farm-weather/prefs.json")
    );
    assert_eq!(config.refresh_interval_minutes, 5);
    assert!(config.forecast_placeholder_on_error);

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_numbers_fall_back() {
    clear_env();
    env::set_var("OPENWEATHER_API_KEY", "abc123");
    env::set_var("SERVER_PORT", "not-a-port");
    env::set_var("UPSTREAM_MAX_RETRIES", "-1");
    env::set_var("GEMINI_API_KEY", "");

    let config = Config::from_env().unwrap();
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.upstream.max_retries, 1);
    assert_eq!(config.gemini_api_key, None);

    clear_env();
}
