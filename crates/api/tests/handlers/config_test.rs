use std::collections::HashMap;
use std::time::Duration;

use officehours_api::config::{ApiConfig, MAX_OFFLINE_AFTER_SECONDS, MAX_WAIT_WINDOW_DAYS};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tracing::Level;

fn from_pairs(pairs: &[(&str, &str)]) -> eyre::Result<ApiConfig> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ApiConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults_without_environment() {
    let config = from_pairs(&[]).unwrap();
    assert_eq!(config.server_addr(), "0.0.0.0:3000");
    assert_eq!(config.database_url, None);
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.wait_window(), None);
    assert_eq!(config.sweep_interval(), Duration::from_secs(120));
    assert_eq!(config.offline_after(), chrono::Duration::minutes(5));
}

#[test]
fn test_reads_overrides() {
    let config = from_pairs(&[
        ("API_HOST", "127.0.0.1"),
        ("API_PORT", "8080"),
        ("DATABASE_URL", "postgres://localhost/officehours"),
        ("LOG_LEVEL", "DEBUG"),
        ("API_CORS_ORIGINS", "http://a.test, ,http://b.test"),
        ("QUEUE_WAIT_WINDOW_DAYS", "7"),
        ("PRESENCE_SWEEP_INTERVAL_SECONDS", "0"),
    ])
    .unwrap();

    assert_eq!(config.server_addr(), "127.0.0.1:8080");
    assert_eq!(
        config.database_url.as_deref(),
        Some("postgres://localhost/officehours")
    );
    assert_eq!(config.log_level, Level::DEBUG);
    assert_eq!(
        config.cors_origins,
        Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
    );
    assert_eq!(config.wait_window(), Some(chrono::Duration::days(7)));
    // A zero interval would spin, so it falls back to the default.
    assert_eq!(config.presence_sweep_interval, 120);
}

#[test]
fn test_blank_database_url_means_memory() {
    let config = from_pairs(&[("DATABASE_URL", "  ")]).unwrap();
    assert!(config.database_url.is_none());
}

#[test]
fn test_invalid_port_is_an_error() {
    assert!(from_pairs(&[("API_PORT", "eighty")]).is_err());
    assert!(from_pairs(&[("QUEUE_WAIT_WINDOW_DAYS", "week")]).is_err());
}

#[rstest]
#[case("QUEUE_WAIT_WINDOW_DAYS", "100000000")]
#[case("PRESENCE_OFFLINE_AFTER_SECONDS", "18446744073709551615")]
#[case("PRESENCE_OFFLINE_AFTER_SECONDS", "0")]
#[case("PRESENCE_OFFLINE_AFTER_SECONDS", "-5")]
fn test_out_of_range_windows_are_errors(#[case] key: &str, #[case] value: &str) {
    assert!(from_pairs(&[(key, value)]).is_err());
}

#[test]
fn test_largest_windows_are_accepted() {
    let max_days = MAX_WAIT_WINDOW_DAYS.to_string();
    let max_secs = MAX_OFFLINE_AFTER_SECONDS.to_string();
    let config = from_pairs(&[
        ("QUEUE_WAIT_WINDOW_DAYS", max_days.as_str()),
        ("PRESENCE_OFFLINE_AFTER_SECONDS", max_secs.as_str()),
    ])
    .unwrap();
    assert_eq!(
        config.wait_window(),
        Some(chrono::Duration::days(MAX_WAIT_WINDOW_DAYS))
    );
    assert_eq!(config.offline_after(), chrono::Duration::days(30));
}
