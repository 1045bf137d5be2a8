use officehours_client::config::ClientConfig;
use officehours_core::models::actor::Role;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

fn from_pairs(pairs: &[(&str, &str)]) -> eyre::Result<ClientConfig> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ClientConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults_and_derived_ws_url() {
    let user = Uuid::new_v4().to_string();
    let config = from_pairs(&[
        ("OFFICEHOURS_API_URL", "https://hours.example.edu/"),
        ("OFFICEHOURS_USER_ID", user.as_str()),
    ])
    .unwrap();

    assert_eq!(config.api_url, "https://hours.example.edu");
    assert_eq!(config.ws_url, "wss://hours.example.edu/ws");
    assert_eq!(config.role, Role::Student);
    assert_eq!(config.debounce, Duration::from_millis(150));
    assert_eq!(config.reconnect_delay, Duration::from_millis(2000));
}

#[test]
fn test_explicit_values() {
    let user = Uuid::new_v4();
    let user_text = user.to_string();
    let config = from_pairs(&[
        ("OFFICEHOURS_WS_URL", "ws://127.0.0.1:9000/ws"),
        ("OFFICEHOURS_USER_ID", user_text.as_str()),
        ("OFFICEHOURS_ROLE", "Instructor"),
        ("OFFICEHOURS_DEBOUNCE_MS", "20"),
    ])
    .unwrap();

    assert_eq!(config.api_url, "http://localhost:3000");
    assert_eq!(config.ws_url, "ws://127.0.0.1:9000/ws");
    assert!(config.actor().can_teach());
    assert_eq!(config.actor().user_id, user);
    assert_eq!(config.debounce, Duration::from_millis(20));
}

#[test]
fn test_missing_or_invalid_values() {
    assert!(from_pairs(&[]).is_err());
    assert!(from_pairs(&[("OFFICEHOURS_USER_ID", "me")]).is_err());

    let user = Uuid::new_v4().to_string();
    assert!(from_pairs(&[
        ("OFFICEHOURS_USER_ID", user.as_str()),
        ("OFFICEHOURS_ROLE", "dean"),
    ])
    .is_err());
    assert!(from_pairs(&[
        ("OFFICEHOURS_USER_ID", user.as_str()),
        ("OFFICEHOURS_API_URL", "ftp://files"),
    ])
    .is_err());
}
