use super::*;
use std::collections::HashMap;

fn from_pairs(pairs: &[(&str, &str)]) -> ClientConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ClientConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn defaults_when_unset() {
    let config = from_pairs(&[]);
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.reconnect.delay, Duration::from_millis(5000));
}

#[test]
fn reads_overrides() {
    let config = from_pairs(&[
        ("GATHER_API_URL", "https://gather.example/api"),
        ("GATHER_WS_URL", "wss://gather.example/ws"),
        ("GATHER_RECONNECT_DELAY_MS", "1500"),
        ("GATHER_STORAGE_DIR", "/tmp/gather"),
    ]);

    assert_eq!(config.api_url, "https://gather.example/api");
    assert_eq!(config.ws_url, "wss://gather.example/ws");
    assert_eq!(config.reconnect.delay, Duration::from_millis(1500));
    assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/gather")));
}

#[test]
fn invalid_delay_falls_back_to_default() {
    let config = from_pairs(&[("GATHER_RECONNECT_DELAY_MS", "soon")]);
    assert_eq!(config.reconnect.delay, DEFAULT_RECONNECT_DELAY);
}

#[test]
fn empty_values_count_as_unset() {
    let config = from_pairs(&[("GATHER_API_URL", ""), ("GATHER_STORAGE_DIR", "")]);
    assert_eq!(config.api_url, DEFAULT_API_URL);
    assert_eq!(config.storage_dir, None);
}
