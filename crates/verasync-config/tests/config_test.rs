#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::time::Duration;

use pretty_assertions::assert_eq;
use verasync_config::{
    Config, ConfigError, ConnectMode, Defaults, Profile, load_config_from, profile_to_hub_config,
    save_config_to,
};
use verasync_core::{HubTarget, TlsVerification};

// ── Helpers ─────────────────────────────────────────────────────────

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.default_profile.as_deref(), Some("default"));
    assert_eq!(config.defaults.output, "table");
    assert_eq!(config.defaults.timeout, 30);
    assert!(config.profiles.is_empty());
}

#[test]
fn profiles_parse_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
default_profile = "home"

[defaults]
output = "json"
insecure = true

[profiles.home]
host = "192.168.1.50"
port = 3481
minimum_delay_ms = 250

[profiles.cabin]
mode = "cloud"
username = "alice"
password = "hunter2"
device = "Cabin"
"#,
    );

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("home"));
    assert_eq!(config.defaults.output, "json");
    assert!(config.defaults.insecure);

    let home = &config.profiles["home"];
    assert_eq!(home.mode, ConnectMode::Local);
    assert_eq!(home.port, Some(3481));

    let cabin = &config.profiles["cabin"];
    assert_eq!(cabin.mode, ConnectMode::Cloud);
    assert_eq!(cabin.device.as_deref(), Some("Cabin"));

    let hub = profile_to_hub_config(home, "home", &config.defaults).unwrap();
    match hub.target {
        HubTarget::Local { ref host, port } => {
            assert_eq!(host, "192.168.1.50");
            assert_eq!(port, 3481);
        }
        ref other => panic!("expected local target, got {other:?}"),
    }
    assert_eq!(hub.tls, TlsVerification::DangerAcceptInvalid);
    assert_eq!(hub.sync.minimum_delay, Duration::from_millis(250));
}

#[test]
fn unknown_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[profiles.bad]
mode = "bluetooth"
host = "10.0.0.2"
"#,
    );

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)));
}

#[test]
fn cloud_profile_without_username_reports_missing_credentials() {
    let profile = Profile {
        mode: ConnectMode::Cloud,
        username: Some("   ".into()),
        password: Some("secret".into()),
        ..Profile::default()
    };

    let err = profile_to_hub_config(&profile, "cabin", &Defaults::default()).unwrap_err();
    assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "cabin"));
}

// ── Saving ──────────────────────────────────────────────────────────

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut profiles = HashMap::new();
    profiles.insert(
        "home".to_string(),
        Profile {
            host: Some("vera.lan".into()),
            timeout: Some(12),
            ..Profile::default()
        },
    );
    let config = Config {
        default_profile: Some("home".into()),
        defaults: Defaults::default(),
        profiles,
    };

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    assert_eq!(loaded.default_profile.as_deref(), Some("home"));
    let home = &loaded.profiles["home"];
    assert_eq!(home.host.as_deref(), Some("vera.lan"));
    assert_eq!(home.timeout, Some(12));
    assert_eq!(home.mode, ConnectMode::Local);
}
