//! Configuration for the verasync CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `verasync_core::HubConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use verasync_core::{CloudEndpoints, HubConfig, HubTarget, SyncConfig, TlsVerification};

/// Service name under which passwords are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "verasync";

/// Environment variable consulted for the account password.
pub const PASSWORD_ENV: &str = "VERASYNC_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// How a profile reaches its hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    /// Direct LAN address.
    #[default]
    Local,
    /// MiOS account, full authentication cascade.
    Cloud,
    /// Legacy forwarder with a known serial.
    Legacy,
}

/// A named hub profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub mode: ConnectMode,

    /// Hub address for `local` mode.
    pub host: Option<String>,

    /// Hub port for `local` mode (defaults to 3480).
    pub port: Option<u16>,

    /// MiOS account name for `cloud` and `legacy` modes.
    pub username: Option<String>,

    /// Plaintext password. Keyring or env var is preferred.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Hub id or name to pick from the account (`cloud` mode).
    pub device: Option<String>,

    /// Hub serial (`legacy` mode).
    pub serial: Option<u64>,

    /// Authentication host override.
    pub auth_host: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// How long the hub may hold a poll open (seconds).
    pub poll_timeout: Option<u64>,

    /// `minimumdelay` hint for polls (milliseconds).
    pub minimum_delay_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "verasync", "verasync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("verasync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + `VERASYNC_` environment variables.
///
/// Nested keys use a double underscore:
/// `VERASYNC_PROFILES__HOME__HOST=10.0.0.2`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VERASYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// Resolve the account username: profile, then `VERASYNC_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("VERASYNC_USERNAME").ok())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the account password without CLI flags.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var (profile-specific name first)
    let env_name = profile.password_env.as_deref().unwrap_or(PASSWORD_ENV);
    if let Ok(pw) = std::env::var(env_name) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve where a profile's hub lives.
pub fn resolve_target(profile: &Profile, profile_name: &str) -> Result<HubTarget, ConfigError> {
    match profile.mode {
        ConnectMode::Local => {
            let host = profile
                .host
                .clone()
                .filter(|h| !h.trim().is_empty())
                .ok_or_else(|| ConfigError::Validation {
                    field: "host".into(),
                    reason: format!("profile '{profile_name}' is local but has no host"),
                })?;
            Ok(HubTarget::Local {
                host,
                port: profile.port.unwrap_or(verasync_core::DEFAULT_LOCAL_PORT),
            })
        }
        ConnectMode::Cloud => Ok(HubTarget::Cloud {
            username: resolve_username(profile, profile_name)?,
            password: resolve_password(profile, profile_name)?,
            device: profile.device.clone(),
        }),
        ConnectMode::Legacy => {
            let serial = profile.serial.ok_or_else(|| ConfigError::Validation {
                field: "serial".into(),
                reason: format!("profile '{profile_name}' is legacy but has no serial"),
            })?;
            Ok(HubTarget::LegacyCloud {
                username: resolve_username(profile, profile_name)?,
                password: resolve_password(profile, profile_name)?,
                serial,
            })
        }
    }
}

/// Build a `HubConfig` from a profile, no CLI flag overrides.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let target = resolve_target(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut sync = SyncConfig::default();
    if let Some(secs) = profile.poll_timeout {
        sync.poll_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = profile.minimum_delay_ms {
        sync.minimum_delay = Duration::from_millis(ms);
    }

    let mut cloud = CloudEndpoints::default();
    if let Some(ref host) = profile.auth_host {
        cloud.auth_host.clone_from(host);
    }

    Ok(HubConfig {
        target,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        sync,
        cloud,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn local_profile_needs_a_host() {
        let profile = Profile::default();
        let err = resolve_target(&profile, "home").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "host"));
    }

    #[test]
    fn legacy_profile_needs_a_serial() {
        let profile = Profile {
            mode: ConnectMode::Legacy,
            username: Some("alice".into()),
            ..Profile::default()
        };
        let err = resolve_target(&profile, "cabin").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "serial"));
    }

    #[test]
    fn local_profile_translates_to_hub_config() {
        let profile = Profile {
            host: Some("192.168.1.50".into()),
            timeout: Some(5),
            poll_timeout: Some(20),
            ca_cert: Some("/etc/ssl/vera.pem".into()),
            ..Profile::default()
        };
        let config = profile_to_hub_config(&profile, "home", &Defaults::default()).unwrap();

        match config.target {
            HubTarget::Local { host, port } => {
                assert_eq!(host, "192.168.1.50");
                assert_eq!(port, 3480);
            }
            other => panic!("expected local target, got {other:?}"),
        }
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.sync.poll_timeout, Duration::from_secs(20));
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ssl/vera.pem".into()));
        assert_eq!(config.cloud.auth_host, verasync_core::DEFAULT_AUTH_HOST);
    }
}
