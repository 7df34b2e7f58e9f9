//! CLI configuration: thin wrapper around `verasync_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--host, --device, --insecure, ...).

use std::time::Duration;

use verasync_core::{HubConfig, HubTarget, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use verasync_config::{
    Config, ConnectMode, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `HubConfig` from the config file, profile, and CLI overrides.
pub fn build_hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, &cfg, global);
    }

    // An explicitly named profile must exist
    if global.profile.is_some() {
        return Err(profile_not_found(&profile_name, &cfg));
    }

    // No profile -- a bare --host is enough for a LAN hub
    let host = global.host.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;

    let mut config = HubConfig::local(host);
    if let HubTarget::Local { ref mut port, .. } = config.target {
        *port = global.port.unwrap_or(*port);
    }
    if global.insecure || cfg.defaults.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    config.timeout = Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout));
    Ok(config)
}

/// Translate a `Profile` + global flags into a `HubConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<HubConfig, CliError> {
    let mut profile = profile.clone();

    if let Some(ref host) = global.host {
        profile.mode = ConnectMode::Local;
        profile.host = Some(host.clone());
    }
    if global.port.is_some() {
        profile.port = global.port;
    }
    if global.device.is_some() {
        profile.device.clone_from(&global.device);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok(verasync_config::profile_to_hub_config(
        &profile,
        profile_name,
        &cfg.defaults,
    )?)
}

pub fn profile_not_found(name: &str, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}
