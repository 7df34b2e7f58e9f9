// ── Runtime connection configuration ──
//
// These types describe *how* to reach a hub and how aggressively to poll
// it. They carry credential data and tuning, but never touch disk. The
// CLI constructs a `HubConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use verasync_api::CloudEndpoints;

/// Where the hub lives and which credentials reach it.
#[derive(Debug, Clone)]
pub enum HubTarget {
    /// Direct LAN access, no authentication.
    Local { host: String, port: u16 },
    /// MiOS account: run the full cloud cascade and pick the variant by UI
    /// version. `device` selects a hub by id or name when the account owns
    /// more than one.
    Cloud {
        username: String,
        password: SecretString,
        device: Option<String>,
    },
    /// Legacy forwarder with a known serial; skips the cascade.
    LegacyCloud {
        username: String,
        password: SecretString,
        serial: u64,
    },
}

impl HubTarget {
    pub fn is_cloud(&self) -> bool {
        !matches!(self, Self::Local { .. })
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). The cloud hosts present public certificates.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Poll loop tuning.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// `minimumdelay` hint sent with every `lu_sdata` poll.
    pub minimum_delay: Duration,
    /// `timeout` hint: how long the hub may hold a poll open.
    pub poll_timeout: Duration,
    /// Pause between successful iterations.
    pub request_pause: Duration,
    /// Backoff unit; the sleep after a failure is `backoff_base * counter`.
    pub backoff_base: Duration,
    /// Cap on the backoff counter.
    pub backoff_ceiling: u32,
    /// Capacity of the notification broadcast channel.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            minimum_delay: Duration::from_millis(500),
            poll_timeout: Duration::from_secs(10),
            request_pause: Duration::from_millis(100),
            backoff_base: Duration::from_secs(2),
            backoff_ceiling: 16,
            event_capacity: 256,
        }
    }
}

/// Configuration for one controller session.
///
/// Built by the CLI, passed to `Controller::connect`; core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub target: HubTarget,
    pub tls: TlsVerification,
    /// Per-request timeout for one-shot calls. Raised automatically above
    /// the long-poll timeout for the hub connection.
    pub timeout: Duration,
    pub sync: SyncConfig,
    /// Cloud authentication endpoints (only used by cloud targets).
    pub cloud: CloudEndpoints,
}

impl HubConfig {
    pub fn local(host: impl Into<String>) -> Self {
        Self {
            target: HubTarget::Local {
                host: host.into(),
                port: verasync_api::DEFAULT_LOCAL_PORT,
            },
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            sync: SyncConfig::default(),
            cloud: CloudEndpoints::default(),
        }
    }
}
