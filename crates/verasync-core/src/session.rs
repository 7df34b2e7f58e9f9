// ── Opening a hub connection from runtime config ──

use std::time::Duration;

use tracing::{debug, info};
use verasync_api::{
    AccountDevice, AccountSession, CloudAuthenticator, Connection, ConnectionKind, TlsMode,
    TransportConfig,
};

use crate::config::{HubConfig, HubTarget, TlsVerification};
use crate::error::CoreError;

/// Slack added on top of the long-poll timeout for the HTTP client.
const POLL_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Build the `Connection` described by `config`, running the cloud
/// cascade when the target needs it.
pub async fn open(config: &HubConfig) -> Result<Connection, CoreError> {
    let transport = build_transport(config);

    match &config.target {
        HubTarget::Local { host, port } => {
            let kind = ConnectionKind::Local {
                host: host.clone(),
                port: *port,
            };
            Ok(Connection::new(kind, &transport)?)
        }
        HubTarget::LegacyCloud {
            username,
            password,
            serial,
        } => {
            let kind = ConnectionKind::LegacyCloud {
                user: username.clone(),
                password: password.clone(),
                serial: *serial,
            };
            Ok(Connection::new(kind, &transport)?)
        }
        HubTarget::Cloud { device, .. } => {
            let session = account_session(config).await?;
            let devices = session.list_devices().await?;
            let hub = select_device(&devices, device.as_deref())?;
            info!(device = %hub.device_id, name = %hub.name, "selected hub");
            Ok(session.connect(hub, &transport).await?)
        }
    }
}

/// Run the first two cascade steps for a cloud target.
pub async fn account_session(config: &HubConfig) -> Result<AccountSession, CoreError> {
    let (username, password) = match &config.target {
        HubTarget::Cloud {
            username, password, ..
        }
        | HubTarget::LegacyCloud {
            username, password, ..
        } => (username, password),
        HubTarget::Local { .. } => {
            return Err(CoreError::Config {
                message: "cloud commands need a cloud profile (username and password)".into(),
            });
        }
    };

    // The cascade itself is plain request/response; keep the short timeout.
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        ..TransportConfig::default()
    };
    let authenticator = CloudAuthenticator::new(username.clone(), password.clone(), &transport)?
        .with_endpoints(config.cloud.clone());

    let identity = authenticator.authenticate().await?;
    debug!(account = identity.account_id(), "identity token acquired");
    Ok(identity.session().await?)
}

/// Pick a hub from the account's device list.
///
/// With no selector the account must own exactly one hub (the first
/// unblocked one is taken if there are several).
pub fn select_device<'a>(
    devices: &'a [AccountDevice],
    selector: Option<&str>,
) -> Result<&'a AccountDevice, CoreError> {
    match selector {
        Some(wanted) => devices
            .iter()
            .find(|d| d.device_id == wanted || d.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::NoHubDevice {
                selector: wanted.to_owned(),
            }),
        None => devices
            .iter()
            .find(|d| !d.blocked)
            .or_else(|| devices.first())
            .ok_or_else(|| CoreError::NoHubDevice {
                selector: "<any>".into(),
            }),
    }
}

fn build_transport(config: &HubConfig) -> TransportConfig {
    let poll_floor = config.sync.poll_timeout + POLL_TIMEOUT_SLACK;
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout.max(poll_floor),
        ..TransportConfig::default()
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
