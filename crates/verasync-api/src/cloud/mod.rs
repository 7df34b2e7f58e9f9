// MiOS cloud authentication cascade
//
// credentials -> identity token -> session token -> (device list, device
// info) -> optional relay session -> `Connection`.
//
// Each stage is its own type and is only constructed once the previous
// exchange fully succeeded, so a session token can never be requested
// without an identity, and no half-authenticated state is ever handed out.
// Re-authentication is a fresh `CloudAuthenticator::authenticate()`.

mod models;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use sha1::{Digest, Sha1};
use tracing::{debug, info};
use url::Url;

pub use models::{AccountDevice, DeviceInfo};

use crate::connection::{Connection, ConnectionKind};
use crate::error::{AuthStep, Error};
use crate::transport::TransportConfig;
use models::{AuthResponse, DevicesResponse, IdentityClaims};

/// Host of the MiOS OEM authentication service.
pub const DEFAULT_AUTH_HOST: &str = "vera-us-oem-autha.mios.com";

/// Hubs reporting this UI version or newer are reached through the relay.
pub const RELAY_MIN_UI_VERSION: u32 = 7;

const PASSWORD_SEED: &str = "oZ7QE6LcLJp6fiWzdqZc";

/// Where the cascade sends its requests.
///
/// Only the authentication host is fixed; every later host is handed out
/// by the previous step. The scheme is configurable so the whole cascade
/// can run against a plain-HTTP mock server.
#[derive(Debug, Clone)]
pub struct CloudEndpoints {
    pub auth_host: String,
    pub scheme: String,
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            auth_host: DEFAULT_AUTH_HOST.into(),
            scheme: "https".into(),
        }
    }
}

impl CloudEndpoints {
    /// Build `{scheme}://{host}/{segments...}` with each segment escaped.
    fn url(&self, host: &str, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}://{host}/", self.scheme))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.clear().extend(segments);
        }
        Ok(url)
    }
}

/// `lower_hex(sha1(username + password + seed))`, as the auth host expects.
pub fn password_hash(username: &str, password: &SecretString) -> String {
    let mut hasher = Sha1::new();
    hasher.update(username.as_bytes());
    hasher.update(password.expose_secret().as_bytes());
    hasher.update(PASSWORD_SEED.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract `PK_Account` from a base64-encoded JSON identity token.
pub fn decode_account_id(identity: &str) -> Result<u64, Error> {
    let raw = STANDARD
        .decode(identity.trim())
        .map_err(|e| Error::InvalidIdentity(format!("not base64: {e}")))?;
    let claims: IdentityClaims = serde_json::from_slice(&raw)
        .map_err(|e| Error::InvalidIdentity(format!("not an identity document: {e}")))?;
    Ok(claims.account_id)
}

// ── Stage 0: credentials ────────────────────────────────────────────

/// Entry point of the cascade: MiOS account credentials.
pub struct CloudAuthenticator {
    http: reqwest::Client,
    endpoints: CloudEndpoints,
    username: String,
    password: SecretString,
}

impl CloudAuthenticator {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self::with_client(
            transport.build_client()?,
            username,
            password,
        ))
    }

    /// Create an authenticator around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            endpoints: CloudEndpoints::default(),
            username: username.into(),
            password,
        }
    }

    /// Override the authentication host and scheme.
    pub fn with_endpoints(mut self, endpoints: CloudEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Step 1: exchange credentials for an identity token.
    pub async fn authenticate(&self) -> Result<IdentitySession, Error> {
        let mut url = self.endpoints.url(
            &self.endpoints.auth_host,
            &["autha", "auth", "username", &self.username],
        )?;
        url.query_pairs_mut()
            .append_pair("SHA1Password", &password_hash(&self.username, &self.password))
            .append_pair("PK_Oem", "1");

        debug!(user = %self.username, host = %self.endpoints.auth_host, "authenticating");

        let body = fetch(AuthStep::Authenticate, self.http.get(url)).await?;
        let auth: AuthResponse = parse(&body)?;
        let account_id = decode_account_id(&auth.identity)?;

        info!(account_id, server = %auth.server_account, "identity token obtained");

        Ok(IdentitySession {
            http: self.http.clone(),
            endpoints: self.endpoints.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            identity: SecretString::from(auth.identity),
            identity_signature: SecretString::from(auth.identity_signature),
            account_server: auth.server_account,
            account_id,
        })
    }
}

// ── Stage 1: identity ───────────────────────────────────────────────

/// An authenticated MiOS identity (token + signature + account server).
pub struct IdentitySession {
    http: reqwest::Client,
    endpoints: CloudEndpoints,
    username: String,
    password: SecretString,
    identity: SecretString,
    identity_signature: SecretString,
    account_server: String,
    account_id: u64,
}

impl IdentitySession {
    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    /// Host of the account server assigned to this identity.
    pub fn account_server(&self) -> &str {
        &self.account_server
    }

    /// Step 2: obtain a session token from the account server.
    pub async fn session(self) -> Result<AccountSession, Error> {
        let token = self
            .signed_token(AuthStep::SessionToken, &self.account_server)
            .await?;

        debug!(account_id = self.account_id, "session token obtained");

        Ok(AccountSession {
            identity: self,
            session_token: token,
        })
    }

    /// `GET {host}/info/session/token` signed with the identity headers.
    async fn signed_token(&self, step: AuthStep, host: &str) -> Result<SecretString, Error> {
        let url = self.endpoints.url(host, &["info", "session", "token"])?;
        let req = self
            .http
            .get(url)
            .header("MMSAuth", self.identity.expose_secret())
            .header("MMSAuthSig", self.identity_signature.expose_secret());

        let body = fetch(step, req).await?;
        let token = body.trim();
        if token.is_empty() {
            return Err(Error::Authentication {
                step,
                message: "empty token in response".into(),
            });
        }
        Ok(SecretString::from(token.to_owned()))
    }
}

// ── Stage 2: account session ────────────────────────────────────────

/// A MiOS account session: can list hubs and open connections to them.
pub struct AccountSession {
    identity: IdentitySession,
    session_token: SecretString,
}

impl AccountSession {
    pub fn account_id(&self) -> u64 {
        self.identity.account_id
    }

    /// Step 3: hubs registered to this account.
    pub async fn list_devices(&self) -> Result<Vec<AccountDevice>, Error> {
        let account_id = self.identity.account_id.to_string();
        let url = self.identity.endpoints.url(
            &self.identity.account_server,
            &["account", "account", "account", &account_id, "devices"],
        )?;
        let req = self
            .identity
            .http
            .get(url)
            .header("MMSSession", self.session_token.expose_secret());

        let body = fetch(AuthStep::ListDevices, req).await?;
        let resp: DevicesResponse = parse(&body)?;

        debug!(count = resp.devices.len(), "account devices listed");
        Ok(resp.devices)
    }

    /// Step 4: extended information for one hub, including its UI version.
    pub async fn device_info(&self, device: &AccountDevice) -> Result<DeviceInfo, Error> {
        let url = self.identity.endpoints.url(
            &device.server_device,
            &["device", "device", "device", &device.device_id],
        )?;
        let req = self
            .identity
            .http
            .get(url)
            .header("MMSSession", self.session_token.expose_secret());

        let body = fetch(AuthStep::DeviceInfo, req).await?;
        let info: DeviceInfo = parse(&body)?;

        debug!(
            device = %info.device_id,
            ui = info.ui_version,
            relay = info.server_relay.as_deref().unwrap_or("-"),
            "device info obtained"
        );
        Ok(info)
    }

    /// Step 5: a relay session token scoped to the hub's relay host.
    ///
    /// Only valid for UI7+ hubs; older hubs are rejected without any
    /// request being sent.
    pub async fn relay_session(&self, info: &DeviceInfo) -> Result<SecretString, Error> {
        if !info.uses_relay() {
            return Err(Error::Authentication {
                step: AuthStep::RelaySession,
                message: format!(
                    "hub {} reports UI{}; relay sessions need UI{RELAY_MIN_UI_VERSION} or newer",
                    info.device_id, info.ui_version
                ),
            });
        }
        let relay = relay_host(info)?;
        self.identity
            .signed_token(AuthStep::RelaySession, relay)
            .await
    }

    /// Steps 4 and 5 plus the variant decision: how to reach `device`.
    pub async fn connection_kind(&self, device: &AccountDevice) -> Result<ConnectionKind, Error> {
        let info = self.device_info(device).await?;

        if info.uses_relay() {
            let relay_session = self.relay_session(&info).await?;
            info!(device = %device.device_id, "using relay connection");
            return Ok(ConnectionKind::RelayCloud {
                relay_host: relay_host(&info)?.to_owned(),
                device_id: device.device_id.clone(),
                relay_session,
            });
        }

        let serial = device.device_id.trim().parse().map_err(|_| Error::Authentication {
            step: AuthStep::DeviceInfo,
            message: format!("hub serial {:?} is not numeric", device.device_id),
        })?;
        info!(device = %device.device_id, ui = info.ui_version, "using legacy forwarder");
        Ok(ConnectionKind::LegacyCloud {
            user: self.identity.username.clone(),
            password: self.identity.password.clone(),
            serial,
        })
    }

    /// Run the remaining cascade for `device` and open a `Connection` to it.
    pub async fn connect(
        &self,
        device: &AccountDevice,
        transport: &TransportConfig,
    ) -> Result<Connection, Error> {
        let kind = self.connection_kind(device).await?;
        Connection::new(kind, transport)
    }
}

// ── Request helpers ─────────────────────────────────────────────────

fn relay_host(info: &DeviceInfo) -> Result<&str, Error> {
    info.server_relay.as_deref().ok_or_else(|| Error::Authentication {
        step: AuthStep::RelaySession,
        message: format!("hub {} has no relay server assigned", info.device_id),
    })
}

/// Send one cascade request; any non-success status aborts with `step`.
async fn fetch(step: AuthStep, req: reqwest::RequestBuilder) -> Result<String, Error> {
    // Drop the URL: the auth request carries the password hash in its query.
    let resp = req.send().await.map_err(|e| Error::Transport(e.without_url()))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::Transport(e.without_url()))?;

    if !status.is_success() {
        return Err(Error::Authentication {
            step,
            message: format!("HTTP {status}: {body}"),
        });
    }
    Ok(body)
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: body.to_owned(),
    })
}
