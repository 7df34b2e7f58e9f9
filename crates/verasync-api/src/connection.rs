// Hub connection: one base URL, one shared HTTP client.
//
// The three ways of reaching a hub (direct LAN address, the legacy
// `fwd2.mios.com` forwarder, and the UI7 relay) differ only in how the
// base URL is built. Everything the sync engine sends is a `data_request`
// GET relative to that base, so the engine never needs to know which
// variant it holds.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Port the Luup engine listens on when reached over the LAN.
pub const DEFAULT_LOCAL_PORT: u16 = 3480;

const LEGACY_FORWARD_HOST: &str = "fwd2.mios.com";

/// How the hub is reached. Fully determines the base URL.
#[derive(Debug, Clone)]
pub enum ConnectionKind {
    /// Direct LAN access: `http://{host}:{port}/`
    Local { host: String, port: u16 },
    /// UI5/UI6 cloud forwarder: `https://fwd2.mios.com/{user}/{password}/{serial}/`
    LegacyCloud {
        user: String,
        password: SecretString,
        serial: u64,
    },
    /// UI7 relay: `https://{relay}/relay/relay/relay/device/{id}/session/{session}/port_3480/`
    RelayCloud {
        relay_host: String,
        device_id: String,
        relay_session: SecretString,
    },
}

impl ConnectionKind {
    /// Local connection on the default Luup port.
    pub fn local(host: impl Into<String>) -> Self {
        Self::Local {
            host: host.into(),
            port: DEFAULT_LOCAL_PORT,
        }
    }

    /// Short label for logs and CLI output. Never contains secrets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::LegacyCloud { .. } => "legacy-cloud",
            Self::RelayCloud { .. } => "relay-cloud",
        }
    }

    /// Build the base URL every request is resolved against.
    ///
    /// Fails when the parameters do not form a valid URL (e.g. a host
    /// containing whitespace, or an empty relay host). Path components are
    /// escaped, so reserved characters in credentials never change the
    /// endpoint.
    pub fn base_url(&self) -> Result<Url, Error> {
        if let Self::Local { host, .. } | Self::RelayCloud { relay_host: host, .. } = self {
            if host.trim().is_empty() {
                return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
            }
        }

        match self {
            Self::Local { host, port } => Ok(Url::parse(&format!("http://{host}:{port}/"))?),
            Self::LegacyCloud {
                user,
                password,
                serial,
            } => {
                let serial = serial.to_string();
                secure_url(
                    LEGACY_FORWARD_HOST,
                    &[user.as_str(), password.expose_secret(), serial.as_str()],
                )
            }
            Self::RelayCloud {
                relay_host,
                device_id,
                relay_session,
            } => secure_url(
                relay_host,
                &[
                    "relay",
                    "relay",
                    "relay",
                    "device",
                    device_id.as_str(),
                    "session",
                    relay_session.expose_secret(),
                    "port_3480",
                ],
            ),
        }
    }
}

/// `https://{host}/{segments...}/` with every segment percent-escaped, so
/// credentials containing `/`, `?` or `#` stay inside their own segment.
fn secure_url(host: &str, segments: &[&str]) -> Result<Url, Error> {
    let mut url = Url::parse(&format!("https://{host}/"))?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .clear()
        .extend(segments)
        // Trailing empty segment keeps the final '/' so joins stay underneath.
        .push("");
    Ok(url)
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { host, port } => write!(f, "local {host}:{port}"),
            Self::LegacyCloud { user, serial, .. } => {
                write!(f, "legacy cloud {user}@{LEGACY_FORWARD_HOST} (serial {serial})")
            }
            Self::RelayCloud {
                relay_host,
                device_id,
                ..
            } => write!(f, "relay {relay_host} (device {device_id})"),
        }
    }
}

/// Body and metadata of a successful hub request.
#[derive(Debug, Clone)]
pub struct HubResponse {
    /// Request path relative to the base URL (`data_request?id=...`).
    /// Safe to log: the secret-bearing base is never included.
    pub path: String,
    /// `Content-Length` as reported by the hub, if any.
    pub content_length: Option<u64>,
    pub body: String,
}

impl HubResponse {
    /// Payload size: the reported length, or the decoded body length.
    pub fn length(&self) -> u64 {
        self.content_length
            .unwrap_or_else(|| u64::try_from(self.body.len()).unwrap_or(u64::MAX))
    }
}

/// A reachable hub endpoint.
///
/// Immutable after construction and cheap to clone: the inner
/// `reqwest::Client` is reference counted, so the poll loop and one-shot
/// actions share a single connection pool.
#[derive(Clone)]
pub struct Connection {
    kind: ConnectionKind,
    base_url: Url,
    http: reqwest::Client,
}

impl Connection {
    /// Create a connection, building a fresh HTTP client from `transport`.
    pub fn new(kind: ConnectionKind, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(kind, http)
    }

    /// Create a connection around a pre-built `reqwest::Client`.
    pub fn with_client(kind: ConnectionKind, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = kind.base_url()?;
        Ok(Self {
            kind,
            base_url,
            http,
        })
    }

    pub fn kind(&self) -> &ConnectionKind {
        &self.kind
    }

    /// The base URL. For cloud variants this embeds credentials; do not log it.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, ConnectionKind::Local { .. })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// `GET data_request?{params}` relative to the base URL.
    ///
    /// Values are percent-encoded. A non-success status becomes
    /// [`Error::Http`]; no retries happen at this layer.
    pub async fn data_request(&self, params: &[(&str, &str)]) -> Result<HubResponse, Error> {
        let path = format!("data_request?{}", encode_query(params));
        let url = self.base_url.join(&path)?;

        debug!(via = self.kind.label(), "GET {path}");

        // The reqwest error would otherwise carry the full URL, secrets included.
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.without_url()))?;

        let status = resp.status();
        let content_length = resp.content_length();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.without_url()))?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(HubResponse {
            path,
            content_length,
            body,
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Percent-encode query pairs. Spaces become `%20`; Luup does not decode `+`.
fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    // `byte_serialize` escapes a literal '+' as %2B, so every '+' left is a space.
    byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    #[test]
    fn local_base_url() {
        let url = ConnectionKind::local("192.168.1.20").base_url().unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.20:3480/");
    }

    #[test]
    fn legacy_base_url() {
        let kind = ConnectionKind::LegacyCloud {
            user: "alice".into(),
            password: secret("hunter2"),
            serial: 35_012_345,
        };
        assert_eq!(
            kind.base_url().unwrap().as_str(),
            "https://fwd2.mios.com/alice/hunter2/35012345/"
        );
    }

    #[test]
    fn relay_base_url() {
        let kind = ConnectionKind::RelayCloud {
            relay_host: "vera-us-oem-relay41.mios.com".into(),
            device_id: "50012345".into(),
            relay_session: secret("ABCDEF"),
        };
        assert_eq!(
            kind.base_url().unwrap().as_str(),
            "https://vera-us-oem-relay41.mios.com/relay/relay/relay/device/50012345/session/ABCDEF/port_3480/"
        );
    }

    #[test]
    fn relative_requests_stay_under_relay_prefix() {
        let kind = ConnectionKind::RelayCloud {
            relay_host: "relay.example".into(),
            device_id: "1".into(),
            relay_session: secret("S"),
        };
        let joined = kind.base_url().unwrap().join("data_request?id=lu_alive").unwrap();
        assert_eq!(
            joined.as_str(),
            "https://relay.example/relay/relay/relay/device/1/session/S/port_3480/data_request?id=lu_alive"
        );
    }

    #[test]
    fn reserved_characters_in_legacy_password_stay_in_one_segment() {
        let cases = [
            ("pa#ss", "pa%23ss"),
            ("pa?ss", "pa%3Fss"),
            ("pa/ss", "pa%2Fss"),
        ];
        for (password, escaped) in cases {
            let kind = ConnectionKind::LegacyCloud {
                user: "alice".into(),
                password: secret(password),
                serial: 35_012_345,
            };
            let joined = kind.base_url().unwrap().join("data_request?id=lu_alive").unwrap();
            assert_eq!(
                joined.as_str(),
                format!("https://fwd2.mios.com/alice/{escaped}/35012345/data_request?id=lu_alive")
            );
        }
    }

    #[test]
    fn relay_session_is_escaped() {
        let kind = ConnectionKind::RelayCloud {
            relay_host: "relay.example".into(),
            device_id: "1".into(),
            relay_session: secret("a/b?c"),
        };
        assert_eq!(
            kind.base_url().unwrap().as_str(),
            "https://relay.example/relay/relay/relay/device/1/session/a%2Fb%3Fc/port_3480/"
        );
    }

    #[test]
    fn unparsable_host_is_rejected() {
        let kind = ConnectionKind::Local {
            host: "not a host".into(),
            port: 3480,
        };
        let err = Connection::with_client(kind, reqwest::Client::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn empty_relay_host_is_rejected() {
        let kind = ConnectionKind::RelayCloud {
            relay_host: String::new(),
            device_id: "1".into(),
            relay_session: secret("S"),
        };
        assert!(matches!(
            kind.base_url(),
            Err(Error::InvalidUrl(url::ParseError::EmptyHost))
        ));
    }

    #[test]
    fn query_encoding_uses_percent_twenty() {
        let q = encode_query(&[("id", "room"), ("name", "Living Room & Hall+1")]);
        assert_eq!(q, "id=room&name=Living%20Room%20%26%20Hall%2B1");
    }

    #[test]
    fn debug_and_display_hide_secrets() {
        let kind = ConnectionKind::LegacyCloud {
            user: "alice".into(),
            password: secret("hunter2"),
            serial: 7,
        };
        let conn = Connection::with_client(kind, reqwest::Client::new()).unwrap();
        assert!(!format!("{conn:?}").contains("hunter2"));
        assert!(!conn.kind().to_string().contains("hunter2"));
        assert!(!conn.is_local());
    }
}
