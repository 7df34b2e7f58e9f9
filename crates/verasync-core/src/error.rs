// ── Core error types ──
//
// User-facing errors from verasync-core. Transport details (raw status
// codes, reqwest internals) are folded into domain variants by the
// `From<verasync_api::Error>` impl below.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Hub request timed out")]
    Timeout,

    // ── Precondition errors ──────────────────────────────────────────
    #[error("Hub at {target} is unreachable: {reason}")]
    HubUnreachable { target: String, reason: String },

    #[error("Cannot {operation} while the sync loop is running")]
    ListenerRunning { operation: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Hub rejected the request: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Room not found: {id}")]
    RoomNotFound { id: u32 },

    #[error("No hub registered to this account matches '{selector}'")]
    NoHubDevice { selector: String },

    // ── Protocol / API errors ────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// Malformed or unexpected response body.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for failures the poll loop expects to recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout | Self::HubUnreachable { .. }
        ) || matches!(self, Self::Api { status: Some(502..=504), .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<verasync_api::Error> for CoreError {
    fn from(err: verasync_api::Error) -> Self {
        match err {
            verasync_api::Error::Authentication { step, message } => {
                CoreError::AuthenticationFailed {
                    message: format!("{step}: {message}"),
                }
            }
            verasync_api::Error::InvalidIdentity(message) => CoreError::AuthenticationFailed {
                message: format!("invalid identity token: {message}"),
            },
            verasync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            verasync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid hub address: {e}"),
            },
            verasync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            verasync_api::Error::Http { status, body } => CoreError::Api {
                message: if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {}", body.trim())
                },
                status: Some(status),
            },
            verasync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Protocol { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verasync_api::AuthStep;

    #[test]
    fn http_errors_keep_their_status() {
        let err = CoreError::from(verasync_api::Error::Http {
            status: 503,
            body: "busy\n".into(),
        });
        assert!(matches!(err, CoreError::Api { status: Some(503), .. }));
        assert_eq!(err.to_string(), "API error: HTTP 503: busy");
        assert!(err.is_transient());
    }

    #[test]
    fn auth_errors_name_the_step() {
        let err = CoreError::from(verasync_api::Error::Authentication {
            step: AuthStep::SessionToken,
            message: "HTTP 401".into(),
        });
        assert_eq!(err.to_string(), "Authentication failed: session token: HTTP 401");
        assert!(!err.is_transient());
    }
}
