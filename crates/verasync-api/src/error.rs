use std::fmt;

use thiserror::Error;

/// Top-level error type for the `verasync-api` crate.
///
/// Covers every failure mode of the hub transport and the MiOS cloud
/// authentication cascade. `verasync-core` maps these into user-facing
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// A step of the cloud cascade was rejected (non-success status).
    #[error("Authentication failed at {step}: {message}")]
    Authentication { step: AuthStep, message: String },

    /// The identity token could not be decoded into an account id.
    #[error("Invalid identity token: {0}")]
    InvalidIdentity(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error (malformed host, relay host, etc.)
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Hub ─────────────────────────────────────────────────────────
    /// The hub (or relay in front of it) answered with a non-success status.
    #[error("Hub returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error came out of the cloud cascade.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::InvalidIdentity(_))
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Returns `true` if the request timed out (long-poll overrun included).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// The individual exchanges of the MiOS cloud cascade, in required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    Authenticate,
    SessionToken,
    ListDevices,
    DeviceInfo,
    RelaySession,
}

impl fmt::Display for AuthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authenticate",
            Self::SessionToken => "session token",
            Self::ListDevices => "list devices",
            Self::DeviceInfo => "device info",
            Self::RelaySession => "relay session",
        };
        f.write_str(name)
    }
}
