//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use verasync_config::ConfigError;
use verasync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the hub: {reason}")]
    #[diagnostic(
        code(verasync::connection_failed),
        help(
            "Check that the hub is powered and reachable.\n\
             For a LAN hub try: verasync status --host <address>"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Hub at {target} is unreachable: {reason}")]
    #[diagnostic(
        code(verasync::hub_unreachable),
        help("The hub may be rebooting or still loading its Luup engine. Try again shortly.")
    )]
    HubUnreachable { target: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("MiOS authentication failed: {message}")]
    #[diagnostic(
        code(verasync::auth_failed),
        help(
            "Verify the account name and password.\n\
             Run: verasync config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(verasync::no_credentials),
        help(
            "Configure credentials with: verasync config init\n\
             Or set VERASYNC_USERNAME and VERASYNC_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(verasync::not_found),
        help("Run: verasync {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Hub responses ────────────────────────────────────────────────
    #[error("The hub rejected the request: {message}")]
    #[diagnostic(code(verasync::rejected))]
    Rejected { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(verasync::api_error))]
    ApiError { message: String },

    #[error("Unexpected hub response: {message}")]
    #[diagnostic(
        code(verasync::protocol),
        help("Run with -vv to see the raw requests.")
    )]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(verasync::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot {operation} while the sync loop is running")]
    #[diagnostic(code(verasync::busy))]
    Busy { operation: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(verasync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: verasync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(verasync::no_config),
        help(
            "Create one with: verasync config init\n\
             Or point at a hub directly with --host.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(verasync::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Hub request timed out")]
    #[diagnostic(
        code(verasync::timeout),
        help("Increase the timeout with --timeout or check the hub's responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::HubUnreachable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Busy { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::HubUnreachable { target, reason } => {
                CliError::HubUnreachable { target, reason }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::ListenerRunning { operation } => CliError::Busy { operation },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::RoomNotFound { id } => CliError::NotFound {
                resource_type: "room".into(),
                identifier: id.to_string(),
                list_command: "rooms list".into(),
            },

            CoreError::NoHubDevice { selector } => CliError::NotFound {
                resource_type: "hub".into(),
                identifier: selector,
                list_command: "cloud devices".into(),
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
