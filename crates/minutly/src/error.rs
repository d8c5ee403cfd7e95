//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use minutly_config::ConfigError;
use minutly_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const RATE_LIMITED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Minut API: {reason}")]
    #[diagnostic(
        code(minutly::connection_failed),
        help(
            "Check your network connection and the profile's base_url.\n\
             Try: minutly devices -v"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(minutly::timeout),
        help("Increase timeout with --timeout or check API responsiveness.")
    )]
    Timeout,

    #[error("Rate limited by the Minut API")]
    #[diagnostic(
        code(minutly::rate_limited),
        help("{hint}")
    )]
    RateLimited { hint: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(minutly::auth_failed),
        help(
            "Verify your credentials, then log in again.\n\
             Run: minutly login --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(minutly::no_credentials),
        help(
            "Log in with: minutly login\n\
             Or set MINUTLY_ACCESS_TOKEN / MINUTLY_USERNAME + MINUTLY_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(minutly::not_found),
        help("Run: minutly {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(minutly::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(minutly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(minutly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: minutly config set username <email> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(minutly::config))]
    Config(Box<figment::Error>),

    #[error("System keyring unavailable: {reason}")]
    #[diagnostic(
        code(minutly::keyring),
        help("Set credentials through MINUTLY_* environment variables instead.")
    )]
    Keyring { reason: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::RateLimited { .. } => exit_code::RATE_LIMITED,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to authentication failures.
    pub fn for_profile(self, profile_name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile_name.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::RateLimited { retry_after_secs } => CliError::RateLimited {
                hint: retry_after_secs.map_or_else(
                    || "Wait a moment before retrying, or widen scan_interval.".into(),
                    |secs| format!("Retry after {secs}s, or widen scan_interval."),
                ),
            },

            CoreError::ConnectionFailed { reason } if reason == "request timed out" => {
                CliError::Timeout
            }

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unexpected".into(), |s| s.to_string()),
                message,
            },

            CoreError::NotReady { source } => CliError::from(*source),

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<minutly_api::Error> for CliError {
    fn from(err: minutly_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Load(e) => CliError::Config(Box::new(e)),
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialize(e) => CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            },
        }
    }
}
