// ── Core error types ──
//
// Errors surfaced by the coordinator. HTTP status codes and JSON failures
// stay in minutly-api; the `From<minutly_api::Error>` impl translates them
// into the three actionable outcomes (reauthenticate, back off, retry)
// plus a catch-all.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Actionable failures ──────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error(
        "Rate limited by the Minut API{}",
        .retry_after_secs.map(|s| format!(" -- retry after {s}s")).unwrap_or_default()
    )]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Cannot reach the Minut API: {reason}")]
    ConnectionFailed { reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Lifecycle ────────────────────────────────────────────────────
    /// The first poll cycle failed, so the host has nothing to show yet.
    #[error("Coordinator not ready: {source}")]
    NotReady {
        #[source]
        source: Box<CoreError>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The innermost error, looking through [`CoreError::NotReady`].
    pub fn root(&self) -> &Self {
        match self {
            Self::NotReady { source } => source.root(),
            other => other,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self.root(), Self::AuthenticationFailed { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.root(), Self::RateLimited { .. })
    }

    /// Transient failures: retry on the next cycle without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.root(),
            Self::ConnectionFailed { .. } | Self::RateLimited { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<minutly_api::Error> for CoreError {
    fn from(err: minutly_api::Error) -> Self {
        use minutly_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::MissingRefreshToken => CoreError::AuthenticationFailed {
                message: "Access token rejected and no refresh token is available".into(),
            },
            ApiError::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            ApiError::Transport(ref e) if e.is_decode() || e.is_builder() => {
                CoreError::Internal(format!("HTTP client error: {e}"))
            }
            ApiError::Transport(e) => CoreError::ConnectionFailed {
                reason: if e.is_timeout() {
                    "request timed out".into()
                } else {
                    e.to_string()
                },
            },
            ApiError::Server { status, message } => CoreError::ConnectionFailed {
                reason: format!("server error (HTTP {status}): {message}"),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::UnexpectedShape { endpoint } => CoreError::Api {
                message: format!("unexpected response shape from {endpoint}"),
                status: None,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
