use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers to decide
/// between prompting for credentials, backing off, or simply retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials or token invalid/revoked. Not retryable without re-auth.
    Auth,
    /// HTTP 429. The caller must back off.
    RateLimit,
    /// Timeout, DNS, connection failure or 5xx. Retryable next cycle.
    Connect,
    /// Anything else.
    Other,
}

/// Top-level error type for the `minutly-api` crate.
///
/// Covers every failure mode of the vendor API: authentication,
/// rate limiting, transport, and malformed payloads. `minutly-core`
/// maps these into coordinator-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// 401/403 from any endpoint, or a token response without an access token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A refresh was requested but the token set carries no refresh token.
    #[error("No refresh token available -- re-authentication required")]
    MissingRefreshToken,

    // ── Rate limiting ───────────────────────────────────────────────
    /// HTTP 429. `retry_after_secs` comes from the `Retry-After` header.
    #[error(
        "Rate limited{}",
        .retry_after_secs.map(|s| format!(" -- retry after {s}s")).unwrap_or_default()
    )]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 5xx from the vendor API.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Any other non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// JSON was valid but matched none of the tolerated shapes.
    #[error("Unexpected response shape from {endpoint}")]
    UnexpectedShape { endpoint: String },
}

impl Error {
    /// Classify this error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } | Self::MissingRefreshToken => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Transport(e) if !(e.is_decode() || e.is_builder()) => ErrorKind::Connect,
            Self::Server { .. } => ErrorKind::Connect,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimit
    }

    /// Returns `true` for transient failures worth retrying next cycle.
    pub fn is_connect_error(&self) -> bool {
        self.kind() == ErrorKind::Connect
    }

    /// Returns `true` if the request never produced an HTTP response
    /// (timeout, DNS, refused connection).
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Transport(e) if !(e.is_decode() || e.is_builder()))
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_variants_classify_as_auth() {
        let err = Error::Authentication {
            message: "HTTP 401".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(Error::MissingRefreshToken.is_auth_error());
    }

    #[test]
    fn server_errors_are_connect_errors() {
        let err = Error::Server {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_connect_error());
        assert!(!err.is_network_failure());
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn rate_limit_message_includes_retry_hint() {
        let err = Error::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limited -- retry after 30s");
        let bare = Error::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(bare.to_string(), "Rate limited");
    }

    #[test]
    fn not_found_only_matches_404_api_errors() {
        let nf = Error::Api {
            status: 404,
            message: "missing".into(),
        };
        assert!(nf.is_not_found());
        assert_eq!(nf.kind(), ErrorKind::Other);
        let other = Error::Api {
            status: 400,
            message: "bad".into(),
        };
        assert!(!other.is_not_found());
    }
}
