// Minut API HTTP client
//
// Wraps a host-owned `reqwest::Client` with endpoint resolution, bearer
// authentication and status classification. Endpoint families (login,
// devices, values, timeline) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Tokens;
use crate::endpoints::Endpoints;
use crate::error::Error;
use crate::transport::{DEFAULT_TIMEOUT, TransportConfig};

/// Default page size for per-device timeline requests.
pub const DEFAULT_TIMELINE_LIMIT: u32 = 20;
/// Default page size for the account-wide timeline.
pub const DEFAULT_ACCOUNT_TIMELINE_LIMIT: u32 = 200;

/// Settings for a [`MinutClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    /// Applied to every request, independent of the pool's own timeout.
    pub request_timeout: Duration,
    /// Optional OAuth client id sent with token grants.
    pub client_id: Option<String>,
    pub timeline_limit: u32,
    pub account_timeline_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_TIMEOUT,
            client_id: None,
            timeline_limit: DEFAULT_TIMELINE_LIMIT,
            account_timeline_limit: DEFAULT_ACCOUNT_TIMELINE_LIMIT,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stateless client for the Minut dashboard API.
///
/// Holds no tokens: every authenticated call takes the caller's
/// [`Tokens`], and refreshes return a new value instead of mutating.
#[derive(Debug, Clone)]
pub struct MinutClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MinutClient {
    /// Wrap a shared connection pool owned by the host.
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Build a dedicated pool from `transport` and wrap it.
    pub fn from_transport(transport: &TransportConfig, config: ClientConfig) -> Result<Self, Error> {
        Ok(Self::new(transport.build_client()?, config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.config.endpoints
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET returning the parsed JSON body.
    pub(crate) async fn get_json(
        &self,
        url: Url,
        params: &[(&str, String)],
        tokens: &Tokens,
    ) -> Result<Value, Error> {
        debug!("GET {url} params={params:?}");

        let req = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(tokens.access_token.expose_secret());
        self.send(req).await
    }

    /// Unauthenticated form POST returning the parsed JSON body.
    pub(crate) async fn post_form(
        &self,
        url: Url,
        form: &[(&str, &str)],
    ) -> Result<Value, Error> {
        debug!("POST {url}");

        let req = self.http.post(url).form(form);
        self.send(req).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, Error> {
        let resp = req
            .header(ACCEPT, "application/json")
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        handle_response(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Map a non-2xx response onto the error taxonomy.
async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Error::Authentication {
                message: format!("HTTP {}", status.as_u16()),
            };
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Error::RateLimited { retry_after_secs };
        }
        _ => {}
    }

    let raw = resp.text().await.unwrap_or_default();
    let message = error_message(&raw).unwrap_or_else(|| status.to_string());

    if status.is_server_error() {
        Error::Server {
            status: status.as_u16(),
            message,
        }
    } else {
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull a human message out of an error body, JSON or plain text.
fn error_message(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        for key in ["error_description", "message", "error"] {
            if let Some(Value::String(msg)) = map.get(key) {
                return Some(msg.clone());
            }
        }
    }
    Some(raw.chars().take(200).collect())
}
