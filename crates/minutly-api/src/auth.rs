use secrecy::{ExposeSecret, SecretString};

/// OAuth2 token set for the Minut API.
///
/// Created by [`MinutClient::password_login`](crate::MinutClient::password_login)
/// or supplied directly by the host (tokens copied from the web dashboard).
/// A refresh never mutates an existing value: it returns a new `Tokens`
/// and the holder decides how to propagate and persist it.
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user_id: Option<String>,
}

impl Tokens {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: None,
            user_id: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Whether both values carry the same access token. Used to detect
    /// that another task already rotated the token.
    pub fn same_access_token(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
    }
}

/// Body of a successful `/oauth/token` response.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Numeric on some accounts, string on others.
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

impl TokenResponse {
    pub(crate) fn user_id_string(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
