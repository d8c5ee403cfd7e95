// OAuth2 token grants
//
// Password exchange and refresh-token rotation against the token endpoint.
// Both return a fresh `Tokens`; nothing is cached on the client.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::auth::{TokenResponse, Tokens};
use crate::client::MinutClient;
use crate::error::Error;

impl MinutClient {
    /// Exchange username and password for a token set.
    ///
    /// The returned [`Tokens`] always carries a non-empty access token;
    /// a 2xx response without one is reported as an authentication failure.
    pub async fn password_login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Tokens, Error> {
        debug!("password login for {username}");

        let mut form = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password.expose_secret()),
        ];
        if let Some(ref client_id) = self.config().client_id {
            form.push(("client_id", client_id.as_str()));
        }

        let tokens = self.token_grant(&form, None).await?;
        info!("password login succeeded");
        Ok(tokens)
    }

    /// Rotate `tokens` using their refresh token.
    ///
    /// Returns a new value and leaves `tokens` untouched. When the server
    /// does not rotate the refresh token, the previous one is carried over.
    /// Fails with [`Error::MissingRefreshToken`] without a request when no
    /// refresh token is held.
    pub async fn refresh_tokens(&self, tokens: &Tokens) -> Result<Tokens, Error> {
        let refresh_token = match tokens.refresh_token {
            Some(ref token) if tokens.has_refresh_token() => token.expose_secret(),
            _ => return Err(Error::MissingRefreshToken),
        };

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if let Some(ref client_id) = self.config().client_id {
            form.push(("client_id", client_id.as_str()));
        }

        let refreshed = self.token_grant(&form, Some(tokens)).await?;
        info!("access token refreshed");
        Ok(refreshed)
    }

    async fn token_grant(
        &self,
        form: &[(&str, &str)],
        previous: Option<&Tokens>,
    ) -> Result<Tokens, Error> {
        let url = self.endpoints().token_url()?;
        let body = self.post_form(url, form).await?;

        let resp: TokenResponse =
            serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.to_string(),
            })?;

        let user_id = resp.user_id_string();
        let access_token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "token response did not contain an access token".into(),
            })?;

        let mut tokens = Tokens::new(access_token);
        tokens.refresh_token = match resp.refresh_token.filter(|t| !t.is_empty()) {
            Some(rotated) => Some(SecretString::from(rotated)),
            None => previous.and_then(|p| p.refresh_token.clone()),
        };
        tokens.user_id = user_id.or_else(|| previous.and_then(|p| p.user_id.clone()));
        Ok(tokens)
    }
}
