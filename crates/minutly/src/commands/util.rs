//! Shared helpers for command handlers.

use minutly_core::{AuthInput, Device, SetupOutcome, Tokens, authenticate};
use tracing::{debug, warn};

use crate::config::{self, Session};
use crate::error::CliError;

/// Validate the session's credentials by listing devices.
///
/// Tokens minted along the way (password exchange or a refresh) are
/// written back to the keyring.
pub async fn connect(session: &Session) -> Result<SetupOutcome, CliError> {
    let input = session.auth()?;
    let supplied = match &input {
        AuthInput::Tokens(tokens) => Some(tokens.clone()),
        AuthInput::Password { .. } => None,
    };

    let outcome = authenticate(&session.client, input)
        .await
        .map_err(|e| CliError::from(e).for_profile(&session.profile_name))?;

    if supplied.is_none_or(|t| !t.same_access_token(&outcome.tokens)) {
        persist_tokens(&session.profile_name, &outcome.tokens);
    }
    Ok(outcome)
}

/// Turn the session's credentials into tokens without listing devices.
pub async fn login(session: &Session) -> Result<Tokens, CliError> {
    match session.auth()? {
        AuthInput::Tokens(tokens) => Ok(tokens),
        AuthInput::Password { username, password } => {
            let tokens = session
                .client
                .password_login(&username, &password)
                .await
                .map_err(|e| CliError::from(e).for_profile(&session.profile_name))?;
            persist_tokens(&session.profile_name, &tokens);
            Ok(tokens)
        }
    }
}

/// Store tokens in the keyring; a headless machine without one only
/// loses the cache, so failures are logged and swallowed.
pub fn persist_tokens(profile_name: &str, tokens: &Tokens) {
    match config::store_tokens(profile_name, tokens) {
        Ok(()) => debug!(profile = profile_name, "tokens persisted"),
        Err(e) => warn!(profile = profile_name, error = %e, "could not persist tokens"),
    }
}

/// Find a device by id in a fetched list.
pub fn find_device<'a>(devices: &'a [Device], identifier: &str) -> Result<&'a Device, CliError> {
    devices
        .iter()
        .find(|d| d.id().as_deref() == Some(identifier))
        .ok_or_else(|| CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "devices".into(),
        })
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
