//! Login: exchange credentials (or validate pasted tokens) and cache the
//! resulting tokens in the system keyring.

use std::io::IsTerminal;

use dialoguer::Input;
use secrecy::SecretString;

use minutly_config::ConfigError;
use minutly_core::{AuthInput, Tokens, authenticate};

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

/// Username and password from flags, env, keyring or config, falling
/// back to interactive prompts on a terminal.
fn password_credentials(
    session: &Session,
    username: Option<String>,
) -> Result<(String, SecretString), CliError> {
    let mut profile = session.profile.clone();
    if username.is_some() {
        profile.username.clone_from(&username);
    }

    match minutly_config::resolve_password(&profile, &session.profile_name) {
        Ok((resolved, password)) => Ok((username.unwrap_or(resolved), password)),
        Err(ConfigError::NoCredentials { .. }) if std::io::stdin().is_terminal() => {
            let username = match username.or(profile.username) {
                Some(u) => u,
                None => Input::new()
                    .with_prompt("Email")
                    .interact_text()
                    .map_err(util::prompt_err)?,
            };
            let password = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
            if username.is_empty() || password.is_empty() {
                return Err(CliError::Validation {
                    field: "credentials".into(),
                    reason: "email and password cannot be empty".into(),
                });
            }
            Ok((username, SecretString::from(password)))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn handle(session: &Session, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let input = if let Some(access) = args.access_token {
        let mut tokens = Tokens::new(access);
        if let Some(refresh) = args.refresh_token {
            tokens = tokens.with_refresh_token(refresh);
        }
        AuthInput::Tokens(tokens)
    } else {
        let (username, password) = password_credentials(session, args.username)?;
        AuthInput::Password { username, password }
    };

    let outcome = authenticate(&session.client, input).await.map_err(|e| {
        tracing::debug!(code = %e.setup_code(), "login rejected");
        CliError::from(e).for_profile(&session.profile_name)
    })?;

    if !args.no_store {
        util::persist_tokens(&session.profile_name, &outcome.tokens);
    }

    let color = output::should_color(&global.color);
    if !global.quiet {
        eprintln!(
            "{} profile '{}' can see {} device(s)",
            output::paint_ok("✓ Logged in:", color),
            session.profile_name,
            outcome.devices.len()
        );
    }
    Ok(())
}
