//! CLI configuration -- thin wrapper around `minutly_config` shared types.
//!
//! Re-exports the shared types and resolves the active profile with
//! `GlobalOpts` flag overrides (--profile, --base-url, --timeout).

use minutly_api::TransportConfig;
use minutly_core::{AuthInput, CoordinatorConfig, MinutClient};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use minutly_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
    store_password, store_tokens,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Everything a network-bound command needs.
#[derive(Debug)]
pub struct Session {
    pub profile_name: String,
    pub profile: Profile,
    pub client: MinutClient,
    pub coordinator: CoordinatorConfig,
}

impl Session {
    /// Credentials for this session, from env, keyring or config.
    pub fn auth(&self) -> Result<AuthInput, CliError> {
        Ok(minutly_config::resolve_auth(&self.profile, &self.profile_name)?)
    }
}

/// Build a [`Session`] from the config file, profile, and CLI overrides.
///
/// A missing default profile is not an error: credentials may come from
/// the environment alone. An explicitly requested one must exist.
pub fn resolve(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    // Flag > env > profile
    if let Some(ref url) = global.base_url {
        profile.base_url = Some(url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let client_config = minutly_config::profile_to_client_config(&profile, &cfg.defaults)?;
    let transport = TransportConfig::default().with_timeout(client_config.request_timeout);
    let client = MinutClient::from_transport(&transport, client_config)?;
    let coordinator = minutly_config::profile_to_coordinator_config(&profile, &cfg.defaults)?;

    Ok(Session {
        profile_name,
        profile,
        client,
        coordinator,
    })
}
