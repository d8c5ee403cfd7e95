//! Shared configuration for minutly hosts: TOML profiles, credential
//! resolution, and translation into `minutly_api::ClientConfig` /
//! `minutly_core::CoordinatorConfig`.
//!
//! Core never sees these types -- it receives pre-built runtime configs.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use minutly_api::{ClientConfig, Endpoints, Tokens};
use minutly_core::{AuthInput, BinaryKind, BinaryTriggers, CoordinatorConfig, EventSource};

const KEYRING_SERVICE: &str = "minutly";

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── TOML config structs ──────────────────────────────────────────────

/// Host-owned TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name (used when --profile is not specified).
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll cadence in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Timeline recency window in seconds.
    #[serde(default = "default_event_window")]
    pub event_window: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
            event_window: default_event_window(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    20
}
fn default_scan_interval() -> u64 {
    15
}
fn default_event_window() -> u64 {
    120
}

/// One Minut account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root; defaults to the public Minut API.
    pub base_url: Option<String>,

    /// "password" (exchange username/password) or "tokens" (use tokens as given).
    #[serde(default = "default_auth_mode")]
    pub auth_mode: String,

    pub username: Option<String>,

    /// Plaintext password -- prefer keyring or env var.
    pub password: Option<String>,

    /// Plaintext access token -- prefer keyring or env var.
    pub access_token: Option<String>,

    /// Plaintext refresh token -- prefer keyring or env var.
    pub refresh_token: Option<String>,

    pub user_id: Option<String>,

    /// OAuth client id sent with token grants.
    pub client_id: Option<String>,

    /// "per-device" or "account".
    pub event_source: Option<String>,

    /// Override defaults.scan_interval.
    pub scan_interval: Option<u64>,

    /// Override defaults.event_window.
    pub event_window: Option<u64>,

    /// Override defaults.timeout.
    pub timeout: Option<u64>,

    pub timeline_limit: Option<u32>,

    /// Binary kind -> event types that switch it on.
    #[serde(default)]
    pub triggers: BTreeMap<String, Vec<String>>,
}

fn default_auth_mode() -> String {
    "password".into()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_mode: default_auth_mode(),
            username: None,
            password: None,
            access_token: None,
            refresh_token: None,
            user_id: None,
            client_id: None,
            event_source: None,
            scan_interval: None,
            event_window: None,
            timeout: None,
            timeline_limit: None,
            triggers: BTreeMap::new(),
        }
    }
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "minutly", "minutly").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("minutly");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config from the default file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if present), then `MINUTLY_*` env vars.
///
/// Nested keys use a double underscore: `MINUTLY_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MINUTLY_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Write `config` to the default path, creating parent directories.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(config)?)?;
    debug!(path = %path.display(), "configuration saved");
    Ok(())
}

// ── Runtime config translation ───────────────────────────────────────

/// Build the API client settings for `profile`.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    if let Some(ref raw) = profile.base_url {
        let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
        config.endpoints = Endpoints::with_base_url(url);
    }

    config.request_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.client_id.clone_from(&profile.client_id);
    if let Some(limit) = profile.timeline_limit {
        config.timeline_limit = limit;
    }
    Ok(config)
}

/// Build the coordinator settings for `profile`.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let event_source = match profile.event_source.as_deref() {
        None => EventSource::default(),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Validation {
            field: "event_source".into(),
            reason: format!("expected 'per-device' or 'account', got '{raw}'"),
        })?,
    };

    let window_secs = profile.event_window.unwrap_or(defaults.event_window);
    let event_window = i64::try_from(window_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ConfigError::Validation {
            field: "event_window".into(),
            reason: format!("{window_secs}s is out of range"),
        })?;

    let mut triggers = BinaryTriggers::default();
    for (kind, events) in &profile.triggers {
        let kind: BinaryKind = kind.parse().map_err(|_| ConfigError::Validation {
            field: format!("triggers.{kind}"),
            reason: "expected 'motion' or 'alarm'".into(),
        })?;
        triggers = triggers.with(kind, events.iter().cloned());
    }

    Ok(CoordinatorConfig {
        scan_interval: Duration::from_secs(profile.scan_interval.unwrap_or(defaults.scan_interval)),
        event_window,
        event_source,
        triggers,
    })
}

// ── Credential resolution ────────────────────────────────────────────

/// Resolve the credentials for `profile`.
///
/// Tokens persisted by a previous login take precedence in password mode,
/// so a password exchange only happens once. Each secret is looked up in
/// order: env var, system keyring, plaintext in config.
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthInput, ConfigError> {
    resolve_auth_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_get,
    )
}

/// [`resolve_auth`] with injectable env and keyring lookups.
pub fn resolve_auth_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<AuthInput, ConfigError> {
    let secret = |env_name: &str, keyring_suffix: &str, plaintext: Option<&String>| {
        env(env_name)
            .or_else(|| keyring(&format!("{profile_name}/{keyring_suffix}")))
            .or_else(|| plaintext.cloned())
            .filter(|s| !s.is_empty())
    };

    let stored_tokens = || {
        let access = secret("MINUTLY_ACCESS_TOKEN", "access-token", profile.access_token.as_ref())?;
        let mut tokens = Tokens::new(access);
        if let Some(refresh) =
            secret("MINUTLY_REFRESH_TOKEN", "refresh-token", profile.refresh_token.as_ref())
        {
            tokens = tokens.with_refresh_token(refresh);
        }
        if let Some(ref user_id) = profile.user_id {
            tokens = tokens.with_user_id(user_id.clone());
        }
        Some(tokens)
    };

    match profile.auth_mode.as_str() {
        "tokens" => stored_tokens()
            .map(AuthInput::Tokens)
            .ok_or_else(|| ConfigError::NoCredentials {
                profile: profile_name.into(),
            }),
        "password" => {
            if let Some(tokens) = stored_tokens() {
                return Ok(AuthInput::Tokens(tokens));
            }
            let (username, password) = password_credentials(profile, profile_name, &env, &keyring)?;
            Ok(AuthInput::Password { username, password })
        }
        other => Err(ConfigError::Validation {
            field: "auth_mode".into(),
            reason: format!("expected 'password' or 'tokens', got '{other}'"),
        }),
    }
}

/// Resolve username and password for `profile`, ignoring any stored tokens.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    password_credentials(
        profile,
        profile_name,
        &|name: &str| std::env::var(name).ok(),
        &keyring_get,
    )
}

fn password_credentials(
    profile: &Profile,
    profile_name: &str,
    env: &impl Fn(&str) -> Option<String>,
    keyring: &impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let missing = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };
    let username = env("MINUTLY_USERNAME")
        .or_else(|| profile.username.clone())
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    let password = env("MINUTLY_PASSWORD")
        .or_else(|| keyring(&format!("{profile_name}/password")))
        .or_else(|| profile.password.clone())
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    Ok((username, SecretString::from(password)))
}

/// Persist `tokens` to the system keyring under `profile_name`.
pub fn store_tokens(profile_name: &str, tokens: &Tokens) -> Result<(), ConfigError> {
    keyring_set(
        &format!("{profile_name}/access-token"),
        tokens.access_token.expose_secret(),
    )?;
    if let Some(ref refresh) = tokens.refresh_token {
        keyring_set(
            &format!("{profile_name}/refresh-token"),
            refresh.expose_secret(),
        )?;
    }
    debug!(profile = profile_name, "tokens stored in keyring");
    Ok(())
}

/// Persist a password to the system keyring under `profile_name`.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_set(&format!("{profile_name}/password"), password.expose_secret())
}

fn keyring_get(key: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, key)
        .ok()?
        .get_password()
        .ok()
}

fn keyring_set(key: &str, value: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, key)?.set_password(value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn load_reads_profiles_from_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "home"

[defaults]
scan_interval = 30

[profiles.home]
username = "me@example.com"
event_source = "account"

[profiles.home.triggers]
alarm = ["alarm_heard"]
"#,
        )
        .expect("write config");

        let config = load_config_from(&path).expect("config loads");
        assert_eq!(config.default_profile.as_deref(), Some("home"));
        assert_eq!(config.defaults.scan_interval, 30);
        assert_eq!(config.defaults.timeout, 20);

        let home = &config.profiles["home"];
        assert_eq!(home.auth_mode, "password");
        let coordinator = profile_to_coordinator_config(home, &config.defaults).expect("valid");
        assert_eq!(coordinator.scan_interval, Duration::from_secs(30));
        assert_eq!(coordinator.event_source, EventSource::Account);
        assert_eq!(
            coordinator.triggers.triggers(BinaryKind::Alarm).collect::<Vec<_>>(),
            vec!["alarm_heard"]
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from(&dir.path().join("absent.toml")).expect("defaults load");
        assert_eq!(config.defaults.scan_interval, 15);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                username: Some("a@b.c".into()),
                auth_mode: "password".into(),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).expect("saved");
        let loaded = load_config_from(&path).expect("loaded");
        assert_eq!(loaded.profiles["default"].username.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn client_config_applies_overrides() {
        let profile = Profile {
            base_url: Some("http://127.0.0.1:9000".into()),
            client_id: Some("abc".into()),
            timeout: Some(5),
            ..Profile::default()
        };
        let client = profile_to_client_config(&profile, &Defaults::default()).expect("valid");
        assert_eq!(
            client.endpoints.devices_url().expect("url").as_str(),
            "http://127.0.0.1:9000/draft1/devices"
        );
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert_eq!(client.client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_values_are_reported_by_field() {
        let bad_url = Profile {
            base_url: Some("not a url".into()),
            ..Profile::default()
        };
        let err = profile_to_client_config(&bad_url, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"));

        let bad_trigger = Profile {
            triggers: BTreeMap::from([("smoke".to_owned(), vec!["x".to_owned()])]),
            ..Profile::default()
        };
        let err = profile_to_coordinator_config(&bad_trigger, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "triggers.smoke"));
    }

    #[test]
    fn password_mode_prefers_stored_tokens() {
        let profile = Profile {
            auth_mode: "password".into(),
            username: Some("me".into()),
            password: Some("pw".into()),
            ..Profile::default()
        };

        let keyring = lookup(&[
            ("home/access-token", "stored-access"),
            ("home/refresh-token", "stored-refresh"),
        ]);
        match resolve_auth_with(&profile, "home", none, keyring).expect("resolves") {
            AuthInput::Tokens(tokens) => {
                assert_eq!(tokens.access_token.expose_secret(), "stored-access");
                assert!(tokens.has_refresh_token());
            }
            AuthInput::Password { .. } => panic!("expected stored tokens"),
        }

        match resolve_auth_with(&profile, "home", none, none).expect("resolves") {
            AuthInput::Password { username, password } => {
                assert_eq!(username, "me");
                assert_eq!(password.expose_secret(), "pw");
            }
            AuthInput::Tokens(_) => panic!("expected password credentials"),
        }
    }

    #[test]
    fn env_beats_keyring_beats_plaintext() {
        let profile = Profile {
            auth_mode: "tokens".into(),
            access_token: Some("plain".into()),
            ..Profile::default()
        };
        let env = lookup(&[("MINUTLY_ACCESS_TOKEN", "from-env")]);
        let keyring = lookup(&[("p/access-token", "from-keyring")]);

        let pick = |input: AuthInput| match input {
            AuthInput::Tokens(t) => t.access_token.expose_secret().to_owned(),
            AuthInput::Password { .. } => panic!("expected tokens"),
        };

        let from_env = resolve_auth_with(&profile, "p", &env, &keyring).expect("resolves");
        assert_eq!(pick(from_env), "from-env");
        let from_keyring = resolve_auth_with(&profile, "p", none, &keyring).expect("resolves");
        assert_eq!(pick(from_keyring), "from-keyring");
        let plain = resolve_auth_with(&profile, "p", none, none).expect("resolves");
        assert_eq!(pick(plain), "plain");
    }

    #[test]
    fn password_lookup_skips_tokens() {
        let profile = Profile {
            username: Some("me".into()),
            access_token: Some("stale".into()),
            ..Profile::default()
        };
        let keyring = lookup(&[("home/password", "from-keyring")]);
        let (user, password) =
            password_credentials(&profile, "home", &none, &keyring).expect("resolves");
        assert_eq!(user, "me");
        assert_eq!(password.expose_secret(), "from-keyring");

        let env = lookup(&[("MINUTLY_USERNAME", "other"), ("MINUTLY_PASSWORD", "pw")]);
        let (user, _) = password_credentials(&profile, "home", &env, &keyring).expect("resolves");
        assert_eq!(user, "other");

        let nameless = Profile::default();
        assert!(matches!(
            password_credentials(&nameless, "home", &none, &keyring),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn missing_credentials_and_bad_mode() {
        let tokens_mode = Profile {
            auth_mode: "tokens".into(),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_auth_with(&tokens_mode, "p", none, none),
            Err(ConfigError::NoCredentials { .. })
        ));

        let odd = Profile {
            auth_mode: "oauth-device".into(),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_auth_with(&odd, "p", none, none),
            Err(ConfigError::Validation { .. })
        ));
    }
}
