//! Config subcommand handlers.

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with every plaintext secret masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        for secret in [
            &mut profile.password,
            &mut profile.access_token,
            &mut profile.refresh_token,
        ] {
            if secret.is_some() {
                *secret = Some(MASK.into());
            }
        }
    }
    cfg
}

/// Format an already-redacted config for display.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "scan_interval = {}", cfg.defaults.scan_interval);
    let _ = writeln!(out, "event_window = {}", cfg.defaults.event_window);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "auth_mode = \"{}\"", p.auth_mode);
        let strings = [
            ("base_url", &p.base_url),
            ("username", &p.username),
            ("password", &p.password),
            ("access_token", &p.access_token),
            ("refresh_token", &p.refresh_token),
            ("user_id", &p.user_id),
            ("client_id", &p.client_id),
            ("event_source", &p.event_source),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = \"{v}\"");
            }
        }
        let numbers = [
            ("scan_interval", p.scan_interval),
            ("event_window", p.event_window),
            ("timeout", p.timeout),
        ];
        for (key, value) in numbers {
            if let Some(v) = value {
                let _ = writeln!(out, "{key} = {v}");
            }
        }
        if let Some(limit) = p.timeline_limit {
            let _ = writeln!(out, "timeline_limit = {limit}");
        }
        for (kind, events) in &p.triggers {
            let _ = writeln!(out, "triggers.{kind} = {events:?}");
        }
    }

    out
}

fn parse_secs(field: &str, value: &str) -> Result<u64, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be a number (seconds)".into(),
    })
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Apply `key = value` to `profile`. Secrets are rejected: they belong
/// in the keyring, not in a file written by this command.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            })?;
            profile.base_url = Some(value);
        }
        "auth_mode" | "auth-mode" => {
            if !matches!(value.as_str(), "password" | "tokens") {
                return Err(CliError::Validation {
                    field: "auth_mode".into(),
                    reason: "must be 'password' or 'tokens'".into(),
                });
            }
            profile.auth_mode = value;
        }
        "username" => profile.username = Some(value),
        "client_id" | "client-id" => profile.client_id = Some(value),
        "event_source" | "event-source" => {
            if !matches!(value.as_str(), "per-device" | "account") {
                return Err(CliError::Validation {
                    field: "event_source".into(),
                    reason: "must be 'per-device' or 'account'".into(),
                });
            }
            profile.event_source = Some(value);
        }
        "scan_interval" | "scan-interval" => {
            profile.scan_interval = Some(parse_secs("scan_interval", &value)?);
        }
        "event_window" | "event-window" => {
            profile.event_window = Some(parse_secs("event_window", &value)?);
        }
        "timeout" => profile.timeout = Some(parse_secs("timeout", &value)?),
        "timeline_limit" | "timeline-limit" => {
            profile.timeline_limit = Some(value.parse().map_err(|_| CliError::Validation {
                field: "timeline_limit".into(),
                reason: "must be a positive number".into(),
            })?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: base_url, auth_mode, username, \
                     client_id, event_source, scan_interval, event_window, timeout, timeline_limit"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: minutly config set username <email>");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }

            let secret = rpassword::prompt_password("Password: ").map_err(util::prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            config::store_password(&profile_name, &SecretString::from(secret))?;

            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked_everywhere() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                username: Some("me@example.com".into()),
                password: Some("hunter2".into()),
                refresh_token: Some("rt-secret".into()),
                ..Profile::default()
            },
        );

        let masked = redacted(&cfg);
        let text = format_config(&masked);
        assert!(text.contains("username = \"me@example.com\""));
        assert!(text.contains("password = \"****\""));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("rt-secret"));
        assert!(masked.profiles["home"].access_token.is_none());
    }

    #[test]
    fn set_key_validates_values() {
        let mut profile = Profile::default();
        set_key(&mut profile, "event-source", "account".into()).expect("valid");
        set_key(&mut profile, "scan_interval", "30".into()).expect("valid");
        assert_eq!(profile.event_source.as_deref(), Some("account"));
        assert_eq!(profile.scan_interval, Some(30));

        assert!(set_key(&mut profile, "event_source", "push".into()).is_err());
        assert!(set_key(&mut profile, "password", "x".into()).is_err());
        assert!(set_key(&mut profile, "base_url", "not a url".into()).is_err());
    }
}
