//! CLI configuration: thin wrapper around `netsync_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --token, --insecure, --timeout, --workers).

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use netsync_core::{DeviceAccess, EngineConfig, InventoryConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use netsync_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the inventory connection from the active profile and flag
/// overrides. Without a profile, `--url` and `--token` must both be given.
pub fn resolve_inventory(global: &GlobalOpts, cfg: &Config) -> Result<InventoryConfig, CliError> {
    let name = active_profile_name(global, cfg);

    let Some(profile) = cfg.profiles.get(&name) else {
        if global.profile.is_some() {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            });
        }
        return from_flags(global, cfg, name);
    };

    let url = netsync_config::parse_url(global.url.as_deref().unwrap_or(&profile.url))?;
    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => netsync_config::resolve_token(profile, &name)?,
    };
    let insecure = global.insecure || profile.insecure.unwrap_or(cfg.defaults.insecure);
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);

    Ok(InventoryConfig {
        url,
        token,
        tls: netsync_config::tls_for(insecure, profile.ca_cert.as_deref()),
        timeout: Duration::from_secs(timeout),
        device_access: DeviceAccess {
            user: profile.ssh_user.clone(),
            ssh_config: profile.ssh_config.clone(),
        },
    })
}

fn from_flags(global: &GlobalOpts, cfg: &Config, name: String) -> Result<InventoryConfig, CliError> {
    let raw = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = netsync_config::parse_url(raw)?;
    let token = global
        .token
        .clone()
        .map(SecretString::from)
        .ok_or(CliError::NoCredentials { profile: name })?;

    Ok(InventoryConfig {
        url,
        token,
        tls: netsync_config::tls_for(global.insecure || cfg.defaults.insecure, None),
        timeout: Duration::from_secs(global.timeout.unwrap_or(cfg.defaults.timeout)),
        device_access: DeviceAccess::default(),
    })
}

/// Engine parameters: `[engine]` tables plus the worker override
/// (flag, then profile, then `[defaults]`).
pub fn resolve_engine(global: &GlobalOpts, cfg: &Config, probe: bool) -> EngineConfig {
    let name = active_profile_name(global, cfg);
    let workers = global
        .workers
        .or_else(|| cfg.profiles.get(&name).and_then(|p| p.workers));
    let mut engine = netsync_config::engine_config(cfg, workers);
    if probe {
        Arc::make_mut(&mut engine.rules).probe.enabled = true;
    }
    engine
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["netsync"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["decode", "RDEN01CR01"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.default_profile = Some("prod".into());
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                url: "https://netbox.example.net".into(),
                token: Some("plain".into()),
                workers: Some(3),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let inv = resolve_inventory(
            &global(&["--token", "flag", "--timeout", "5", "-k"]),
            &config(),
        )
        .unwrap();
        assert_eq!(inv.token.expose_secret(), "flag");
        assert_eq!(inv.timeout, Duration::from_secs(5));
        assert_eq!(
            inv.tls,
            netsync_core::TlsVerification::DangerAcceptInvalid
        );
    }

    #[test]
    fn unknown_explicit_profile_lists_available() {
        let err = resolve_inventory(&global(&["-p", "lab"]), &config()).unwrap_err();
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "prod"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn flags_alone_need_url_and_token() {
        let cfg = Config::default();
        assert!(matches!(
            resolve_inventory(&global(&[]), &cfg),
            Err(CliError::NoConfig { .. })
        ));
        assert!(matches!(
            resolve_inventory(&global(&["--url", "https://nb.lab"]), &cfg),
            Err(CliError::NoCredentials { .. })
        ));
        let inv = resolve_inventory(&global(&["--url", "https://nb.lab", "--token", "t"]), &cfg)
            .unwrap();
        assert_eq!(inv.url.as_str(), "https://nb.lab/");
    }

    #[test]
    fn workers_fall_back_to_profile_and_probe_flag_enables_rule() {
        let engine = resolve_engine(&global(&[]), &config(), true);
        assert_eq!(engine.executor.workers, 3);
        assert!(engine.rules.probe.enabled);

        let engine = resolve_engine(&global(&["--workers", "12"]), &config(), false);
        assert_eq!(engine.executor.workers, 12);
        assert!(!engine.rules.probe.enabled);
    }
}
