//! Configuration for netsync.
//!
//! TOML profiles (one per inventory instance), engine table overrides,
//! token resolution (env + keyring + plaintext), and translation into
//! `netsync_core::{InventoryConfig, EngineConfig}`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netsync_core::config::{DualRoleRule, ProbeRule};
use netsync_core::{
    DeviceAccess, EngineConfig, ExecutorConfig, HostnameTables, InventoryConfig,
    ReconcileOptions, TagMode, TagRules, TlsVerification,
};

/// Keyring service name; entries are `<profile>/token`.
pub const KEYRING_SERVICE: &str = "netsync";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named inventory profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    /// Engine table and rule overrides.
    #[serde(default)]
    pub engine: EngineSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
            engine: EngineSection::default(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or(ConfigError::UnknownProfile { name })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Concurrent store operations / probes.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Upper bound for one store mutation or probe, in seconds.
    #[serde(default = "default_op_timeout")]
    pub op_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            workers: default_workers(),
            op_timeout: default_op_timeout(),
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
    30
}
fn default_workers() -> usize {
    8
}
fn default_op_timeout() -> u64 {
    60
}

/// A named inventory profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Inventory base URL (e.g., "https://netbox.example.net").
    pub url: String,

    /// API token in plaintext. Keyring or env var preferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the API token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Login user for device probes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,

    /// Alternate ssh config file for device probes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_config: Option<PathBuf>,
}

// ── Engine section ──────────────────────────────────────────────────

/// `[engine]` overrides. Unset keys keep the built-in defaults; table
/// sections merge key by key.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_mode: Option<TagMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_precedence: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stp_precedence: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_vlans: Option<Vec<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roles: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subroles: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statuses: BTreeMap<String, String>,

    /// Tag name -> platform slug.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual_role: Option<DualRoleSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DualRoleSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_markers: Option<Vec<String>>,
    /// Empty list = any subrole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_subroles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProbeSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subroles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl DualRoleSection {
    fn apply(&self, mut rule: DualRoleRule) -> DualRoleRule {
        if let Some(ref markers) = self.model_markers {
            rule.model_markers.clone_from(markers);
        }
        if let Some(ref parents) = self.parent_subroles {
            rule.parent_subroles.clone_from(parents);
        }
        if let Some(ref tag) = self.tag {
            rule.tag.clone_from(tag);
        }
        rule
    }
}

impl ProbeSection {
    fn apply(&self, mut rule: ProbeRule) -> ProbeRule {
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(ref subroles) = self.subroles {
            rule.subroles.clone_from(subroles);
        }
        if let Some(ref platforms) = self.platforms {
            rule.platforms.clone_from(platforms);
        }
        if let Some(ref command) = self.command {
            rule.command.clone_from(command);
        }
        if let Some(ref marker) = self.marker {
            rule.marker.clone_from(marker);
        }
        if let Some(ref tag) = self.tag {
            rule.tag.clone_from(tag);
        }
        rule
    }
}

impl EngineSection {
    pub fn hostname_tables(&self) -> HostnameTables {
        HostnameTables::default().merged(&self.roles, &self.subroles, &self.statuses)
    }

    pub fn tag_rules(&self) -> TagRules {
        let mut rules = TagRules::default();
        if let Some(ref recognized) = self.recognized_tags {
            rules.recognized = recognized.iter().cloned().collect();
        }
        if let Some(ref precedence) = self.election_precedence {
            rules.election_precedence.clone_from(precedence);
        }
        if let Some(ref precedence) = self.stp_precedence {
            rules.stp_precedence.clone_from(precedence);
        }
        rules
            .platforms
            .extend(self.platforms.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(ref section) = self.dual_role {
            rules.dual_role = section.apply(rules.dual_role);
        }
        if let Some(ref section) = self.probe {
            rules.probe = section.apply(rules.probe);
        }
        rules
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        let mut options = ReconcileOptions::default();
        if let Some(mode) = self.tag_mode {
            options.tag_mode = mode;
        }
        if let Some(ref vlans) = self.excluded_vlans {
            options.excluded_vlans = vlans.iter().copied().collect();
        }
        options
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "netsync", "netsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `NETSYNC_*` environment (`__` separates nesting).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETSYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the API token: `token_env` variable, then the system keyring,
/// then plaintext in the profile.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let keyring_err = |e: keyring::Error| ConfigError::Validation {
        field: "keyring".into(),
        reason: e.to_string(),
    };
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .map_err(keyring_err)?
        .set_password(token)
        .map_err(keyring_err)
}

// ── Translation into core types ─────────────────────────────────────

pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// TLS mode: `insecure` wins, then a custom CA, else the system store.
pub fn tls_for(insecure: bool, ca_cert: Option<&Path>) -> TlsVerification {
    if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(path) = ca_cert {
        TlsVerification::CustomCa(path.to_path_buf())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build an `InventoryConfig` from a profile alone, without CLI flag overrides.
pub fn profile_to_inventory_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<InventoryConfig, ConfigError> {
    let url = parse_url(&profile.url)?;
    let token = resolve_token(profile, profile_name)?;

    Ok(InventoryConfig {
        url,
        token,
        tls: tls_for(
            profile.insecure.unwrap_or(defaults.insecure),
            profile.ca_cert.as_deref(),
        ),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        device_access: DeviceAccess {
            user: profile.ssh_user.clone(),
            ssh_config: profile.ssh_config.clone(),
        },
    })
}

/// Build the engine configuration from the `[engine]` section and run
/// defaults.
pub fn engine_config(cfg: &Config, workers: Option<usize>) -> EngineConfig {
    EngineConfig {
        tables: Arc::new(cfg.engine.hostname_tables()),
        rules: Arc::new(cfg.engine.tag_rules()),
        reconcile: cfg.engine.reconcile_options(),
        executor: ExecutorConfig {
            workers: workers.unwrap_or(cfg.defaults.workers).max(1),
            op_timeout: Duration::from_secs(cfg.defaults.op_timeout),
        },
    }
}
