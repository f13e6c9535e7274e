// ── Runtime engine configuration ──
//
// Lookup tables, tag rules and run tuning. These types never touch disk:
// the CLI builds them (defaults plus config-file overrides) and hands them
// to the engine.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::model::NaturalKey;

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// ── Hostname tables ──────────────────────────────────────────────────

/// Code-to-name translations used by the hostname decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostnameTables {
    pub roles: BTreeMap<String, String>,
    pub subroles: BTreeMap<String, String>,
    pub statuses: BTreeMap<String, String>,
}

impl Default for HostnameTables {
    fn default() -> Self {
        Self {
            roles: table(&[
                ("O", "wan-accelerator"),
                ("R", "router"),
                ("S", "switch"),
                ("V", "voice-gateway"),
                ("W", "wireless-controller"),
            ]),
            subroles: table(&[
                ("AC", "access-switch"),
                ("CR", "core-router"),
                ("DS", "distribution-switch"),
                ("ED", "edge-switch"),
                ("ER", "edge-router"),
                ("LB", "load-balancer"),
                ("MA", "man-router"),
                ("SS", "server-switch"),
                ("TS", "console-server"),
                ("VG", "voice-gateway"),
                ("WA", "wan-router"),
                ("WC", "wireless-controller"),
                ("WO", "wan-accelerator"),
            ]),
            statuses: table(&[("ACT", "active"), ("STB", "standby"), ("OLD", "legacy")]),
        }
    }
}

impl HostnameTables {
    /// Merge overrides key by key on top of the current tables.
    pub fn merged(
        mut self,
        roles: &BTreeMap<String, String>,
        subroles: &BTreeMap<String, String>,
        statuses: &BTreeMap<String, String>,
    ) -> Self {
        self.roles.extend(roles.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.subroles.extend(subroles.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.statuses.extend(statuses.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

// ── Tag rules ────────────────────────────────────────────────────────

/// Extra tag for hardware that serves two roles (e.g. 3850 stacks acting as
/// both edge router and access switch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualRoleRule {
    /// Substrings matched against the device model.
    pub model_markers: Vec<String>,
    /// Decoded subroles the rule applies to. Empty = any subrole.
    pub parent_subroles: Vec<String>,
    pub tag: String,
}

impl Default for DualRoleRule {
    fn default() -> Self {
        Self {
            model_markers: strings(&["3750", "3850"]),
            parent_subroles: strings(&["edge-router"]),
            tag: "access-switch".into(),
        }
    }
}

/// Live device probe that grants a tag when the running configuration
/// contains a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRule {
    pub enabled: bool,
    pub subroles: Vec<String>,
    pub platforms: Vec<String>,
    pub command: String,
    pub marker: String,
    pub tag: String,
}

impl Default for ProbeRule {
    fn default() -> Self {
        Self {
            enabled: false,
            subroles: strings(&["core-router"]),
            platforms: strings(&["ios"]),
            command: "show running-config | include wireless".into(),
            marker: "wireless mobility controller".into(),
            tag: "wireless-controller".into(),
        }
    }
}

/// Everything the tag deriver needs, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRules {
    /// Decoded-hostname values that are copied verbatim into the tag set.
    pub recognized: BTreeSet<String>,
    /// Subrole precedence for the primary/secondary election.
    pub election_precedence: Vec<String>,
    /// Subrole precedence for the STP root election.
    pub stp_precedence: Vec<String>,
    pub dual_role: DualRoleRule,
    pub probe: ProbeRule,
    /// Tag name -> platform slug, for devices without a platform.
    pub platforms: BTreeMap<String, String>,
}

impl Default for TagRules {
    fn default() -> Self {
        let precedence = strings(&["distribution-switch", "core-router"]);
        Self {
            recognized: [
                "access-switch",
                "core-router",
                "distribution-switch",
                "edge-router",
                "primary",
                "secondary",
                "server-switch",
                "active",
                "standby",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
            election_precedence: precedence.clone(),
            stp_precedence: precedence,
            dual_role: DualRoleRule::default(),
            probe: ProbeRule::default(),
            platforms: table(&[
                ("Network-Arista", "eos"),
                ("Network-IOS", "ios"),
                ("Network-IOS-XE", "ios"),
                ("Network-Juniper", "junos"),
                ("Network-NXOS", "nxos"),
                ("Network-Riverbed", "rios"),
                ("Network-WLC", "aireos"),
            ]),
        }
    }
}

// ── Reconciliation ───────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// New tags are added; existing tags are never removed.
    #[default]
    Additive,
    /// The tag set is replaced by exactly the desired set.
    Replace,
}

pub const DEFAULT_EXCLUDED_VLANS: [u16; 5] = [1, 1002, 1003, 1004, 1005];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub tag_mode: TagMode,
    /// Keys that use `Replace` regardless of `tag_mode`.
    pub replace_tags_for: BTreeSet<NaturalKey>,
    /// VLAN ids ignored on both sides.
    pub excluded_vlans: BTreeSet<u16>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            tag_mode: TagMode::Additive,
            replace_tags_for: BTreeSet::new(),
            excluded_vlans: DEFAULT_EXCLUDED_VLANS.into_iter().collect(),
        }
    }
}

impl ReconcileOptions {
    pub fn tag_mode_for(&self, key: &NaturalKey) -> TagMode {
        if self.replace_tags_for.contains(key) {
            TagMode::Replace
        } else {
            self.tag_mode
        }
    }
}

// ── Execution ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum operations in flight.
    pub workers: usize,
    /// Upper bound for a single store mutation or device probe.
    pub op_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            op_timeout: Duration::from_secs(60),
        }
    }
}

// ── Engine bundle ────────────────────────────────────────────────────

/// All engine parameters for one run.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub tables: Arc<HostnameTables>,
    pub rules: Arc<TagRules>,
    pub reconcile: ReconcileOptions,
    pub executor: ExecutorConfig,
}

// ── Inventory connection ─────────────────────────────────────────────

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed lab instances).
    DangerAcceptInvalid,
}

/// Device access for live probes.
#[derive(Debug, Clone, Default)]
pub struct DeviceAccess {
    pub user: Option<String>,
    pub ssh_config: Option<PathBuf>,
}

/// Configuration for connecting to one inventory instance.
///
/// Built by the CLI, passed to the controller. Core never reads config files.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Inventory base URL (e.g., `https://netbox.example.net`).
    pub url: Url,
    pub token: SecretString,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub device_access: DeviceAccess,
}
