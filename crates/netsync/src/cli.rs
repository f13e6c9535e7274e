//! Clap derive structures for the `netsync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netsync -- reconcile device-derived inventory against NetBox
#[derive(Debug, Parser)]
#[command(
    name = "netsync",
    version,
    about = "Reconcile network devices against the NetBox inventory",
    long_about = "Derives device tags, platforms, interfaces and VLANs from hostnames\n\
        and device output, diffs them against NetBox, and applies the minimal\n\
        set of changes. Every mutating command supports --dry-run.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Inventory profile to use
    #[arg(long, short = 'p', env = "NETSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Inventory URL (overrides profile)
    #[arg(long, env = "NETSYNC_URL", global = true)]
    pub url: Option<String>,

    /// Inventory API token
    #[arg(long, env = "NETSYNC_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NETSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Maximum concurrent inventory operations
    #[arg(long, env = "NETSYNC_WORKERS", global = true)]
    pub workers: Option<usize>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Derive and apply device tags and platforms
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Sync one device's interfaces from parsed `show interfaces` output
    #[command(alias = "if")]
    Interfaces(InterfacesArgs),

    /// Sync a site's VLANs from parsed `show vlan` output
    Vlans(VlansArgs),

    /// Decode hostnames (no inventory access)
    Decode(DecodeArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Scope ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Restrict to one site (slug or name)
    #[arg(long, short = 's')]
    pub site: Option<String>,

    /// Restrict to every site of a region
    #[arg(long, short = 'r', conflicts_with = "site")]
    pub region: Option<String>,

    /// Restrict to devices carrying this tag
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Include devices whose status is not active
    #[arg(long)]
    pub include_inactive: bool,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// List scoped devices with their decoded hostnames
    #[arg(long, short = 'l', conflicts_with_all = ["update_tags", "update_platform"])]
    pub list: bool,

    /// Write derived tags
    #[arg(long)]
    pub update_tags: bool,

    /// Assign platforms to devices without one
    #[arg(long)]
    pub update_platform: bool,

    /// Replace tag sets instead of adding to them
    #[arg(long, requires = "update_tags")]
    pub replace_tags: bool,

    /// Report the plan without changing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Probe candidate devices for the wireless-controller tag
    #[arg(long)]
    pub probe_wireless: bool,
}

// ── Interfaces ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InterfacesArgs {
    /// Device the interfaces belong to
    #[arg(long, short = 'd')]
    pub device: String,

    /// Parsed interface records (JSON or YAML list of field maps)
    #[arg(long, short = 'F')]
    pub from_file: PathBuf,

    /// Per-interface switchport settings (JSON or YAML map keyed by name)
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Report the plan without changing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

// ── VLANs ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VlansArgs {
    /// Site the VLANs belong to
    #[arg(long, short = 's')]
    pub site: String,

    /// Parsed VLAN records (JSON or YAML list of field maps)
    #[arg(long, short = 'F')]
    pub from_file: PathBuf,

    /// Report the plan without changing anything
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

// ── Decode ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Hostnames to decode
    #[arg(required = true)]
    pub names: Vec<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store the active profile's API token in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
