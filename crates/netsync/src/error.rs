//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netsync_config::ConfigError;
use netsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const EMPTY_SCOPE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the inventory at {url}")]
    #[diagnostic(
        code(netsync::connection_failed),
        help(
            "Check that NetBox is running and reachable.\n\
             Self-signed certificate? Retry with --insecure (-k) or set ca_cert in the profile."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netsync::auth_failed),
        help(
            "Verify the API token for profile '{profile}'.\n\
             Run: netsync config set-token -p {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(netsync::no_credentials),
        help(
            "Configure a token with: netsync config init\n\
             Or pass --token / set NETSYNC_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(netsync::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Scope ────────────────────────────────────────────────────────

    #[error("Scope {scope} matched no devices")]
    #[diagnostic(
        code(netsync::empty_scope),
        help("Check the --site/--region/--tag values, or add --include-inactive.")
    )]
    EmptyScope { scope: String },

    // ── Run results ──────────────────────────────────────────────────

    #[error("{failed} of {total} operations failed")]
    #[diagnostic(
        code(netsync::operations_failed),
        help("The report above lists each failed key. Re-running retries only what is still out of sync.")
    )]
    OperationsFailed { failed: usize, total: usize },

    #[error("Run cancelled: {skipped} planned operation(s) not applied")]
    #[diagnostic(
        code(netsync::cancelled),
        help("Re-run the same command to apply what is still out of sync.")
    )]
    Cancelled { skipped: usize },

    // ── Inventory ────────────────────────────────────────────────────

    #[error("Inventory rejected the request: {message}")]
    #[diagnostic(code(netsync::inventory), help("HTTP status: {status:?}"))]
    Inventory { message: String, status: Option<u16> },

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(netsync::unsupported))]
    Unsupported { operation: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netsync::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: netsync config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No inventory configured")]
    #[diagnostic(
        code(netsync::no_config),
        help(
            "Create a profile with: netsync config init\n\
             Or pass --url and --token. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(netsync::config))]
    Config(Box<figment::Error>),

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(netsync::timeout),
        help("Increase timeout with --timeout or check NetBox responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid input file {path}: {reason}")]
    #[diagnostic(
        code(netsync::input_file),
        help("Input files hold a JSON or YAML list of parsed records.")
    )]
    InputFile { path: String, reason: String },

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(netsync::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(netsync::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::EmptyScope { .. } => exit_code::EMPTY_SCOPE,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::InputFile { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                hint: format!("Check that the {entity_type} exists in NetBox."),
                resource_type: entity_type,
                identifier,
            },

            CoreError::EmptyScope { scope } => CliError::EmptyScope { scope },

            CoreError::InvalidScope { message } => CliError::Validation {
                field: "scope".into(),
                reason: message,
            },

            CoreError::MalformedInput { field, message } => CliError::Validation {
                field,
                reason: message,
            },

            CoreError::DuplicateKey { key } => CliError::Validation {
                field: "input".into(),
                reason: format!("duplicate key {key}"),
            },

            CoreError::Store { message, status } => CliError::Inventory { message, status },

            CoreError::Unsupported { operation } => CliError::Unsupported { operation },

            CoreError::Connectivity { host, message } => CliError::ConnectionFailed {
                url: host,
                source: message.into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Cancelled => CliError::Cancelled { skipped: 0 },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
