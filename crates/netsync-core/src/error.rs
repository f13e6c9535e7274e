// ── Core error types ──
//
// Engine-level errors. Consumers never see HTTP status codes or JSON parse
// failures directly; the `From<netsync_api::Error>` impl translates
// transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// A required field is missing or unparseable. Recorded per record;
    /// batch callers continue with the rest.
    #[error("Malformed input: field `{field}`: {message}")]
    MalformedInput { field: String, message: String },

    #[error("Duplicate natural key: {key}")]
    DuplicateKey { key: String },

    // ── Scope errors ─────────────────────────────────────────────────
    #[error("Invalid scope: {message}")]
    InvalidScope { message: String },

    #[error("Scope {scope} resolved to zero devices")]
    EmptyScope { scope: String },

    // ── Inventory store errors ───────────────────────────────────────
    #[error("Cannot reach inventory at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Inventory request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Entity not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Inventory rejected the request: {message}")]
    Store {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    // ── Device errors ────────────────────────────────────────────────
    /// Device session failure or timeout. Only ever skips the probe tag.
    #[error("Device {host} unreachable: {message}")]
    Connectivity { host: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Run control ──────────────────────────────────────────────────
    #[error("Run cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::malformed(field, "required field is missing")
    }

    /// Errors that abort a whole run rather than a single operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::AuthenticationFailed { .. }
                | Self::InvalidScope { .. }
                | Self::EmptyScope { .. }
                | Self::Config { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netsync_api::Error> for CoreError {
    fn from(err: netsync_api::Error) -> Self {
        match err {
            netsync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            netsync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Store {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            netsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netsync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            netsync_api::Error::Api { status: 404, message } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            netsync_api::Error::Api { status, message } => CoreError::Store {
                message,
                status: Some(status),
            },
            netsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            netsync_api::Error::Ssh { host, message } => CoreError::Connectivity { host, message },
            netsync_api::Error::SshTimeout { host, timeout_secs } => CoreError::Connectivity {
                host,
                message: format!("timed out after {timeout_secs}s"),
            },
        }
    }
}
