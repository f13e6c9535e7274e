// ── Device sessions ──
//
// The live probe talks to devices through `DeviceConnector`. A session is a
// scoped resource: `probe` closes it on every exit path before returning.

use std::future::Future;
use std::time::Duration;

use netsync_api::{SshClient, SshConfig};
use tracing::debug;

use crate::config::{DeviceAccess, ProbeRule};
use crate::error::CoreError;
use crate::model::Entity;

/// Where and how to reach one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub name: String,
    /// Primary IP of the device.
    pub host: String,
    pub platform: Option<String>,
}

impl DeviceTarget {
    /// `None` for devices without a primary IP; those are never dialled.
    pub fn from_entity(device: &Entity) -> Option<Self> {
        let attrs = device.as_device()?;
        Some(Self {
            host: attrs.primary_ip.clone()?,
            platform: attrs.platform.clone(),
            name: device.name(),
        })
    }
}

pub trait DeviceSession: Send {
    fn run_command(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

pub trait DeviceConnector: Send + Sync {
    type Session: DeviceSession;

    fn open(
        &self,
        target: &DeviceTarget,
    ) -> impl Future<Output = Result<Self::Session, CoreError>> + Send;
}

// ── SSH ──────────────────────────────────────────────────────────────

/// Connector backed by the system `ssh` client.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    client: SshClient,
}

impl SshConnector {
    pub fn new(access: &DeviceAccess, timeout: Duration) -> Self {
        let config = SshConfig {
            user: access.user.clone(),
            config_file: access.ssh_config.clone(),
            command_timeout: timeout,
            ..SshConfig::default()
        };
        Self {
            client: SshClient::new(config),
        }
    }
}

/// Each command is its own ssh invocation; the session only pins the host.
#[derive(Debug)]
pub struct SshSession {
    client: SshClient,
    host: String,
}

impl DeviceSession for SshSession {
    async fn run_command(&mut self, command: &str) -> Result<String, CoreError> {
        Ok(self.client.run(&self.host, command).await?)
    }

    async fn close(self) {
        debug!(host = %self.host, "ssh session closed");
    }
}

impl DeviceConnector for SshConnector {
    type Session = SshSession;

    async fn open(&self, target: &DeviceTarget) -> Result<SshSession, CoreError> {
        Ok(SshSession {
            client: self.client.clone(),
            host: target.host.clone(),
        })
    }
}

// ── Probe ────────────────────────────────────────────────────────────

/// Run the probe command on `target` and report whether the output contains
/// the rule's marker (case-insensitive).
pub async fn probe<C: DeviceConnector>(
    connector: &C,
    target: &DeviceTarget,
    rule: &ProbeRule,
    timeout: Duration,
) -> Result<bool, CoreError> {
    let timed_out = || CoreError::Connectivity {
        host: target.host.clone(),
        message: format!("timed out after {}s", timeout.as_secs()),
    };

    let mut session = tokio::time::timeout(timeout, connector.open(target))
        .await
        .map_err(|_| timed_out())??;

    let output = tokio::time::timeout(timeout, session.run_command(&rule.command)).await;
    session.close().await;

    let output = output.map_err(|_| timed_out())??;
    let hit = output.to_lowercase().contains(&rule.marker.to_lowercase());
    debug!(device = %target.name, hit, "probe finished");
    Ok(hit)
}
