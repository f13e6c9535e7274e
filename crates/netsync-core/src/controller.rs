// ── Controller ──
//
// Facade the CLI talks to: one inventory connection, one engine, one
// run-level cancellation token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{EngineConfig, InventoryConfig};
use crate::device::SshConnector;
use crate::error::CoreError;
use crate::normalize::Batch;
use crate::store::{Filter, NetBoxStore};
use crate::sync::{DeviceListing, DeviceSyncRequest, Engine, SyncOutcome};

/// Cheaply cloneable handle over a NetBox-backed engine.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: InventoryConfig,
    store: NetBoxStore,
    engine: Engine,
    connector: SshConnector,
    probes_enabled: bool,
    cancel: CancellationToken,
}

impl Controller {
    /// Build the API client. No request is made until the first operation.
    pub fn new(config: InventoryConfig, engine: &EngineConfig) -> Result<Self, CoreError> {
        let store = NetBoxStore::connect(&config)?;
        let connector = SshConnector::new(&config.device_access, engine.executor.op_timeout);
        debug!(url = %config.url, "controller ready");
        Ok(Self {
            inner: Arc::new(ControllerInner {
                store,
                engine: Engine::new(engine),
                connector,
                probes_enabled: engine.rules.probe.enabled,
                cancel: CancellationToken::new(),
                config,
            }),
        })
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.inner.config
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn store(&self) -> &NetBoxStore {
        &self.inner.store
    }

    /// Stop submitting new work. In-flight operations finish.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn list_devices(&self, filter: &Filter) -> Result<Vec<DeviceListing>, CoreError> {
        self.inner
            .engine
            .list_devices(&self.inner.store, filter)
            .await
    }

    pub async fn sync_devices(&self, request: &DeviceSyncRequest) -> Result<SyncOutcome, CoreError> {
        let inner = &*self.inner;
        let connector = inner.probes_enabled.then_some(&inner.connector);
        inner
            .engine
            .sync_devices(&inner.store, connector, request, &inner.cancel)
            .await
    }

    pub async fn sync_interfaces(
        &self,
        device: &str,
        batch: Batch,
        dry_run: bool,
    ) -> Result<SyncOutcome, CoreError> {
        let inner = &*self.inner;
        inner
            .engine
            .sync_interfaces(&inner.store, device, batch, dry_run, &inner.cancel)
            .await
    }

    pub async fn sync_vlans(
        &self,
        site: &str,
        batch: Batch,
        dry_run: bool,
    ) -> Result<SyncOutcome, CoreError> {
        let inner = &*self.inner;
        inner
            .engine
            .sync_vlans(&inner.store, site, batch, dry_run, &inner.cancel)
            .await
    }
}
