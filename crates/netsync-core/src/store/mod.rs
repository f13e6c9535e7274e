// ── Inventory store contract ──
//
// The engine talks to the source-of-truth inventory only through this
// trait. `NetBoxStore` is the production adapter; `MemoryStore` backs tests
// and offline runs.

pub mod memory;
pub mod netbox;

use std::collections::BTreeSet;
use std::future::Future;

use crate::error::CoreError;
use crate::model::{Entity, EntityKind, FieldChange, NaturalKey};

pub use memory::MemoryStore;
pub use netbox::NetBoxStore;

/// Listing filter. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub site: Option<String>,
    /// Region; resolves to all of its sites.
    pub region: Option<String>,
    pub tag: Option<String>,
    /// Include devices whose status is not `active`.
    pub include_inactive: bool,
    /// Parent device, for interface listings.
    pub device: Option<String>,
}

impl Filter {
    pub fn site(site: impl Into<String>) -> Self {
        Self {
            site: Some(site.into()),
            ..Self::default()
        }
    }

    pub fn device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }
}

/// CRUD access to the inventory, one entity at a time.
///
/// Implementations must be safe to call concurrently; the executor keeps up
/// to `workers` calls in flight.
pub trait InventoryStore: Send + Sync {
    fn list(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Entity>, CoreError>> + Send;

    fn get(&self, key: &NaturalKey) -> impl Future<Output = Result<Option<Entity>, CoreError>> + Send;

    fn create(&self, entity: &Entity) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn update(
        &self,
        key: &NaturalKey,
        changes: &[FieldChange],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete(&self, key: &NaturalKey) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Site identifiers matching `filter` (site and/or region).
    fn sites(&self, filter: &Filter) -> impl Future<Output = Result<Vec<String>, CoreError>> + Send;

    /// Create any of `tags` that do not exist yet. Returns the created names.
    fn ensure_tags(
        &self,
        tags: &BTreeSet<String>,
    ) -> impl Future<Output = Result<Vec<String>, CoreError>> + Send;
}
