// netsync-core: reconciliation engine between device state and the inventory.

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod executor;
pub mod hostname;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod sync;
pub mod tags;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DeviceAccess, EngineConfig, ExecutorConfig, HostnameTables, InventoryConfig,
    ReconcileOptions, TagMode, TagRules, TlsVerification,
};
pub use controller::Controller;
pub use device::{DeviceConnector, DeviceSession, DeviceTarget, SshConnector};
pub use error::CoreError;
pub use executor::Executor;
pub use hostname::HostnameDecoder;
pub use normalize::{Batch, FieldMap, InterfaceConfig};
pub use reconcile::{EntityUpdate, Reconciler, ReconciliationPlan};
pub use report::{Action, ExecutionReport, OpOutcome, OpStatus, Warning};
pub use store::{Filter, InventoryStore, MemoryStore, NetBoxStore};
pub use sync::{DeviceListing, DeviceSyncRequest, Engine, SyncOutcome};
pub use tags::{SiteElection, TagDeriver};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    DecodedHostname, DeviceAttrs, Entity, EntityKind, EntitySet, Field, FieldChange, FieldValue,
    InterfaceAttrs, InterfaceType, NaturalKey, VlanAttrs, VlanMode, VlanStatus,
};
