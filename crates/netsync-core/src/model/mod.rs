// ── Domain model ──
//
// Canonical entity records shared by the normalizer, the tag deriver, the
// reconciler and the store adapters.

pub mod entity;
pub mod hostname;
pub mod value;

pub use entity::{
    Attributes, DeviceAttrs, Entity, EntityKind, EntitySet, InterfaceAttrs, InterfaceType,
    NaturalKey, VlanAttrs, VlanMode, VlanStatus,
};
pub use hostname::DecodedHostname;
pub use value::{Field, FieldChange, FieldValue, format_vlan_list};
