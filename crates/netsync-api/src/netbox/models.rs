// NetBox REST API response and request types.
//
// Only the fields the sync engine reads or writes are modelled. Unknown
// fields are ignored on deserialization; write payloads skip unset fields so
// a PATCH only touches what changed.

use serde::{Deserialize, Serialize};

// ── Envelopes ────────────────────────────────────────────────────────

/// Paginated list envelope: `{ count, next, previous, results }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Brief nested representation used for foreign keys (`site`, `device`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NestedRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Choice field: `{ "value": "active", "label": "Active" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoiceValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

// ── Organization ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NbSite {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub region: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbPlatform {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbDeviceType {
    pub id: u64,
    pub model: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbIpAddress {
    pub id: u64,
    pub address: String,
}

// ── Tags ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NbTag {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Tag reference used in write payloads. NetBox resolves tags by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRef {
    pub name: String,
}

impl TagRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCreate {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NbDevice {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub site: NestedRef,
    pub device_type: NbDeviceType,
    #[serde(default)]
    pub platform: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
    #[serde(default)]
    pub primary_ip4: Option<NbIpAddress>,
    #[serde(default)]
    pub tags: Vec<NbTag>,
}

/// Partial device update. Only `platform` and `tags` are ever written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

// ── Interfaces ───────────────────────────────────────────────────────

/// VLAN as nested inside an interface (`untagged_vlan`, `tagged_vlans`).
#[derive(Debug, Clone, Deserialize)]
pub struct NestedVlan {
    pub id: u64,
    pub vid: u16,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NbInterface {
    pub id: u64,
    pub device: NestedRef,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChoiceValue,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mgmt_only: bool,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mode: Option<ChoiceValue>,
    #[serde(default)]
    pub untagged_vlan: Option<NestedVlan>,
    #[serde(default)]
    pub tagged_vlans: Vec<NestedVlan>,
    #[serde(default)]
    pub tags: Vec<NbTag>,
}

fn default_true() -> bool {
    true
}

/// Create or partial update body for `dcim/interfaces/`.
///
/// `Option<Option<T>>` fields serialize `Some(None)` as JSON `null`, which
/// clears the value on the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InterfaceWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mgmt_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untagged_vlan: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagged_vlans: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

// ── VLANs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NbVlan {
    pub id: u64,
    pub vid: u16,
    pub name: String,
    #[serde(default)]
    pub site: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
    #[serde(default)]
    pub tags: Vec<NbTag>,
}

/// Create or partial update body for `ipam/vlans/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VlanWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn interface_deserializes_with_missing_optionals() {
        let json = r#"{
            "id": 7,
            "device": {"id": 3, "name": "SDEN01AC01"},
            "name": "GigabitEthernet1/0/1",
            "type": {"value": "1000base-t", "label": "1000BASE-T (1GE)"},
            "mtu": null
        }"#;
        let iface: NbInterface = serde_json::from_str(json).unwrap();
        assert_eq!(iface.kind.value, "1000base-t");
        assert!(iface.enabled);
        assert!(iface.mtu.is_none());
        assert!(iface.tagged_vlans.is_empty());
    }

    #[test]
    fn interface_write_serializes_null_for_cleared_fields() {
        let body = InterfaceWrite {
            mtu: Some(None),
            enabled: Some(false),
            ..Default::default()
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({"mtu": null, "enabled": false}));
    }
}
