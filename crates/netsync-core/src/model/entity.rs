// ── Inventory entities ──
//
// One `Entity` per device, interface or VLAN. The natural key is the join
// key between desired and actual sets; attributes are a tagged variant per
// kind with a fixed field schema.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString};

use super::value::{Field, FieldChange, FieldValue, format_vlan_list};
use crate::error::CoreError;

// ── EntityKind ───────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Device,
    Interface,
    Vlan,
}

impl EntityKind {
    /// Fields the reconciler diffs for this kind, in report order.
    pub fn authoritative_fields(self) -> &'static [Field] {
        match self {
            Self::Device => &[Field::Platform, Field::Tags],
            Self::Interface => &[
                Field::Type,
                Field::Enabled,
                Field::MgmtOnly,
                Field::Mtu,
                Field::Mac,
                Field::Description,
                Field::Mode,
                Field::UntaggedVlan,
                Field::TaggedVlans,
                Field::Tags,
            ],
            Self::Vlan => &[Field::Name, Field::Status, Field::Tags],
        }
    }
}

// ── NaturalKey ───────────────────────────────────────────────────────

/// Stable identity shared by the desired and actual side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NaturalKey {
    Device { name: String },
    Interface { device: String, name: String },
    Vlan { site: String, vid: u16 },
}

impl NaturalKey {
    pub fn device(name: impl Into<String>) -> Self {
        Self::Device { name: name.into() }
    }

    pub fn interface(device: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Interface {
            device: device.into(),
            name: name.into(),
        }
    }

    pub fn vlan(site: impl Into<String>, vid: u16) -> Self {
        Self::Vlan {
            site: site.into(),
            vid,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Device { .. } => EntityKind::Device,
            Self::Interface { .. } => EntityKind::Interface,
            Self::Vlan { .. } => EntityKind::Vlan,
        }
    }

    /// VLAN id, for VLAN keys only.
    pub fn vid(&self) -> Option<u16> {
        match self {
            Self::Vlan { vid, .. } => Some(*vid),
            _ => None,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device { name } => write!(f, "{name}"),
            Self::Interface { device, name } => write!(f, "{device}:{name}"),
            Self::Vlan { site, vid } => write!(f, "{site}/vlan{vid}"),
        }
    }
}

// ── Attribute enums ──────────────────────────────────────────────────

/// Interface type slug. Values the normalizer derives are named; anything
/// else read from the inventory is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterfaceType {
    Virtual,
    Base100Tx,
    Base1000T,
    Base10GSfpPlus,
    Other(String),
}

impl InterfaceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Virtual => "virtual",
            Self::Base100Tx => "100base-tx",
            Self::Base1000T => "1000base-t",
            Self::Base10GSfpPlus => "10gbase-x-sfpp",
            Self::Other(slug) => slug,
        }
    }

    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "virtual" => Self::Virtual,
            "100base-tx" => Self::Base100Tx,
            "1000base-t" => Self::Base1000T,
            "10gbase-x-sfpp" => Self::Base10GSfpPlus,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 802.1Q mode of a switchport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum VlanMode {
    #[strum(serialize = "access")]
    Access,
    #[strum(serialize = "tagged")]
    Tagged,
    #[strum(serialize = "tagged-all")]
    TaggedAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VlanStatus {
    Active,
    Reserved,
    Deprecated,
}

// ── Per-kind attributes ──────────────────────────────────────────────

/// Device attributes. Only `platform` is authoritative; the rest is context
/// for tag derivation and probing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAttrs {
    pub platform: Option<String>,
    pub site: Option<String>,
    pub model: Option<String>,
    pub status: Option<String>,
    pub primary_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAttrs {
    pub kind: Option<InterfaceType>,
    pub enabled: bool,
    pub mgmt_only: bool,
    pub mtu: Option<u32>,
    pub mac: Option<String>,
    pub description: Option<String>,
    pub mode: Option<VlanMode>,
    pub untagged_vlan: Option<u16>,
    pub tagged_vlans: BTreeSet<u16>,
}

impl Default for InterfaceAttrs {
    fn default() -> Self {
        Self {
            kind: None,
            enabled: true,
            mgmt_only: false,
            mtu: None,
            mac: None,
            description: None,
            mode: None,
            untagged_vlan: None,
            tagged_vlans: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanAttrs {
    pub name: String,
    pub status: VlanStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attributes {
    Device(DeviceAttrs),
    Interface(InterfaceAttrs),
    Vlan(VlanAttrs),
}

// ── Entity ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    key: NaturalKey,
    attrs: Attributes,
    pub tags: BTreeSet<String>,
}

impl Entity {
    pub fn device(name: impl Into<String>, attrs: DeviceAttrs) -> Self {
        Self {
            key: NaturalKey::device(name),
            attrs: Attributes::Device(attrs),
            tags: BTreeSet::new(),
        }
    }

    pub fn interface(
        device: impl Into<String>,
        name: impl Into<String>,
        attrs: InterfaceAttrs,
    ) -> Self {
        Self {
            key: NaturalKey::interface(device, name),
            attrs: Attributes::Interface(attrs),
            tags: BTreeSet::new(),
        }
    }

    pub fn vlan(site: impl Into<String>, vid: u16, attrs: VlanAttrs) -> Self {
        Self {
            key: NaturalKey::vlan(site, vid),
            attrs: Attributes::Vlan(attrs),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> &NaturalKey {
        &self.key
    }

    pub fn kind(&self) -> EntityKind {
        self.key.kind()
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Short name: device name, interface name, or VLAN id.
    pub fn name(&self) -> String {
        match &self.key {
            NaturalKey::Device { name } | NaturalKey::Interface { name, .. } => name.clone(),
            NaturalKey::Vlan { vid, .. } => vid.to_string(),
        }
    }

    pub fn as_device(&self) -> Option<&DeviceAttrs> {
        match &self.attrs {
            Attributes::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_device_mut(&mut self) -> Option<&mut DeviceAttrs> {
        match &mut self.attrs {
            Attributes::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceAttrs> {
        match &self.attrs {
            Attributes::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_interface_mut(&mut self) -> Option<&mut InterfaceAttrs> {
        match &mut self.attrs {
            Attributes::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_vlan(&self) -> Option<&VlanAttrs> {
        match &self.attrs {
            Attributes::Vlan(v) => Some(v),
            _ => None,
        }
    }

    /// Current value of `field` in comparable form. Fields that do not belong
    /// to this entity's kind read as `FieldValue::None`.
    pub fn field_value(&self, field: Field) -> FieldValue {
        if field == Field::Tags {
            return FieldValue::Tags(self.tags.clone());
        }
        match (&self.attrs, field) {
            (Attributes::Device(d), Field::Platform) => FieldValue::text(d.platform.as_deref()),

            (Attributes::Interface(i), Field::Type) => {
                FieldValue::text(i.kind.as_ref().map(InterfaceType::as_str))
            }
            (Attributes::Interface(i), Field::Enabled) => FieldValue::Bool(i.enabled),
            (Attributes::Interface(i), Field::MgmtOnly) => FieldValue::Bool(i.mgmt_only),
            (Attributes::Interface(i), Field::Mtu) => {
                i.mtu.filter(|m| *m != 0).map_or(FieldValue::None, FieldValue::Int)
            }
            (Attributes::Interface(i), Field::Mac) => FieldValue::text(
                i.mac
                    .as_deref()
                    .map(crate::normalize::normalize_mac)
                    .unwrap_or_default()
                    .as_deref(),
            ),
            (Attributes::Interface(i), Field::Description) => {
                FieldValue::text(i.description.as_deref().map(str::trim))
            }
            (Attributes::Interface(i), Field::Mode) => {
                FieldValue::text(i.mode.map(|m| m.to_string()).as_deref())
            }
            (Attributes::Interface(i), Field::UntaggedVlan) => {
                i.untagged_vlan.map_or(FieldValue::None, |v| FieldValue::Int(u32::from(v)))
            }
            (Attributes::Interface(i), Field::TaggedVlans) => {
                FieldValue::Vlans(i.tagged_vlans.clone())
            }

            (Attributes::Vlan(v), Field::Name) => FieldValue::Text(v.name.trim().to_owned()),
            (Attributes::Vlan(v), Field::Status) => FieldValue::Text(v.status.to_string()),

            _ => FieldValue::None,
        }
    }

    /// Every populated authoritative field, for create reporting.
    pub fn fields(&self) -> BTreeMap<Field, FieldValue> {
        self.kind()
            .authoritative_fields()
            .iter()
            .map(|f| (*f, self.field_value(*f)))
            .filter(|(_, v)| !v.is_none())
            .collect()
    }

    /// Apply a single field change in place.
    pub fn apply(&mut self, change: &FieldChange) -> Result<(), CoreError> {
        let mismatch = || {
            CoreError::Internal(format!(
                "cannot apply {} = {} to {}",
                change.field, change.new, self.key
            ))
        };

        if change.field == Field::Tags {
            let FieldValue::Tags(ref tags) = change.new else {
                return Err(mismatch());
            };
            self.tags.clone_from(tags);
            return Ok(());
        }

        match (&mut self.attrs, change.field, &change.new) {
            (Attributes::Device(d), Field::Platform, v) => d.platform = v.as_text(),

            (Attributes::Interface(i), Field::Type, v) => {
                i.kind = v.as_text().map(|s| InterfaceType::from_slug(&s));
            }
            (Attributes::Interface(i), Field::Enabled, FieldValue::Bool(b)) => i.enabled = *b,
            (Attributes::Interface(i), Field::MgmtOnly, FieldValue::Bool(b)) => i.mgmt_only = *b,
            (Attributes::Interface(i), Field::Mtu, v) => i.mtu = v.as_int(),
            (Attributes::Interface(i), Field::Mac, v) => i.mac = v.as_text(),
            (Attributes::Interface(i), Field::Description, v) => i.description = v.as_text(),
            (Attributes::Interface(i), Field::Mode, v) => {
                i.mode = v.as_text().and_then(|s| s.parse().ok());
            }
            (Attributes::Interface(i), Field::UntaggedVlan, v) => {
                i.untagged_vlan = v.as_int().and_then(|n| u16::try_from(n).ok());
            }
            (Attributes::Interface(i), Field::TaggedVlans, FieldValue::Vlans(vids)) => {
                i.tagged_vlans.clone_from(vids);
            }

            (Attributes::Vlan(v), Field::Name, FieldValue::Text(name)) => v.name.clone_from(name),
            (Attributes::Vlan(v), Field::Status, FieldValue::Text(status)) => {
                v.status = status.parse().map_err(|_| mismatch())?;
            }

            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// One-line attribute summary for listings.
    pub fn summary(&self) -> String {
        self.fields()
            .into_iter()
            .filter(|(f, _)| *f != Field::Tags)
            .map(|(f, v)| match v {
                FieldValue::Vlans(ref vids) => format!("{f}={}", format_vlan_list(vids)),
                other => format!("{f}={other}"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serialized as `{ key, fields }` with only populated authoritative fields.
impl Serialize for Entity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Entity", 2)?;
        s.serialize_field("key", self.key())?;
        s.serialize_field("fields", &self.fields())?;
        s.end()
    }
}

// ── EntitySet ────────────────────────────────────────────────────────

/// Desired or actual side of a reconciliation: unique natural keys,
/// iteration in key order regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    entities: BTreeMap<NaturalKey, Entity>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. A second entity with the same key is rejected.
    pub fn insert(&mut self, entity: Entity) -> Result<(), CoreError> {
        if self.entities.contains_key(entity.key()) {
            return Err(CoreError::DuplicateKey {
                key: entity.key().to_string(),
            });
        }
        self.entities.insert(entity.key().clone(), entity);
        Ok(())
    }

    pub fn from_entities<I: IntoIterator<Item = Entity>>(iter: I) -> Result<Self, CoreError> {
        let mut set = Self::new();
        for entity in iter {
            set.insert(entity)?;
        }
        Ok(set)
    }

    pub fn get(&self, key: &NaturalKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NaturalKey> {
        self.entities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drop every entity for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&Entity) -> bool) {
        self.entities.retain(|_, e| keep(e));
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }
}

impl IntoIterator for EntitySet {
    type Item = Entity;
    type IntoIter = std::collections::btree_map::IntoValues<NaturalKey, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_values()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn vlan(site: &str, vid: u16, name: &str) -> Entity {
        Entity::vlan(
            site,
            vid,
            VlanAttrs {
                name: name.into(),
                status: VlanStatus::Active,
            },
        )
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut set = EntitySet::new();
        set.insert(vlan("den", 10, "USERS")).unwrap();
        let err = set.insert(vlan("den", 10, "OTHER")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { .. }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn same_vid_on_two_sites_is_distinct() {
        let set = EntitySet::from_entities([vlan("den", 10, "A"), vlan("ord", 10, "A")]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn key_display() {
        assert_eq!(NaturalKey::device("RDEN01CR01").to_string(), "RDEN01CR01");
        assert_eq!(
            NaturalKey::interface("RDEN01CR01", "Gi0/1").to_string(),
            "RDEN01CR01:Gi0/1"
        );
        assert_eq!(NaturalKey::vlan("den", 20).to_string(), "den/vlan20");
    }

    #[test]
    fn zero_mtu_reads_as_unset() {
        let iface = Entity::interface(
            "SDEN01AC01",
            "Gi1/0/1",
            InterfaceAttrs {
                mtu: Some(0),
                ..InterfaceAttrs::default()
            },
        );
        assert!(iface.field_value(Field::Mtu).is_none());
    }

    #[test]
    fn apply_updates_fields() {
        let mut iface = Entity::interface("SDEN01AC01", "Gi1/0/1", InterfaceAttrs::default());
        iface
            .apply(&FieldChange {
                field: Field::Mode,
                old: FieldValue::None,
                new: FieldValue::Text("tagged-all".into()),
            })
            .unwrap();
        iface
            .apply(&FieldChange {
                field: Field::Mtu,
                old: FieldValue::None,
                new: FieldValue::Int(9000),
            })
            .unwrap();
        let attrs = iface.as_interface().unwrap();
        assert_eq!(attrs.mode, Some(VlanMode::TaggedAll));
        assert_eq!(attrs.mtu, Some(9000));
    }

    #[test]
    fn apply_rejects_foreign_field() {
        let mut v = vlan("den", 10, "USERS");
        let err = v
            .apply(&FieldChange {
                field: Field::Mtu,
                old: FieldValue::None,
                new: FieldValue::Int(1500),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
