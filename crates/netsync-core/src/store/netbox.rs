// ── NetBox-backed inventory store ──
//
// Maps NetBox wire models to engine entities and back. NetBox addresses
// objects by numeric id while the engine uses natural keys, so every id seen
// while listing is cached and lookups fall back to a filtered GET.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use netsync_api::netbox::extras::slugify;
use netsync_api::netbox::models::{
    DevicePatch, InterfaceWrite, NbDevice, NbInterface, NbVlan, NestedRef, TagCreate, TagRef,
    VlanWrite,
};
use netsync_api::{NetBoxClient, TlsMode, TransportConfig};
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::{Filter, InventoryStore};
use crate::config::{InventoryConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{
    DeviceAttrs, Entity, EntityKind, Field, FieldChange, FieldValue, InterfaceAttrs,
    InterfaceType, NaturalKey, VlanAttrs, VlanStatus,
};

/// NetBox requires an interface type on create; used when none was derived.
const FALLBACK_INTERFACE_TYPE: &str = "other";

pub struct NetBoxStore {
    client: NetBoxClient,
    /// natural key -> NetBox object id
    ids: DashMap<NaturalKey, u64>,
    /// device name -> (id, site key)
    devices: DashMap<String, (u64, String)>,
    /// site key -> id
    sites: DashMap<String, u64>,
    /// (site key, vid) -> VLAN id
    vlans: DashMap<(String, u16), u64>,
    /// platform slug -> id, loaded on first use
    platforms: OnceCell<BTreeMap<String, u64>>,
    /// existing tag names, loaded on first use
    tags: Mutex<Option<BTreeSet<String>>>,
}

impl NetBoxStore {
    pub fn new(client: NetBoxClient) -> Self {
        Self {
            client,
            ids: DashMap::new(),
            devices: DashMap::new(),
            sites: DashMap::new(),
            vlans: DashMap::new(),
            platforms: OnceCell::new(),
            tags: Mutex::new(None),
        }
    }

    /// Build the API client from connection settings.
    pub fn connect(config: &InventoryConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: config.timeout,
        };
        if config.token.expose_secret().is_empty() {
            return Err(CoreError::Config {
                message: "inventory API token is empty".into(),
            });
        }
        let client = NetBoxClient::from_token(config.url.as_str(), &config.token, &transport)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &NetBoxClient {
        &self.client
    }

    // ── Wire -> entity ───────────────────────────────────────────────

    fn device_entity(&self, device: NbDevice) -> Option<Entity> {
        let Some(name) = device.name.filter(|n| !n.is_empty()) else {
            debug!(id = device.id, "skipping unnamed device");
            return None;
        };
        let site = site_key(&device.site);
        self.ids.insert(NaturalKey::device(&name), device.id);
        self.devices.insert(name.clone(), (device.id, site.clone()));
        self.sites.insert(site.clone(), device.site.id);

        let attrs = DeviceAttrs {
            platform: device.platform.and_then(|p| p.slug),
            site: Some(site),
            model: Some(device.device_type.model),
            status: device.status.map(|s| s.value),
            primary_ip: device
                .primary_ip4
                .map(|ip| ip.address.split('/').next().unwrap_or_default().to_owned()),
        };
        Some(Entity::device(name, attrs).with_tags(device.tags.into_iter().map(|t| t.name)))
    }

    fn interface_entity(&self, iface: NbInterface) -> Option<Entity> {
        let device = iface.device.name?;
        let key = NaturalKey::interface(&device, &iface.name);
        self.ids.insert(key, iface.id);

        let attrs = InterfaceAttrs {
            kind: Some(InterfaceType::from_slug(&iface.kind.value)),
            enabled: iface.enabled,
            mgmt_only: iface.mgmt_only,
            mtu: iface.mtu,
            mac: iface.mac_address,
            description: Some(iface.description).filter(|d| !d.trim().is_empty()),
            mode: iface.mode.and_then(|m| m.value.parse().ok()),
            untagged_vlan: iface.untagged_vlan.map(|v| v.vid),
            tagged_vlans: iface.tagged_vlans.iter().map(|v| v.vid).collect(),
        };
        Some(Entity::interface(device, iface.name, attrs).with_tags(iface.tags.into_iter().map(|t| t.name)))
    }

    fn vlan_entity(&self, vlan: NbVlan) -> Option<Entity> {
        // global VLANs have no site and no natural key here
        let site = site_key(vlan.site.as_ref()?);
        self.ids.insert(NaturalKey::vlan(&site, vlan.vid), vlan.id);
        self.vlans.insert((site.clone(), vlan.vid), vlan.id);

        let status = vlan
            .status
            .and_then(|s| s.value.parse().ok())
            .unwrap_or(VlanStatus::Deprecated);
        let attrs = VlanAttrs {
            name: vlan.name,
            status,
        };
        Some(Entity::vlan(site, vlan.vid, attrs).with_tags(vlan.tags.into_iter().map(|t| t.name)))
    }

    // ── Id resolution ────────────────────────────────────────────────

    async fn device_ref(&self, name: &str) -> Result<(u64, String), CoreError> {
        let cached = self.devices.get(name).map(|r| r.value().clone());
        if let Some(found) = cached {
            return Ok(found);
        }
        let device = self
            .client
            .find_device(name)
            .await?
            .ok_or_else(|| not_found("device", name))?;
        self.device_entity(device);
        self.devices
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| not_found("device", name))
    }

    async fn site_id(&self, site: &str) -> Result<u64, CoreError> {
        let cached = self.sites.get(site).map(|r| *r.value());
        if let Some(id) = cached {
            return Ok(id);
        }
        let found = self.client.list_sites(&[("slug", site.to_owned())]).await?;
        let id = found.first().map(|s| s.id).ok_or_else(|| not_found("site", site))?;
        self.sites.insert(site.to_owned(), id);
        Ok(id)
    }

    async fn vlan_id(&self, site: &str, vid: u16) -> Result<u64, CoreError> {
        let cached = self.vlans.get(&(site.to_owned(), vid)).map(|r| *r.value());
        if let Some(id) = cached {
            return Ok(id);
        }
        let found = self
            .client
            .list_vlans(&[("site", site.to_owned()), ("vid", vid.to_string())])
            .await?;
        let id = found
            .first()
            .map(|v| v.id)
            .ok_or_else(|| not_found("vlan", &format!("{site}/{vid}")))?;
        self.vlans.insert((site.to_owned(), vid), id);
        Ok(id)
    }

    async fn platform_id(&self, slug: &str) -> Result<u64, CoreError> {
        let platforms = self
            .platforms
            .get_or_try_init(|| async {
                let list = self.client.list_platforms().await?;
                Ok::<_, CoreError>(list.into_iter().map(|p| (p.slug, p.id)).collect())
            })
            .await?;
        platforms
            .get(slug)
            .copied()
            .ok_or_else(|| not_found("platform", slug))
    }

    async fn object_id(&self, key: &NaturalKey) -> Result<u64, CoreError> {
        let cached = self.ids.get(key).map(|r| *r.value());
        if let Some(id) = cached {
            return Ok(id);
        }
        self.get(key).await?;
        self.ids
            .get(key)
            .map(|r| *r.value())
            .ok_or_else(|| not_found(&key.kind().to_string(), &key.to_string()))
    }

    // ── Entity / change -> wire ──────────────────────────────────────

    fn tag_refs(tags: &BTreeSet<String>) -> Vec<TagRef> {
        tags.iter().map(TagRef::new).collect()
    }

    async fn vlan_ids(&self, site: &str, vids: &BTreeSet<u16>) -> Result<Vec<u64>, CoreError> {
        let mut ids = Vec::with_capacity(vids.len());
        for vid in vids {
            ids.push(self.vlan_id(site, *vid).await?);
        }
        Ok(ids)
    }

    async fn interface_changes(
        &self,
        device: &str,
        changes: &[FieldChange],
    ) -> Result<InterfaceWrite, CoreError> {
        let mut body = InterfaceWrite::default();
        for change in changes {
            match (change.field, &change.new) {
                (Field::Type, v) => {
                    body.kind = Some(v.as_text().unwrap_or_else(|| FALLBACK_INTERFACE_TYPE.into()));
                }
                (Field::Enabled, FieldValue::Bool(b)) => body.enabled = Some(*b),
                (Field::MgmtOnly, FieldValue::Bool(b)) => body.mgmt_only = Some(*b),
                (Field::Mtu, v) => body.mtu = Some(v.as_int()),
                (Field::Mac, v) => body.mac_address = Some(v.as_text().map(|m| colon_mac(&m))),
                (Field::Description, v) => body.description = Some(v.as_text().unwrap_or_default()),
                (Field::Mode, v) => body.mode = Some(v.as_text()),
                (Field::UntaggedVlan, v) => {
                    body.untagged_vlan = Some(match v.as_int().and_then(|n| u16::try_from(n).ok()) {
                        Some(vid) => {
                            let (_, site) = self.device_ref(device).await?;
                            Some(self.vlan_id(&site, vid).await?)
                        }
                        None => None,
                    });
                }
                (Field::TaggedVlans, FieldValue::Vlans(vids)) => {
                    let (_, site) = self.device_ref(device).await?;
                    body.tagged_vlans = Some(self.vlan_ids(&site, vids).await?);
                }
                (Field::Tags, FieldValue::Tags(tags)) => body.tags = Some(Self::tag_refs(tags)),
                _ => return Err(unsupported_change(change)),
            }
        }
        Ok(body)
    }

    async fn device_changes(&self, changes: &[FieldChange]) -> Result<DevicePatch, CoreError> {
        let mut body = DevicePatch::default();
        for change in changes {
            match (change.field, &change.new) {
                (Field::Platform, FieldValue::Text(slug)) => {
                    body.platform = Some(Some(self.platform_id(slug).await?));
                }
                (Field::Platform, FieldValue::None) => body.platform = Some(None),
                (Field::Tags, FieldValue::Tags(tags)) => body.tags = Some(Self::tag_refs(tags)),
                _ => return Err(unsupported_change(change)),
            }
        }
        Ok(body)
    }

    fn vlan_changes(changes: &[FieldChange]) -> Result<VlanWrite, CoreError> {
        let mut body = VlanWrite::default();
        for change in changes {
            match (change.field, &change.new) {
                (Field::Name, FieldValue::Text(name)) => body.name = Some(name.clone()),
                (Field::Status, FieldValue::Text(status)) => body.status = Some(status.clone()),
                (Field::Tags, FieldValue::Tags(tags)) => body.tags = Some(Self::tag_refs(tags)),
                _ => return Err(unsupported_change(change)),
            }
        }
        Ok(body)
    }

    /// Every populated field of `entity` expressed as changes from nothing.
    fn as_changes(entity: &Entity) -> Vec<FieldChange> {
        entity
            .fields()
            .into_iter()
            .map(|(field, new)| FieldChange {
                field,
                old: FieldValue::None,
                new,
            })
            .collect()
    }

    async fn load_tags(&self) -> Result<BTreeSet<String>, CoreError> {
        Ok(self
            .client
            .list_tags()
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect())
    }
}

impl InventoryStore for NetBoxStore {
    async fn list(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Entity>, CoreError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref site) = filter.site {
            params.push(("site", slugify(site)));
        }
        if let Some(ref region) = filter.region {
            params.push(("region", slugify(region)));
        }
        if let Some(ref tag) = filter.tag {
            params.push(("tag", slugify(tag)));
        }

        let entities: Vec<Entity> = match kind {
            EntityKind::Device => {
                if !filter.include_inactive {
                    params.push(("status", "active".into()));
                }
                let devices = self.client.list_devices(&params).await?;
                devices.into_iter().filter_map(|d| self.device_entity(d)).collect()
            }
            EntityKind::Interface => {
                if let Some(ref device) = filter.device {
                    params.push(("device", device.clone()));
                }
                let ifaces = self.client.list_interfaces(&params).await?;
                ifaces.into_iter().filter_map(|i| self.interface_entity(i)).collect()
            }
            EntityKind::Vlan => {
                let vlans = self.client.list_vlans(&params).await?;
                vlans.into_iter().filter_map(|v| self.vlan_entity(v)).collect()
            }
        };

        debug!(%kind, count = entities.len(), "listed inventory");
        Ok(entities)
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<Entity>, CoreError> {
        Ok(match key {
            NaturalKey::Device { name } => self
                .client
                .find_device(name)
                .await?
                .and_then(|d| self.device_entity(d)),
            NaturalKey::Interface { device, name } => self
                .client
                .list_interfaces(&[("device", device.clone()), ("name", name.clone())])
                .await?
                .into_iter()
                .find_map(|i| self.interface_entity(i)),
            NaturalKey::Vlan { site, vid } => self
                .client
                .list_vlans(&[("site", site.clone()), ("vid", vid.to_string())])
                .await?
                .into_iter()
                .find_map(|v| self.vlan_entity(v)),
        })
    }

    async fn create(&self, entity: &Entity) -> Result<(), CoreError> {
        let key = entity.key();
        match key {
            NaturalKey::Device { .. } => {
                return Err(CoreError::Unsupported {
                    operation: "creating devices".into(),
                });
            }
            NaturalKey::Interface { device, name } => {
                let (device_id, _) = self.device_ref(device).await?;
                let mut body = self.interface_changes(device, &Self::as_changes(entity)).await?;
                body.device = Some(device_id);
                body.name = Some(name.clone());
                if body.kind.is_none() {
                    body.kind = Some(FALLBACK_INTERFACE_TYPE.into());
                }
                let created = self.client.create_interface(&body).await?;
                self.ids.insert(key.clone(), created.id);
            }
            NaturalKey::Vlan { site, vid } => {
                let mut body = Self::vlan_changes(&Self::as_changes(entity))?;
                body.site = Some(self.site_id(site).await?);
                body.vid = Some(*vid);
                let created = self.client.create_vlan(&body).await?;
                self.ids.insert(key.clone(), created.id);
                self.vlans.insert((site.clone(), *vid), created.id);
            }
        }
        info!(%key, "created");
        Ok(())
    }

    async fn update(&self, key: &NaturalKey, changes: &[FieldChange]) -> Result<(), CoreError> {
        let id = self.object_id(key).await?;
        match key {
            NaturalKey::Device { .. } => {
                let body = self.device_changes(changes).await?;
                self.client.patch_device(id, &body).await?;
            }
            NaturalKey::Interface { device, .. } => {
                let body = self.interface_changes(device, changes).await?;
                self.client.patch_interface(id, &body).await?;
            }
            NaturalKey::Vlan { .. } => {
                let body = Self::vlan_changes(changes)?;
                self.client.patch_vlan(id, &body).await?;
            }
        }
        info!(%key, fields = changes.len(), "updated");
        Ok(())
    }

    async fn delete(&self, key: &NaturalKey) -> Result<(), CoreError> {
        let id = self.object_id(key).await?;
        match key {
            NaturalKey::Device { .. } => {
                return Err(CoreError::Unsupported {
                    operation: "deleting devices".into(),
                });
            }
            NaturalKey::Interface { .. } => self.client.delete_interface(id).await?,
            NaturalKey::Vlan { site, vid } => {
                self.client.delete_vlan(id).await?;
                self.vlans.remove(&(site.clone(), *vid));
            }
        }
        self.ids.remove(key);
        info!(%key, "deleted");
        Ok(())
    }

    async fn sites(&self, filter: &Filter) -> Result<Vec<String>, CoreError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(ref site) = filter.site {
            params.push(("slug", slugify(site)));
        }
        if let Some(ref region) = filter.region {
            params.push(("region", slugify(region)));
        }
        let sites = self.client.list_sites(&params).await?;
        Ok(sites
            .into_iter()
            .map(|s| {
                self.sites.insert(s.slug.clone(), s.id);
                s.slug
            })
            .collect())
    }

    async fn ensure_tags(&self, tags: &BTreeSet<String>) -> Result<Vec<String>, CoreError> {
        let mut known = self.tags.lock().await;
        if known.is_none() {
            *known = Some(self.load_tags().await?);
        }
        let existing = known.get_or_insert_with(BTreeSet::new);

        let missing: Vec<String> = tags
            .iter()
            .filter(|t| !existing.contains(*t))
            .cloned()
            .collect();

        let mut created = Vec::with_capacity(missing.len());
        for name in missing {
            let body = TagCreate {
                slug: slugify(&name),
                name: name.clone(),
                color: None,
            };
            self.client.create_tag(&body).await?;
            info!(tag = %name, "created tag");
            existing.insert(name.clone());
            created.push(name);
        }
        Ok(created)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Site identity used in natural keys: slug, else name, else id.
fn site_key(site: &NestedRef) -> String {
    site.slug
        .clone()
        .or_else(|| site.name.clone())
        .unwrap_or_else(|| site.id.to_string())
}

/// `AABBCCDDEEFF` -> `AA:BB:CC:DD:EE:FF`; other lengths pass through.
fn colon_mac(mac: &str) -> String {
    if mac.len() != 12 || !mac.is_ascii() {
        return mac.to_owned();
    }
    mac.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

fn not_found(entity_type: &str, identifier: &str) -> CoreError {
    CoreError::NotFound {
        entity_type: entity_type.to_owned(),
        identifier: identifier.to_owned(),
    }
}

fn unsupported_change(change: &FieldChange) -> CoreError {
    CoreError::Unsupported {
        operation: format!("writing {} = {}", change.field, change.new),
    }
}
