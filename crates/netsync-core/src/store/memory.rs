// ── In-memory inventory ──
//
// Lock-free `DashMap` storage implementing `InventoryStore`. Counts every
// mutating call and can be told to fail or stall specific keys.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::{DashMap, DashSet};

use super::{Filter, InventoryStore};
use crate::error::CoreError;
use crate::model::{Entity, EntityKind, FieldChange, NaturalKey};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: DashMap<NaturalKey, Entity>,
    /// site -> region
    sites: DashMap<String, Option<String>>,
    tags: DashSet<String>,
    failures: DashMap<NaturalKey, String>,
    stalls: DashMap<NaturalKey, Duration>,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with entities, bypassing the mutation counter.
    pub fn with_entities<I: IntoIterator<Item = Entity>>(self, entities: I) -> Self {
        for entity in entities {
            if let Some(site) = entity.as_device().and_then(|d| d.site.clone()) {
                self.sites.entry(site).or_insert(None);
            }
            for tag in &entity.tags {
                self.tags.insert(tag.clone());
            }
            self.entities.insert(entity.key().clone(), entity);
        }
        self
    }

    pub fn with_site(self, site: impl Into<String>, region: Option<&str>) -> Self {
        self.sites.insert(site.into(), region.map(str::to_owned));
        self
    }

    /// Make every mutation of `key` fail with `message`.
    pub fn fail_on(&self, key: NaturalKey, message: impl Into<String>) {
        self.failures.insert(key, message.into());
    }

    /// Make every mutation of `key` sleep for `delay` first.
    pub fn stall_on(&self, key: NaturalKey, delay: Duration) {
        self.stalls.insert(key, delay);
    }

    /// Number of create/update/delete/tag calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<NaturalKey, Entity> {
        self.entities
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    async fn begin_mutation(&self, key: &NaturalKey) -> Result<(), CoreError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let stall = self.stalls.get(key).map(|d| *d.value());
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.get(key).map(|m| m.value().clone());
        match failure {
            Some(message) => Err(CoreError::Store {
                message,
                status: None,
            }),
            None => Ok(()),
        }
    }

    fn unscoped(filter: &Filter) -> bool {
        filter.site.is_none() && filter.region.is_none()
    }

    fn matches(
        entity: &Entity,
        kind: EntityKind,
        filter: &Filter,
        sites: &BTreeSet<String>,
    ) -> bool {
        if entity.kind() != kind {
            return false;
        }
        if let Some(ref tag) = filter.tag {
            if !entity.tags.contains(tag) {
                return false;
            }
        }
        match entity.key() {
            NaturalKey::Device { .. } => {
                let attrs = entity.as_device();
                let site = attrs.and_then(|d| d.site.as_deref()).unwrap_or_default();
                let active = attrs
                    .and_then(|d| d.status.as_deref())
                    .is_none_or(|s| s == "active");
                (Self::unscoped(filter) || sites.contains(site))
                    && (filter.include_inactive || active)
            }
            NaturalKey::Interface { device, .. } => {
                filter.device.as_ref().is_none_or(|d| d == device)
            }
            NaturalKey::Vlan { site, .. } => Self::unscoped(filter) || sites.contains(site),
        }
    }

    fn resolve_sites(&self, filter: &Filter) -> BTreeSet<String> {
        self.sites
            .iter()
            .filter(|r| filter.site.as_ref().is_none_or(|s| s == r.key()))
            .filter(|r| {
                filter
                    .region
                    .as_ref()
                    .is_none_or(|want| r.value().as_ref() == Some(want))
            })
            .map(|r| r.key().clone())
            .collect()
    }
}

impl InventoryStore for MemoryStore {
    async fn list(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Entity>, CoreError> {
        let sites = self.resolve_sites(filter);
        let mut found: Vec<Entity> = self
            .entities
            .iter()
            .filter(|r| Self::matches(r.value(), kind, filter, &sites))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(found)
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<Entity>, CoreError> {
        Ok(self.entities.get(key).map(|r| r.value().clone()))
    }

    async fn create(&self, entity: &Entity) -> Result<(), CoreError> {
        self.begin_mutation(entity.key()).await?;
        if self.entities.contains_key(entity.key()) {
            return Err(CoreError::DuplicateKey {
                key: entity.key().to_string(),
            });
        }
        self.entities.insert(entity.key().clone(), entity.clone());
        Ok(())
    }

    async fn update(&self, key: &NaturalKey, changes: &[FieldChange]) -> Result<(), CoreError> {
        self.begin_mutation(key).await?;
        let mut entry = self.entities.get_mut(key).ok_or_else(|| CoreError::NotFound {
            entity_type: key.kind().to_string(),
            identifier: key.to_string(),
        })?;
        for change in changes {
            entry.apply(change)?;
        }
        Ok(())
    }

    async fn delete(&self, key: &NaturalKey) -> Result<(), CoreError> {
        self.begin_mutation(key).await?;
        self.entities
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound {
                entity_type: key.kind().to_string(),
                identifier: key.to_string(),
            })
    }

    async fn sites(&self, filter: &Filter) -> Result<Vec<String>, CoreError> {
        Ok(self.resolve_sites(filter).into_iter().collect())
    }

    async fn ensure_tags(&self, tags: &BTreeSet<String>) -> Result<Vec<String>, CoreError> {
        let mut created = Vec::new();
        for tag in tags {
            if self.tags.insert(tag.clone()) {
                self.mutations.fetch_add(1, Ordering::SeqCst);
                created.push(tag.clone());
            }
        }
        Ok(created)
    }
}
