// ── Reconciler ──
//
// Diffs a desired entity set against an actual one and produces a plan of
// disjoint create / update / delete buckets, each sorted by natural key.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{ReconcileOptions, TagMode};
use crate::model::{Entity, EntitySet, Field, FieldChange, FieldValue, NaturalKey};

/// Changed fields of one entity present on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityUpdate {
    pub key: NaturalKey,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub to_create: Vec<Entity>,
    pub to_update: Vec<EntityUpdate>,
    pub to_delete: Vec<NaturalKey>,
    /// Keys present on both sides with no differences.
    pub unchanged: Vec<NaturalKey>,
}

impl ReconciliationPlan {
    /// `true` when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Number of mutating operations.
    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Every tag name a create or update would write.
    pub fn referenced_tags(&self) -> BTreeSet<String> {
        let created = self.to_create.iter().flat_map(|e| e.tags.iter().cloned());
        let updated = self
            .to_update
            .iter()
            .flat_map(|u| &u.changes)
            .filter_map(|c| match &c.new {
                FieldValue::Tags(tags) => Some(tags.iter().cloned()),
                _ => None,
            })
            .flatten();
        created.chain(updated).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Compute the plan converging `actual` to `desired`.
    pub fn reconcile(&self, desired: &EntitySet, actual: &EntitySet) -> ReconciliationPlan {
        let mut plan = ReconciliationPlan::default();

        let keys: BTreeSet<&NaturalKey> = desired
            .keys()
            .chain(actual.keys())
            .filter(|k| !self.is_excluded(k))
            .collect();

        for key in keys {
            match (desired.get(key), actual.get(key)) {
                (Some(want), None) => plan.to_create.push(self.without_excluded(want)),
                (None, Some(_)) => plan.to_delete.push(key.clone()),
                (Some(want), Some(have)) => {
                    let changes = self.diff(want, have);
                    if changes.is_empty() {
                        plan.unchanged.push(key.clone());
                    } else {
                        plan.to_update.push(EntityUpdate {
                            key: key.clone(),
                            changes,
                        });
                    }
                }
                (None, None) => {}
            }
        }

        plan
    }

    fn is_excluded(&self, key: &NaturalKey) -> bool {
        key.vid()
            .is_some_and(|vid| self.options.excluded_vlans.contains(&vid))
    }

    /// Copy of `entity` with excluded VLAN ids dropped from its memberships.
    fn without_excluded(&self, entity: &Entity) -> Entity {
        let mut entity = entity.clone();
        if let Some(attrs) = entity.as_interface_mut() {
            let excluded = &self.options.excluded_vlans;
            attrs.tagged_vlans.retain(|vid| !excluded.contains(vid));
            attrs.untagged_vlan = attrs.untagged_vlan.filter(|vid| !excluded.contains(vid));
        }
        entity
    }

    /// Changed authoritative fields, in schema order.
    fn diff(&self, desired: &Entity, actual: &Entity) -> Vec<FieldChange> {
        let desired = self.without_excluded(desired);
        let actual = self.without_excluded(actual);
        let tag_mode = self.options.tag_mode_for(desired.key());

        desired
            .kind()
            .authoritative_fields()
            .iter()
            .filter_map(|&field| {
                let old = actual.field_value(field);
                let new = desired.field_value(field);
                match field {
                    Field::Tags => tag_change(&desired, &actual, tag_mode),
                    // unset type / platform on the desired side means "leave alone"
                    Field::Type | Field::Platform if new.is_none() => None,
                    _ if old == new => None,
                    _ => Some(FieldChange { field, old, new }),
                }
            })
            .collect()
    }
}

fn tag_change(desired: &Entity, actual: &Entity, mode: TagMode) -> Option<FieldChange> {
    let new = match mode {
        TagMode::Additive => {
            if desired.tags.is_subset(&actual.tags) {
                return None;
            }
            actual.tags.union(&desired.tags).cloned().collect()
        }
        TagMode::Replace => {
            if desired.tags == actual.tags {
                return None;
            }
            desired.tags.clone()
        }
    };
    Some(FieldChange {
        field: Field::Tags,
        old: FieldValue::Tags(actual.tags.clone()),
        new: FieldValue::Tags(new),
    })
}
