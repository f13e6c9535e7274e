// ── Sync pipeline ──
//
// Scope -> list -> decode -> per-site elections -> probes -> derive ->
// reconcile -> provision tags -> execute. Elections for a site are complete
// before any tag of that site is derived, and nothing is submitted to the
// store before the whole plan exists.

use std::collections::{BTreeMap, BTreeSet};
use std::future;

use futures_util::future::try_join_all;
use futures_util::{StreamExt, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, TagMode};
use crate::device::{self, DeviceConnector, DeviceTarget};
use crate::error::CoreError;
use crate::executor::Executor;
use crate::hostname::HostnameDecoder;
use crate::model::{DecodedHostname, Entity, EntityKind, EntitySet, NaturalKey};
use crate::normalize::Batch;
use crate::reconcile::{Reconciler, ReconciliationPlan};
use crate::report::{ExecutionReport, Warning};
use crate::store::{Filter, InventoryStore};
use crate::tags::{SiteElection, TagDeriver};

/// What a device run should change.
#[derive(Debug, Clone, Default)]
pub struct DeviceSyncRequest {
    pub filter: Filter,
    /// Write derived tags.
    pub update_tags: bool,
    /// Assign platforms mapped from tags to devices without one.
    pub update_platform: bool,
    /// Replace tag sets instead of adding to them.
    pub replace_tags: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    /// Sites the run covered.
    pub scope: Vec<String>,
    pub elections: Vec<SiteElection>,
    pub plan: ReconciliationPlan,
    pub report: ExecutionReport,
    /// Tags created in the inventory before applying the plan.
    pub tags_created: Vec<String>,
}

/// One device with its decoded hostname, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceListing {
    pub device: Entity,
    pub decoded: Option<DecodedHostname>,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    decoder: HostnameDecoder,
    deriver: TagDeriver,
    reconciler: Reconciler,
    executor: Executor,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            decoder: HostnameDecoder::new(config.tables.clone()),
            deriver: TagDeriver::new(config.rules.clone()),
            reconciler: Reconciler::new(config.reconcile.clone()),
            executor: Executor::new(config.executor.clone()),
        }
    }

    pub fn decoder(&self) -> &HostnameDecoder {
        &self.decoder
    }

    pub fn deriver(&self) -> &TagDeriver {
        &self.deriver
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    // ── Scope ────────────────────────────────────────────────────────

    /// Sites covered by `filter`. Unscoped filters cover every site.
    pub async fn resolve_scope<S: InventoryStore>(
        &self,
        store: &S,
        filter: &Filter,
    ) -> Result<Vec<String>, CoreError> {
        for (flag, value) in [("--site", &filter.site), ("--region", &filter.region)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CoreError::InvalidScope {
                    message: format!("{flag} must not be empty"),
                });
            }
        }

        let sites = store.sites(filter).await?;
        if sites.is_empty() && (filter.site.is_some() || filter.region.is_some()) {
            return Err(CoreError::EmptyScope {
                scope: describe(filter),
            });
        }
        debug!(sites = sites.len(), "scope resolved");
        Ok(sites)
    }

    /// Devices in scope, listed per site. Zero devices is an error.
    pub async fn scoped_devices<S: InventoryStore>(
        &self,
        store: &S,
        filter: &Filter,
    ) -> Result<(Vec<String>, Vec<Entity>), CoreError> {
        let sites = self.resolve_scope(store, filter).await?;

        let devices: Vec<Entity> = if filter.site.is_none() && filter.region.is_none() {
            store.list(EntityKind::Device, filter).await?
        } else {
            let per_site = sites.iter().map(|site| {
                let site_filter = Filter {
                    site: Some(site.clone()),
                    region: None,
                    ..filter.clone()
                };
                async move { store.list(EntityKind::Device, &site_filter).await }
            });
            try_join_all(per_site).await?.into_iter().flatten().collect()
        };

        if devices.is_empty() {
            return Err(CoreError::EmptyScope {
                scope: describe(filter),
            });
        }
        info!(devices = devices.len(), sites = sites.len(), "devices in scope");
        Ok((sites, devices))
    }

    pub async fn list_devices<S: InventoryStore>(
        &self,
        store: &S,
        filter: &Filter,
    ) -> Result<Vec<DeviceListing>, CoreError> {
        let (_, devices) = self.scoped_devices(store, filter).await?;
        Ok(devices
            .into_iter()
            .map(|device| DeviceListing {
                decoded: self.decoder.decode(&device.name()),
                device,
            })
            .collect())
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn sync_devices<S, C>(
        &self,
        store: &S,
        connector: Option<&C>,
        request: &DeviceSyncRequest,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, CoreError>
    where
        S: InventoryStore,
        C: DeviceConnector,
    {
        let (scope, devices) = self.scoped_devices(store, &request.filter).await?;
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let mut warnings = Vec::new();

        let decoded: Vec<Option<DecodedHostname>> = devices
            .iter()
            .map(|d| {
                let name = d.name();
                let hostname = self.decoder.decode(&name);
                if hostname.is_none() {
                    debug!(device = %name, "hostname does not decode");
                    warnings.push(Warning::MalformedInput {
                        context: name,
                        message: "hostname does not follow the naming convention".into(),
                    });
                }
                hostname
            })
            .collect();

        let elections = self.elect(&devices, &decoded, &mut warnings);

        let probe_hits = match connector {
            Some(connector) if request.update_tags => {
                self.run_probes(connector, &devices, &decoded, cancel, &mut warnings)
                    .await
            }
            _ => BTreeSet::new(),
        };

        let no_election = SiteElection::default();
        let mut desired = EntitySet::new();
        let mut actual = EntitySet::new();
        for (device, hostname) in devices.into_iter().zip(&decoded) {
            let name = device.name();
            let mut target = device.clone();

            if request.update_tags {
                let election = elections.get(site_of(&device)).unwrap_or(&no_election);
                let derived = self.deriver.derive(
                    &device,
                    hostname.as_ref(),
                    election,
                    probe_hits.contains(&name),
                );
                target.tags = if hostname.is_some() {
                    derived
                } else {
                    device.tags.union(&derived).cloned().collect()
                };
            }
            if request.update_platform {
                if let Some(platform) = self.deriver.platform_for(&device) {
                    if let Some(attrs) = target.as_device_mut() {
                        attrs.platform = Some(platform);
                    }
                }
            }

            desired.insert(target)?;
            actual.insert(device)?;
        }

        let plan = if request.replace_tags {
            let mut options = self.reconciler.options().clone();
            options.tag_mode = TagMode::Replace;
            Reconciler::new(options).reconcile(&desired, &actual)
        } else {
            self.reconciler.reconcile(&desired, &actual)
        };

        let mut outcome = self
            .finish(store, plan, request.dry_run, cancel, warnings)
            .await?;
        outcome.scope = scope;
        outcome.elections = elections.into_values().collect();
        Ok(outcome)
    }

    /// Per-site elections. A site's election only sees that site's devices.
    fn elect(
        &self,
        devices: &[Entity],
        decoded: &[Option<DecodedHostname>],
        warnings: &mut Vec<Warning>,
    ) -> BTreeMap<String, SiteElection> {
        let names: Vec<String> = devices.iter().map(Entity::name).collect();
        let mut groups: BTreeMap<&str, Vec<(&str, Option<&DecodedHostname>)>> = BTreeMap::new();
        for ((device, name), hostname) in devices.iter().zip(&names).zip(decoded) {
            groups
                .entry(site_of(device))
                .or_default()
                .push((name.as_str(), hostname.as_ref()));
        }

        groups
            .into_iter()
            .map(|(site, members)| {
                let election = self.deriver.elect_site(site, members.iter().copied());
                for warning in Warning::from_election(&election) {
                    warn!(%warning, "ambiguous election");
                    warnings.push(warning);
                }
                (site.to_owned(), election)
            })
            .collect()
    }

    /// Probe every qualifying device, at most `workers` at a time. Returns
    /// the names of devices where the marker was found.
    async fn run_probes<C: DeviceConnector>(
        &self,
        connector: &C,
        devices: &[Entity],
        decoded: &[Option<DecodedHostname>],
        cancel: &CancellationToken,
        warnings: &mut Vec<Warning>,
    ) -> BTreeSet<String> {
        let targets: Vec<DeviceTarget> = devices
            .iter()
            .zip(decoded)
            .filter(|(d, h)| self.deriver.wants_probe(d, h.as_ref()))
            .filter_map(|(d, _)| {
                let target = DeviceTarget::from_entity(d);
                if target.is_none() {
                    debug!(device = %d.name(), "no primary IP, not probing");
                }
                target
            })
            .collect();
        if targets.is_empty() {
            return BTreeSet::new();
        }

        let rule = &self.deriver.rules().probe;
        let config = self.executor.config();
        let timeout = config.op_timeout;
        debug!(devices = targets.len(), "probing devices");

        let results: Vec<(&str, Result<bool, CoreError>)> = stream::iter(&targets)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|target| async move {
                let result = device::probe(connector, target, rule, timeout).await;
                (target.name.as_str(), result)
            })
            .buffer_unordered(config.workers.max(1))
            .collect()
            .await;

        let mut hits = BTreeSet::new();
        for (name, result) in results {
            match result {
                Ok(true) => {
                    hits.insert(name.to_owned());
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(device = name, error = %e, "probe failed, skipping probe tag");
                    warnings.push(Warning::ProbeFailed {
                        device: name.to_owned(),
                        message: e.to_string(),
                    });
                }
            }
        }
        hits
    }

    // ── Interfaces & VLANs ───────────────────────────────────────────

    /// Reconcile `device`'s interfaces against normalized device output.
    pub async fn sync_interfaces<S: InventoryStore>(
        &self,
        store: &S,
        device: &str,
        batch: Batch,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, CoreError> {
        if store.get(&NaturalKey::device(device)).await?.is_none() {
            return Err(CoreError::NotFound {
                entity_type: "device".into(),
                identifier: device.to_owned(),
            });
        }
        let warnings = batch_warnings(device, &batch);
        let desired = EntitySet::from_entities(batch.entities)?;
        let listed = store
            .list(EntityKind::Interface, &Filter::device(device))
            .await?;
        let actual = EntitySet::from_entities(without_held(listed, &batch.held))?;

        let plan = self.reconciler.reconcile(&desired, &actual);
        self.finish(store, plan, dry_run, cancel, warnings).await
    }

    /// Reconcile `site`'s VLANs against normalized device output.
    pub async fn sync_vlans<S: InventoryStore>(
        &self,
        store: &S,
        site: &str,
        batch: Batch,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, CoreError> {
        let scope = self.resolve_scope(store, &Filter::site(site)).await?;
        let warnings = batch_warnings(site, &batch);
        // key desired VLANs by the site identity the store reports
        let site_key = scope.first().map_or(site, String::as_str);
        let held: Vec<NaturalKey> = batch
            .held
            .iter()
            .filter_map(NaturalKey::vid)
            .map(|vid| NaturalKey::vlan(site_key, vid))
            .collect();
        let desired = EntitySet::from_entities(
            batch.entities.into_iter().map(|e| rehome_vlan(e, site_key)),
        )?;
        let listed = store.list(EntityKind::Vlan, &Filter::site(site)).await?;
        let actual = EntitySet::from_entities(without_held(listed, &held))?;

        let plan = self.reconciler.reconcile(&desired, &actual);
        let mut outcome = self.finish(store, plan, dry_run, cancel, warnings).await?;
        outcome.scope = scope;
        Ok(outcome)
    }

    // ── Shared tail ──────────────────────────────────────────────────

    async fn finish<S: InventoryStore>(
        &self,
        store: &S,
        plan: ReconciliationPlan,
        dry_run: bool,
        cancel: &CancellationToken,
        mut warnings: Vec<Warning>,
    ) -> Result<SyncOutcome, CoreError> {
        info!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            unchanged = plan.unchanged.len(),
            dry_run,
            "plan ready"
        );

        let mut tags_created = Vec::new();
        let tags = plan.referenced_tags();
        if !dry_run && !plan.is_empty() && !tags.is_empty() && !cancel.is_cancelled() {
            match store.ensure_tags(&tags).await {
                Ok(created) => tags_created = created,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "could not provision tags");
                    warnings.push(Warning::TagProvisioning {
                        message: e.to_string(),
                    });
                }
            }
        }

        let mut report = self.executor.apply(store, &plan, dry_run, cancel).await;
        report.warnings = warnings;
        Ok(SyncOutcome {
            scope: Vec::new(),
            elections: Vec::new(),
            plan,
            report,
            tags_created,
        })
    }
}

fn site_of(device: &Entity) -> &str {
    device
        .as_device()
        .and_then(|d| d.site.as_deref())
        .unwrap_or_default()
}

fn rehome_vlan(entity: Entity, site: &str) -> Entity {
    let rehomed = match (entity.key(), entity.as_vlan()) {
        (NaturalKey::Vlan { site: current, vid }, Some(attrs)) if current != site => {
            Some(Entity::vlan(site, *vid, attrs.clone()).with_tags(entity.tags.iter().cloned()))
        }
        _ => None,
    };
    rehomed.unwrap_or(entity)
}

/// Drop inventory entities whose input record was rejected, so a bad record
/// never turns into an update or a delete.
fn without_held(listed: Vec<Entity>, held: &[NaturalKey]) -> Vec<Entity> {
    if held.is_empty() {
        return listed;
    }
    listed
        .into_iter()
        .filter(|entity| {
            let keep = !held.contains(entity.key());
            if !keep {
                debug!(key = %entity.key(), "left untouched: input record was malformed");
            }
            keep
        })
        .collect()
}

fn describe(filter: &Filter) -> String {
    let mut parts = Vec::new();
    if let Some(ref site) = filter.site {
        parts.push(format!("site={site}"));
    }
    if let Some(ref region) = filter.region {
        parts.push(format!("region={region}"));
    }
    if let Some(ref tag) = filter.tag {
        parts.push(format!("tag={tag}"));
    }
    if parts.is_empty() {
        "<all>".into()
    } else {
        parts.join(" ")
    }
}

fn batch_warnings(context: &str, batch: &Batch) -> Vec<Warning> {
    batch
        .errors
        .iter()
        .map(|(index, e)| Warning::MalformedInput {
            context: format!("{context} record {index}"),
            message: e.to_string(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{ProbeRule, TagRules};
    use crate::device::{DeviceSession, SshConnector};
    use crate::model::{DeviceAttrs, Field, FieldValue, VlanAttrs, VlanStatus};
    use crate::normalize::{self, FieldMap};
    use crate::report::OpStatus;
    use crate::store::MemoryStore;

    fn device(name: &str, site: &str) -> Entity {
        Entity::device(
            name,
            DeviceAttrs {
                site: Some(site.into()),
                status: Some("active".into()),
                platform: Some("ios".into()),
                model: Some("C9300-48P".into()),
                primary_ip: Some("192.0.2.10".into()),
            },
        )
    }

    fn request(filter: Filter) -> DeviceSyncRequest {
        DeviceSyncRequest {
            filter,
            update_tags: true,
            ..DeviceSyncRequest::default()
        }
    }

    async fn run(
        engine: &Engine,
        store: &MemoryStore,
        request: &DeviceSyncRequest,
    ) -> Result<SyncOutcome, CoreError> {
        engine
            .sync_devices(store, None::<&SshConnector>, request, &CancellationToken::new())
            .await
    }

    fn tags_of(outcome: &SyncOutcome, name: &str) -> BTreeSet<String> {
        outcome
            .plan
            .to_update
            .iter()
            .find(|u| u.key == NaturalKey::device(name))
            .and_then(|u| u.changes.iter().find(|c| c.field == Field::Tags))
            .map(|c| match &c.new {
                FieldValue::Tags(tags) => tags.clone(),
                _ => BTreeSet::new(),
            })
            .unwrap_or_default()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn den_store() -> MemoryStore {
        MemoryStore::new()
            .with_site("den", Some("us-west"))
            .with_site("ord", Some("us-central"))
            .with_entities([
                device("RDEN01CR01", "den"),
                device("RDEN01CR02", "den"),
                device("RORD01CR01", "ord"),
            ])
    }

    #[tokio::test]
    async fn core_pair_gets_election_tags_in_dry_run() {
        let store = den_store();
        let mut req = request(Filter::site("den"));
        req.dry_run = true;
        let outcome = run(&Engine::default(), &store, &req).await.unwrap();

        assert_eq!(store.mutation_count(), 0);
        assert_eq!(outcome.scope, vec!["den".to_owned()]);
        assert_eq!(
            tags_of(&outcome, "RDEN01CR01"),
            set(&["core-router", "primary", "stp-root-primary"])
        );
        assert_eq!(
            tags_of(&outcome, "RDEN01CR02"),
            set(&["core-router", "secondary", "stp-root-secondary"])
        );
        assert_eq!(outcome.report.counts().update, 2);
    }

    #[tokio::test]
    async fn live_run_provisions_tags_and_converges() {
        let store = den_store();
        let engine = Engine::default();
        let req = request(Filter::default());

        let first = run(&engine, &store, &req).await.unwrap();
        assert!(!first.report.has_failures());
        assert!(first.tags_created.contains(&"stp-root-primary".to_owned()));
        assert!(store.has_tag("primary"));

        let second = run(&engine, &store, &req).await.unwrap();
        assert!(second.plan.is_empty());
        assert_eq!(second.report.counts().unchanged, 3);
    }

    #[tokio::test]
    async fn elections_are_per_site() {
        let store = den_store();
        let outcome = run(&Engine::default(), &store, &request(Filter::default()))
            .await
            .unwrap();
        // ORD has a single core router; it is primary at its own site
        assert!(tags_of(&outcome, "RORD01CR01").contains("primary"));
        assert_eq!(outcome.elections.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_claimants_are_flagged_not_tagged() {
        let store = MemoryStore::new().with_site("den", None).with_entities([
            device("SDEN01DS01", "den"),
            device("SDEN02DS01", "den"),
            device("SDEN01DS02", "den"),
        ]);
        let outcome = run(&Engine::default(), &store, &request(Filter::default()))
            .await
            .unwrap();

        assert!(!tags_of(&outcome, "SDEN01DS01").contains("primary"));
        assert!(!tags_of(&outcome, "SDEN02DS01").contains("primary"));
        assert!(tags_of(&outcome, "SDEN01DS02").contains("secondary"));
        let flagged: Vec<&Warning> = outcome
            .report
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::AmbiguousElection { .. }))
            .collect();
        assert_eq!(flagged.len(), 2, "roles and stp each flag the primary slot");
    }

    #[tokio::test]
    async fn undecodable_hostname_keeps_its_tags() {
        let store = MemoryStore::new()
            .with_site("den", None)
            .with_entities([device("lab-switch", "den").with_tags(["lab"])]);
        let outcome = run(&Engine::default(), &store, &request(Filter::default()))
            .await
            .unwrap();
        assert!(outcome.plan.is_empty());
        assert!(
            outcome
                .report
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::MalformedInput { .. }))
        );
    }

    #[tokio::test]
    async fn cancelled_before_planning_is_an_error() {
        let store = den_store();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Engine::default()
            .sync_devices(&store, None::<&SshConnector>, &request(Filter::site("den")), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn empty_scope_is_an_error() {
        let store = den_store();
        let unknown = Filter {
            region: Some("eu-north".into()),
            ..Filter::default()
        };
        let err = run(&Engine::default(), &store, &request(unknown)).await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyScope { .. }));

        let no_match = Filter::site("den").with_tag(Some("wan-router".into()));
        let err = run(&Engine::default(), &store, &request(no_match)).await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyScope { .. }));

        let blank = Filter::site(" ");
        let err = run(&Engine::default(), &store, &request(blank)).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidScope { .. }));
    }

    #[tokio::test]
    async fn platform_assigned_from_first_mapped_tag() {
        let mut bare = device("RDEN01CR01", "den").with_tags(["Network-IOS", "core-router"]);
        if let Some(attrs) = bare.as_device_mut() {
            attrs.platform = None;
        }
        let store = MemoryStore::new().with_site("den", None).with_entities([bare]);
        let req = DeviceSyncRequest {
            update_platform: true,
            dry_run: true,
            ..DeviceSyncRequest::default()
        };
        let outcome = run(&Engine::default(), &store, &req).await.unwrap();
        let changes = &outcome.plan.to_update[0].changes;
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new, FieldValue::Text("ios".into()));
    }

    #[tokio::test]
    async fn replace_mode_drops_stale_tags() {
        let store = MemoryStore::new()
            .with_site("den", None)
            .with_entities([device("RDEN01CR01", "den").with_tags(["stale"])]);
        let mut req = request(Filter::default());
        req.replace_tags = true;
        req.dry_run = true;
        let outcome = run(&Engine::default(), &store, &req).await.unwrap();
        assert!(!tags_of(&outcome, "RDEN01CR01").contains("stale"));
    }

    // ── Probes ──

    struct Canned(Option<&'static str>);
    struct CannedSession(Option<&'static str>);

    impl DeviceSession for CannedSession {
        async fn run_command(&mut self, _command: &str) -> Result<String, CoreError> {
            self.0.map(str::to_owned).ok_or_else(|| CoreError::Connectivity {
                host: "10.0.0.1".into(),
                message: "auth failed".into(),
            })
        }

        async fn close(self) {}
    }

    impl DeviceConnector for Canned {
        type Session = CannedSession;

        async fn open(&self, _target: &DeviceTarget) -> Result<CannedSession, CoreError> {
            Ok(CannedSession(self.0))
        }
    }

    fn probing_engine() -> Engine {
        let rules = TagRules {
            probe: ProbeRule {
                enabled: true,
                ..ProbeRule::default()
            },
            ..TagRules::default()
        };
        Engine::new(&EngineConfig {
            rules: Arc::new(rules),
            ..EngineConfig::default()
        })
    }

    #[tokio::test]
    async fn probe_hit_adds_wireless_controller() {
        let store = den_store();
        let connector = Canned(Some("wireless mobility controller\n"));
        let mut req = request(Filter::site("ord"));
        req.dry_run = true;
        let outcome = probing_engine()
            .sync_devices(&store, Some(&connector), &req, &CancellationToken::new())
            .await
            .unwrap();
        assert!(tags_of(&outcome, "RORD01CR01").contains("wireless-controller"));
    }

    #[tokio::test]
    async fn devices_without_primary_ip_are_not_probed() {
        let mut bare = device("RORD01CR01", "ord");
        if let Some(attrs) = bare.as_device_mut() {
            attrs.primary_ip = None;
        }
        let store = MemoryStore::new()
            .with_site("ord", Some("us-central"))
            .with_entities([bare]);
        let connector = Canned(None);
        let mut req = request(Filter::site("ord"));
        req.dry_run = true;
        let outcome = probing_engine()
            .sync_devices(&store, Some(&connector), &req, &CancellationToken::new())
            .await
            .unwrap();
        assert!(tags_of(&outcome, "RORD01CR01").contains("core-router"));
        assert!(outcome.report.warnings.is_empty());
    }

    #[tokio::test]
    async fn probe_failure_only_skips_probe_tag() {
        let store = den_store();
        let mut req = request(Filter::site("ord"));
        req.dry_run = true;
        let outcome = probing_engine()
            .sync_devices(&store, Some(&Canned(None)), &req, &CancellationToken::new())
            .await
            .unwrap();
        let tags = tags_of(&outcome, "RORD01CR01");
        assert!(tags.contains("core-router"));
        assert!(!tags.contains("wireless-controller"));
        assert!(
            outcome
                .report
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::ProbeFailed { .. }))
        );
    }

    // ── Interfaces & VLANs ──

    fn record(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn interfaces_created_and_stale_deleted() {
        let store = den_store().with_entities([Entity::interface(
            "RDEN01CR01",
            "Gi1/0/48",
            crate::model::InterfaceAttrs::default(),
        )]);
        let records = vec![
            record(&[
                ("interface", "GigabitEthernet1/0/1"),
                ("link_status", "up"),
                ("protocol_status", "up"),
                ("hardware_type", "Gigabit Ethernet"),
                ("media_type", "10/100/1000BaseTX"),
                ("address", "aabb.cc00.0101"),
                ("mtu", "1500"),
            ]),
            record(&[("interface", "Vlan10")]),
        ];
        let batch = normalize::normalize_interfaces("RDEN01CR01", &records, &BTreeMap::new());

        let outcome = Engine::default()
            .sync_interfaces(&store, "RDEN01CR01", batch, false, &CancellationToken::new())
            .await
            .unwrap();

        let counts = outcome.report.counts();
        assert_eq!((counts.create, counts.delete, counts.applied), (1, 1, 2));
        assert_eq!(outcome.report.warnings.len(), 1);
        assert!(
            store
                .get(&NaturalKey::interface("RDEN01CR01", "GigabitEthernet1/0/1"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn malformed_record_leaves_inventory_interface_alone() {
        let key = NaturalKey::interface("RDEN01CR01", "GigabitEthernet1/0/1");
        let store = den_store().with_entities([Entity::interface(
            "RDEN01CR01",
            "GigabitEthernet1/0/1",
            crate::model::InterfaceAttrs::default(),
        )]);
        let records = vec![record(&[
            ("interface", "GigabitEthernet1/0/1"),
            ("link_status", "up"),
            ("protocol_status", "up"),
            ("hardware_type", "Gigabit Ethernet"),
            ("media_type", "10/100/1000BaseTX"),
            ("mtu", "jumbo"),
        ])];
        let batch = normalize::normalize_interfaces("RDEN01CR01", &records, &BTreeMap::new());

        let outcome = Engine::default()
            .sync_interfaces(&store, "RDEN01CR01", batch, false, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.plan.to_delete.is_empty());
        assert!(outcome.plan.to_update.is_empty());
        assert_eq!(outcome.report.warnings.len(), 1);
        assert_eq!(store.mutation_count(), 0);
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_vlan_record_is_not_deleted() {
        let store = den_store().with_entities([Entity::vlan(
            "den",
            30,
            VlanAttrs {
                name: "PRINTERS".into(),
                status: VlanStatus::Active,
            },
        )]);
        let records = vec![record(&[("vlan_id", "30"), ("status", "active")])];
        let batch = normalize::normalize_vlans(&records, "DEN");

        let outcome = Engine::default()
            .sync_vlans(&store, "den", batch, false, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.plan.to_delete.is_empty());
        assert!(store.get(&NaturalKey::vlan("den", 30)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn interfaces_of_unknown_device_fail() {
        let err = Engine::default()
            .sync_interfaces(
                &den_store(),
                "RXXX01CR01",
                Batch::default(),
                true,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn default_vlan_never_planned() {
        let store = den_store().with_entities([Entity::vlan(
            "den",
            1,
            VlanAttrs {
                name: "default".into(),
                status: VlanStatus::Active,
            },
        )]);
        let records = vec![
            record(&[("vlan_id", "1"), ("name", "DEFAULT"), ("status", "active")]),
            record(&[("vlan_id", "20"), ("name", "USERS"), ("status", "active")]),
        ];
        let batch = normalize::normalize_vlans(&records, "den");
        let outcome = Engine::default()
            .sync_vlans(&store, "den", batch, true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.plan.to_create.len(), 1);
        assert_eq!(outcome.plan.to_create[0].key(), &NaturalKey::vlan("den", 20));
        assert!(outcome.plan.to_update.is_empty());
        assert!(outcome.report.outcomes.iter().all(|o| o.status == OpStatus::Planned));
    }

    #[test]
    fn vlans_take_the_store_site_identity() {
        let vlan = Entity::vlan(
            "DEN",
            20,
            VlanAttrs {
                name: "USERS".into(),
                status: VlanStatus::Active,
            },
        )
        .with_tags(["voice"]);
        let moved = rehome_vlan(vlan, "den");
        assert_eq!(moved.key(), &NaturalKey::vlan("den", 20));
        assert_eq!(moved.tags, set(&["voice"]));
    }
}
