// ── Tag deriver ──
//
// Computes the classification tags a device should carry from its decoded
// hostname, its site's elections, its hardware model and an optional live
// probe result. Output is a set; rules are unioned.

pub mod election;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::TagRules;
use crate::model::{DecodedHostname, Entity};

pub use election::{Ambiguity, Election, SiteElection, Slot, elect};

pub const PRIMARY: &str = "primary";
pub const SECONDARY: &str = "secondary";
pub const STP_ROOT_PRIMARY: &str = "stp-root-primary";
pub const STP_ROOT_SECONDARY: &str = "stp-root-secondary";

#[derive(Debug, Clone, Default)]
pub struct TagDeriver {
    rules: Arc<TagRules>,
}

impl TagDeriver {
    pub fn new(rules: Arc<TagRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TagRules {
        &self.rules
    }

    /// Run both elections over one site's devices.
    pub fn elect_site<'a, I>(&self, site: &str, members: I) -> SiteElection
    where
        I: IntoIterator<Item = (&'a str, Option<&'a DecodedHostname>)> + Clone,
    {
        SiteElection {
            site: site.to_owned(),
            roles: elect(members.clone(), &self.rules.election_precedence),
            stp: elect(members, &self.rules.stp_precedence),
        }
    }

    /// Whether `device` qualifies for the live probe.
    pub fn wants_probe(&self, device: &Entity, decoded: Option<&DecodedHostname>) -> bool {
        let probe = &self.rules.probe;
        if !probe.enabled {
            return false;
        }
        let Some(hostname) = decoded else {
            return false;
        };
        let platform = device.as_device().and_then(|d| d.platform.as_deref());
        probe.subroles.contains(&hostname.subrole)
            && platform.is_some_and(|p| probe.platforms.iter().any(|q| q == p))
    }

    /// Tags `device` should carry.
    ///
    /// `probe_hit` is the outcome of the live probe (`false` when it was not
    /// run or failed).
    pub fn derive(
        &self,
        device: &Entity,
        decoded: Option<&DecodedHostname>,
        site: &SiteElection,
        probe_hit: bool,
    ) -> BTreeSet<String> {
        let rules = &self.rules;
        let name = device.name();
        let mut tags = BTreeSet::new();

        if let Some(hostname) = decoded {
            for value in hostname.tag_candidates() {
                if rules.recognized.contains(value) {
                    tags.insert(value.to_owned());
                }
            }

            match site.roles.slot_of(&name) {
                Some(Slot::Primary) => tags.insert(PRIMARY.to_owned()),
                Some(Slot::Secondary) => tags.insert(SECONDARY.to_owned()),
                None => false,
            };
            match site.stp.slot_of(&name) {
                Some(Slot::Primary) => tags.insert(STP_ROOT_PRIMARY.to_owned()),
                Some(Slot::Secondary) => tags.insert(STP_ROOT_SECONDARY.to_owned()),
                None => false,
            };

            let dual = &rules.dual_role;
            let model = device
                .as_device()
                .and_then(|d| d.model.as_deref())
                .unwrap_or_default();
            let subrole_matches =
                dual.parent_subroles.is_empty() || dual.parent_subroles.contains(&hostname.subrole);
            if subrole_matches && dual.model_markers.iter().any(|m| model.contains(m.as_str())) {
                tags.insert(dual.tag.clone());
            }
        }

        if probe_hit && self.wants_probe(device, decoded) {
            tags.insert(rules.probe.tag.clone());
        }

        tags
    }

    /// Platform slug for a device with no platform, mapped from the first of
    /// its tags that has an entry in the platform table.
    pub fn platform_for(&self, device: &Entity) -> Option<String> {
        let attrs = device.as_device()?;
        if attrs.platform.is_some() {
            return None;
        }
        device
            .tags
            .iter()
            .find_map(|tag| self.rules.platforms.get(tag))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hostname::HostnameDecoder;
    use crate::model::DeviceAttrs;

    fn device(name: &str, model: &str, platform: Option<&str>) -> Entity {
        Entity::device(
            name,
            DeviceAttrs {
                platform: platform.map(str::to_owned),
                site: Some("den".into()),
                model: Some(model.into()),
                ..DeviceAttrs::default()
            },
        )
    }

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    /// Decode, elect and derive over a whole site.
    fn derive_site(deriver: &TagDeriver, devices: &[Entity]) -> Vec<BTreeSet<String>> {
        let decoder = HostnameDecoder::default();
        let decoded: Vec<_> = devices.iter().map(|d| decoder.decode(&d.name())).collect();
        let names: Vec<String> = devices.iter().map(Entity::name).collect();
        let site = deriver.elect_site(
            "den",
            names.iter().map(String::as_str).zip(decoded.iter().map(Option::as_ref)),
        );
        devices
            .iter()
            .zip(&decoded)
            .map(|(d, h)| deriver.derive(d, h.as_ref(), &site, false))
            .collect()
    }

    #[test]
    fn core_router_pair_gets_role_and_stp_tags() {
        let deriver = TagDeriver::default();
        let devices = [
            device("RDEN01CR01", "ISR4451", Some("ios")),
            device("RDEN01CR02", "ISR4451", Some("ios")),
        ];
        let result = derive_site(&deriver, &devices);
        assert_eq!(result[0], tags(&["core-router", "primary", "stp-root-primary"]));
        assert_eq!(result[1], tags(&["core-router", "secondary", "stp-root-secondary"]));
    }

    #[test]
    fn status_and_subrole_tags_are_copied() {
        let deriver = TagDeriver::default();
        let devices = [device("SDEN03AC01-ACT", "C9300-48P", None)];
        let result = derive_site(&deriver, &devices);
        assert_eq!(result[0], tags(&["access-switch", "active"]));
    }

    #[test]
    fn dual_role_hardware_gets_access_tag() {
        let deriver = TagDeriver::default();
        let devices = [
            device("RDEN01ER01", "WS-C3850-24T", Some("ios")),
            device("RDEN01ER02", "ISR4331", Some("ios")),
            device("SDEN01DS01", "WS-C3850-48P", Some("ios")),
        ];
        let result = derive_site(&deriver, &devices);
        assert!(result[0].contains("access-switch"));
        assert!(result[0].contains("edge-router"));
        assert!(!result[1].contains("access-switch"));
        // distribution switch is not in the parent subrole list
        assert!(!result[2].contains("access-switch"));
    }

    #[test]
    fn empty_parent_list_matches_any_subrole() {
        let mut rules = TagRules::default();
        rules.dual_role.parent_subroles.clear();
        let deriver = TagDeriver::new(Arc::new(rules));
        let result = derive_site(&deriver, &[device("SDEN01DS05", "WS-C3750X", None)]);
        assert!(result[0].contains("access-switch"));
    }

    #[test]
    fn undecodable_devices_get_nothing() {
        let deriver = TagDeriver::default();
        let result = derive_site(&deriver, &[device("lab-switch", "WS-C3850-24T", None)]);
        assert!(result[0].is_empty());
    }

    #[test]
    fn probe_requires_enabled_rule_and_matching_platform() {
        let mut rules = TagRules::default();
        rules.probe.enabled = true;
        let deriver = TagDeriver::new(Arc::new(rules));
        let decoder = HostnameDecoder::default();

        let ios = device("RDEN01CR01", "ISR4451", Some("ios"));
        let nxos = device("RDEN01CR02", "N9K", Some("nxos"));
        assert!(deriver.wants_probe(&ios, decoder.decode("RDEN01CR01").as_ref()));
        assert!(!deriver.wants_probe(&nxos, decoder.decode("RDEN01CR02").as_ref()));

        let site = SiteElection::default();
        let derived = deriver.derive(&ios, decoder.decode("RDEN01CR01").as_ref(), &site, true);
        assert!(derived.contains("wireless-controller"));

        assert!(!TagDeriver::default().wants_probe(&ios, decoder.decode("RDEN01CR01").as_ref()));
    }

    #[test]
    fn platform_from_first_mapped_tag() {
        let deriver = TagDeriver::default();
        let unset = device("SDEN01AC01", "C9300", None).with_tags(["access-switch", "Network-IOS-XE"]);
        assert_eq!(deriver.platform_for(&unset), Some("ios".to_owned()));

        let set = device("SDEN01AC02", "C9300", Some("ios")).with_tags(["Network-NXOS"]);
        assert_eq!(deriver.platform_for(&set), None);

        let unmapped = device("SDEN01AC03", "C9300", None).with_tags(["access-switch"]);
        assert_eq!(deriver.platform_for(&unmapped), None);
    }
}
