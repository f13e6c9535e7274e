// ── Entity normalizer ──
//
// Turns raw device-CLI field maps (structured `show interfaces` / `show vlan`
// output) into canonical entities. Every derivation is a pure function so it
// can be tested on its own.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{
    Entity, InterfaceAttrs, InterfaceType, NaturalKey, VlanAttrs, VlanMode, VlanStatus,
};

/// One parsed CLI record: field name -> text.
pub type FieldMap = BTreeMap<String, String>;

/// Interface names treated as management ports regardless of hardware type.
pub const MANAGEMENT_NAMES: [&str; 5] = [
    "FastEthernet0",
    "GigabitEthernet0",
    "Management0",
    "Management1",
    "mgmt0",
];

const LAG_PREFIXES: [&str; 3] = ["Port-channel", "ae", "bond"];

// ── Running-configuration input ──────────────────────────────────────

/// Switchport settings parsed from an interface's running configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterfaceConfig {
    /// `false` when `no switchport` / switchport administratively disabled.
    pub switchport: bool,
    /// Configured `switchport mode` (`access`, `trunk`, ...).
    pub mode: Option<String>,
    pub access_vlan: Option<u16>,
    pub native_vlan: Option<u16>,
    /// Trunk allowed list in CLI range syntax (`10,20-22`), or `all`.
    pub allowed_vlans: Option<String>,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            switchport: true,
            mode: None,
            access_vlan: None,
            native_vlan: None,
            allowed_vlans: None,
        }
    }
}

// ── Field access ─────────────────────────────────────────────────────

fn required<'a>(raw: &'a FieldMap, field: &str) -> Result<&'a str, CoreError> {
    raw.get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::missing(field))
}

fn optional<'a>(raw: &'a FieldMap, field: &str) -> Option<&'a str> {
    raw.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
}

// ── Derivations ──────────────────────────────────────────────────────

pub fn is_physical(hardware_type: &str, media_type: Option<&str>) -> bool {
    if hardware_type.contains("management") {
        return true;
    }
    media_type.is_some_and(|m| !m.trim().is_empty() && !m.contains("N/A"))
}

pub fn is_management(name: &str, hardware_type: &str, physical: bool) -> bool {
    if hardware_type.contains("management") {
        return true;
    }
    (physical && !name.contains(['/', '.', ':'])) || MANAGEMENT_NAMES.contains(&name)
}

pub fn interface_type(
    name: &str,
    hardware_type: &str,
    media_type: Option<&str>,
    physical: bool,
    management: bool,
) -> Option<InterfaceType> {
    if !physical {
        return Some(InterfaceType::Virtual);
    }
    let media = media_type.map(str::trim).filter(|m| !m.is_empty() && !m.contains("N/A"));
    match media {
        Some("10/100-TX" | "10/100BaseTX") => return Some(InterfaceType::Base100Tx),
        Some("10/100/1000-TX" | "10/100/1000BaseTX" | "RJ45") => {
            return Some(InterfaceType::Base1000T);
        }
        _ => {}
    }
    if management && media.is_none() && name.starts_with("FastEthernet") {
        return Some(InterfaceType::Base100Tx);
    }
    if hardware_type.contains("Ten Gigabit") {
        return Some(InterfaceType::Base10GSfpPlus);
    }
    None
}

pub fn is_disabled(link_status: &str, protocol_status: &str) -> bool {
    let link = link_status.to_ascii_lowercase();
    let protocol = protocol_status.to_ascii_lowercase();
    protocol.contains("disabled")
        || ["administratively down", "admin down", "admin-down"]
            .iter()
            .any(|marker| link.contains(marker))
}

/// Strip separators and upper-case: `aabb.ccdd.eeff` -> `AABBCCDDEEFF`.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let mac: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (!mac.is_empty()).then_some(mac)
}

pub fn parse_mtu(raw: Option<&str>) -> Result<Option<u32>, CoreError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => {
            let mtu: u32 = text
                .parse()
                .map_err(|_| CoreError::malformed("mtu", format!("not a number: {text:?}")))?;
            Ok((mtu != 0).then_some(mtu))
        }
    }
}

pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|d| !d.is_empty()).map(str::to_owned)
}

pub fn is_link_aggregation(name: &str) -> bool {
    LAG_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Parse a VLAN list in CLI range syntax (`10,20-22`).
pub fn parse_vlan_list(raw: &str) -> Result<BTreeSet<u16>, CoreError> {
    let malformed =
        |part: &str| CoreError::malformed("allowed_vlans", format!("bad VLAN range {part:?}"));
    let mut vids = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (part, part),
        };
        let start = parse_vid(start).ok_or_else(|| malformed(part))?;
        let end = parse_vid(end).ok_or_else(|| malformed(part))?;
        if start > end {
            return Err(malformed(part));
        }
        vids.extend(start..=end);
    }
    Ok(vids)
}

fn parse_vid(raw: &str) -> Option<u16> {
    raw.parse::<u16>().ok().filter(|v| (1..=4094).contains(v))
}

/// `(mode, untagged, tagged)` for a port.
pub fn vlan_membership(
    name: &str,
    physical: bool,
    management: bool,
    config: Option<&InterfaceConfig>,
) -> Result<(Option<VlanMode>, Option<u16>, BTreeSet<u16>), CoreError> {
    let none = || (None, None, BTreeSet::new());
    if management || !(physical || is_link_aggregation(name)) {
        return Ok(none());
    }
    let default_config = InterfaceConfig::default();
    let config = config.unwrap_or(&default_config);
    if !config.switchport {
        return Ok(none());
    }

    match config.mode.as_deref().map(str::trim) {
        None | Some("" | "access") => Ok((
            Some(VlanMode::Access),
            config.access_vlan,
            BTreeSet::new(),
        )),
        Some("trunk") => match config.allowed_vlans.as_deref().map(str::trim) {
            None | Some("" | "all" | "ALL") => Ok((
                Some(VlanMode::TaggedAll),
                config.native_vlan,
                BTreeSet::new(),
            )),
            Some(list) => Ok((
                Some(VlanMode::Tagged),
                config.native_vlan,
                parse_vlan_list(list)?,
            )),
        },
        // dynamic / private-vlan modes are not modelled
        Some(_) => Ok(none()),
    }
}

// ── Entity builders ──────────────────────────────────────────────────

/// Build an interface entity from a `show interfaces` record and the
/// matching running-configuration block.
pub fn normalize_interface(
    device: &str,
    raw: &FieldMap,
    config: Option<&InterfaceConfig>,
) -> Result<Entity, CoreError> {
    let name = required(raw, "interface")?;
    let hardware_type = required(raw, "hardware_type")?;
    let link_status = required(raw, "link_status")?;
    let protocol_status = required(raw, "protocol_status")?;
    let media_type = optional(raw, "media_type");

    let physical = is_physical(hardware_type, media_type);
    let management = is_management(name, hardware_type, physical);
    let (mode, untagged_vlan, tagged_vlans) = vlan_membership(name, physical, management, config)?;

    let attrs = InterfaceAttrs {
        kind: interface_type(name, hardware_type, media_type, physical, management),
        enabled: !is_disabled(link_status, protocol_status),
        mgmt_only: management,
        mtu: parse_mtu(raw.get("mtu").map(String::as_str))?,
        mac: optional(raw, "address").and_then(normalize_mac),
        description: normalize_description(raw.get("description").map(String::as_str)),
        mode,
        untagged_vlan,
        tagged_vlans,
    };

    Ok(Entity::interface(device, name, attrs))
}

pub fn vlan_status(raw: &str) -> VlanStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => VlanStatus::Active,
        "act/unsup" => VlanStatus::Reserved,
        _ => VlanStatus::Deprecated,
    }
}

/// Build a VLAN entity from a `show vlan` record.
pub fn normalize_vlan(raw: &FieldMap, site: &str) -> Result<Entity, CoreError> {
    let vid_text = required(raw, "vlan_id")?;
    let vid = parse_vid(vid_text).ok_or_else(|| {
        CoreError::malformed("vlan_id", format!("not in 1..=4094: {vid_text:?}"))
    })?;
    let name = required(raw, "name")?;
    let status = optional(raw, "status").map_or(VlanStatus::Deprecated, vlan_status);

    Ok(Entity::vlan(
        site,
        vid,
        VlanAttrs {
            name: name.to_owned(),
            status,
        },
    ))
}

// ── Batch helpers ────────────────────────────────────────────────────

/// Result of normalizing many records: what succeeded plus one error per
/// rejected record.
#[derive(Debug, Default)]
pub struct Batch {
    pub entities: Vec<Entity>,
    pub errors: Vec<(usize, CoreError)>,
    /// Keys of rejected records that still named their entity. The inventory
    /// copies of these must be left untouched.
    pub held: Vec<NaturalKey>,
}

impl Batch {
    fn push(&mut self, index: usize, key: Option<NaturalKey>, result: Result<Entity, CoreError>) {
        match result {
            Ok(entity) => self.entities.push(entity),
            Err(e) => {
                warn!(record = index, key = ?key, error = %e, "skipping malformed record");
                self.held.extend(key);
                self.errors.push((index, e));
            }
        }
    }
}

/// Normalize every interface record; configs are looked up by interface name.
pub fn normalize_interfaces(
    device: &str,
    records: &[FieldMap],
    configs: &BTreeMap<String, InterfaceConfig>,
) -> Batch {
    let mut batch = Batch::default();
    for (index, raw) in records.iter().enumerate() {
        let name = optional(raw, "interface");
        let config = name.and_then(|n| configs.get(n));
        let key = name.map(|n| NaturalKey::interface(device, n));
        batch.push(index, key, normalize_interface(device, raw, config));
    }
    batch
}

pub fn normalize_vlans(records: &[FieldMap], site: &str) -> Batch {
    let mut batch = Batch::default();
    for (index, raw) in records.iter().enumerate() {
        let key = optional(raw, "vlan_id")
            .and_then(parse_vid)
            .map(|vid| NaturalKey::vlan(site, vid));
        batch.push(index, key, normalize_vlan(raw, site));
    }
    batch
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn gig_port() -> FieldMap {
        record(&[
            ("interface", "GigabitEthernet1/0/1"),
            ("link_status", "up"),
            ("protocol_status", "up (connected)"),
            ("hardware_type", "Gigabit Ethernet"),
            ("media_type", "10/100/1000BaseTX"),
            ("address", "aabb.cc00.0101"),
            ("mtu", "1500"),
            ("description", "  desk 4.12  "),
        ])
    }

    #[test]
    fn physical_rules() {
        assert!(is_physical("Fast Ethernet management", None));
        assert!(is_physical("Gigabit Ethernet", Some("RJ45")));
        assert!(!is_physical("EtherChannel", Some("N/A")));
        assert!(!is_physical("Ethernet SVI", None));
        assert!(!is_physical("Ethernet SVI", Some("")));
    }

    #[test]
    fn management_rules() {
        assert!(is_management("Vlan1", "management interface", false));
        assert!(is_management("GigabitEthernet0", "Gigabit Ethernet", true));
        assert!(!is_management("GigabitEthernet0/0/1", "Gigabit Ethernet", true));
        assert!(!is_management("Loopback0", "Loopback", false));
        assert!(is_management("mgmt0", "Ethernet", false));
        assert!(is_management("FastEthernet0", "Fast Ethernet", false));
    }

    #[test]
    fn well_known_management_name_without_media_type() {
        let raw = record(&[
            ("interface", "mgmt0"),
            ("hardware_type", "Ethernet"),
            ("link_status", "up"),
            ("protocol_status", "up"),
        ]);
        let entity = normalize_interface("SDEN01AC01", &raw, None).unwrap();
        let attrs = entity.as_interface().unwrap();
        assert!(attrs.mgmt_only);
        assert_eq!(attrs.mode, None);
    }

    #[test]
    fn type_rules() {
        assert_eq!(
            interface_type("Vlan10", "Ethernet SVI", None, false, false),
            Some(InterfaceType::Virtual)
        );
        assert_eq!(
            interface_type("Gi1/0/1", "Gigabit Ethernet", Some("10/100/1000-TX"), true, false),
            Some(InterfaceType::Base1000T)
        );
        assert_eq!(
            interface_type("Fa0/1", "Fast Ethernet", Some("10/100BaseTX"), true, false),
            Some(InterfaceType::Base100Tx)
        );
        assert_eq!(
            interface_type("FastEthernet0", "Fast Ethernet management", None, true, true),
            Some(InterfaceType::Base100Tx)
        );
        assert_eq!(
            interface_type("Te1/1/1", "Ten Gigabit Ethernet", Some("SFP-10GBase-SR"), true, false),
            Some(InterfaceType::Base10GSfpPlus)
        );
        assert_eq!(
            interface_type("Gi1/1/1", "Gigabit Ethernet", Some("1000BaseSX SFP"), true, false),
            None
        );
    }

    #[test]
    fn disabled_rules() {
        assert!(is_disabled("administratively down", "down"));
        assert!(is_disabled("up", "down (disabled)"));
        assert!(is_disabled("Admin-Down", "down"));
        assert!(!is_disabled("up", "up (connected)"));
        assert!(!is_disabled("down", "down (notconnect)"));
    }

    #[test]
    fn mac_and_mtu() {
        assert_eq!(normalize_mac("aabb.cc00.0101"), Some("AABBCC000101".into()));
        assert_eq!(normalize_mac("aa:bb:cc:dd:ee:ff"), Some("AABBCCDDEEFF".into()));
        assert_eq!(normalize_mac("..::"), None);
        assert_eq!(parse_mtu(Some("9000")).unwrap(), Some(9000));
        assert_eq!(parse_mtu(Some("0")).unwrap(), None);
        assert_eq!(parse_mtu(Some("")).unwrap(), None);
        assert_eq!(parse_mtu(None).unwrap(), None);
        let err = parse_mtu(Some("jumbo")).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { ref field, .. } if field == "mtu"));
    }

    #[test]
    fn vlan_list_ranges() {
        let vids = parse_vlan_list("10,20-22, 30").unwrap();
        assert_eq!(vids.into_iter().collect::<Vec<_>>(), vec![10, 20, 21, 22, 30]);
        assert!(parse_vlan_list("22-20").is_err());
        assert!(parse_vlan_list("10,abc").is_err());
        assert!(parse_vlan_list("4095").is_err());
    }

    #[test]
    fn access_port_defaults() {
        let entity = normalize_interface("SDEN01AC01", &gig_port(), None).unwrap();
        let attrs = entity.as_interface().unwrap();
        assert_eq!(attrs.kind, Some(InterfaceType::Base1000T));
        assert!(attrs.enabled);
        assert!(!attrs.mgmt_only);
        assert_eq!(attrs.mtu, Some(1500));
        assert_eq!(attrs.mac.as_deref(), Some("AABBCC000101"));
        assert_eq!(attrs.description.as_deref(), Some("desk 4.12"));
        assert_eq!(attrs.mode, Some(VlanMode::Access));
    }

    #[test]
    fn trunk_modes() {
        let tagged = InterfaceConfig {
            mode: Some("trunk".into()),
            native_vlan: Some(99),
            allowed_vlans: Some("10,20-22".into()),
            ..InterfaceConfig::default()
        };
        let entity = normalize_interface("SDEN01DS01", &gig_port(), Some(&tagged)).unwrap();
        let attrs = entity.as_interface().unwrap();
        assert_eq!(attrs.mode, Some(VlanMode::Tagged));
        assert_eq!(attrs.untagged_vlan, Some(99));
        assert_eq!(attrs.tagged_vlans.len(), 4);

        let all = InterfaceConfig {
            mode: Some("trunk".into()),
            ..InterfaceConfig::default()
        };
        let entity = normalize_interface("SDEN01DS01", &gig_port(), Some(&all)).unwrap();
        assert_eq!(entity.as_interface().unwrap().mode, Some(VlanMode::TaggedAll));
    }

    #[test]
    fn routed_port_has_no_mode() {
        let routed = InterfaceConfig {
            switchport: false,
            ..InterfaceConfig::default()
        };
        let entity = normalize_interface("RDEN01CR01", &gig_port(), Some(&routed)).unwrap();
        assert_eq!(entity.as_interface().unwrap().mode, None);
    }

    #[test]
    fn port_channel_gets_mode_svi_does_not() {
        let mut lag = gig_port();
        lag.insert("interface".into(), "Port-channel1".into());
        lag.insert("hardware_type".into(), "EtherChannel".into());
        lag.insert("media_type".into(), "N/A".into());
        let entity = normalize_interface("SDEN01DS01", &lag, None).unwrap();
        let attrs = entity.as_interface().unwrap();
        assert_eq!(attrs.kind, Some(InterfaceType::Virtual));
        assert_eq!(attrs.mode, Some(VlanMode::Access));

        let mut svi = lag;
        svi.insert("interface".into(), "Vlan10".into());
        let entity = normalize_interface("SDEN01DS01", &svi, None).unwrap();
        assert_eq!(entity.as_interface().unwrap().mode, None);
    }

    #[test]
    fn missing_required_field_names_it() {
        let mut raw = gig_port();
        raw.remove("hardware_type");
        let err = normalize_interface("SDEN01AC01", &raw, None).unwrap_err();
        assert!(
            matches!(err, CoreError::MalformedInput { ref field, .. } if field == "hardware_type")
        );
    }

    #[test]
    fn vlan_records() {
        let status_of = |status: &str| {
            let raw = record(&[("vlan_id", "20"), ("name", "USERS"), ("status", status)]);
            normalize_vlan(&raw, "den").unwrap().as_vlan().unwrap().status
        };
        assert_eq!(status_of("active"), VlanStatus::Active);
        assert_eq!(status_of("act/unsup"), VlanStatus::Reserved);
        assert_eq!(status_of("suspended"), VlanStatus::Deprecated);

        assert!(normalize_vlan(&record(&[("vlan_id", "4095"), ("name", "Z")]), "den").is_err());
        assert!(normalize_vlan(&record(&[("vlan_id", "50")]), "den").is_err());
    }

    #[test]
    fn batch_continues_past_bad_records() {
        let mut bad = gig_port();
        bad.insert("mtu".into(), "big".into());
        let mut second = gig_port();
        second.insert("interface".into(), "GigabitEthernet1/0/2".into());

        let records = [gig_port(), bad, second];
        let batch = normalize_interfaces("SDEN01AC01", &records, &BTreeMap::new());
        assert_eq!(batch.entities.len(), 2);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].0, 1);
        assert_eq!(
            batch.held,
            vec![NaturalKey::interface("SDEN01AC01", "GigabitEthernet1/0/1")]
        );
    }

    #[test]
    fn nameless_records_hold_nothing() {
        let records = [
            record(&[("name", "USERS")]),
            record(&[("vlan_id", "30"), ("status", "active")]),
        ];
        let batch = normalize_vlans(&records, "den");
        assert_eq!(batch.errors.len(), 2);
        assert_eq!(batch.held, vec![NaturalKey::vlan("den", 30)]);
    }
}
