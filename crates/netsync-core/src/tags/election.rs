// ── Primary/secondary election ──
//
// Among the devices of one site, the candidates are the members whose
// subrole is the first precedence entry present in the group. Index 1
// claims the primary slot, index 2 the secondary slot. A slot with more than
// one claimant is left empty and every claimant is reported.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::Display;

use crate::model::DecodedHostname;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    fn for_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Primary),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// More than one candidate claimed the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambiguity {
    pub slot: Slot,
    /// Sorted device names.
    pub claimants: Vec<String>,
}

/// Outcome of one election over one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Election {
    /// Subrole the candidates were drawn from, if any member matched.
    pub subrole: Option<String>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub ambiguous: Vec<Ambiguity>,
}

impl Election {
    /// Slot won by `device`, if any.
    pub fn slot_of(&self, device: &str) -> Option<Slot> {
        if self.primary.as_deref() == Some(device) {
            Some(Slot::Primary)
        } else if self.secondary.as_deref() == Some(device) {
            Some(Slot::Secondary)
        } else {
            None
        }
    }
}

/// Run an election over `members` (`(device name, decoded hostname)`).
pub fn elect<'a, I>(members: I, precedence: &[String]) -> Election
where
    I: IntoIterator<Item = (&'a str, Option<&'a DecodedHostname>)>,
{
    let decoded: Vec<(&str, &DecodedHostname)> = members
        .into_iter()
        .filter_map(|(name, h)| h.map(|h| (name, h)))
        .collect();

    let Some(subrole) = precedence
        .iter()
        .find(|subrole| decoded.iter().any(|(_, h)| &h.subrole == *subrole))
    else {
        return Election::default();
    };

    let mut claims: BTreeMap<Slot, Vec<String>> = BTreeMap::new();
    for (name, hostname) in &decoded {
        if &hostname.subrole != subrole {
            continue;
        }
        if let Some(slot) = Slot::for_index(hostname.index) {
            claims.entry(slot).or_default().push((*name).to_owned());
        }
    }

    let mut election = Election {
        subrole: Some(subrole.clone()),
        ..Election::default()
    };
    for (slot, mut claimants) in claims {
        if claimants.len() == 1 {
            let winner = claimants.pop();
            match slot {
                Slot::Primary => election.primary = winner,
                Slot::Secondary => election.secondary = winner,
            }
        } else {
            claimants.sort();
            election.ambiguous.push(Ambiguity { slot, claimants });
        }
    }
    election
}

/// Both elections for one site. Computed once per site, before any tag
/// derivation for that site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteElection {
    pub site: String,
    pub roles: Election,
    pub stp: Election,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hostname::HostnameDecoder;

    fn precedence() -> Vec<String> {
        vec!["distribution-switch".into(), "core-router".into()]
    }

    fn run(names: &[&str]) -> Election {
        let decoder = HostnameDecoder::default();
        let decoded: Vec<(String, Option<DecodedHostname>)> = names
            .iter()
            .map(|n| ((*n).to_owned(), decoder.decode(n)))
            .collect();
        elect(
            decoded.iter().map(|(n, h)| (n.as_str(), h.as_ref())),
            &precedence(),
        )
    }

    #[test]
    fn core_routers_win_without_distribution() {
        let e = run(&["RDEN01CR01", "RDEN01CR02", "SDEN01AC01"]);
        assert_eq!(e.subrole.as_deref(), Some("core-router"));
        assert_eq!(e.primary.as_deref(), Some("RDEN01CR01"));
        assert_eq!(e.secondary.as_deref(), Some("RDEN01CR02"));
        assert!(e.ambiguous.is_empty());
    }

    #[test]
    fn distribution_switches_take_precedence() {
        let e = run(&["RDEN01CR01", "RDEN01CR02", "SDEN02DS01", "SDEN02DS02"]);
        assert_eq!(e.primary.as_deref(), Some("SDEN02DS01"));
        assert_eq!(e.secondary.as_deref(), Some("SDEN02DS02"));
        assert_eq!(e.slot_of("RDEN01CR01"), None);
    }

    #[test]
    fn duplicate_claimants_are_all_flagged() {
        let e = run(&["SDEN01DS01", "SDEN02DS01", "SDEN01DS02"]);
        assert_eq!(e.primary, None);
        assert_eq!(e.secondary.as_deref(), Some("SDEN01DS02"));
        assert_eq!(
            e.ambiguous,
            vec![Ambiguity {
                slot: Slot::Primary,
                claimants: vec!["SDEN01DS01".into(), "SDEN02DS01".into()],
            }]
        );
    }

    #[test]
    fn no_candidates_means_no_winner() {
        let e = run(&["SDEN01AC01", "not-a-convention-name"]);
        assert_eq!(e, Election::default());
    }

    #[test]
    fn index_three_claims_nothing() {
        let e = run(&["RDEN01CR03"]);
        assert_eq!(e.subrole.as_deref(), Some("core-router"));
        assert_eq!(e.primary, None);
        assert_eq!(e.secondary, None);
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = run(&["RDEN01CR02", "RDEN01CR01", "SDEN01AC01"]);
        let b = run(&["SDEN01AC01", "RDEN01CR01", "RDEN01CR02"]);
        assert_eq!(a, b);
    }
}
