// ── Field-level diff values ──

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use strum::{Display, EnumString};

/// Closed set of fields the reconciler may change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Platform,
    Type,
    Enabled,
    MgmtOnly,
    Mtu,
    Mac,
    Description,
    Mode,
    UntaggedVlan,
    TaggedVlans,
    Name,
    Status,
    Tags,
}

/// A field value in comparable, normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    None,
    Bool(bool),
    Int(u32),
    Text(String),
    Vlans(BTreeSet<u16>),
    Tags(BTreeSet<String>),
}

impl FieldValue {
    /// Text value; empty or whitespace-only text reads as `None`.
    pub fn text(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(s) if !s.is_empty() => Self::Text(s.to_owned()),
            _ => Self::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Vlans(vids) if vids.is_empty() => f.write_str("[]"),
            Self::Vlans(vids) => write!(f, "[{}]", format_vlan_list(vids)),
            Self::Tags(tags) => {
                let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
                write!(f, "[{}]", joined.join(", "))
            }
        }
    }
}

/// One changed field: `(field, old, new)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: Field,
    pub old: FieldValue,
    pub new: FieldValue,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.old, self.new)
    }
}

/// Compress VLAN ids into range syntax: `{10, 20, 21, 22}` -> `10,20-22`.
pub fn format_vlan_list(vids: &BTreeSet<u16>) -> String {
    let mut parts = Vec::new();
    let mut iter = vids.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if Some(next) != end.checked_add(1) {
                break;
            }
            end = next;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlan_ranges_are_compressed() {
        let vids: BTreeSet<u16> = [10, 20, 21, 22, 30].into_iter().collect();
        assert_eq!(format_vlan_list(&vids), "10,20-22,30");
        assert_eq!(format_vlan_list(&BTreeSet::new()), "");
    }

    #[test]
    fn change_display() {
        let change = FieldChange {
            field: Field::Mtu,
            old: FieldValue::Int(1500),
            new: FieldValue::None,
        };
        assert_eq!(change.to_string(), "mtu: 1500 -> none");
    }

    #[test]
    fn blank_text_is_none() {
        assert!(FieldValue::text(Some("   ")).is_none());
        assert_eq!(FieldValue::text(Some(" uplink ")), FieldValue::Text("uplink".into()));
    }

    #[test]
    fn field_names_round_trip_through_strum() {
        assert_eq!(Field::UntaggedVlan.to_string(), "untagged_vlan");
        assert_eq!("mgmt_only".parse::<Field>().ok(), Some(Field::MgmtOnly));
    }
}
