use serde::Serialize;

/// Structured view of a device name following the site naming convention
/// `<role><site><floor><subrole><index>[-<status>]`.
///
/// `role`, `subrole` and `status` hold the translated names (or the raw code
/// when the lookup table has no entry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DecodedHostname {
    pub role: String,
    pub site: String,
    pub floor: u8,
    pub subrole: String,
    pub index: u8,
    pub status: Option<String>,
}

impl DecodedHostname {
    /// The string fields that may double as tag names.
    pub fn tag_candidates(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.role.as_str()),
            Some(self.site.as_str()),
            Some(self.subrole.as_str()),
            self.status.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}
