// ── Hostname decoder ──
//
// Grammar (anchored at the start, ASCII only):
//
//   <role:1 word><site:3 word><floor:2 digit><subrole:2 word><index:2 digit>[-][<status:3>][free text]
//
// A status is recognised only when its three characters are a key of the
// status table; anything after it is free text.

use std::sync::Arc;

use crate::config::HostnameTables;
use crate::model::DecodedHostname;

/// Bytes covered by the fixed-width prefix (role through index).
const PREFIX_LEN: usize = 10;
const STATUS_LEN: usize = 3;

/// Decodes device names through injected lookup tables.
#[derive(Debug, Clone, Default)]
pub struct HostnameDecoder {
    tables: Arc<HostnameTables>,
}

impl HostnameDecoder {
    pub fn new(tables: Arc<HostnameTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &HostnameTables {
        &self.tables
    }

    /// Decode `name`. Returns `None` when the name does not follow the
    /// convention; never fails.
    pub fn decode(&self, name: &str) -> Option<DecodedHostname> {
        let bytes = name.as_bytes();
        let prefix = bytes.get(..PREFIX_LEN)?;
        if !prefix.is_ascii() {
            return None;
        }

        let (role, rest) = prefix.split_at(1);
        let (site, rest) = rest.split_at(3);
        let (floor, rest) = rest.split_at(2);
        let (subrole, index) = rest.split_at(2);

        if !all_word(role) || !all_word(site) || !all_word(subrole) {
            return None;
        }
        let floor = two_digits(floor)?;
        let index = two_digits(index)?;

        // The prefix is ASCII, so byte offset 10 is a char boundary.
        let tail = name.get(PREFIX_LEN..)?;
        let tail = tail.strip_prefix('-').unwrap_or(tail);
        let status = tail
            .get(..STATUS_LEN)
            .and_then(|code| self.tables.statuses.get(code));

        Some(DecodedHostname {
            role: translate(&self.tables.roles, ascii(role)),
            site: ascii(site).to_owned(),
            floor,
            subrole: translate(&self.tables.subroles, ascii(subrole)),
            index,
            status: status.cloned(),
        })
    }
}

fn all_word(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

fn two_digits(bytes: &[u8]) -> Option<u8> {
    match bytes {
        [tens, ones] if tens.is_ascii_digit() && ones.is_ascii_digit() => {
            Some((tens - b'0') * 10 + (ones - b'0'))
        }
        _ => None,
    }
}

/// View an ASCII byte slice as `&str`.
fn ascii(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or_default()
}

fn translate(table: &std::collections::BTreeMap<String, String>, code: &str) -> String {
    table.get(code).cloned().unwrap_or_else(|| code.to_owned())
}
