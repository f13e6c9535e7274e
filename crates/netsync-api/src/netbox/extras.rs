// Extras endpoints: tags.

use super::NetBoxClient;
use super::models::{NbTag, TagCreate};
use crate::Error;

impl NetBoxClient {
    // ── Tags ─────────────────────────────────────────────────────────

    pub async fn list_tags(&self) -> Result<Vec<NbTag>, Error> {
        self.list_all("extras/tags/", &[]).await
    }

    pub async fn create_tag(&self, body: &TagCreate) -> Result<NbTag, Error> {
        self.post("extras/tags/", body).await
    }
}

/// Derive a NetBox slug from a tag name: lowercase, non-alphanumerics
/// collapsed into single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Network-IOS-XE"), "network-ios-xe");
        assert_eq!(slugify("stp root / primary"), "stp-root-primary");
        assert_eq!(slugify("--edge--"), "edge");
    }
}
