// IPAM endpoints: VLANs.

use super::NetBoxClient;
use super::models::{NbVlan, VlanWrite};
use crate::Error;

impl NetBoxClient {
    // ── VLANs ────────────────────────────────────────────────────────

    pub async fn list_vlans(&self, params: &[(&str, String)]) -> Result<Vec<NbVlan>, Error> {
        self.list_all("ipam/vlans/", params).await
    }

    pub async fn create_vlan(&self, body: &VlanWrite) -> Result<NbVlan, Error> {
        self.post("ipam/vlans/", body).await
    }

    pub async fn patch_vlan(&self, id: u64, body: &VlanWrite) -> Result<NbVlan, Error> {
        self.patch(&format!("ipam/vlans/{id}/"), body).await
    }

    pub async fn delete_vlan(&self, id: u64) -> Result<(), Error> {
        self.delete(&format!("ipam/vlans/{id}/")).await
    }
}
