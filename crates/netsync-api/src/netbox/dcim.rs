// DCIM endpoints: sites, regions, platforms, devices, interfaces.

use super::NetBoxClient;
use super::models::{
    DevicePatch, InterfaceWrite, NbDevice, NbInterface, NbPlatform, NbSite, NestedRef,
};
use crate::Error;

impl NetBoxClient {
    // ── Sites ────────────────────────────────────────────────────────

    pub async fn list_sites(&self, params: &[(&str, String)]) -> Result<Vec<NbSite>, Error> {
        self.list_all("dcim/sites/", params).await
    }

    /// Regions are only used to scope site listings, so the brief shape suffices.
    pub async fn list_regions(&self, params: &[(&str, String)]) -> Result<Vec<NestedRef>, Error> {
        self.list_all("dcim/regions/", params).await
    }

    // ── Platforms ────────────────────────────────────────────────────

    pub async fn list_platforms(&self) -> Result<Vec<NbPlatform>, Error> {
        self.list_all("dcim/platforms/", &[]).await
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn list_devices(&self, params: &[(&str, String)]) -> Result<Vec<NbDevice>, Error> {
        self.list_all("dcim/devices/", params).await
    }

    /// Look a device up by its exact name. `Ok(None)` when absent.
    pub async fn find_device(&self, name: &str) -> Result<Option<NbDevice>, Error> {
        let mut found = self
            .list_all::<NbDevice>("dcim/devices/", &[("name", name.to_owned())])
            .await?;
        Ok(found.pop())
    }

    pub async fn patch_device(&self, id: u64, body: &DevicePatch) -> Result<NbDevice, Error> {
        self.patch(&format!("dcim/devices/{id}/"), body).await
    }

    // ── Interfaces ───────────────────────────────────────────────────

    pub async fn list_interfaces(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<NbInterface>, Error> {
        self.list_all("dcim/interfaces/", params).await
    }

    pub async fn create_interface(&self, body: &InterfaceWrite) -> Result<NbInterface, Error> {
        self.post("dcim/interfaces/", body).await
    }

    pub async fn patch_interface(
        &self,
        id: u64,
        body: &InterfaceWrite,
    ) -> Result<NbInterface, Error> {
        self.patch(&format!("dcim/interfaces/{id}/"), body).await
    }

    pub async fn delete_interface(&self, id: u64) -> Result<(), Error> {
        self.delete(&format!("dcim/interfaces/{id}/")).await
    }
}
