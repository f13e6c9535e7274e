//! VLAN command handler: normalize parsed `show vlan` records and sync
//! them onto one site.

use netsync_core::Controller;
use netsync_core::normalize;

use crate::cli::{GlobalOpts, VlansArgs};
use crate::error::CliError;

use super::{report, util};

pub async fn handle(
    controller: &Controller,
    args: VlansArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site = args.site.trim();
    let records = util::read_records(&args.from_file)?;
    let batch = normalize::normalize_vlans(&records, site);
    tracing::debug!(site, records = records.len(), rejected = batch.errors.len(), "normalized vlans");

    let outcome = controller.sync_vlans(site, batch, args.dry_run).await?;
    report::render(&outcome, global)
}
