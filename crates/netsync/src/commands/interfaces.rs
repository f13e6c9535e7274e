//! Interface command handler: normalize parsed `show interfaces` records
//! and sync them onto one device.

use std::collections::BTreeMap;

use netsync_core::Controller;
use netsync_core::normalize;

use crate::cli::{GlobalOpts, InterfacesArgs};
use crate::error::CliError;

use super::{report, util};

pub async fn handle(
    controller: &Controller,
    args: InterfacesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let records = util::read_records(&args.from_file)?;
    let configs = match args.config_file {
        Some(ref path) => util::read_interface_configs(path)?,
        None => BTreeMap::new(),
    };

    let batch = normalize::normalize_interfaces(&args.device, &records, &configs);
    tracing::debug!(
        device = %args.device,
        records = records.len(),
        rejected = batch.errors.len(),
        "normalized interfaces"
    );

    let outcome = controller
        .sync_interfaces(&args.device, batch, args.dry_run)
        .await?;
    report::render(&outcome, global)
}
