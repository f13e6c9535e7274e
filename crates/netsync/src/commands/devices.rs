//! Device command handler: listing, tag and platform sync.

use tabled::Tabled;

use netsync_core::{Controller, DeviceListing, DeviceSyncRequest, Filter};

use crate::cli::{DevicesArgs, GlobalOpts, ScopeArgs};
use crate::error::CliError;
use crate::output;

use super::report;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Subrole")]
    subrole: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&DeviceListing> for DeviceRow {
    fn from(l: &DeviceListing) -> Self {
        let attrs = l.device.as_device();
        let text = |v: Option<&String>| v.cloned().unwrap_or_else(|| "-".into());
        Self {
            name: l.device.name(),
            site: text(attrs.and_then(|a| a.site.as_ref())),
            model: text(attrs.and_then(|a| a.model.as_ref())),
            platform: text(attrs.and_then(|a| a.platform.as_ref())),
            role: text(l.decoded.as_ref().map(|d| &d.role)),
            subrole: text(l.decoded.as_ref().map(|d| &d.subrole)),
            tags: l.device.tags.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

// ── Request building ────────────────────────────────────────────────

pub(crate) fn filter(scope: &ScopeArgs) -> Filter {
    Filter {
        site: scope.site.clone(),
        region: scope.region.clone(),
        tag: scope.tag.clone(),
        include_inactive: scope.include_inactive,
        device: None,
    }
}

/// Without any `--update-*` flag the run previews both tag and platform
/// changes and mutates nothing.
pub(crate) fn request(args: &DevicesArgs) -> DeviceSyncRequest {
    let preview = !args.update_tags && !args.update_platform;
    DeviceSyncRequest {
        filter: filter(&args.scope),
        update_tags: args.update_tags || preview,
        update_platform: args.update_platform || preview,
        replace_tags: args.replace_tags,
        dry_run: args.dry_run || preview,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.list {
        let listings = controller.list_devices(&filter(&args.scope)).await?;
        let out = output::render_list(global.output, &listings, |l| DeviceRow::from(l), |l| {
            l.device.name()
        })?;
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let request = request(&args);
    tracing::debug!(?request, "device sync");
    let outcome = controller.sync_devices(&request).await?;
    report::render(&outcome, global)
}
