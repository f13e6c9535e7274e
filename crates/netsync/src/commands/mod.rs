//! Command dispatch: bridges CLI args -> controller operations -> output.

pub mod config_cmd;
pub mod decode;
pub mod devices;
pub mod interfaces;
pub mod report;
pub mod util;
pub mod vlans;

use netsync_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an inventory-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Interfaces(args) => interfaces::handle(controller, args, global).await,
        Command::Vlans(args) => vlans::handle(controller, args, global).await,
        // Handled before a controller exists.
        Command::Decode(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command dispatched without an inventory".into()))
        }
    }
}
