//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod catalog;
pub mod cloud;
pub mod config_cmd;
pub mod devices;
pub mod mode;
pub mod rooms;
pub mod scenes;
pub mod status;
pub mod util;
pub mod watch;

use verasync_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(controller, global).await,
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Rooms(args) => rooms::handle(controller, args, global).await,
        Command::Scenes(args) => scenes::handle(controller, args, global).await,
        Command::Sections(args) => catalog::handle_sections(controller, args, global).await,
        Command::Categories(args) => catalog::handle_categories(controller, args, global).await,
        Command::Mode(args) => mode::handle(controller, args, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        // Config, Cloud and Completions are handled before dispatch
        Command::Config(_) | Command::Cloud(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not need a hub connection".into(),
        }),
    }
}
