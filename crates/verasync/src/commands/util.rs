//! Shared helpers for command handlers.

use std::sync::Arc;

use verasync_core::{Controller, Room};

use crate::error::CliError;

/// Fetch one complete snapshot before rendering anything.
pub async fn snapshot(controller: &Controller) -> Result<(), CliError> {
    controller.full_refresh().await?;
    Ok(())
}

/// Resolve a room identifier: numeric id, exact name, then name ignoring case.
pub fn resolve_room(controller: &Controller, identifier: &str) -> Result<Arc<Room>, CliError> {
    let store = controller.store();
    let found = match identifier.parse::<u32>() {
        Ok(id) => store.room(id),
        Err(_) => store.room_by_name(identifier).or_else(|| {
            controller
                .rooms_snapshot()
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(identifier))
                .cloned()
        }),
    };
    found.ok_or_else(|| CliError::NotFound {
        resource_type: "room".into(),
        identifier: identifier.into(),
        list_command: "rooms list".into(),
    })
}

/// Name of a room by id, or "-" when unassigned or unknown.
pub fn room_name(controller: &Controller, room_id: Option<u32>) -> String {
    room_id
        .and_then(|id| controller.store().room(id))
        .map_or_else(|| "-".into(), |r| r.name.clone())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

pub fn opt_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}
