//! Hub status: liveness, identity and entity counts.

use serde::Serialize;
use verasync_core::{Controller, HubInfo};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util::{self, opt_or_dash};

#[derive(Serialize)]
struct Status {
    connection: String,
    #[serde(flatten)]
    hub: HubInfo,
    sections: usize,
    rooms: usize,
    categories: usize,
    scenes: usize,
    devices: usize,
}

fn detail(s: &Status) -> String {
    let hub = &s.hub;
    [
        format!("Connection:  {}", s.connection),
        format!("Model:       {}", hub.model.as_deref().unwrap_or("-")),
        format!("Serial:      {}", hub.serial_number.as_deref().unwrap_or("-")),
        format!("Version:     {}", hub.version.as_deref().unwrap_or("-")),
        format!("Temp unit:   {}", hub.temperature_unit.as_deref().unwrap_or("-")),
        format!("State:       {}", hub.state),
        format!("House mode:  {}", hub.house_mode),
        format!("Cursor:      {}", hub.cursor),
        format!(
            "Updated:     {}",
            opt_or_dash(hub.last_update.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC")))
        ),
        format!(
            "Entities:    {} sections, {} rooms, {} categories, {} scenes, {} devices",
            s.sections, s.rooms, s.categories, s.scenes, s.devices
        ),
    ]
    .join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    util::snapshot(controller).await?;
    controller.request_house_mode().await?;

    let status = Status {
        connection: controller.connection().kind().to_string(),
        hub: controller.hub_info(),
        sections: controller.sections_snapshot().len(),
        rooms: controller.rooms_snapshot().len(),
        categories: controller.categories_snapshot().len(),
        scenes: controller.scenes_snapshot().len(),
        devices: controller.devices_snapshot().len(),
    };

    let out = output::render_single(&global.output, &status, detail, |s| {
        s.hub.serial_number.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
