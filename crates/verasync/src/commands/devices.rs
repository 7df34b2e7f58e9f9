//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;
use verasync_core::{Controller, Device, Entity};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::{self, opt_or_dash};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "State")]
    state: String,
}

impl DeviceRow {
    fn new(controller: &Controller, d: &Arc<Device>) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            category: d.category.to_string(),
            room: util::room_name(controller, d.room_id),
            state: d.kind.summary(),
        }
    }
}

fn detail(controller: &Controller) -> impl Fn(&Arc<Device>) -> String + '_ {
    move |d| {
        let mut lines = vec![
            format!("ID:          {}", d.id),
            format!("Name:        {}", d.name),
            format!("Alt ID:      {}", if d.alt_id.is_empty() { "-" } else { &d.alt_id }),
            format!("Category:    {}", d.category),
            format!("Subcategory: {}", opt_or_dash(d.subcategory)),
            format!("Room:        {}", util::room_name(controller, d.room_id)),
            format!(
                "Parent:      {}",
                controller
                    .store()
                    .parent_of(d)
                    .map_or_else(|| "-".into(), |p| format!("{} ({})", p.name, p.id))
            ),
            format!("Job state:   {}", opt_or_dash(d.state)),
        ];
        let summary = d.kind.summary();
        if !summary.is_empty() {
            lines.push(format!("Status:      {summary}"));
        }
        if !d.comment.is_empty() {
            lines.push(format!("Comment:     {}", d.comment));
        }

        let mut keys: Vec<_> = d.fields().iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        lines.push(String::new());
        lines.push("Fields:".into());
        for (key, value) in keys {
            let rendered = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_owned);
            lines.push(format!("  {key} = {rendered}"));
        }
        lines.join("\n")
    }
}

fn find_device(controller: &Controller, identifier: &str) -> Result<Arc<Device>, CliError> {
    let found = match identifier.parse::<u32>() {
        Ok(id) => controller.store().device(id),
        Err(_) => controller
            .devices_snapshot()
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(identifier))
            .cloned(),
    };
    found.ok_or_else(|| CliError::NotFound {
        resource_type: "device".into(),
        identifier: identifier.into(),
        list_command: "devices list".into(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::snapshot(controller).await?;

    match args.command {
        DevicesCommand::List { room } => {
            let devices: Vec<Arc<Device>> = match room {
                Some(ref room) => {
                    let room = util::resolve_room(controller, room)?;
                    controller.store().devices_in_room(room.id)
                }
                None => controller.devices_snapshot().iter().cloned().collect(),
            };
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::new(controller, d),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let d = find_device(controller, &device)?;
            let out =
                output::render_single(&global.output, &d, detail(controller), |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
