//! Room command handlers.

use std::sync::Arc;

use tabled::Tabled;
use verasync_core::{Controller, Room};

use crate::cli::{GlobalOpts, RoomsArgs, RoomsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct RoomRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Section")]
    section: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Scenes")]
    scenes: usize,
}

impl RoomRow {
    fn new(controller: &Controller, r: &Arc<Room>) -> Self {
        let store = controller.store();
        Self {
            id: r.id,
            name: r.name.clone(),
            section: store
                .section_of(r)
                .map_or_else(|| "-".into(), |s| s.name.clone()),
            devices: store.devices_in_room(r.id).len(),
            scenes: store.scenes_in_room(r.id).len(),
        }
    }
}

fn detail(r: &Arc<Room>) -> String {
    format!("ID:   {}\nName: {}", r.id, r.name)
}

pub async fn handle(
    controller: &Controller,
    args: RoomsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::snapshot(controller).await?;

    match args.command {
        RoomsCommand::List => {
            let rooms = controller.rooms_snapshot();
            let out = output::render_list(
                &global.output,
                rooms.as_slice(),
                |r| RoomRow::new(controller, r),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RoomsCommand::Create { name } => {
            match controller.create_room(&name).await? {
                Some(room) => {
                    let out = output::render_single(&global.output, &room, detail, |r| {
                        r.id.to_string()
                    });
                    output::print_output(&out, global.quiet);
                }
                None => {
                    if !global.quiet {
                        eprintln!("Room '{name}' created; it will appear after the next sync");
                    }
                }
            }
            Ok(())
        }

        RoomsCommand::Rename { id, name } => {
            let room = controller.rename_room(id, &name).await?;
            if !global.quiet {
                eprintln!("Room {} renamed to '{}'", room.id, room.name);
            }
            Ok(())
        }

        RoomsCommand::Delete { id } => {
            let room = util::resolve_room(controller, &id.to_string())?;
            let devices = controller.store().devices_in_room(id).len();
            let prompt = if devices == 0 {
                format!("Delete room '{}'?", room.name)
            } else {
                format!(
                    "Delete room '{}'? Its {devices} device(s) become unassigned.",
                    room.name
                )
            };
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            controller.delete_room(id).await?;
            if !global.quiet {
                eprintln!("Room deleted");
            }
            Ok(())
        }
    }
}
