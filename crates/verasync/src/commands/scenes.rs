//! Scene command handlers.

use std::sync::Arc;

use tabled::Tabled;
use verasync_core::{Controller, Scene};

use crate::cli::{GlobalOpts, ScenesArgs, ScenesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SceneRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Active")]
    active: bool,
}

pub async fn handle(
    controller: &Controller,
    args: ScenesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::snapshot(controller).await?;

    match args.command {
        ScenesCommand::List { room } => {
            let scenes: Vec<Arc<Scene>> = match room {
                Some(ref room) => {
                    let room = util::resolve_room(controller, room)?;
                    controller.store().scenes_in_room(room.id)
                }
                None => controller.scenes_snapshot().iter().cloned().collect(),
            };
            let out = output::render_list(
                &global.output,
                &scenes,
                |s| SceneRow {
                    id: s.id,
                    name: s.name.clone(),
                    room: controller
                        .store()
                        .room_of_scene(s)
                        .map_or_else(|| "-".into(), |r| r.name.clone()),
                    active: s.active,
                },
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
