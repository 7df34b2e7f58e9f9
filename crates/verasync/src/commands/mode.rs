//! House mode handlers.

use serde::Serialize;
use verasync_core::{Controller, HouseMode};

use crate::cli::{GlobalOpts, ModeArg, ModeArgs, ModeCommand};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ModeView {
    mode: HouseMode,
    code: i64,
}

impl From<ModeArg> for HouseMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Home => Self::Home,
            ModeArg::Away => Self::Away,
            ModeArg::Night => Self::Night,
            ModeArg::Vacation => Self::Vacation,
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: ModeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ModeCommand::Get => {
            let mode = controller.request_house_mode().await?;
            let view = ModeView {
                mode,
                code: mode.code(),
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| v.mode.to_string(),
                |v| v.code.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ModeCommand::Set { mode } => {
            let mode = HouseMode::from(mode);
            controller.set_house_mode(mode).await?;
            if !global.quiet {
                eprintln!("House mode change to {mode} requested");
            }
            Ok(())
        }
    }
}
