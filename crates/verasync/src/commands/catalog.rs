//! Section and category listings.

use tabled::Tabled;
use verasync_core::Controller;

use crate::cli::{CategoriesArgs, CategoriesCommand, GlobalOpts, SectionsArgs, SectionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NamedRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
}

pub async fn handle_sections(
    controller: &Controller,
    args: SectionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::snapshot(controller).await?;

    match args.command {
        SectionsCommand::List => {
            let sections = controller.sections_snapshot();
            let out = output::render_list(
                &global.output,
                sections.as_slice(),
                |s| NamedRow {
                    id: s.id,
                    name: s.name.clone(),
                },
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

pub async fn handle_categories(
    controller: &Controller,
    args: CategoriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::snapshot(controller).await?;

    match args.command {
        CategoriesCommand::List => {
            let categories = controller.categories_snapshot();
            let out = output::render_list(
                &global.output,
                categories.as_slice(),
                |c| NamedRow {
                    id: c.id,
                    name: c.name.clone(),
                },
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
