//! `blueprints delete` command - Archive a blueprint

use console::style;
use miette::Result;

use crate::cli::helpers::{open_service, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Blueprint ID (e.g. blueprint/3)
    pub id: String,
}

pub fn run(args: DeleteArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let service = open_service(config)?;
    let before = service.delete(&args.id)?;

    match global.format {
        OutputFormat::Json => print_json(&before)?,
        OutputFormat::Text if global.quiet => {}
        OutputFormat::Text => println!(
            "{} Deleted blueprint {} ({}); the name is free again",
            style("✓").green(),
            style(&args.id).cyan(),
            before.name
        ),
    }
    Ok(())
}
