//! `blueprints create` command - Create a blueprint from a JSON file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{open_service, print_json, read_blueprint_file};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Blueprint document (name, connectionType, patterns, template)
    pub file: PathBuf,
}

pub fn run(args: CreateArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let data = read_blueprint_file(&args.file)?;
    let service = open_service(config)?;
    let id = service.create(&data)?;

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": id.to_string(),
            "name": data.name,
        }))?,
        OutputFormat::Text if global.quiet => println!("{}", id),
        OutputFormat::Text => println!(
            "{} Created blueprint {} ({})",
            style("✓").green(),
            style(&id).cyan(),
            data.name
        ),
    }
    Ok(())
}
