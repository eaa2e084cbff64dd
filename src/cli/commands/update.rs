//! `blueprints update` command - Update a blueprint from a JSON file

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{open_service, print_json, read_blueprint_file};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::UpdateOutcome;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Blueprint ID (e.g. blueprint/3)
    pub id: String,

    /// Blueprint document; its name must match the stored one
    pub file: PathBuf,
}

pub fn run(args: UpdateArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let data = read_blueprint_file(&args.file)?;
    let service = open_service(config)?;
    let outcome = service.update(&args.id, &data)?;

    let label = match outcome {
        UpdateOutcome::Updated => "updated",
        UpdateOutcome::Unchanged => "unchanged",
    };

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": args.id,
            "outcome": label,
        }))?,
        OutputFormat::Text if global.quiet => println!("{}", label),
        OutputFormat::Text => match outcome {
            UpdateOutcome::Updated => println!(
                "{} Updated blueprint {}",
                style("✓").green(),
                style(&args.id).cyan()
            ),
            UpdateOutcome::Unchanged => println!(
                "{} Blueprint {} unchanged",
                style("•").dim(),
                style(&args.id).cyan()
            ),
        },
    }
    Ok(())
}
