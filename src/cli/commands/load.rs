//! `blueprints load` command - Bulk-load a directory of blueprint files

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{open_service, print_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader::BlueprintLoader;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Directory to load (default: configured blueprints_directory)
    pub dir: Option<PathBuf>,
}

pub fn run(args: LoadArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| config.blueprints_directory());
    let service = open_service(config)?;
    let stats = BlueprintLoader::new(&service).load_directory(&dir)?;

    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "directory": dir.display().to_string(),
            "filesScanned": stats.files_scanned,
            "created": stats.created,
            "updated": stats.updated,
            "unchanged": stats.unchanged,
            "skipped": stats.skipped,
        }))?,
        OutputFormat::Text if global.quiet => {}
        OutputFormat::Text => {
            println!(
                "{} Loaded {} file(s) from {}",
                style("✓").green(),
                stats.files_scanned,
                style(dir.display()).cyan()
            );
            println!(
                "   {} created, {} updated, {} unchanged, {} skipped",
                style(stats.created).green(),
                style(stats.updated).yellow(),
                stats.unchanged,
                stats.skipped
            );
        }
    }
    Ok(())
}
