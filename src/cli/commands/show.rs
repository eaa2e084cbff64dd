//! `blueprints show` command - Show a single blueprint

use console::style;
use miette::Result;

use crate::cli::helpers::{open_service, print_json, record_json};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Status;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Blueprint ID (e.g. blueprint/3)
    pub id: String,
}

pub fn run(args: ShowArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let service = open_service(config)?;
    let record = service.get(&args.id)?;

    if global.format == OutputFormat::Json {
        return print_json(&record_json(&record)?);
    }

    let status = match record.status {
        Status::Active => style(record.status.as_str()).green(),
        Status::Deleted => style(record.status.as_str()).red(),
    };
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("{}: {}", style("ID").bold(), style(record.blueprint_id()).cyan());
    println!("{}: {}", style("Name").bold(), record.name);
    println!("{}: {}", style("Connection").bold(), record.connection_type);
    println!("{}: {}", style("Status").bold(), status);
    println!("{}: {}", style("Vendor").bold(), or_dash(&record.vendor_pattern));
    println!("{}: {}", style("Model").bold(), or_dash(&record.model_pattern));
    println!("{}: {}", style("Version").bold(), or_dash(&record.version_pattern));
    println!("{}: {}", style("Created").bold(), record.created_at.to_rfc3339());
    println!("{}: {}", style("Updated").bold(), record.updated_at.to_rfc3339());
    println!("{}:", style("Template").bold());

    // stored templates are always valid JSON, fall back to raw text anyway
    let template = serde_json::from_str::<serde_json::Value>(&record.template)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| record.template.clone());
    println!("{}", template);
    Ok(())
}
