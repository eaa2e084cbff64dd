//! `blueprints list` command - Table of stored blueprints

use console::style;
use miette::Result;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{open_service, print_json, record_json, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::ConnectionType;
use crate::core::lifecycle::StatusFilter;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include deleted (archived) blueprints
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Only blueprints with this connection type
    #[arg(long, short = 't')]
    pub connection_type: Option<ConnectionType>,
}

pub fn run(args: ListArgs, global: &GlobalOpts, config: &Config) -> Result<()> {
    let service = open_service(config)?;
    let filter = if args.all {
        StatusFilter::All
    } else {
        StatusFilter::Active
    };

    let mut records = service.list(filter)?;
    if let Some(connection_type) = args.connection_type {
        records.retain(|r| r.connection_type == connection_type);
    }

    if global.format == OutputFormat::Json {
        let values = records
            .iter()
            .map(record_json)
            .collect::<Result<Vec<_>>>()?;
        return print_json(&values);
    }

    if records.is_empty() {
        if !global.quiet {
            println!("No blueprints found.");
        }
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Type", "Vendor", "Model", "Version", "Status", "Updated"]);
    for record in &records {
        builder.push_record([
            record.blueprint_id().to_string(),
            truncate_str(&record.name, 40),
            record.connection_type.to_string(),
            record.vendor_pattern.clone().unwrap_or_default(),
            record.model_pattern.clone().unwrap_or_default(),
            record.version_pattern.clone().unwrap_or_default(),
            record.status.to_string(),
            record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::markdown()));

    if !global.quiet {
        println!(
            "\n{} blueprint(s) found",
            style(records.len()).cyan()
        );
    }
    Ok(())
}
