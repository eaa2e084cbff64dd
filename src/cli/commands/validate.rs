//! `blueprints validate` command - Check templates without touching the database

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{print_json, read_blueprint_file};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::template::TemplateValidator;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Template files to validate
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat files as blueprint documents and validate their template field
    #[arg(long)]
    pub document: bool,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let validator = TemplateValidator::new();
    let mut results = Vec::new();
    let mut failed = 0;

    for path in &args.files {
        let name = path.display().to_string();
        let template = if args.document {
            read_blueprint_file(path)?.template
        } else {
            fs::read_to_string(path).into_diagnostic()?
        };

        match validator.validate_named(&template, &name) {
            Ok(()) => {
                if global.format == OutputFormat::Text && !global.quiet {
                    println!("{} {}", style("✓").green(), name);
                }
                results.push(serde_json::json!({ "file": name, "valid": true }));
            }
            Err(e) => {
                failed += 1;
                if global.format == OutputFormat::Text {
                    println!("{} {}", style("✗").red(), name);
                    eprintln!("{:?}", miette::Report::new(e));
                } else {
                    results.push(serde_json::json!({
                        "file": name,
                        "valid": false,
                        "error": e.to_string(),
                    }));
                }
            }
        }
    }

    if global.format == OutputFormat::Json {
        print_json(&results)?;
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} template(s) failed validation",
            failed,
            args.files.len()
        ));
    }
    if global.format == OutputFormat::Text && !global.quiet {
        println!(
            "\n{} {} template(s) valid",
            style("✓").green(),
            args.files.len()
        );
    }
    Ok(())
}
