//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    create::CreateArgs, delete::DeleteArgs, list::ListArgs, load::LoadArgs, show::ShowArgs,
    update::UpdateArgs, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "blueprints")]
#[command(author, version, about = "Device connection blueprint registry")]
#[command(
    long_about = "Manage connection blueprints for network devices: create, update and archive them, and validate the typed placeholders in their JSON templates."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// SQLite database file (default: from config, else blueprints.db)
    #[arg(long, short = 'd', global = true)]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a blueprint from a JSON file
    Create(CreateArgs),

    /// Update a blueprint from a JSON file
    Update(UpdateArgs),

    /// Delete (archive) a blueprint
    Delete(DeleteArgs),

    /// Show a single blueprint
    Show(ShowArgs),

    /// List blueprints
    List(ListArgs),

    /// Load every blueprint file in a directory
    Load(LoadArgs),

    /// Validate template files without touching the database
    Validate(ValidateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable output
    #[default]
    Text,
    /// JSON format (for programming)
    Json,
}
