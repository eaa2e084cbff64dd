//! Device blueprint registry
//!
//! Stores connection blueprints for network devices, enforces their
//! lifecycle (unique names, terminal deletion with archival renames) and
//! validates the typed placeholders in their JSON templates.

pub mod cli;
pub mod core;
pub mod template;
