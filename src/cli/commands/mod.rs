//! CLI command implementations

pub mod create;
pub mod delete;
pub mod list;
pub mod load;
pub mod show;
pub mod update;
pub mod validate;
