//! Bulk loading of blueprint documents from a directory
//!
//! Every `*.json` file below the directory holds one transfer document. All
//! files are read and parsed first, then applied in a single transaction, so
//! a load either lands completely or not at all.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::core::entity::BlueprintData;
use crate::core::lifecycle::{BlueprintError, BlueprintService, UpdateOutcome};
use crate::core::store::BlueprintStore;

/// Errors raised while loading a directory
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Failed to read {}", path.display())]
    #[diagnostic(code(blueprints::load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk blueprint directory: {0}")]
    #[diagnostic(code(blueprints::load::walk))]
    Walk(#[from] walkdir::Error),

    #[error("{} is not a blueprint document: {source}", path.display())]
    #[diagnostic(
        code(blueprints::load::parse),
        help("Expected an object with name, connectionType and template")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to load blueprint from {}: {source}", path.display())]
    #[diagnostic(code(blueprints::load::blueprint))]
    Blueprint {
        path: PathBuf,
        #[source]
        source: BlueprintError,
    },
}

/// Counters for one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files_scanned: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Documents that were JSON `null`
    pub skipped: usize,
}

/// Imports blueprint documents through the lifecycle engine
pub struct BlueprintLoader<'a, S> {
    service: &'a BlueprintService<S>,
}

impl<'a, S: BlueprintStore> BlueprintLoader<'a, S> {
    pub fn new(service: &'a BlueprintService<S>) -> Self {
        Self { service }
    }

    /// Load every document below `dir`
    ///
    /// A blueprint whose name is already stored is updated by name, anything
    /// else is created. A missing directory loads nothing.
    pub fn load_directory(&self, dir: &Path) -> Result<LoadStats, LoadError> {
        let mut stats = LoadStats::default();
        if !dir.exists() {
            info!(dir = %dir.display(), "blueprint directory does not exist, nothing to load");
            return Ok(stats);
        }

        let documents = read_documents(dir, &mut stats)?;
        info!(dir = %dir.display(), count = documents.len(), "loading blueprints");

        // path of the document being applied, for error reporting
        let mut current: Option<&Path> = None;
        let result = self.service.in_transaction(|session| {
            let mut applied = stats;
            for (path, data) in &documents {
                current = Some(path.as_path());
                if session.exists(&data.name)? {
                    match session.update_by_name(data)? {
                        UpdateOutcome::Updated => applied.updated += 1,
                        UpdateOutcome::Unchanged => applied.unchanged += 1,
                    }
                } else {
                    session.create(data)?;
                    applied.created += 1;
                }
            }
            current = None;
            Ok(applied)
        });

        match result {
            Ok(applied) => {
                info!(
                    created = applied.created,
                    updated = applied.updated,
                    unchanged = applied.unchanged,
                    "blueprints loaded"
                );
                Ok(applied)
            }
            Err(source) => Err(LoadError::Blueprint {
                path: current.unwrap_or(dir).to_path_buf(),
                source,
            }),
        }
    }
}

/// Read and parse all documents, ordered by path
fn read_documents(dir: &Path, stats: &mut LoadStats) -> Result<Vec<(PathBuf, BlueprintData)>, LoadError> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "json") {
            continue;
        }
        stats.files_scanned += 1;

        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Option<BlueprintData> =
            serde_json::from_str(&content).map_err(|source| LoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        match document {
            Some(data) => documents.push((path.to_path_buf(), data)),
            None => {
                debug!(path = %path.display(), "skipping empty blueprint document");
                stats.skipped += 1;
            }
        }
    }

    Ok(documents)
}
