//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = "blueprints.yaml";

const DEFAULT_DATABASE: &str = "blueprints.db";
const DEFAULT_BLUEPRINTS_DIRECTORY: &str = "blueprints";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Longest lock timeout SQLite can wait for
pub const MAX_LOCK_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Blueprint registry configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database: Option<PathBuf>,

    /// Directory read by `blueprints load`
    pub blueprints_directory: Option<PathBuf>,

    /// How long an operation waits for a locked record
    pub lock_timeout_ms: Option<u64>,

    /// Log filter directive, e.g. `blueprints=debug`
    pub log: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut files = Vec::new();
        if let Some(global_path) = Self::global_config_path() {
            files.push(global_path);
        }
        files.push(PathBuf::from(LOCAL_CONFIG_FILE));

        Self::from_sources(&files, |key| std::env::var(key).ok())
    }

    /// Merge the given files (later wins), then environment variables
    ///
    /// Missing files are ignored; unreadable or invalid ones are skipped with
    /// a warning.
    pub fn from_sources<F>(files: &[PathBuf], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Built-in defaults (resolved by the accessors)
        let mut config = Config::default();

        // 2. Global user config, then 3. local config
        for path in files {
            if let Some(file_config) = Self::read_file(path) {
                config.merge(file_config);
            }
        }

        // 4. Environment variables
        config.apply_env(env);
        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable config file");
                return None;
            }
        };
        if contents.trim().is_empty() {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(mut config) => {
                debug!(path = %path.display(), "loaded config file");
                let source = path.display().to_string();
                config.lock_timeout_ms = config
                    .lock_timeout_ms
                    .and_then(|ms| checked_lock_timeout(ms, &source));
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping invalid config file");
                None
            }
        }
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database) = env("BLUEPRINTS_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(dir) = env("BLUEPRINTS_DIRECTORY") {
            self.blueprints_directory = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = env("BLUEPRINTS_LOCK_TIMEOUT_MS") {
            match timeout.trim().parse() {
                Ok(ms) => {
                    if let Some(ms) = checked_lock_timeout(ms, "BLUEPRINTS_LOCK_TIMEOUT_MS") {
                        self.lock_timeout_ms = Some(ms);
                    }
                }
                Err(_) => warn!(value = %timeout, "ignoring invalid BLUEPRINTS_LOCK_TIMEOUT_MS"),
            }
        }
        if let Some(log) = env("BLUEPRINTS_LOG") {
            self.log = Some(log);
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "blueprints")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.blueprints_directory.is_some() {
            self.blueprints_directory = other.blueprints_directory;
        }
        if other.lock_timeout_ms.is_some() {
            self.lock_timeout_ms = other.lock_timeout_ms;
        }
        if other.log.is_some() {
            self.log = other.log;
        }
    }

    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    pub fn blueprints_directory(&self) -> PathBuf {
        self.blueprints_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLUEPRINTS_DIRECTORY))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS))
    }
}

fn checked_lock_timeout(ms: u64, source: &str) -> Option<u64> {
    if ms > MAX_LOCK_TIMEOUT_MS {
        warn!(
            source,
            value = ms,
            max = MAX_LOCK_TIMEOUT_MS,
            "ignoring out-of-range lock_timeout_ms"
        );
        return None;
    }
    Some(ms)
}
