//! Persistence interface plus the JSON-file and in-memory stores.
//!
//! The core never does I/O inside an operation: the service loads every
//! document it needs up front through a [`StateStore`], runs the pure
//! transformation, then saves once. A failed save aborts the operation.

mod config;
mod json_store;
mod memory;

pub use config::{Config, DefaultsConfig, SchedulerSettings};
pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::error::{ConfigError, InputError, Result};
use crate::frontier::FrontierState;
use crate::project::{LearningHistory, ProjectConfig, ProjectHandle};
use crate::schedule::DailySchedule;

/// Returns the data directory, creating it if needed.
///
/// `FOREST_DATA_DIR` overrides the location entirely. Otherwise
/// `~/.config/forest/`, or `~/.config/forest-dev/` when `FOREST_ENV=dev`.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("FOREST_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env = std::env::var("FOREST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("forest-dev")
            } else {
                base_dir.join("forest")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Key-value load/save of the documents an operation consumes.
///
/// Loads return `Ok(None)` for documents that were never written; the
/// learning history defaults to empty instead.
pub trait StateStore {
    fn load_project(&self, project_id: &str) -> Result<Option<ProjectConfig>>;
    fn save_project(&mut self, project: &ProjectConfig) -> Result<()>;

    fn load_frontier(&self, handle: &ProjectHandle) -> Result<Option<FrontierState>>;
    fn save_frontier(&mut self, handle: &ProjectHandle, state: &FrontierState) -> Result<()>;

    fn load_history(&self, project_id: &str) -> Result<LearningHistory>;
    fn save_history(&mut self, project_id: &str, history: &LearningHistory) -> Result<()>;

    fn load_schedule(&self, handle: &ProjectHandle, date: NaiveDate) -> Result<Option<DailySchedule>>;
    fn save_schedule(&mut self, handle: &ProjectHandle, schedule: &DailySchedule) -> Result<()>;

    /// Ids of every stored project, sorted.
    fn list_projects(&self) -> Result<Vec<String>>;
}

/// Project ids double as directory names.
pub fn validate_project_id(id: &str) -> Result<()> {
    let trimmed = id.trim();
    let invalid = trimmed.is_empty()
        || trimmed != id
        || id == "."
        || id == ".."
        || id.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if invalid {
        return Err(InputError::InvalidValue {
            field: "project_id".into(),
            message: format!("'{id}' cannot be used as a project id"),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_ids_must_be_path_safe() {
        assert!(validate_project_id("jazz-piano").is_ok());
        assert!(validate_project_id("Learn Piano 2").is_ok());
        assert!(validate_project_id("").is_err());
        assert!(validate_project_id("..").is_err());
        assert!(validate_project_id("a/b").is_err());
        assert!(validate_project_id(" padded").is_err());
    }
}
