//! JSON documents on disk, one directory per project.
//!
//! ```text
//! <root>/projects/<id>/config.json
//! <root>/projects/<id>/frontier[-<path>].json
//! <root>/projects/<id>/history.json
//! <root>/projects/<id>/schedules/<date>[-<path>].json
//! ```

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{data_dir, validate_project_id, StateStore};
use crate::error::{PersistenceError, Result};
use crate::frontier::FrontierState;
use crate::project::{LearningHistory, ProjectConfig, ProjectHandle};
use crate::schedule::DailySchedule;

/// File-backed [`StateStore`]. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at [`data_dir`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf> {
        validate_project_id(project_id)?;
        Ok(self.projects_dir().join(project_id))
    }

    fn frontier_path(&self, handle: &ProjectHandle) -> Result<PathBuf> {
        Ok(self
            .project_dir(&handle.project_id)?
            .join(format!("frontier{}.json", handle.path_suffix())))
    }

    fn schedule_path(&self, handle: &ProjectHandle, date: NaiveDate) -> Result<PathBuf> {
        Ok(self
            .project_dir(&handle.project_id)?
            .join("schedules")
            .join(format!("{}{}.json", date.format("%Y-%m-%d"), handle.path_suffix())))
    }

    fn read_json<T: DeserializeOwned>(what: &str, path: &Path) -> Result<Option<T>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::LoadFailed {
                    what: what.to_string(),
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into())
            }
        };
        let value = serde_json::from_str(&content).map_err(|e| PersistenceError::LoadFailed {
            what: what.to_string(),
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(what, path = %path.display(), "loaded document");
        Ok(Some(value))
    }

    fn write_json<T: Serialize>(what: &str, path: &Path, value: &T) -> Result<()> {
        let save_failed = |message: String| PersistenceError::SaveFailed {
            what: what.to_string(),
            path: path.to_path_buf(),
            message,
        };

        let content = serde_json::to_string_pretty(value).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| save_failed(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| save_failed(e.to_string()))?;
        info!(what, path = %path.display(), "saved document");
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn load_project(&self, project_id: &str) -> Result<Option<ProjectConfig>> {
        let path = self.project_dir(project_id)?.join("config.json");
        Self::read_json("project config", &path)
    }

    fn save_project(&mut self, project: &ProjectConfig) -> Result<()> {
        let path = self.project_dir(&project.id)?.join("config.json");
        Self::write_json("project config", &path, project)
    }

    fn load_frontier(&self, handle: &ProjectHandle) -> Result<Option<FrontierState>> {
        Self::read_json("HTA frontier", &self.frontier_path(handle)?)
    }

    fn save_frontier(&mut self, handle: &ProjectHandle, state: &FrontierState) -> Result<()> {
        Self::write_json("HTA frontier", &self.frontier_path(handle)?, state)
    }

    fn load_history(&self, project_id: &str) -> Result<LearningHistory> {
        let path = self.project_dir(project_id)?.join("history.json");
        Ok(Self::read_json("learning history", &path)?.unwrap_or_default())
    }

    fn save_history(&mut self, project_id: &str, history: &LearningHistory) -> Result<()> {
        let path = self.project_dir(project_id)?.join("history.json");
        Self::write_json("learning history", &path, history)
    }

    fn load_schedule(&self, handle: &ProjectHandle, date: NaiveDate) -> Result<Option<DailySchedule>> {
        Self::read_json("schedule", &self.schedule_path(handle, date)?)
    }

    fn save_schedule(&mut self, handle: &ProjectHandle, schedule: &DailySchedule) -> Result<()> {
        Self::write_json("schedule", &self.schedule_path(handle, schedule.date)?, schedule)
    }

    fn list_projects(&self) -> Result<Vec<String>> {
        let dir = self.projects_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().join("config.json").is_file() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::frontier::{BranchType, FrontierNode};

    #[test]
    fn missing_documents_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load_project("nope").unwrap().is_none());
        assert!(store.load_frontier(&ProjectHandle::new("nope")).unwrap().is_none());
        assert!(store.load_history("nope").unwrap().completed_topics.is_empty());
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn frontier_files_are_scoped_by_learning_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        let mut state = FrontierState::new();
        state.frontier_nodes.push(FrontierNode::new("Scales", BranchType::Practical));

        let piano = ProjectHandle::new("music").with_path("Jazz Piano");
        store.save_frontier(&piano, &state).unwrap();

        assert!(dir.path().join("projects/music/frontier-jazz-piano.json").is_file());
        assert!(store.load_frontier(&ProjectHandle::new("music")).unwrap().is_none());
        assert_eq!(store.load_frontier(&piano).unwrap(), Some(state.clone()));

        let hyphenated = ProjectHandle::new("music").with_path("jazz-piano");
        store.save_frontier(&hyphenated, &FrontierState::new()).unwrap();
        assert_eq!(store.load_frontier(&piano).unwrap(), Some(state));
    }

    #[test]
    fn corrupt_document_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("projects/broken");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.json"), "{ not json").unwrap();

        let store = JsonFileStore::new(dir.path());
        let err = store.load_project("broken").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Persistence(PersistenceError::LoadFailed { .. })
        ));
    }

    #[test]
    fn lists_saved_projects() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        store.save_project(&ProjectConfig::new("b", "Bake bread")).unwrap();
        store.save_project(&ProjectConfig::new("a", "Learn piano")).unwrap();
        assert_eq!(store.list_projects().unwrap(), vec!["a", "b"]);
        assert!(!dir.path().join("projects/a/config.json.tmp").exists());
    }
}
