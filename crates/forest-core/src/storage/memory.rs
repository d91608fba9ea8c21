use chrono::NaiveDate;
use std::collections::HashMap;

use super::{validate_project_id, StateStore};
use crate::error::{PersistenceError, Result};
use crate::frontier::FrontierState;
use crate::project::{LearningHistory, ProjectConfig, ProjectHandle};
use crate::schedule::DailySchedule;

/// `HashMap`-backed [`StateStore`] for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: HashMap<String, ProjectConfig>,
    frontiers: HashMap<ProjectHandle, FrontierState>,
    histories: HashMap<String, LearningHistory>,
    schedules: HashMap<(ProjectHandle, NaiveDate), DailySchedule>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves all fail, for exercising persistence errors.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Toggle save rejection on an existing store.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.read_only {
            return Err(PersistenceError::Rejected(what.to_string()).into());
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load_project(&self, project_id: &str) -> Result<Option<ProjectConfig>> {
        Ok(self.projects.get(project_id).cloned())
    }

    fn save_project(&mut self, project: &ProjectConfig) -> Result<()> {
        validate_project_id(&project.id)?;
        self.check_writable("project config")?;
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn load_frontier(&self, handle: &ProjectHandle) -> Result<Option<FrontierState>> {
        Ok(self.frontiers.get(handle).cloned())
    }

    fn save_frontier(&mut self, handle: &ProjectHandle, state: &FrontierState) -> Result<()> {
        self.check_writable("HTA frontier")?;
        self.frontiers.insert(handle.clone(), state.clone());
        Ok(())
    }

    fn load_history(&self, project_id: &str) -> Result<LearningHistory> {
        Ok(self.histories.get(project_id).cloned().unwrap_or_default())
    }

    fn save_history(&mut self, project_id: &str, history: &LearningHistory) -> Result<()> {
        self.check_writable("learning history")?;
        self.histories.insert(project_id.to_string(), history.clone());
        Ok(())
    }

    fn load_schedule(&self, handle: &ProjectHandle, date: NaiveDate) -> Result<Option<DailySchedule>> {
        Ok(self.schedules.get(&(handle.clone(), date)).cloned())
    }

    fn save_schedule(&mut self, handle: &ProjectHandle, schedule: &DailySchedule) -> Result<()> {
        self.check_writable("schedule")?;
        self.schedules
            .insert((handle.clone(), schedule.date), schedule.clone());
        Ok(())
    }

    fn list_projects(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.projects.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn frontiers_are_kept_per_learning_path() {
        let mut store = MemoryStore::new();
        let base = ProjectHandle::new("music");
        let piano = ProjectHandle::new("music").with_path("piano");

        store.save_frontier(&piano, &FrontierState::new()).unwrap();
        assert!(store.load_frontier(&piano).unwrap().is_some());
        assert!(store.load_frontier(&base).unwrap().is_none());
    }

    #[test]
    fn read_only_store_rejects_saves() {
        let mut store = MemoryStore::read_only();
        let err = store
            .save_history("music", &LearningHistory::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Persistence(PersistenceError::Rejected(_))));

        store.set_read_only(false);
        store.save_project(&ProjectConfig::new("music", "Play")).unwrap();
        assert_eq!(store.list_projects().unwrap(), vec!["music"]);
    }
}
