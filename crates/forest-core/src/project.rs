//! Project configuration and the explicit project context.
//!
//! Every operation receives a [`ProjectHandle`] naming the project (and
//! optionally a learning path) it works on; there is no process-wide
//! "current project".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InputError, Result};
use crate::time::{self, Minutes};

/// Identifies the project and learning path an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectHandle {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_path: Option<String>,
}

impl ProjectHandle {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            learning_path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.learning_path = Some(path.into());
        self
    }

    /// Handle for the project's configured active path, if any.
    pub fn for_project(project: &ProjectConfig) -> Self {
        Self {
            project_id: project.id.clone(),
            learning_path: project.active_path.clone(),
        }
    }

    /// File-name-safe suffix for path-scoped documents ("" when unscoped).
    ///
    /// Distinct only up to ASCII case, matching how nodes are matched to
    /// paths: spaces become `-`, every other non-alphanumeric character is
    /// escaped as `_<hex>_`.
    pub fn path_suffix(&self) -> String {
        let Some(path) = &self.learning_path else {
            return String::new();
        };
        let mut slug = String::with_capacity(path.len() + 1);
        slug.push('-');
        for c in path.chars() {
            match c {
                c if c.is_ascii_alphanumeric() => slug.push(c.to_ascii_lowercase()),
                ' ' => slug.push('-'),
                c => slug.push_str(&format!("_{:x}_", u32::from(c))),
            }
        }
        slug
    }
}

impl fmt::Display for ProjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.learning_path {
            Some(path) => write!(f, "{}/{}", self.project_id, path),
            None => f.write_str(&self.project_id),
        }
    }
}

/// A fixed commitment other than meals (work, commute, classes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub title: String,
    /// Start time-of-day ("9:00 AM" or "09:00")
    pub start: String,
    pub duration_minutes: Minutes,
}

/// A named sub-scope of a project with its own frontier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningPath {
    pub name: String,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Per-goal configuration. Immutable input to every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub wake_time: Option<String>,
    #[serde(default)]
    pub sleep_time: Option<String>,
    #[serde(default)]
    pub meal_times: Vec<String>,
    #[serde(default)]
    pub commitments: Vec<Commitment>,
    /// Preferred length of one focus block ("25 minutes", "1 hour")
    #[serde(default = "default_focus_duration")]
    pub focus_duration: String,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Daily habits, scheduled near the morning and evening anchors
    #[serde(default)]
    pub habits: Vec<String>,
    #[serde(default)]
    pub learning_paths: Vec<LearningPath>,
    #[serde(default)]
    pub active_path: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_focus_duration() -> String {
    "25 minutes".to_string()
}

impl ProjectConfig {
    pub fn new(id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            context: String::new(),
            wake_time: None,
            sleep_time: None,
            meal_times: Vec::new(),
            commitments: Vec::new(),
            focus_duration: default_focus_duration(),
            interests: Vec::new(),
            habits: Vec::new(),
            learning_paths: Vec::new(),
            active_path: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_window(mut self, wake: impl Into<String>, sleep: impl Into<String>) -> Self {
        self.wake_time = Some(wake.into());
        self.sleep_time = Some(sleep.into());
        self
    }

    pub fn with_meals<I, S>(mut self, meals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meal_times = meals.into_iter().map(Into::into).collect();
        self
    }

    /// Wake and sleep as minutes since midnight.
    ///
    /// # Errors
    /// `InputError::MissingField` when either is unset and
    /// `InputError::InvalidValue` when either cannot be parsed.
    pub fn wake_sleep_minutes(&self) -> Result<(Minutes, Minutes)> {
        let wake = parse_required(self.wake_time.as_deref(), "wake_time")?;
        let sleep = parse_required(self.sleep_time.as_deref(), "sleep_time")?;
        Ok((wake, sleep))
    }

    /// Interests of the active path, falling back to the project interests.
    pub fn active_interests(&self) -> &[String] {
        self.active_path
            .as_deref()
            .and_then(|name| {
                self.learning_paths
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(name))
            })
            .filter(|p| !p.interests.is_empty())
            .map(|p| p.interests.as_slice())
            .unwrap_or(&self.interests)
    }
}

fn parse_required(value: Option<&str>, field: &str) -> Result<Minutes> {
    let text = value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| InputError::MissingField(field.to_string()))?;
    time::parse_time(text).map_err(|e| {
        InputError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// One entry of the completed-topics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTopic {
    pub topic: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
}

/// Learning history: topics completed so far, keyed by free-text name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningHistory {
    #[serde(default)]
    pub completed_topics: Vec<CompletedTopic>,
}

impl LearningHistory {
    pub fn record(&mut self, topic: impl Into<String>, node_id: Option<String>, difficulty: Option<u8>) {
        self.completed_topics.push(CompletedTopic {
            topic: topic.into(),
            completed_at: Utc::now(),
            node_id,
            difficulty,
        });
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.completed_topics.iter().any(|t| t.topic == topic)
    }
}
