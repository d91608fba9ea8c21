//! HTA frontier: branches, ready-to-do nodes, and the completed log.
//!
//! The frontier is plain data. Evolution (completions, invalidation,
//! difficulty rebalancing) happens in [`crate::sequence`]; this module only
//! owns the types and their invariant checks.

pub mod prerequisites;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub use prerequisites::{CompletionIndex, PrerequisiteMatch};

/// Lowest valid magnitude.
pub const MIN_MAGNITUDE: u8 = 1;
/// Highest valid magnitude.
pub const MAX_MAGNITUDE: u8 = 10;

/// Category of a frontier node or branch.
///
/// Known categories are closed variants; anything else (usually a
/// path-specific label) is carried verbatim in [`BranchType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BranchType {
    InterestDriven,
    InterestBased,
    Exploration,
    Sampling,
    Fundamentals,
    Tools,
    Practical,
    Research,
    Continuation,
    Preparation,
    Habit,
    BreakthroughAmplification,
    SerendipityPathway,
    HiddenTalentDevelopment,
    ExternalOpportunity,
    Custom(String),
}

impl BranchType {
    pub fn as_str(&self) -> &str {
        match self {
            BranchType::InterestDriven => "interest_driven",
            BranchType::InterestBased => "interest_based",
            BranchType::Exploration => "exploration",
            BranchType::Sampling => "sampling",
            BranchType::Fundamentals => "fundamentals",
            BranchType::Tools => "tools",
            BranchType::Practical => "practical",
            BranchType::Research => "research",
            BranchType::Continuation => "continuation",
            BranchType::Preparation => "preparation",
            BranchType::Habit => "habit",
            BranchType::BreakthroughAmplification => "breakthrough_amplification",
            BranchType::SerendipityPathway => "serendipity_pathway",
            BranchType::HiddenTalentDevelopment => "hidden_talent_development",
            BranchType::ExternalOpportunity => "external_opportunity",
            BranchType::Custom(label) => label,
        }
    }

    /// Branch types produced by completion feedback rather than planning.
    pub fn is_opportunity(&self) -> bool {
        matches!(
            self,
            BranchType::BreakthroughAmplification
                | BranchType::SerendipityPathway
                | BranchType::HiddenTalentDevelopment
                | BranchType::ExternalOpportunity
        )
    }
}

impl From<String> for BranchType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "interest_driven" => BranchType::InterestDriven,
            "interest_based" => BranchType::InterestBased,
            "exploration" => BranchType::Exploration,
            "sampling" => BranchType::Sampling,
            "fundamentals" => BranchType::Fundamentals,
            "tools" => BranchType::Tools,
            "practical" => BranchType::Practical,
            "research" => BranchType::Research,
            "continuation" => BranchType::Continuation,
            "preparation" => BranchType::Preparation,
            "habit" => BranchType::Habit,
            "breakthrough_amplification" => BranchType::BreakthroughAmplification,
            "serendipity_pathway" => BranchType::SerendipityPathway,
            "hidden_talent_development" => BranchType::HiddenTalentDevelopment,
            "external_opportunity" => BranchType::ExternalOpportunity,
            _ => BranchType::Custom(value),
        }
    }
}

impl From<&str> for BranchType {
    fn from(value: &str) -> Self {
        BranchType::from(value.to_string())
    }
}

impl From<BranchType> for String {
    fn from(value: BranchType) -> Self {
        match value {
            BranchType::Custom(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// Node status.
///
/// Advisory only: generators emit `Ready` and nothing promotes `Blocked` or
/// `Future` nodes. Eligibility is decided by the prerequisite check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Ready,
    Blocked,
    Future,
}

/// A candidate or ready task in the HTA frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierNode {
    /// Unique identifier, fixed at creation
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub branch_type: BranchType,
    /// Free-text estimate, parsed on demand
    #[serde(default = "default_estimated_time")]
    pub estimated_time: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: NodeStatus,
    /// Composite difficulty/effort, 1-10
    #[serde(default = "default_magnitude")]
    pub magnitude: u8,
    /// Node ids, node titles, or topic names
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    /// Owning branch id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub interest_based: bool,
    #[serde(default)]
    pub path_priority: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_focus: Option<String>,
    /// Provenance tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_from: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_estimated_time() -> String {
    "25 minutes".to_string()
}

fn default_magnitude() -> u8 {
    5
}

impl FrontierNode {
    /// Create a ready node with a fresh id and medium defaults.
    pub fn new(title: impl Into<String>, branch_type: BranchType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            branch_type,
            estimated_time: default_estimated_time(),
            priority: Priority::Medium,
            status: NodeStatus::Ready,
            magnitude: default_magnitude(),
            prerequisites: Vec::new(),
            learning_outcomes: Vec::new(),
            branch_id: None,
            interest_based: false,
            path_priority: false,
            path_focus: None,
            generated_from: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_estimated_time(mut self, estimated_time: impl Into<String>) -> Self {
        self.estimated_time = estimated_time.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set magnitude, clamped to 1-10.
    pub fn with_magnitude(mut self, magnitude: u8) -> Self {
        self.magnitude = magnitude.clamp(MIN_MAGNITUDE, MAX_MAGNITUDE);
        self
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_learning_outcomes<I, S>(mut self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.learning_outcomes = outcomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    pub fn with_path_focus(mut self, path: impl Into<String>) -> Self {
        self.path_focus = Some(path.into());
        self
    }

    pub fn with_generated_from(mut self, provenance: impl Into<String>) -> Self {
        self.generated_from = Some(provenance.into());
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == NodeStatus::Ready
    }

    /// True when this node lists `node` (by id or title) as a prerequisite.
    pub fn depends_on(&self, node: &FrontierNode) -> bool {
        self.prerequisites
            .iter()
            .any(|p| *p == node.id || *p == node.title)
    }

    /// Whether this node belongs to the given learning path.
    ///
    /// Nodes without a path focus are shared across paths.
    pub fn is_relevant_to_path(&self, path: &str) -> bool {
        match &self.path_focus {
            Some(focus) => focus.eq_ignore_ascii_case(path),
            None => true,
        }
    }
}

/// A frontier node snapshot with completion details. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedNode {
    #[serde(flatten)]
    pub node: FrontierNode,
    pub completed_date: DateTime<Utc>,
    /// User-reported difficulty, 1-5
    pub actual_difficulty: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub outcome: String,
}

/// A named grouping of frontier nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub title: String,
    pub branch_type: BranchType,
    #[serde(default)]
    pub description: String,
}

impl Branch {
    pub fn new(title: impl Into<String>, branch_type: BranchType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            branch_type,
            description: String::new(),
        }
    }
}

/// Full HTA state for one project (or one learning path of it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontierState {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub frontier_nodes: Vec<FrontierNode>,
    #[serde(default)]
    pub completed_nodes: Vec<CompletedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evolution: Option<DateTime<Utc>>,
}

/// Invariant violations found by [`FrontierState::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierIssue {
    DuplicateId(String),
    MagnitudeOutOfRange { id: String, magnitude: u8 },
    CompletedStillInFrontier(String),
}

impl fmt::Display for FrontierIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontierIssue::DuplicateId(id) => write!(f, "duplicate node id {id}"),
            FrontierIssue::MagnitudeOutOfRange { id, magnitude } => {
                write!(f, "node {id} has magnitude {magnitude} outside 1-10")
            }
            FrontierIssue::CompletedStillInFrontier(id) => {
                write!(f, "node {id} is both completed and in the frontier")
            }
        }
    }
}

/// Per-branch progress counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProgress {
    pub ready: usize,
    pub completed: usize,
}

/// Display summary of a frontier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierSummary {
    pub ready: usize,
    pub total_frontier: usize,
    pub completed: usize,
    pub by_branch_type: BTreeMap<String, BranchProgress>,
}

impl FrontierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frontier_nodes.is_empty()
    }

    /// Nodes whose status is ready, in frontier order.
    pub fn ready_nodes(&self) -> impl Iterator<Item = &FrontierNode> {
        self.frontier_nodes.iter().filter(|n| n.is_ready())
    }

    pub fn find_node(&self, id: &str) -> Option<&FrontierNode> {
        self.frontier_nodes.iter().find(|n| n.id == id)
    }

    pub fn find_completed(&self, id: &str) -> Option<&CompletedNode> {
        self.completed_nodes.iter().find(|c| c.node.id == id)
    }

    /// Remove a node from the live frontier, keeping the order of the rest.
    pub fn take_node(&mut self, id: &str) -> Option<FrontierNode> {
        let index = self.frontier_nodes.iter().position(|n| n.id == id)?;
        Some(self.frontier_nodes.remove(index))
    }

    /// Whether any frontier or completed node has this id or title.
    pub fn has_node_reference(&self, reference: &str) -> bool {
        self.frontier_nodes
            .iter()
            .any(|n| n.id == reference || n.title == reference)
            || self
                .completed_nodes
                .iter()
                .any(|c| c.node.id == reference || c.node.title == reference)
    }

    /// Most recently completed node.
    pub fn last_completed(&self) -> Option<&CompletedNode> {
        self.completed_nodes.iter().max_by_key(|c| c.completed_date)
    }

    /// Check structural invariants. An empty result means the state is sound.
    pub fn validate(&self) -> Vec<FrontierIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for node in &self.frontier_nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(FrontierIssue::DuplicateId(node.id.clone()));
            }
            if !(MIN_MAGNITUDE..=MAX_MAGNITUDE).contains(&node.magnitude) {
                issues.push(FrontierIssue::MagnitudeOutOfRange {
                    id: node.id.clone(),
                    magnitude: node.magnitude,
                });
            }
        }

        let mut seen_completed = HashSet::new();
        for completed in &self.completed_nodes {
            let id = completed.node.id.as_str();
            if !seen_completed.insert(id) {
                issues.push(FrontierIssue::DuplicateId(id.to_string()));
            }
            if seen.contains(id) {
                issues.push(FrontierIssue::CompletedStillInFrontier(id.to_string()));
            }
        }

        issues
    }

    pub fn summary(&self) -> FrontierSummary {
        let mut summary = FrontierSummary {
            ready: self.ready_nodes().count(),
            total_frontier: self.frontier_nodes.len(),
            completed: self.completed_nodes.len(),
            by_branch_type: BTreeMap::new(),
        };
        for node in self.ready_nodes() {
            summary
                .by_branch_type
                .entry(node.branch_type.to_string())
                .or_default()
                .ready += 1;
        }
        for completed in &self.completed_nodes {
            summary
                .by_branch_type
                .entry(completed.node.branch_type.to_string())
                .or_default()
                .completed += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_type_round_trips_through_strings() {
        let json = serde_json::to_string(&BranchType::InterestDriven).unwrap();
        assert_eq!(json, "\"interest_driven\"");

        let parsed: BranchType = serde_json::from_str("\"breakthrough_amplification\"").unwrap();
        assert_eq!(parsed, BranchType::BreakthroughAmplification);

        let custom: BranchType = serde_json::from_str("\"piano_technique\"").unwrap();
        assert_eq!(custom, BranchType::Custom("piano_technique".into()));
        assert_eq!(custom.as_str(), "piano_technique");
    }

    #[test]
    fn node_defaults_fill_missing_fields() {
        let node: FrontierNode = serde_json::from_str(
            r#"{"id":"n1","title":"Scales","branch_type":"fundamentals"}"#,
        )
        .unwrap();
        assert_eq!(node.magnitude, 5);
        assert_eq!(node.priority, Priority::Medium);
        assert_eq!(node.status, NodeStatus::Ready);
        assert!(node.prerequisites.is_empty());
    }

    #[test]
    fn magnitude_builder_clamps() {
        let node = FrontierNode::new("x", BranchType::Tools).with_magnitude(14);
        assert_eq!(node.magnitude, MAX_MAGNITUDE);
        let node = FrontierNode::new("x", BranchType::Tools).with_magnitude(0);
        assert_eq!(node.magnitude, MIN_MAGNITUDE);
    }

    #[test]
    fn take_node_preserves_order() {
        let mut state = FrontierState::new();
        for title in ["a", "b", "c"] {
            let mut node = FrontierNode::new(title, BranchType::Practical);
            node.id = title.to_string();
            state.frontier_nodes.push(node);
        }
        let taken = state.take_node("b").unwrap();
        assert_eq!(taken.title, "b");
        let ids: Vec<_> = state.frontier_nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(state.take_node("b").is_none());
    }

    #[test]
    fn validate_reports_duplicates_and_overlap() {
        let mut state = FrontierState::new();
        let mut node = FrontierNode::new("a", BranchType::Practical);
        node.id = "dup".into();
        node.magnitude = 11;
        state.frontier_nodes.push(node.clone());
        state.frontier_nodes.push(node.clone());
        state.completed_nodes.push(CompletedNode {
            node,
            completed_date: Utc::now(),
            actual_difficulty: 3,
            outcome: String::new(),
        });

        let issues = state.validate();
        assert!(issues.contains(&FrontierIssue::DuplicateId("dup".into())));
        assert!(issues.contains(&FrontierIssue::CompletedStillInFrontier("dup".into())));
        assert!(issues
            .iter()
            .any(|i| matches!(i, FrontierIssue::MagnitudeOutOfRange { magnitude: 11, .. })));
    }

    #[test]
    fn path_relevance_treats_untagged_nodes_as_shared() {
        let shared = FrontierNode::new("Rhythm", BranchType::Fundamentals);
        let piano = FrontierNode::new("Hanon", BranchType::Practical).with_path_focus("Piano");
        assert!(shared.is_relevant_to_path("saxophone"));
        assert!(piano.is_relevant_to_path("piano"));
        assert!(!piano.is_relevant_to_path("saxophone"));
    }
}
