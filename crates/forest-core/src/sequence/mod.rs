//! Task sequencing over the HTA frontier.
//!
//! The engine picks the next task to hand the user and evolves the frontier
//! when the user reports a completion.
//!
//! Selection works in three passes over ready nodes:
//! 1. eligibility: prerequisites met (id, title, or completed topic) and
//!    relevant to the active learning path
//! 2. fit: estimate within the time budget and magnitude within the
//!    reported energy; when nothing fits, the lowest-magnitude eligible node
//! 3. scoring (see [`scoring`]); ties keep frontier order

pub mod evolution;
pub mod generation;
pub mod opportunity;
pub mod scoring;

use indoc::indoc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{InputError, Result};
use crate::frontier::{CompletionIndex, FrontierNode, FrontierState};
use crate::project::{LearningHistory, ProjectConfig};
use crate::time;

pub use evolution::{CompletionReport, FrontierDelta, RepairReport};
pub use generation::{generate_adaptive_tasks, generate_initial_frontier, GeneratedFrontier};
pub use opportunity::{
    CompletionContext, ExternalFeedback, InvalidatedNode, InvalidationReason, OpportunityDetector,
    Sentiment,
};
pub use scoring::{required_energy, score_node, ScoreBreakdown};

const STUCK_ADVICE: &str = indoc! {"
    No task is ready: every frontier node is waiting on prerequisites or
    belongs to another learning path, and generating follow-up tasks did not
    help. Run a sequence repair to drop dangling prerequisites, or force a
    rebuild to regenerate the frontier."};

/// Selection parameters supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Free-text budget ("45 minutes"); no budget filter when absent
    #[serde(default)]
    pub time_budget: Option<String>,
    /// 1-5
    pub energy_level: u8,
    /// Free-text context matched against descriptions
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub learning_path: Option<String>,
}

impl SelectionRequest {
    /// # Errors
    /// `InputError::InvalidValue` when the energy level is outside 1-5.
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.energy_level) {
            return Err(InputError::InvalidValue {
                field: "energy_level".into(),
                message: format!("expected 1-5, got {}", self.energy_level),
            }
            .into());
        }
        Ok(())
    }
}

/// A chosen task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub node: FrontierNode,
    pub score: ScoreBreakdown,
    /// True when nothing fit budget/energy and the easiest node was chosen
    pub fallback: bool,
}

/// A node held back by unmet prerequisites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedNode {
    pub id: String,
    pub title: String,
    pub unmet: Vec<String>,
}

/// Result of asking for the next task. Never an error when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextTask {
    /// An existing node was chosen
    Selected(Selection),
    /// Follow-up nodes were generated and one of them was chosen
    Generated {
        selection: Selection,
        generated: Vec<FrontierNode>,
    },
    /// Nothing eligible even after generation
    Stuck {
        advice: String,
        blocked: Vec<BlockedNode>,
        generated: Vec<FrontierNode>,
    },
}

impl NextTask {
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            NextTask::Selected(selection) | NextTask::Generated { selection, .. } => Some(selection),
            NextTask::Stuck { .. } => None,
        }
    }

    /// Nodes added to the frontier while answering.
    pub fn generated(&self) -> &[FrontierNode] {
        match self {
            NextTask::Selected(_) => &[],
            NextTask::Generated { generated, .. } | NextTask::Stuck { generated, .. } => generated,
        }
    }
}

/// Selects tasks and evolves the frontier.
#[derive(Debug, Clone, Default)]
pub struct SequenceEngine {
    detector: OpportunityDetector,
}

impl SequenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(detector: OpportunityDetector) -> Self {
        Self { detector }
    }

    /// Ready nodes whose prerequisites are met and that belong to `path`.
    pub fn eligible_candidates<'a>(
        &self,
        nodes: &'a [FrontierNode],
        index: &CompletionIndex,
        path: Option<&str>,
    ) -> Vec<&'a FrontierNode> {
        nodes
            .iter()
            .filter(|n| n.is_ready())
            .filter(|n| path.map_or(true, |p| n.is_relevant_to_path(p)))
            .filter(|n| index.is_satisfied(n))
            .collect()
    }

    /// Pick the best node among `ready_nodes`, or `None` when nothing is eligible.
    pub fn select_next_task(
        &self,
        ready_nodes: &[FrontierNode],
        index: &CompletionIndex,
        request: &SelectionRequest,
    ) -> Option<Selection> {
        let eligible = self.eligible_candidates(ready_nodes, index, request.learning_path.as_deref());
        if eligible.is_empty() {
            return None;
        }

        let budget = request.time_budget.as_deref().and_then(|text| {
            time::parse_duration(text)
                .map_err(|err| warn!(budget = text, error = %err, "ignoring unparsable time budget"))
                .ok()
                .map(|d| d.minutes)
        });

        let fitting: Vec<&FrontierNode> = eligible
            .iter()
            .copied()
            .filter(|n| budget.map_or(true, |b| fits_budget(n, b)))
            .filter(|n| request.energy_level >= required_energy(n.magnitude))
            .collect();

        if fitting.is_empty() {
            let easiest = eligible.iter().copied().reduce(|best, n| {
                if n.magnitude < best.magnitude {
                    n
                } else {
                    best
                }
            })?;
            debug!(node = %easiest.id, "nothing fits budget/energy, falling back to easiest node");
            return Some(Selection {
                node: easiest.clone(),
                score: score_node(easiest, &request.context),
                fallback: true,
            });
        }

        let mut best: Option<(&FrontierNode, ScoreBreakdown)> = None;
        for node in fitting {
            let score = score_node(node, &request.context);
            debug!(node = %node.id, total = score.total(), "scored candidate");
            if best.map_or(true, |(_, b)| score.total() > b.total()) {
                best = Some((node, score));
            }
        }

        best.map(|(node, score)| Selection {
            node: node.clone(),
            score,
            fallback: false,
        })
    }

    /// Select against `state`, generating follow-up work when nothing is
    /// eligible. Generated nodes are appended to `state.frontier_nodes`.
    pub fn next_task(
        &self,
        project: &ProjectConfig,
        state: &mut FrontierState,
        history: &LearningHistory,
        request: &SelectionRequest,
    ) -> NextTask {
        let index = CompletionIndex::from_state(state, history);
        if let Some(selection) = self.select_next_task(&state.frontier_nodes, &index, request) {
            return NextTask::Selected(selection);
        }

        let generated = generate_adaptive_tasks(project, state, request.learning_path.as_deref());
        info!(count = generated.nodes.len(), "no eligible task, generated follow-up work");
        state.branches.extend(generated.branches);
        state.frontier_nodes.extend(generated.nodes.iter().cloned());
        if !generated.nodes.is_empty() {
            state.last_evolution = Some(chrono::Utc::now());
        }

        if let Some(selection) = self.select_next_task(&state.frontier_nodes, &index, request) {
            return NextTask::Generated {
                selection,
                generated: generated.nodes,
            };
        }

        let blocked = state
            .ready_nodes()
            .filter_map(|n| {
                let unmet = index.unmet(n);
                (!unmet.is_empty()).then(|| BlockedNode {
                    id: n.id.clone(),
                    title: n.title.clone(),
                    unmet: unmet.into_iter().map(str::to_string).collect(),
                })
            })
            .collect();
        warn!("sequence stuck: no eligible task after generation");
        NextTask::Stuck {
            advice: STUCK_ADVICE.to_string(),
            blocked,
            generated: generated.nodes,
        }
    }

    /// Record a completion and evolve the frontier.
    ///
    /// # Errors
    /// `NotFound` for an unknown node id; `InputError` for a difficulty
    /// outside 1-5 or engagement outside 1-10. `state` is untouched on error.
    pub fn complete_task(
        &self,
        state: &mut FrontierState,
        node_id: &str,
        report: CompletionReport,
    ) -> Result<FrontierDelta> {
        evolution::apply_completion(&self.detector, state, node_id, report)
    }

    /// Drop prerequisites that point nowhere; regenerate the frontier when
    /// forced or empty. Completed nodes are kept.
    pub fn repair_sequence(
        &self,
        project: &ProjectConfig,
        state: &mut FrontierState,
        history: &LearningHistory,
        force_rebuild: bool,
    ) -> RepairReport {
        evolution::repair(project, state, history, force_rebuild)
    }
}

/// Flexible estimates count as their fitting default; unparsable ones fit.
fn fits_budget(node: &FrontierNode, budget_minutes: u32) -> bool {
    match time::parse_duration(&node.estimated_time) {
        Ok(estimate) => estimate.minutes <= budget_minutes,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::{BranchType, CompletedNode, Priority};
    use chrono::Utc;

    fn node(id: &str, branch: BranchType) -> FrontierNode {
        let mut node = FrontierNode::new(format!("Task {id}"), branch)
            .with_estimated_time("45 minutes")
            .with_prerequisites(["root"]);
        node.id = id.to_string();
        node
    }

    fn index() -> CompletionIndex {
        CompletionIndex::new(vec!["root"], Vec::<String>::new(), Vec::<String>::new())
    }

    fn request(energy: u8) -> SelectionRequest {
        SelectionRequest {
            energy_level: energy,
            ..Default::default()
        }
    }

    #[test]
    fn picks_highest_branch_tier() {
        let nodes = vec![
            node("practical", BranchType::Practical),
            node("interest", BranchType::InterestDriven),
            node("fund", BranchType::Fundamentals),
        ];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(3))
            .unwrap();
        assert_eq!(selection.node.id, "interest");
        assert!(!selection.fallback);
    }

    #[test]
    fn ties_keep_frontier_order() {
        let nodes = vec![node("a", BranchType::Tools), node("b", BranchType::Tools)];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(3))
            .unwrap();
        assert_eq!(selection.node.id, "a");
    }

    #[test]
    fn grounded_node_beats_orphan() {
        let mut orphan = node("orphan", BranchType::Practical);
        orphan.prerequisites.clear();
        let grounded = node("grounded", BranchType::Practical);
        let nodes = vec![orphan, grounded];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(3))
            .unwrap();
        assert_eq!(selection.node.id, "grounded");
    }

    #[test]
    fn unmet_prerequisites_exclude_nodes() {
        let mut blocked = node("blocked", BranchType::InterestDriven);
        blocked.prerequisites = vec!["missing".into()];
        let nodes = vec![blocked, node("open", BranchType::Practical)];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(3))
            .unwrap();
        assert_eq!(selection.node.id, "open");
    }

    #[test]
    fn non_ready_status_is_not_eligible() {
        let mut future = node("future", BranchType::InterestDriven);
        future.status = crate::frontier::NodeStatus::Future;
        assert!(SequenceEngine::new()
            .select_next_task(&[future], &index(), &request(3))
            .is_none());
    }

    #[test]
    fn budget_and_energy_filter_candidates() {
        let long = node("long", BranchType::InterestDriven).with_estimated_time("2 hours");
        let short = node("short", BranchType::Practical).with_estimated_time("20 minutes");
        let hard = node("hard", BranchType::InterestDriven).with_magnitude(8);
        let nodes = vec![long, hard, short];

        let mut req = request(3);
        req.time_budget = Some("1 hour".into());
        let selection = SequenceEngine::new().select_next_task(&nodes, &index(), &req).unwrap();
        assert_eq!(selection.node.id, "short");

        req.energy_level = 4;
        let selection = SequenceEngine::new().select_next_task(&nodes, &index(), &req).unwrap();
        assert_eq!(selection.node.id, "hard");
    }

    #[test]
    fn falls_back_to_lowest_magnitude_when_nothing_fits() {
        let nodes = vec![
            node("big", BranchType::InterestDriven).with_magnitude(9),
            node("smaller", BranchType::Practical).with_magnitude(8),
        ];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(1))
            .unwrap();
        assert_eq!(selection.node.id, "smaller");
        assert!(selection.fallback);
    }

    #[test]
    fn learning_path_filters_foreign_nodes() {
        let sax = node("sax", BranchType::InterestDriven).with_path_focus("saxophone");
        let piano = node("piano", BranchType::Practical).with_path_focus("piano");
        let mut req = request(3);
        req.learning_path = Some("piano".into());
        let selection = SequenceEngine::new()
            .select_next_task(&[sax, piano], &index(), &req)
            .unwrap();
        assert_eq!(selection.node.id, "piano");
    }

    #[test]
    fn path_priority_dominates() {
        let mut flagged = node("flagged", BranchType::Research).with_priority(Priority::Low);
        flagged.path_priority = true;
        let nodes = vec![node("interest", BranchType::InterestDriven), flagged];
        let selection = SequenceEngine::new()
            .select_next_task(&nodes, &index(), &request(3))
            .unwrap();
        assert_eq!(selection.node.id, "flagged");
    }

    #[test]
    fn next_task_generates_when_frontier_is_blocked() {
        let project = ProjectConfig::new("p", "piano");
        let mut state = FrontierState::new();
        let mut done = FrontierNode::new("Scales", BranchType::Practical);
        done.id = "done".into();
        state.completed_nodes.push(CompletedNode {
            node: done,
            completed_date: Utc::now(),
            actual_difficulty: 3,
            outcome: String::new(),
        });
        let mut blocked = FrontierNode::new("Arpeggios", BranchType::Practical);
        blocked.prerequisites = vec!["never".into()];
        state.frontier_nodes.push(blocked);

        let outcome = SequenceEngine::new().next_task(
            &project,
            &mut state,
            &LearningHistory::default(),
            &request(3),
        );
        match &outcome {
            NextTask::Generated { selection, generated } => {
                assert_eq!(generated.len(), 2);
                assert!(selection.node.title.ends_with("Scales"));
            }
            other => panic!("expected generated selection, got {other:?}"),
        }
        assert_eq!(state.frontier_nodes.len(), 3);
    }

    #[test]
    fn next_task_reports_stuck_with_blockers() {
        let project = ProjectConfig::new("p", "piano");
        let mut state = FrontierState::new();
        let mut done = FrontierNode::new("Scales", BranchType::Practical);
        done.id = "done".into();
        state.completed_nodes.push(CompletedNode {
            node: done,
            completed_date: Utc::now(),
            actual_difficulty: 3,
            outcome: String::new(),
        });
        for title in ["Deepen: Scales", "Apply: Scales"] {
            let mut n = FrontierNode::new(title, BranchType::Practical);
            n.prerequisites = vec!["ghost".into()];
            state.frontier_nodes.push(n);
        }

        let outcome = SequenceEngine::new().next_task(
            &project,
            &mut state,
            &LearningHistory::default(),
            &request(3),
        );
        match outcome {
            NextTask::Stuck { blocked, generated, advice } => {
                assert!(generated.is_empty());
                assert_eq!(blocked.len(), 2);
                assert_eq!(blocked[0].unmet, vec!["ghost".to_string()]);
                assert!(advice.contains("repair"));
            }
            other => panic!("expected stuck, got {other:?}"),
        }
    }
}
