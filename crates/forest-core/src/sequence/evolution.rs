//! Frontier evolution after a completion, and sequence repair.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::generation::generate_initial_frontier;
use super::opportunity::{CompletionContext, InvalidatedNode, OpportunityDetector};
use crate::error::{CoreError, EntityKind, InputError, Result};
use crate::frontier::{
    BranchType, CompletedNode, FrontierNode, FrontierState, Priority, MAX_MAGNITUDE,
};
use crate::project::{LearningHistory, ProjectConfig};

/// Magnitudes never drop below this when a task was rated too hard.
pub const REBALANCE_FLOOR: u8 = 3;

/// What the user reports when finishing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub outcome: String,
    /// 1 (too easy) to 5 (too hard)
    pub difficulty_rating: u8,
    #[serde(default)]
    pub learned: String,
    /// Question to research next
    #[serde(default)]
    pub follow_up_question: Option<String>,
    #[serde(default)]
    pub context: CompletionContext,
}

/// Everything a completion changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierDelta {
    pub completed: CompletedNode,
    pub continuation: FrontierNode,
    pub research: Option<FrontierNode>,
    pub opportunities: Vec<FrontierNode>,
    pub invalidated: Vec<InvalidatedNode>,
    /// -1, 0 or +1 applied to the surviving frontier
    pub magnitude_shift: i8,
}

impl FrontierDelta {
    pub fn added(&self) -> impl Iterator<Item = &FrontierNode> {
        std::iter::once(&self.continuation)
            .chain(self.research.iter())
            .chain(self.opportunities.iter())
    }

    pub fn added_count(&self) -> usize {
        self.added().count()
    }
}

/// Apply a completion to `state`.
///
/// Order: move to completed, spawn continuation, spawn research for a
/// follow-up question, detect opportunities, invalidate redundant nodes,
/// rebalance the surviving nodes' magnitudes, then append the new nodes.
/// Invalidation and rebalancing only touch nodes that existed beforehand.
pub(crate) fn apply_completion(
    detector: &OpportunityDetector,
    state: &mut FrontierState,
    node_id: &str,
    report: CompletionReport,
) -> Result<FrontierDelta> {
    if !(1..=5).contains(&report.difficulty_rating) {
        return Err(InputError::DifficultyOutOfRange(report.difficulty_rating).into());
    }
    if let Some(engagement) = report.context.engagement_level {
        if !(1..=10).contains(&engagement) {
            return Err(InputError::InvalidValue {
                field: "engagement_level".into(),
                message: format!("expected 1-10, got {engagement}"),
            }
            .into());
        }
    }

    let node = state
        .take_node(node_id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Task, node_id))?;

    let completed = CompletedNode {
        node,
        completed_date: Utc::now(),
        actual_difficulty: report.difficulty_rating,
        outcome: report.outcome.clone(),
    };
    let done = &completed.node;

    let continuation = continuation_node(done);
    let research = report
        .follow_up_question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|question| research_node(done, question));
    let opportunities = detector.detect(done, &report.context);

    let existing = std::mem::take(&mut state.frontier_nodes);
    let (mut survivors, invalidated) = detector.invalidate(existing, done, &report.context);

    let magnitude_shift = rebalance(&mut survivors, report.difficulty_rating);

    survivors.push(continuation.clone());
    survivors.extend(research.iter().cloned());
    survivors.extend(opportunities.iter().cloned());
    state.frontier_nodes = survivors;
    state.completed_nodes.push(completed.clone());
    state.last_evolution = Some(Utc::now());

    info!(
        node = %completed.node.id,
        opportunities = opportunities.len(),
        invalidated = invalidated.len(),
        magnitude_shift,
        "frontier evolved after completion"
    );

    Ok(FrontierDelta {
        completed,
        continuation,
        research,
        opportunities,
        invalidated,
        magnitude_shift,
    })
}

fn continuation_node(done: &FrontierNode) -> FrontierNode {
    let mut node = FrontierNode::new(format!("Continue: {}", done.title), done.branch_type.clone())
        .with_description(format!("Next step after '{}'", done.title))
        .with_estimated_time(done.estimated_time.clone())
        .with_priority(Priority::High)
        .with_magnitude(done.magnitude.saturating_sub(1).max(4))
        .with_prerequisites([done.id.clone()])
        .with_generated_from(format!("continuation:{}", done.id));
    node.branch_id = done.branch_id.clone();
    node.path_focus = done.path_focus.clone();
    node.interest_based = done.interest_based;
    node
}

fn research_node(done: &FrontierNode, question: &str) -> FrontierNode {
    let mut node = FrontierNode::new(format!("Research: {question}"), BranchType::Research)
        .with_description(format!("Follow-up question raised by '{}': {question}", done.title))
        .with_estimated_time("30 minutes")
        .with_priority(Priority::Medium)
        .with_magnitude(5)
        .with_prerequisites([done.id.clone()])
        .with_generated_from(format!("follow_up:{}", done.id));
    node.branch_id = done.branch_id.clone();
    node.path_focus = done.path_focus.clone();
    node
}

/// Rating 5 eases every node by one (not below 3), rating 1 hardens every
/// node by one (not above 10). Returns the shift applied.
fn rebalance(nodes: &mut [FrontierNode], difficulty_rating: u8) -> i8 {
    match difficulty_rating {
        5 => {
            for node in nodes.iter_mut() {
                if node.magnitude > REBALANCE_FLOOR {
                    node.magnitude -= 1;
                }
            }
            -1
        }
        1 => {
            for node in nodes.iter_mut() {
                if node.magnitude < MAX_MAGNITUDE {
                    node.magnitude += 1;
                }
            }
            1
        }
        _ => 0,
    }
}

/// Outcome of a repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// (node id, dropped prerequisite)
    pub dropped_prerequisites: Vec<(String, String)>,
    pub rebuilt: bool,
    pub frontier_size: usize,
}

/// Drop dangling prerequisites; regenerate when forced or empty.
pub(crate) fn repair(
    project: &ProjectConfig,
    state: &mut FrontierState,
    history: &LearningHistory,
    force_rebuild: bool,
) -> RepairReport {
    let mut report = RepairReport::default();

    let known: Vec<bool> = state
        .frontier_nodes
        .iter()
        .flat_map(|n| n.prerequisites.iter())
        .map(|p| state.has_node_reference(p) || history.has_topic(p))
        .collect();
    let mut known = known.into_iter();
    for node in &mut state.frontier_nodes {
        let mut kept = Vec::with_capacity(node.prerequisites.len());
        for prerequisite in std::mem::take(&mut node.prerequisites) {
            if known.next().unwrap_or(true) {
                kept.push(prerequisite);
            } else {
                report
                    .dropped_prerequisites
                    .push((node.id.clone(), prerequisite));
            }
        }
        node.prerequisites = kept;
    }

    if force_rebuild || state.frontier_nodes.is_empty() {
        let generated = generate_initial_frontier(project);
        state.branches = generated.branches;
        state.frontier_nodes = generated.nodes;
        report.rebuilt = true;
    }

    state.last_evolution = Some(Utc::now());
    report.frontier_size = state.frontier_nodes.len();
    info!(
        dropped = report.dropped_prerequisites.len(),
        rebuilt = report.rebuilt,
        "sequence repaired"
    );
    report
}
