//! Operation facade over a [`StateStore`].
//!
//! Each operation loads what it needs, runs the pure core logic, saves once,
//! and returns a [`Report`]: the structured payload plus a human-readable
//! summary. Nothing is saved when the core logic fails.

use chrono::NaiveDate;
use indoc::formatdoc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, EntityKind, InputError, Result};
use crate::frontier::{BranchType, FrontierNode, FrontierState, FrontierSummary};
use crate::project::{LearningHistory, ProjectConfig, ProjectHandle};
use crate::schedule::{
    BlockCompletion, BlockType, DailySchedule, FocusType, ScheduleRequest, ScheduleSynthesizer, TimeBlock,
};
use crate::sequence::{
    generate_initial_frontier, CompletionReport, FrontierDelta, NextTask, RepairReport, SelectionRequest,
    SequenceEngine,
};
use crate::storage::{validate_project_id, Config, StateStore};
use crate::time;

/// Structured result plus display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report<T> {
    pub payload: T,
    pub summary: String,
}

impl<T> Report<T> {
    fn new(payload: T, summary: impl Into<String>) -> Self {
        Self {
            payload,
            summary: summary.into(),
        }
    }
}

/// Frontier progress plus any invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub handle: ProjectHandle,
    pub goal: String,
    pub frontier: FrontierSummary,
    pub issues: Vec<String>,
    pub last_evolution: Option<chrono::DateTime<chrono::Utc>>,
}

/// The planning operations, bound to one store.
pub struct ForestService<S: StateStore> {
    store: S,
    synthesizer: ScheduleSynthesizer,
    engine: SequenceEngine,
}

impl<S: StateStore> ForestService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            synthesizer: ScheduleSynthesizer::new(),
            engine: SequenceEngine::new(),
        }
    }

    /// Service whose synthesizer uses the `[scheduler]` settings of `config`.
    pub fn with_config(store: S, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            synthesizer: ScheduleSynthesizer::with_config(config.synthesizer_config()?),
            engine: SequenceEngine::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn project(&self, project_id: &str) -> Result<ProjectConfig> {
        self.store
            .load_project(project_id)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Project, project_id))
    }

    fn frontier(&self, handle: &ProjectHandle) -> Result<FrontierState> {
        self.store
            .load_frontier(handle)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Frontier, handle.to_string()))
    }

    /// Project config with the handle's path made active.
    fn project_for(&self, handle: &ProjectHandle) -> Result<ProjectConfig> {
        let mut project = self.project(&handle.project_id)?;
        if handle.learning_path.is_some() {
            project.active_path = handle.learning_path.clone();
        }
        Ok(project)
    }

    /// Save a new project and seed its frontier from the initial generators.
    ///
    /// # Errors
    /// `InputError` for an unusable id, an empty goal, an id that is already
    /// taken, or an unparsable wake/sleep time.
    pub fn create_project(&mut self, project: ProjectConfig) -> Result<Report<FrontierState>> {
        validate_project_id(&project.id)?;
        if project.goal.trim().is_empty() {
            return Err(InputError::MissingField("goal".into()).into());
        }
        if self.store.load_project(&project.id)?.is_some() {
            return Err(InputError::InvalidValue {
                field: "project_id".into(),
                message: format!("project '{}' already exists", project.id),
            }
            .into());
        }
        if project.wake_time.is_some() || project.sleep_time.is_some() {
            project.wake_sleep_minutes()?;
        }

        let handle = ProjectHandle::for_project(&project);
        let generated = generate_initial_frontier(&project);
        let state = FrontierState {
            branches: generated.branches,
            frontier_nodes: generated.nodes,
            completed_nodes: Vec::new(),
            last_evolution: Some(chrono::Utc::now()),
        };

        self.store.save_project(&project)?;
        self.store.save_frontier(&handle, &state)?;
        info!(project = %handle, nodes = state.frontier_nodes.len(), "created project");

        let summary = formatdoc! {"
            Created project '{id}' for goal: {goal}
            Initial frontier: {branches} branches, {nodes} ready tasks",
            id = project.id,
            goal = project.goal,
            branches = state.branches.len(),
            nodes = state.frontier_nodes.len(),
        };
        Ok(Report::new(state, summary))
    }

    /// Generate and store the schedule for `date`.
    ///
    /// Ready nodes are the frontier nodes eligible on the handle's path;
    /// habits come from the project's habit list.
    pub fn synthesize_schedule(
        &mut self,
        handle: &ProjectHandle,
        date: NaiveDate,
        energy_level: u8,
        focus_type: FocusType,
    ) -> Result<Report<DailySchedule>> {
        let project = self.project_for(handle)?;
        let state = self.frontier(handle)?;
        let history = self.store.load_history(&handle.project_id)?;

        let index = crate::frontier::CompletionIndex::from_state(&state, &history);
        let ready: Vec<FrontierNode> = self
            .engine
            .eligible_candidates(&state.frontier_nodes, &index, handle.learning_path.as_deref())
            .into_iter()
            .cloned()
            .collect();
        let habits: Vec<FrontierNode> = project
            .habits
            .iter()
            .map(|h| FrontierNode::new(h.clone(), BranchType::Habit).with_estimated_time("15 minutes"))
            .collect();

        let schedule = self.synthesizer.synthesize(&ScheduleRequest {
            project: &project,
            ready_nodes: &ready,
            habit_nodes: &habits,
            date,
            energy_level,
            focus_type,
        })?;
        self.store.save_schedule(handle, &schedule)?;
        info!(project = %handle, %date, blocks = schedule.total_blocks, "generated schedule");

        let summary = schedule_summary(&schedule);
        Ok(Report::new(schedule, summary))
    }

    pub fn schedule(&self, handle: &ProjectHandle, date: NaiveDate) -> Result<Report<DailySchedule>> {
        let schedule = self
            .store
            .load_schedule(handle, date)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Schedule, format!("{handle} {date}")))?;
        let summary = schedule_summary(&schedule);
        Ok(Report::new(schedule, summary))
    }

    /// Record completion feedback on one block of a stored schedule.
    pub fn complete_block(
        &mut self,
        handle: &ProjectHandle,
        date: NaiveDate,
        block_id: &str,
        completion: BlockCompletion,
    ) -> Result<Report<TimeBlock>> {
        let mut schedule = self
            .store
            .load_schedule(handle, date)?
            .ok_or_else(|| CoreError::not_found(EntityKind::Schedule, format!("{handle} {date}")))?;
        let block = schedule.complete_block(block_id, completion)?.clone();
        self.store.save_schedule(handle, &schedule)?;

        let summary = format!(
            "Completed '{}' at {} ({}/{} blocks done)",
            block.title, block.time, schedule.completed, schedule.total_blocks
        );
        Ok(Report::new(block, summary))
    }

    /// Pick the next task; generates follow-up work when nothing is eligible.
    /// Generated nodes are saved even when the sequence ends up stuck.
    /// Energy outside 1-5 is an `InputError`.
    pub fn select_next_task(
        &mut self,
        handle: &ProjectHandle,
        request: &SelectionRequest,
    ) -> Result<Report<NextTask>> {
        request.validate()?;
        let project = self.project_for(handle)?;
        let mut state = self.frontier(handle)?;
        let history = self.store.load_history(&handle.project_id)?;

        let mut request = request.clone();
        if request.learning_path.is_none() {
            request.learning_path = handle.learning_path.clone();
        }
        let next = self.engine.next_task(&project, &mut state, &history, &request);
        if !next.generated().is_empty() {
            self.store.save_frontier(handle, &state)?;
        }

        let summary = match &next {
            NextTask::Selected(selection) | NextTask::Generated { selection, .. } => {
                let node = &selection.node;
                let mut text = formatdoc! {"
                    Next task: {title}
                    Branch: {branch} | Magnitude: {magnitude} | Estimated: {estimate}
                    Score: {score}",
                    title = node.title,
                    branch = node.branch_type,
                    magnitude = node.magnitude,
                    estimate = node.estimated_time,
                    score = selection.score.total(),
                };
                if selection.fallback {
                    text.push_str("\nNothing fit your time and energy, so this is the easiest ready task.");
                }
                if !next.generated().is_empty() {
                    text.push_str(&format!(
                        "\nGenerated {} follow-up tasks first.",
                        next.generated().len()
                    ));
                }
                text
            }
            NextTask::Stuck { advice, .. } => format!("Sequence stuck.\n{advice}"),
        };
        Ok(Report::new(next, summary))
    }

    /// Complete a frontier node, evolve the frontier and log the topic.
    pub fn complete_task(
        &mut self,
        handle: &ProjectHandle,
        node_id: &str,
        report: CompletionReport,
    ) -> Result<Report<FrontierDelta>> {
        let mut state = self.frontier(handle)?;
        let mut history: LearningHistory = self.store.load_history(&handle.project_id)?;
        let rating = report.difficulty_rating;

        let delta = self.engine.complete_task(&mut state, node_id, report)?;
        history.record(
            delta.completed.node.title.clone(),
            Some(delta.completed.node.id.clone()),
            Some(rating),
        );

        // History before frontier: a stored completion always has its topic.
        self.store.save_history(&handle.project_id, &history)?;
        self.store.save_frontier(handle, &state)?;

        let shift = match delta.magnitude_shift {
            s if s < 0 => "remaining tasks made easier",
            s if s > 0 => "remaining tasks made harder",
            _ => "difficulty unchanged",
        };
        let summary = formatdoc! {"
            Completed: {title}
            Added {added} tasks ({opportunities} opportunities), removed {invalidated}; {shift}
            Frontier now holds {size} tasks",
            title = delta.completed.node.title,
            added = delta.added_count(),
            opportunities = delta.opportunities.len(),
            invalidated = delta.invalidated.len(),
            size = state.frontier_nodes.len(),
        };
        Ok(Report::new(delta, summary))
    }

    /// Repair the frontier of `handle`; a missing frontier is rebuilt.
    pub fn repair_sequence(&mut self, handle: &ProjectHandle, force_rebuild: bool) -> Result<Report<RepairReport>> {
        let project = self.project_for(handle)?;
        let mut state = self.store.load_frontier(handle)?.unwrap_or_default();
        let history = self.store.load_history(&handle.project_id)?;

        let repair = self
            .engine
            .repair_sequence(&project, &mut state, &history, force_rebuild);
        self.store.save_frontier(handle, &state)?;

        let summary = formatdoc! {"
            Repaired sequence for {handle}
            Dropped {dropped} dangling prerequisites{rebuilt}
            Frontier now holds {size} tasks",
            dropped = repair.dropped_prerequisites.len(),
            rebuilt = if repair.rebuilt { "; frontier rebuilt" } else { "" },
            size = repair.frontier_size,
        };
        Ok(Report::new(repair, summary))
    }

    /// Frontier of `handle` in stored order.
    pub fn frontier_state(&self, handle: &ProjectHandle) -> Result<FrontierState> {
        self.frontier(handle)
    }

    pub fn status(&self, handle: &ProjectHandle) -> Result<Report<ProjectStatus>> {
        let project = self.project(&handle.project_id)?;
        let state = self.frontier(handle)?;
        let status = ProjectStatus {
            handle: handle.clone(),
            goal: project.goal,
            frontier: state.summary(),
            issues: state.validate().iter().map(ToString::to_string).collect(),
            last_evolution: state.last_evolution,
        };

        let mut summary = format!(
            "{}: {}\n{} ready of {} frontier tasks, {} completed",
            status.handle, status.goal, status.frontier.ready, status.frontier.total_frontier, status.frontier.completed
        );
        for (branch, progress) in &status.frontier.by_branch_type {
            summary.push_str(&format!(
                "\n  {branch}: {} ready, {} completed",
                progress.ready, progress.completed
            ));
        }
        for issue in &status.issues {
            summary.push_str(&format!("\n  warning: {issue}"));
        }
        Ok(Report::new(status, summary))
    }
}

fn schedule_summary(schedule: &DailySchedule) -> String {
    let learning = schedule.blocks_of_type(BlockType::Learning).count();
    let mut summary = formatdoc! {"
        Schedule for {date}: {start} to {end}
        {total} blocks, {learning} learning, {completed} completed",
        date = schedule.date,
        start = time::format_time(i64::from(schedule.wake_minute)),
        end = time::format_time(i64::from(schedule.end_minute)),
        total = schedule.total_blocks,
        completed = schedule.completed,
    };
    for block in &schedule.blocks {
        let mark = if block.is_completed() { "x" } else { " " };
        summary.push_str(&format!(
            "\n[{mark}] {:>8}  {:<14} {} ({} min)",
            block.time,
            block.block_type.as_str(),
            block.title,
            block.duration_minutes
        ));
    }
    if !schedule.unscheduled.is_empty() {
        summary.push_str(&format!(
            "\n{} ready tasks did not fit today",
            schedule.unscheduled.len()
        ));
    }
    summary
}
