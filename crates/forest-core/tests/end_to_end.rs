//! End-to-end planning scenarios over the pure core (no store).

use chrono::NaiveDate;
use forest_core::frontier::{BranchType, CompletionIndex, FrontierNode, FrontierState, Priority};
use forest_core::project::{LearningHistory, ProjectConfig};
use forest_core::schedule::{BlockType, FocusType, ScheduleRequest, ScheduleSynthesizer};
use forest_core::sequence::{
    CompletionContext, CompletionReport, ExternalFeedback, NextTask, SelectionRequest, SequenceEngine, Sentiment,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

#[test]
fn midnight_sleep_schedule_places_interest_node_in_morning_window() {
    let project = ProjectConfig::new("e2e", "Learn jazz piano").with_window("8:00 AM", "12:00 AM");
    let node = FrontierNode::new("Improvise over a blues", BranchType::InterestDriven)
        .with_magnitude(6)
        .with_estimated_time("30 minutes");

    let schedule = ScheduleSynthesizer::new()
        .synthesize(&ScheduleRequest {
            project: &project,
            ready_nodes: std::slice::from_ref(&node),
            habit_nodes: &[],
            date: date(),
            energy_level: 3,
            focus_type: FocusType::Balanced,
        })
        .unwrap();

    assert_eq!(schedule.wake_minute, 480);
    assert_eq!(schedule.end_minute, 1440);
    assert_eq!(schedule.window_minutes(), 960);
    assert!(schedule.coverage_issues().is_empty());
    assert!(schedule.total_blocks >= 15);

    let learning: Vec<_> = schedule.blocks_of_type(BlockType::Learning).collect();
    assert_eq!(learning.len(), 1);
    assert_eq!(learning[0].id, node.id);
    // First high-energy window: three hours after wake.
    assert!(learning[0].start_minute >= 480);
    assert!(learning[0].end_minute() <= 480 + 180);
}

#[test]
fn prerequisite_fallback_tiers_each_unlock_a_node() {
    let engine = SequenceEngine::new();
    let node = FrontierNode::new("Walking bass lines", BranchType::Practical).with_prerequisites(["Foo"]);
    let nodes = vec![node];
    let request = SelectionRequest {
        energy_level: 3,
        ..Default::default()
    };
    let none = Vec::<String>::new();

    let by_id = CompletionIndex::new(vec!["Foo"], none.clone(), none.clone());
    let by_title = CompletionIndex::new(none.clone(), vec!["Foo"], none.clone());
    let by_topic = CompletionIndex::new(none.clone(), none.clone(), vec!["Foo"]);
    let nothing = CompletionIndex::new(none.clone(), none.clone(), none.clone());

    for index in [&by_id, &by_title, &by_topic] {
        assert!(engine.select_next_task(&nodes, index, &request).is_some());
    }
    assert!(engine.select_next_task(&nodes, &nothing, &request).is_none());
}

#[test]
fn completion_feedback_reshapes_the_frontier() {
    let project = ProjectConfig::new("e2e", "Learn jazz piano");
    let engine = SequenceEngine::new();
    let mut state = FrontierState::new();

    let done = FrontierNode::new("Comp through rhythm changes", BranchType::Practical)
        .with_magnitude(6)
        .with_prerequisites(["start"]);
    let done_id = done.id.clone();
    let theory = FrontierNode::new("Voice leading theory", BranchType::Fundamentals).with_magnitude(5);
    let other = FrontierNode::new("Learn a standard", BranchType::Practical)
        .with_magnitude(7)
        .with_priority(Priority::Low);
    state.frontier_nodes = vec![done, theory, other];

    let report = CompletionReport {
        outcome: "Got through it twice".into(),
        difficulty_rating: 5,
        learned: "Guide tones".into(),
        follow_up_question: Some("How do pianists use upper structures?".into()),
        context: CompletionContext {
            engagement_level: Some(9),
            unexpected_results: vec!["X".into(), "Y".into()],
            new_skills_revealed: vec!["voice leading".into()],
            external_feedback: vec![ExternalFeedback {
                source: "mentor".into(),
                content: "Nice comping".into(),
                sentiment: Sentiment::Positive,
            }],
            shorter_path_discovered: false,
        },
    };

    let delta = engine.complete_task(&mut state, &done_id, report).unwrap();

    assert_eq!(delta.opportunities.len(), 5);
    assert!(delta.research.is_some());
    // The fundamentals node titled with the revealed skill is dropped.
    assert_eq!(delta.invalidated.len(), 1);
    assert_eq!(delta.invalidated[0].node.title, "Voice leading theory");
    assert_eq!(delta.magnitude_shift, -1);

    let surviving = state
        .frontier_nodes
        .iter()
        .find(|n| n.title == "Learn a standard")
        .unwrap();
    assert_eq!(surviving.magnitude, 6);
    assert_eq!(state.completed_nodes.len(), 1);
    assert!(state.find_node(&done_id).is_none());
    assert!(state.validate().is_empty());

    // Everything spawned hangs off the completed node, so it is selectable
    // now; the high-priority practical continuation outranks the rest.
    let next = engine.next_task(
        &project,
        &mut state,
        &LearningHistory::default(),
        &SelectionRequest {
            energy_level: 5,
            ..Default::default()
        },
    );
    let selection = match next {
        NextTask::Selected(selection) => selection,
        other => panic!("expected a selection, got {other:?}"),
    };
    assert_eq!(selection.node.title, "Continue: Comp through rhythm changes");
    assert_eq!(selection.node.prerequisites, vec![done_id]);
    assert_eq!(selection.score.total(), 100 + 35 + 5);
}

#[test]
fn repair_rebuilds_an_empty_frontier() {
    let mut project = ProjectConfig::new("e2e", "Learn jazz piano");
    project.interests = vec!["blues".into(), "bebop".into()];
    let mut state = FrontierState::new();

    let report = SequenceEngine::new().repair_sequence(&project, &mut state, &LearningHistory::default(), false);
    assert!(report.rebuilt);
    assert_eq!(report.frontier_size, state.frontier_nodes.len());
    assert_eq!(state.frontier_nodes.len(), 6);
    assert!(state.validate().is_empty());
}
