//! Frontier generators.
//!
//! Every generator emits `Ready` nodes. Ordering between generated nodes is
//! expressed through prerequisites only.

use crate::frontier::{Branch, BranchType, FrontierNode, FrontierState, Priority};
use crate::project::ProjectConfig;

/// Branches plus their first nodes.
#[derive(Debug, Clone, Default)]
pub struct GeneratedFrontier {
    pub branches: Vec<Branch>,
    pub nodes: Vec<FrontierNode>,
}

/// Starter HTA for a project: one branch per interest, then fundamentals,
/// exploration, tools and a practical branch gated on fundamentals.
pub fn generate_initial_frontier(project: &ProjectConfig) -> GeneratedFrontier {
    let path = project.active_path.clone();
    let goal = project.goal.trim();
    let mut generated = GeneratedFrontier::default();

    let mut push = |branch: Branch, node: FrontierNode| {
        let mut node = node.with_branch(branch.id.clone()).with_generated_from("initial");
        node.path_focus = path.clone();
        generated.branches.push(branch);
        generated.nodes.push(node);
    };

    for interest in project.active_interests() {
        let branch = Branch::new(interest.clone(), BranchType::InterestDriven);
        let mut node = FrontierNode::new(format!("Explore {interest} hands-on"), BranchType::InterestDriven)
            .with_description(format!("Spend a session on {interest} because it pulls you in"))
            .with_estimated_time("30 minutes")
            .with_priority(Priority::High)
            .with_magnitude(4)
            .with_learning_outcomes([format!("A feel for what {interest} involves")]);
        node.interest_based = true;
        push(branch, node);
    }

    let fundamentals_branch = Branch::new("Foundations", BranchType::Fundamentals);
    let fundamentals = FrontierNode::new(format!("Map the core concepts of {goal}"), BranchType::Fundamentals)
        .with_description(format!("Outline the building blocks every practitioner of {goal} relies on"))
        .with_estimated_time("45 minutes")
        .with_priority(Priority::High)
        .with_magnitude(5)
        .with_learning_outcomes(["A map of the core concepts", "Known unknowns to research"]);
    let fundamentals_id = fundamentals.id.clone();
    push(fundamentals_branch, fundamentals);

    push(
        Branch::new("Exploration", BranchType::Exploration),
        FrontierNode::new(format!("Sample three different approaches to {goal}"), BranchType::Exploration)
            .with_description("Try short samples of different styles, resources and methods")
            .with_estimated_time("20 minutes")
            .with_priority(Priority::Medium)
            .with_magnitude(3),
    );

    push(
        Branch::new("Tools", BranchType::Tools),
        FrontierNode::new(format!("Set up your tools for {goal}"), BranchType::Tools)
            .with_description("Gather and configure the equipment, software and materials you need")
            .with_estimated_time("15 minutes")
            .with_priority(Priority::Medium)
            .with_magnitude(2),
    );

    push(
        Branch::new("Practice", BranchType::Practical),
        FrontierNode::new(format!("First practical application of {goal}"), BranchType::Practical)
            .with_description("Produce something small that uses the core concepts")
            .with_estimated_time("1 hour")
            .with_priority(Priority::Medium)
            .with_magnitude(6)
            .with_prerequisites([fundamentals_id]),
    );

    generated
}

/// Follow-up nodes for a frontier with nothing eligible.
///
/// Builds on the most recent completion; with no completions yet, falls back
/// to the initial generators. Titles already present anywhere in the state
/// are skipped so repeated calls do not pile up duplicates.
pub fn generate_adaptive_tasks(
    project: &ProjectConfig,
    state: &FrontierState,
    learning_path: Option<&str>,
) -> GeneratedFrontier {
    let mut generated = match state.last_completed() {
        Some(last) => {
            let done = &last.node;
            let deepen = FrontierNode::new(format!("Deepen: {}", done.title), BranchType::Continuation)
                .with_description(format!("Revisit '{}' and push one level deeper", done.title))
                .with_estimated_time("30 minutes")
                .with_priority(Priority::High)
                .with_magnitude(done.magnitude.max(3))
                .with_prerequisites([done.id.clone()]);
            let apply = FrontierNode::new(format!("Apply: {}", done.title), BranchType::Practical)
                .with_description(format!("Use what '{}' taught you in a small piece of work", done.title))
                .with_estimated_time("45 minutes")
                .with_priority(Priority::Medium)
                .with_magnitude(done.magnitude.saturating_add(1).min(10))
                .with_prerequisites([done.id.clone()]);

            let nodes = [deepen, apply]
                .into_iter()
                .map(|n| {
                    let mut n = n.with_generated_from(format!("adaptive:{}", done.id));
                    n.branch_id = done.branch_id.clone();
                    n
                })
                .collect();
            GeneratedFrontier {
                branches: Vec::new(),
                nodes,
            }
        }
        None => generate_initial_frontier(project),
    };

    if let Some(path) = learning_path {
        for node in &mut generated.nodes {
            node.path_focus = Some(path.to_string());
        }
    }

    generated.nodes.retain(|n| !state.has_node_reference(&n.title));
    let GeneratedFrontier { branches, nodes } = &mut generated;
    branches.retain(|b| {
        nodes.iter().any(|n| n.branch_id.as_deref() == Some(b.id.as_str()))
            && !state.branches.iter().any(|existing| existing.title == b.title)
    });
    generated
}
