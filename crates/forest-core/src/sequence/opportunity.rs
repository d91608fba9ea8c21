//! Opportunity detection and frontier invalidation after a completion.
//!
//! Rich completion feedback (high engagement, surprises, revealed skills,
//! outside interest) spawns new ready nodes. The same feedback can make
//! planned nodes redundant; those are dropped from the frontier outright.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scoring::significant_words;
use crate::frontier::{BranchType, FrontierNode, Priority};

/// Engagement at or above this spawns a breakthrough node.
pub const BREAKTHROUGH_ENGAGEMENT: u8 = 8;

/// Sentiment of an external feedback entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

/// Feedback from someone other than the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFeedback {
    pub source: String,
    pub content: String,
    #[serde(default)]
    pub sentiment: Sentiment,
}

impl ExternalFeedback {
    /// Positive sentiment, or text signalling interest.
    pub fn is_opportunity(&self) -> bool {
        if self.sentiment == Sentiment::Positive {
            return true;
        }
        let content = self.content.to_lowercase();
        content.contains("viral") || content.contains("interested")
    }
}

/// Context reported alongside a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionContext {
    /// 1-10
    #[serde(default)]
    pub engagement_level: Option<u8>,
    #[serde(default)]
    pub unexpected_results: Vec<String>,
    #[serde(default)]
    pub new_skills_revealed: Vec<String>,
    #[serde(default)]
    pub external_feedback: Vec<ExternalFeedback>,
    /// The user found a shortcut that skips preparation work
    #[serde(default)]
    pub shorter_path_discovered: bool,
}

/// Why a frontier node was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A revealed skill makes a fundamentals node redundant
    AptitudeDemonstrated { skill: String },
    /// An unexpected result already covered a smaller task
    SubsumedByDiscovery { result: String },
    /// A shortcut bypassed preparation depending on the completed node
    ShortcutBypassedPreparation,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::AptitudeDemonstrated { skill } => {
                write!(f, "natural aptitude shown in '{skill}'")
            }
            InvalidationReason::SubsumedByDiscovery { result } => {
                write!(f, "covered by discovery '{result}'")
            }
            InvalidationReason::ShortcutBypassedPreparation => {
                f.write_str("shorter path made preparation unnecessary")
            }
        }
    }
}

/// A node removed by invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidatedNode {
    pub node: FrontierNode,
    pub reason: InvalidationReason,
}

/// Emits opportunity nodes and applies invalidation rules.
#[derive(Debug, Clone)]
pub struct OpportunityDetector {
    breakthrough_engagement: u8,
}

impl OpportunityDetector {
    pub fn new() -> Self {
        Self {
            breakthrough_engagement: BREAKTHROUGH_ENGAGEMENT,
        }
    }

    pub fn with_breakthrough_engagement(mut self, level: u8) -> Self {
        self.breakthrough_engagement = level;
        self
    }

    /// New ready nodes for the opportunities in `context`.
    pub fn detect(&self, completed: &FrontierNode, context: &CompletionContext) -> Vec<FrontierNode> {
        let mut nodes = Vec::new();

        if let Some(engagement) = context.engagement_level {
            if engagement >= self.breakthrough_engagement {
                nodes.push(
                    self.opportunity(
                        completed,
                        format!("Amplify breakthrough: {}", completed.title),
                        BranchType::BreakthroughAmplification,
                        "breakthrough",
                    )
                    .with_description(format!(
                        "Engagement hit {engagement}/10 on '{}'. Push further while momentum is high.",
                        completed.title
                    ))
                    .with_magnitude(completed.magnitude.saturating_sub(1).max(3))
                    .with_priority(Priority::High),
                );
            }
        }

        for result in &context.unexpected_results {
            nodes.push(
                self.opportunity(
                    completed,
                    format!("Explore unexpected result: {result}"),
                    BranchType::SerendipityPathway,
                    "unexpected_result",
                )
                .with_description(format!("While working on '{}' you found: {result}", completed.title))
                .with_magnitude(4)
                .with_priority(Priority::Medium),
            );
        }

        for skill in &context.new_skills_revealed {
            nodes.push(
                self.opportunity(
                    completed,
                    format!("Develop revealed skill: {skill}"),
                    BranchType::HiddenTalentDevelopment,
                    "revealed_skill",
                )
                .with_description(format!("'{}' revealed an aptitude for {skill}", completed.title))
                .with_magnitude(5)
                .with_priority(Priority::High),
            );
        }

        for feedback in context.external_feedback.iter().filter(|f| f.is_opportunity()) {
            nodes.push(
                self.opportunity(
                    completed,
                    format!("Follow up on interest from {}", feedback.source),
                    BranchType::ExternalOpportunity,
                    "external_feedback",
                )
                .with_description(feedback.content.clone())
                .with_magnitude(6)
                .with_priority(Priority::Critical),
            );
        }

        nodes
    }

    fn opportunity(
        &self,
        completed: &FrontierNode,
        title: String,
        branch_type: BranchType,
        provenance: &str,
    ) -> FrontierNode {
        let mut node = FrontierNode::new(title, branch_type)
            .with_estimated_time("30 minutes")
            .with_prerequisites([completed.id.clone()])
            .with_generated_from(format!("{provenance}:{}", completed.id));
        node.path_focus = completed.path_focus.clone();
        node.branch_id = completed.branch_id.clone();
        node
    }

    /// First invalidation rule `candidate` matches, if any.
    pub fn invalidation_reason(
        &self,
        candidate: &FrontierNode,
        completed: &FrontierNode,
        context: &CompletionContext,
    ) -> Option<InvalidationReason> {
        if candidate.branch_type == BranchType::Fundamentals
            && completed.branch_type != BranchType::Fundamentals
        {
            let title = candidate.title.to_lowercase();
            if let Some(skill) = context
                .new_skills_revealed
                .iter()
                .find(|skill| significant_words(skill).iter().any(|w| title.contains(w.as_str())))
            {
                return Some(InvalidationReason::AptitudeDemonstrated {
                    skill: skill.clone(),
                });
            }
        }

        if candidate.magnitude <= completed.magnitude {
            let description = candidate.description.to_lowercase();
            if let Some(result) = context
                .unexpected_results
                .iter()
                .find(|r| significant_words(r).iter().any(|w| description.contains(w.as_str())))
            {
                return Some(InvalidationReason::SubsumedByDiscovery {
                    result: result.clone(),
                });
            }
        }

        if context.shorter_path_discovered
            && candidate.branch_type == BranchType::Preparation
            && candidate.depends_on(completed)
        {
            return Some(InvalidationReason::ShortcutBypassedPreparation);
        }

        None
    }

    /// Split `frontier` into survivors and invalidated nodes, keeping order.
    pub fn invalidate(
        &self,
        frontier: Vec<FrontierNode>,
        completed: &FrontierNode,
        context: &CompletionContext,
    ) -> (Vec<FrontierNode>, Vec<InvalidatedNode>) {
        let mut kept = Vec::with_capacity(frontier.len());
        let mut dropped = Vec::new();
        for node in frontier {
            match self.invalidation_reason(&node, completed, context) {
                Some(reason) => dropped.push(InvalidatedNode { node, reason }),
                None => kept.push(node),
            }
        }
        (kept, dropped)
    }
}

impl Default for OpportunityDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(branch: BranchType, magnitude: u8) -> FrontierNode {
        let mut node = FrontierNode::new("Play by ear", branch).with_magnitude(magnitude);
        node.id = "done-1".into();
        node
    }

    fn feedback(content: &str, sentiment: Sentiment) -> ExternalFeedback {
        ExternalFeedback {
            source: "mentor".into(),
            content: content.into(),
            sentiment,
        }
    }

    #[test]
    fn emits_one_node_per_signal() {
        let context = CompletionContext {
            engagement_level: Some(9),
            unexpected_results: vec!["X".into(), "Y".into()],
            new_skills_revealed: vec!["Z".into()],
            external_feedback: vec![feedback("nice", Sentiment::Positive)],
            shorter_path_discovered: false,
        };
        let nodes = OpportunityDetector::new().detect(&completed(BranchType::Practical, 6), &context);
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].branch_type, BranchType::BreakthroughAmplification);
        assert_eq!(nodes[0].magnitude, 5);
        assert_eq!(nodes[0].priority, Priority::High);
        assert_eq!(nodes[1].branch_type, BranchType::SerendipityPathway);
        assert_eq!(nodes[1].magnitude, 4);
        assert_eq!(nodes[3].branch_type, BranchType::HiddenTalentDevelopment);
        assert_eq!(nodes[3].magnitude, 5);
        assert_eq!(nodes[4].branch_type, BranchType::ExternalOpportunity);
        assert_eq!(nodes[4].priority, Priority::Critical);
        assert!(nodes.iter().all(|n| n.is_ready()));
        assert!(nodes.iter().all(|n| n.prerequisites == vec!["done-1".to_string()]));
        assert!(nodes
            .iter()
            .all(|n| n.generated_from.as_deref().is_some_and(|g| g.ends_with(":done-1"))));
    }

    #[test]
    fn breakthrough_magnitude_floors_at_three() {
        let context = CompletionContext {
            engagement_level: Some(8),
            ..Default::default()
        };
        let nodes = OpportunityDetector::new().detect(&completed(BranchType::Practical, 2), &context);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].magnitude, 3);
    }

    #[test]
    fn low_engagement_and_negative_feedback_emit_nothing() {
        let context = CompletionContext {
            engagement_level: Some(7),
            external_feedback: vec![feedback("meh", Sentiment::Negative)],
            ..Default::default()
        };
        assert!(OpportunityDetector::new()
            .detect(&completed(BranchType::Practical, 5), &context)
            .is_empty());
    }

    #[test]
    fn interest_keywords_count_as_opportunity() {
        assert!(feedback("this went VIRAL overnight", Sentiment::Neutral).is_opportunity());
        assert!(feedback("a label is interested", Sentiment::Negative).is_opportunity());
        assert!(!feedback("ok", Sentiment::Neutral).is_opportunity());
    }

    #[test]
    fn revealed_skill_drops_fundamentals_only_from_other_branches() {
        let detector = OpportunityDetector::new();
        let context = CompletionContext {
            new_skills_revealed: vec!["improvisation".into()],
            ..Default::default()
        };
        let theory = FrontierNode::new("Improvisation theory basics", BranchType::Fundamentals);
        let practice = FrontierNode::new("Improvisation drills", BranchType::Practical);

        assert!(matches!(
            detector.invalidation_reason(&theory, &completed(BranchType::InterestDriven, 5), &context),
            Some(InvalidationReason::AptitudeDemonstrated { .. })
        ));
        assert_eq!(
            detector.invalidation_reason(&theory, &completed(BranchType::Fundamentals, 5), &context),
            None
        );
        assert_eq!(
            detector.invalidation_reason(&practice, &completed(BranchType::InterestDriven, 5), &context),
            None
        );
    }

    #[test]
    fn short_skill_names_still_match() {
        let detector = OpportunityDetector::new();
        let context = CompletionContext {
            new_skills_revealed: vec!["Go".into()],
            ..Default::default()
        };
        let basics = FrontierNode::new("Go syntax basics", BranchType::Fundamentals);

        assert_eq!(
            detector.invalidation_reason(&basics, &completed(BranchType::Practical, 5), &context),
            Some(InvalidationReason::AptitudeDemonstrated { skill: "Go".into() })
        );
    }

    #[test]
    fn discovery_subsumes_smaller_tasks_only() {
        let detector = OpportunityDetector::new();
        let context = CompletionContext {
            unexpected_results: vec!["modal interchange".into()],
            ..Default::default()
        };
        let small = FrontierNode::new("Borrowed chords", BranchType::Practical)
            .with_description("Intro to modal interchange")
            .with_magnitude(4);
        let big = small.clone().with_magnitude(8);
        let done = completed(BranchType::Practical, 5);

        assert!(detector.invalidation_reason(&small, &done, &context).is_some());
        assert!(detector.invalidation_reason(&big, &done, &context).is_none());
    }

    #[test]
    fn shortcut_drops_dependent_preparation() {
        let detector = OpportunityDetector::new();
        let done = completed(BranchType::Practical, 5);
        let prep = FrontierNode::new("Warm-up routine", BranchType::Preparation)
            .with_prerequisites([done.id.clone()]);
        let unrelated_prep = FrontierNode::new("Tune instrument", BranchType::Preparation);

        let mut context = CompletionContext::default();
        assert!(detector.invalidation_reason(&prep, &done, &context).is_none());

        context.shorter_path_discovered = true;
        let (kept, dropped) = detector.invalidate(vec![prep, unrelated_prep], &done, &context);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Tune instrument");
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].reason, InvalidationReason::ShortcutBypassedPreparation);
    }
}
