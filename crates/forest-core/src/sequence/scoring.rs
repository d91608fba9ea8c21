//! Candidate scoring for next-task selection.
//!
//! Integer points, higher wins:
//! - path priority flag: +500
//! - branch tier: interest +300, exploration/sampling +250, fundamentals +200,
//!   tools +150, practical +100, research +25
//! - priority: critical +50, high +35, medium +20
//! - no prerequisites: -25
//! - context words found in the description: +15
//! - estimate of 30 minutes or less: +5

use serde::{Deserialize, Serialize};

use crate::frontier::{BranchType, FrontierNode, Priority};
use crate::time;

pub const PATH_PRIORITY_BONUS: i32 = 500;
pub const ORPHAN_PENALTY: i32 = -25;
pub const CONTEXT_MATCH_BONUS: i32 = 15;
pub const QUICK_WIN_BONUS: i32 = 5;
pub const QUICK_WIN_MAX_MINUTES: u32 = 30;

/// Per-factor points for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub path_priority: i32,
    pub branch: i32,
    pub priority: i32,
    pub orphan: i32,
    pub context: i32,
    pub quick_win: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.path_priority + self.branch + self.priority + self.orphan + self.context + self.quick_win
    }
}

pub fn branch_tier(branch_type: &BranchType) -> i32 {
    match branch_type {
        BranchType::InterestDriven | BranchType::InterestBased => 300,
        BranchType::Exploration | BranchType::Sampling => 250,
        BranchType::Fundamentals => 200,
        BranchType::Tools => 150,
        BranchType::Practical => 100,
        BranchType::Research => 25,
        _ => 0,
    }
}

/// Branch tier, with the `interest_based` flag lifting a node to the interest tier.
pub fn branch_score(node: &FrontierNode) -> i32 {
    let tier = branch_tier(&node.branch_type);
    if node.interest_based {
        tier.max(branch_tier(&BranchType::InterestBased))
    } else {
        tier
    }
}

pub fn priority_score(priority: Priority) -> i32 {
    match priority {
        Priority::Critical => 50,
        Priority::High => 35,
        Priority::Medium => 20,
        Priority::Low => 0,
    }
}

pub fn orphan_penalty(node: &FrontierNode) -> i32 {
    if node.prerequisites.iter().all(|p| p.trim().is_empty()) {
        ORPHAN_PENALTY
    } else {
        0
    }
}

/// +15 when any significant word of `context` appears in the description.
pub fn context_match_score(node: &FrontierNode, context: &str) -> i32 {
    let description = node.description.to_lowercase();
    if description.is_empty() || context.trim().is_empty() {
        return 0;
    }
    let matched = significant_words(context)
        .iter()
        .any(|word| description.contains(word.as_str()));
    if matched {
        CONTEXT_MATCH_BONUS
    } else {
        0
    }
}

pub fn quick_win_score(node: &FrontierNode) -> i32 {
    match time::parse_duration(&node.estimated_time) {
        Ok(estimate) if !estimate.flexible && estimate.minutes <= QUICK_WIN_MAX_MINUTES => QUICK_WIN_BONUS,
        _ => 0,
    }
}

pub fn score_node(node: &FrontierNode, context: &str) -> ScoreBreakdown {
    ScoreBreakdown {
        path_priority: if node.path_priority { PATH_PRIORITY_BONUS } else { 0 },
        branch: branch_score(node),
        priority: priority_score(node.priority),
        orphan: orphan_penalty(node),
        context: context_match_score(node, context),
        quick_win: quick_win_score(node),
    }
}

/// Minimum energy (1-5) a node's magnitude demands.
pub fn required_energy(magnitude: u8) -> u8 {
    match magnitude {
        m if m > 7 => 4,
        m if m > 5 => 3,
        _ => 2,
    }
}

/// Lowercase words of four or more characters; the whole phrase when none.
pub(crate) fn significant_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<String> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .map(str::to_string)
        .collect();
    if words.is_empty() && !lower.trim().is_empty() {
        vec![lower.trim().to_string()]
    } else {
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(branch: BranchType) -> FrontierNode {
        FrontierNode::new("Task", branch)
            .with_estimated_time("45 minutes")
            .with_prerequisites(["earlier"])
    }

    #[test]
    fn branch_tiers() {
        assert_eq!(branch_tier(&BranchType::InterestDriven), 300);
        assert_eq!(branch_tier(&BranchType::Sampling), 250);
        assert_eq!(branch_tier(&BranchType::Fundamentals), 200);
        assert_eq!(branch_tier(&BranchType::Tools), 150);
        assert_eq!(branch_tier(&BranchType::Practical), 100);
        assert_eq!(branch_tier(&BranchType::Research), 25);
        assert_eq!(branch_tier(&BranchType::Custom("violin".into())), 0);
    }

    #[test]
    fn interest_flag_lifts_tier() {
        let mut n = node(BranchType::Practical);
        n.interest_based = true;
        assert_eq!(branch_score(&n), 300);
    }

    #[test]
    fn orphan_costs_twenty_five() {
        let grounded = node(BranchType::Practical);
        let mut orphan = grounded.clone();
        orphan.prerequisites.clear();
        let diff = score_node(&grounded, "").total() - score_node(&orphan, "").total();
        assert_eq!(diff, 25);
    }

    #[test]
    fn context_matches_description_words() {
        let n = node(BranchType::Practical).with_description("Practice jazz chord voicings");
        assert_eq!(context_match_score(&n, "I want more JAZZ"), 15);
        assert_eq!(context_match_score(&n, "classical"), 0);
        assert_eq!(context_match_score(&n, ""), 0);
    }

    #[test]
    fn quick_win_needs_short_fixed_estimate() {
        assert_eq!(quick_win_score(&node(BranchType::Tools).with_estimated_time("30 minutes")), 5);
        assert_eq!(quick_win_score(&node(BranchType::Tools).with_estimated_time("31 minutes")), 0);
        assert_eq!(quick_win_score(&node(BranchType::Tools).with_estimated_time("flexible")), 0);
    }

    #[test]
    fn full_score_adds_up() {
        let mut n = FrontierNode::new("Improvise", BranchType::InterestDriven)
            .with_priority(Priority::Critical)
            .with_estimated_time("20 minutes")
            .with_description("improvise over blues changes");
        n.path_priority = true;
        let score = score_node(&n, "blues");
        assert_eq!(score.total(), 500 + 300 + 50 - 25 + 15 + 5);
    }

    #[test]
    fn energy_thresholds() {
        assert_eq!(required_energy(8), 4);
        assert_eq!(required_energy(7), 3);
        assert_eq!(required_energy(6), 3);
        assert_eq!(required_energy(5), 2);
        assert_eq!(required_energy(1), 2);
    }
}
