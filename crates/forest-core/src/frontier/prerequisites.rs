//! Prerequisite satisfaction.
//!
//! Producers have written node ids, node titles, and free-text topic names
//! into `prerequisites`, so an entry is met by any of the three, checked in
//! that order. Dropping a tier leaves older data permanently blocked.

use std::collections::HashSet;

use super::{FrontierNode, FrontierState};
use crate::project::LearningHistory;

/// Which lookup satisfied a prerequisite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerequisiteMatch {
    CompletedId,
    CompletedTitle,
    CompletedTopic,
}

/// Lookup sets built once per selection.
#[derive(Debug, Clone, Default)]
pub struct CompletionIndex {
    ids: HashSet<String>,
    titles: HashSet<String>,
    topics: HashSet<String>,
}

impl CompletionIndex {
    pub fn new<I, T, P>(ids: I, titles: T, topics: P) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            titles: titles.into_iter().map(Into::into).collect(),
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Index the completed nodes of `state` plus the topic log.
    pub fn from_state(state: &FrontierState, history: &LearningHistory) -> Self {
        Self::new(
            state.completed_nodes.iter().map(|c| c.node.id.clone()),
            state.completed_nodes.iter().map(|c| c.node.title.clone()),
            history.completed_topics.iter().map(|t| t.topic.clone()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.titles.is_empty() && self.topics.is_empty()
    }

    /// Resolve a single prerequisite entry.
    pub fn lookup(&self, prerequisite: &str) -> Option<PrerequisiteMatch> {
        if self.ids.contains(prerequisite) {
            Some(PrerequisiteMatch::CompletedId)
        } else if self.titles.contains(prerequisite) {
            Some(PrerequisiteMatch::CompletedTitle)
        } else if self.topics.contains(prerequisite) {
            Some(PrerequisiteMatch::CompletedTopic)
        } else {
            None
        }
    }

    /// All prerequisites of `node` are met. Nodes without any are always met.
    pub fn is_satisfied(&self, node: &FrontierNode) -> bool {
        node.prerequisites.iter().all(|p| self.lookup(p).is_some())
    }

    /// Prerequisites of `node` not yet met, in declared order.
    pub fn unmet<'a>(&self, node: &'a FrontierNode) -> Vec<&'a str> {
        node.prerequisites
            .iter()
            .filter(|p| self.lookup(p).is_none())
            .map(String::as_str)
            .collect()
    }
}
