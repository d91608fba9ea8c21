//! Daily schedule types.
//!
//! A [`DailySchedule`] is an ordered list of [`TimeBlock`]s that tiles the
//! wake window with no gaps and no overlaps. Blocks carry absolute start
//! minutes, so a window running past midnight stays monotonic.

pub mod synthesizer;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, EntityKind, InputError, Result};
use crate::time::{format_time, Minutes};

pub use synthesizer::{ScheduleRequest, ScheduleSynthesizer, SynthesizerConfig};

/// Type of schedule block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Frontier task
    Learning,
    /// Daily habit
    Habit,
    /// Fixed meal
    Meal,
    /// Short rest filler
    Break,
    /// Buffer filler between activities
    Transition,
    /// Fixed non-meal commitment
    LifeStructure,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Learning => "learning",
            BlockType::Habit => "habit",
            BlockType::Meal => "meal",
            BlockType::Break => "break",
            BlockType::Transition => "transition",
            BlockType::LifeStructure => "life_structure",
        }
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, BlockType::Break | BlockType::Transition)
    }
}

/// How the day's focus blocks should be sized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FocusType {
    /// Long uninterrupted blocks
    Deep,
    /// The project's configured focus duration
    #[default]
    Balanced,
    /// Short blocks
    Light,
}

impl FromStr for FocusType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deep" => Ok(FocusType::Deep),
            "balanced" | "mixed" | "" => Ok(FocusType::Balanced),
            "light" | "shallow" => Ok(FocusType::Light),
            other => Err(InputError::InvalidValue {
                field: "focus_type".into(),
                message: format!("expected deep, balanced or light, got '{other}'"),
            }
            .into()),
        }
    }
}

impl fmt::Display for FocusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FocusType::Deep => "deep",
            FocusType::Balanced => "balanced",
            FocusType::Light => "light",
        })
    }
}

/// User feedback attached when a block is marked done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockCompletion {
    pub outcome: String,
    #[serde(default)]
    pub learned: String,
    #[serde(default)]
    pub next_questions: String,
    /// Energy after the block, 1-5
    pub energy_after: u8,
    /// 1 (too easy) to 5 (too hard)
    pub difficulty_rating: u8,
    #[serde(default)]
    pub breakthrough: bool,
}

/// A scheduled time block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Frontier node id for learning/habit blocks, fresh otherwise
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Absolute start minute (may exceed 1440 past midnight)
    pub start_minute: Minutes,
    /// Display start ("8:30 AM")
    pub time: String,
    pub duration_minutes: Minutes,
    /// Display duration; the node's own estimate for learning blocks
    pub duration: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learning_outcomes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<u8>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_questions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_after: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakthrough: Option<bool>,
}

impl TimeBlock {
    /// Create a block with a fresh id.
    pub fn new(
        block_type: BlockType,
        title: impl Into<String>,
        start_minute: Minutes,
        duration_minutes: Minutes,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            block_type,
            start_minute,
            time: format_time(i64::from(start_minute)),
            duration_minutes,
            duration: format!("{duration_minutes} minutes"),
            title: title.into(),
            description: String::new(),
            strategic_purpose: None,
            learning_outcomes: Vec::new(),
            magnitude: None,
            completed: None,
            outcome: None,
            learned: None,
            next_questions: None,
            energy_after: None,
            difficulty_rating: None,
            breakthrough: None,
        }
    }

    pub fn end_minute(&self) -> Minutes {
        self.start_minute + self.duration_minutes
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }
}

/// A gap or overlap between consecutive blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageIssue {
    /// Minutes [from, to) are not covered
    Gap { from: Minutes, to: Minutes },
    /// Block at `index` starts before the previous one ends
    Overlap { index: usize, previous_end: Minutes, start: Minutes },
}

/// One calendar day's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub wake_minute: Minutes,
    /// Absolute window end; greater than 1440 when sleep is past midnight
    pub end_minute: Minutes,
    pub energy_level: u8,
    #[serde(default)]
    pub focus_type: FocusType,
    pub blocks: Vec<TimeBlock>,
    pub total_blocks: usize,
    pub completed: usize,
    /// Ready nodes that did not fit today
    #[serde(default)]
    pub unscheduled: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DailySchedule {
    pub fn window_minutes(&self) -> Minutes {
        self.end_minute - self.wake_minute
    }

    pub fn refresh_counts(&mut self) {
        self.total_blocks = self.blocks.len();
        self.completed = self.blocks.iter().filter(|b| b.is_completed()).count();
    }

    pub fn blocks_of_type(&self, block_type: BlockType) -> impl Iterator<Item = &TimeBlock> {
        self.blocks.iter().filter(move |b| b.block_type == block_type)
    }

    pub fn find_block(&self, id: &str) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Record completion feedback on a block.
    ///
    /// # Errors
    /// `NotFound` when no block has `id`; `InputError` for ratings outside 1-5.
    pub fn complete_block(&mut self, id: &str, completion: BlockCompletion) -> Result<&TimeBlock> {
        if !(1..=5).contains(&completion.difficulty_rating) {
            return Err(InputError::DifficultyOutOfRange(completion.difficulty_rating).into());
        }
        let index = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Block, id))?;

        let block = &mut self.blocks[index];
        block.completed = Some(Utc::now());
        block.outcome = Some(completion.outcome);
        block.learned = Some(completion.learned);
        block.next_questions = Some(completion.next_questions);
        block.energy_after = Some(completion.energy_after);
        block.difficulty_rating = Some(completion.difficulty_rating);
        block.breakthrough = Some(completion.breakthrough);

        self.refresh_counts();
        Ok(&self.blocks[index])
    }

    /// Check that blocks tile [wake, end) exactly. Returns every issue found.
    pub fn coverage_issues(&self) -> Vec<CoverageIssue> {
        let mut sorted: Vec<&TimeBlock> = self.blocks.iter().collect();
        sorted.sort_by_key(|b| b.start_minute);

        let mut issues = Vec::new();
        let mut cursor = self.wake_minute;
        for (index, block) in sorted.iter().enumerate() {
            if block.start_minute > cursor {
                issues.push(CoverageIssue::Gap {
                    from: cursor,
                    to: block.start_minute,
                });
            } else if block.start_minute < cursor {
                issues.push(CoverageIssue::Overlap {
                    index,
                    previous_end: cursor,
                    start: block.start_minute,
                });
            }
            cursor = cursor.max(block.end_minute());
        }
        if cursor < self.end_minute {
            issues.push(CoverageIssue::Gap {
                from: cursor,
                to: self.end_minute,
            });
        }
        issues
    }
}
