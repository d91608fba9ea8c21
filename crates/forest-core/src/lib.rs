//! # Forest Core Library
//!
//! Planning logic for a single user's learning goals: a hierarchical task
//! frontier (HTA), day schedules generated from a wake/sleep window, and
//! frontier evolution driven by completion feedback. The `forest` CLI is a
//! thin layer over [`ForestService`].
//!
//! ## Architecture
//!
//! - **Time**: time-of-day and free-text duration parsing
//! - **Frontier**: HTA nodes, branches and the prerequisite index
//! - **Schedule**: gap-free daily schedules from the frontier
//! - **Sequence**: next-task selection and frontier evolution
//! - **Storage**: load/save interface, JSON file store, TOML configuration
//!
//! ## Key Components
//!
//! - [`ScheduleSynthesizer`]: builds a [`DailySchedule`] covering the window
//! - [`SequenceEngine`]: selects tasks and applies completions
//! - [`OpportunityDetector`]: emergent opportunity nodes and invalidation
//! - [`StateStore`]: persistence seam used by [`ForestService`]

pub mod error;
pub mod frontier;
pub mod project;
pub mod schedule;
pub mod sequence;
pub mod service;
pub mod storage;
pub mod time;

pub use error::{ConfigError, CoreError, EntityKind, InputError, PersistenceError, Result};
pub use frontier::{
    Branch, BranchType, CompletedNode, CompletionIndex, FrontierNode, FrontierState, NodeStatus, Priority,
};
pub use project::{Commitment, LearningHistory, LearningPath, ProjectConfig, ProjectHandle};
pub use schedule::{
    BlockCompletion, BlockType, DailySchedule, FocusType, ScheduleRequest, ScheduleSynthesizer, SynthesizerConfig,
    TimeBlock,
};
pub use sequence::{
    CompletionContext, CompletionReport, ExternalFeedback, FrontierDelta, NextTask, OpportunityDetector,
    RepairReport, Selection, SelectionRequest, SequenceEngine, Sentiment,
};
pub use service::{ForestService, ProjectStatus, Report};
pub use storage::{Config, JsonFileStore, MemoryStore, StateStore};
pub use time::{Minutes, TimeParseError};
