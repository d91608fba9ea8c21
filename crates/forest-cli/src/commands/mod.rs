pub mod config;
pub mod project;
pub mod repair;
pub mod schedule;
pub mod status;
pub mod task;
