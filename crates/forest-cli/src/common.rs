//! Shared plumbing for CLI commands.

use forest_core::{Config, ForestService, JsonFileStore, ProjectHandle, Report};
use serde::Serialize;
use std::error::Error;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Print JSON payloads instead of summaries
    pub json: bool,
    pub project: Option<String>,
    pub path: Option<String>,
}

impl GlobalOpts {
    /// Explicit `--project`, else `defaults.project` from the config.
    pub fn handle(&self, config: &Config) -> Result<ProjectHandle, Box<dyn Error>> {
        let project_id = self
            .project
            .clone()
            .or_else(|| config.defaults.project.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or("no project selected: pass --project or run `forest project init`")?;

        let handle = ProjectHandle::new(project_id);
        Ok(match &self.path {
            Some(path) => handle.with_path(path.clone()),
            None => handle,
        })
    }
}

pub fn open_service(config: &Config) -> Result<ForestService<JsonFileStore>, Box<dyn Error>> {
    Ok(ForestService::with_config(JsonFileStore::open_default()?, config)?)
}

/// Summary text, or the payload as pretty JSON with `--json`.
pub fn print_report<T: Serialize>(report: &Report<T>, opts: &GlobalOpts) -> Result<(), Box<dyn Error>> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report.payload)?);
    } else {
        println!("{}", report.summary);
    }
    Ok(())
}

/// Parse `SOURCE:CONTENT`; a missing separator leaves the source empty.
pub fn split_feedback(raw: &str) -> (String, String) {
    match raw.split_once(':') {
        Some((source, content)) => (source.trim().to_string(), content.trim().to_string()),
        None => (String::new(), raw.trim().to_string()),
    }
}
