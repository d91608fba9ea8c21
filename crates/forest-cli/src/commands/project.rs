use clap::Subcommand;
use forest_core::{Commitment, Config, LearningPath, ProjectConfig, StateStore};

use crate::common::{open_service, print_report, GlobalOpts};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project and seed its frontier
    Init {
        /// Project id (also the directory name)
        id: String,
        /// What you want to achieve
        #[arg(long)]
        goal: String,
        /// Free-text background (current level, constraints)
        #[arg(long, default_value = "")]
        context: String,
        /// Wake time (defaults to `defaults.wake_time`)
        #[arg(long)]
        wake: Option<String>,
        /// Sleep time (defaults to `defaults.sleep_time`)
        #[arg(long)]
        sleep: Option<String>,
        /// Meal time, repeatable (defaults to `defaults.meal_times`)
        #[arg(long = "meal")]
        meals: Vec<String>,
        /// Fixed commitment as "TITLE@START+MINUTES", repeatable
        #[arg(long = "commitment")]
        commitments: Vec<String>,
        /// Preferred focus block length (defaults to `defaults.focus_duration`)
        #[arg(long)]
        focus_duration: Option<String>,
        /// Interest to build a branch around, repeatable
        #[arg(long = "interest")]
        interests: Vec<String>,
        /// Daily habit, repeatable
        #[arg(long = "habit")]
        habits: Vec<String>,
        /// Learning path to create and activate
        #[arg(long = "learning-path")]
        learning_path: Option<String>,
        /// Do not make this the default project
        #[arg(long)]
        no_default: bool,
    },
    /// Show the project configuration
    Show,
    /// List stored projects
    List,
}

pub fn run(action: ProjectAction, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    match action {
        ProjectAction::Init {
            id,
            goal,
            context,
            wake,
            sleep,
            meals,
            commitments,
            focus_duration,
            interests,
            habits,
            learning_path,
            no_default,
        } => {
            let defaults = &config.defaults;
            let mut project = ProjectConfig::new(id.clone(), goal)
                .with_window(
                    wake.unwrap_or_else(|| defaults.wake_time.clone()),
                    sleep.unwrap_or_else(|| defaults.sleep_time.clone()),
                )
                .with_meals(if meals.is_empty() {
                    defaults.meal_times.clone()
                } else {
                    meals
                });
            project.context = context;
            project.focus_duration = focus_duration.unwrap_or_else(|| defaults.focus_duration.clone());
            project.commitments = commitments
                .iter()
                .map(|raw| parse_commitment(raw))
                .collect::<Result<_, _>>()?;
            project.interests = interests;
            project.habits = habits;
            if let Some(name) = learning_path {
                project.learning_paths.push(LearningPath {
                    name: name.clone(),
                    interests: Vec::new(),
                });
                project.active_path = Some(name);
            }

            let mut service = open_service(&config)?;
            let report = service.create_project(project)?;
            if !no_default {
                config.defaults.project = Some(id);
                config.save()?;
            }
            print_report(&report, opts)?;
        }
        ProjectAction::Show => {
            let handle = opts.handle(&config)?;
            let service = open_service(&config)?;
            let project = service.project(&handle.project_id)?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                println!("{} - {}", project.id, project.goal);
                println!(
                    "Window: {} to {}",
                    project.wake_time.as_deref().unwrap_or("(unset)"),
                    project.sleep_time.as_deref().unwrap_or("(unset)")
                );
                println!("Meals: {}", project.meal_times.join(", "));
                for commitment in &project.commitments {
                    println!(
                        "Commitment: {} at {} for {} min",
                        commitment.title, commitment.start, commitment.duration_minutes
                    );
                }
                println!("Focus: {}", project.focus_duration);
                if !project.interests.is_empty() {
                    println!("Interests: {}", project.interests.join(", "));
                }
                if !project.habits.is_empty() {
                    println!("Habits: {}", project.habits.join(", "));
                }
                if let Some(path) = &project.active_path {
                    println!("Active path: {path}");
                }
            }
        }
        ProjectAction::List => {
            let service = open_service(&config)?;
            let ids = service.store().list_projects()?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                let current = config.defaults.project.as_deref();
                for id in ids {
                    let marker = if current == Some(id.as_str()) { "*" } else { " " };
                    println!("{marker} {id}");
                }
            }
        }
    }
    Ok(())
}

/// "Work@9:00 AM+480" -> Commitment { title: "Work", start: "9:00 AM", 480 }
fn parse_commitment(raw: &str) -> Result<Commitment, String> {
    let (title, rest) = raw
        .split_once('@')
        .ok_or_else(|| format!("commitment '{raw}' must look like TITLE@START+MINUTES"))?;
    let (start, minutes) = rest
        .rsplit_once('+')
        .ok_or_else(|| format!("commitment '{raw}' is missing +MINUTES"))?;
    let duration_minutes = minutes
        .trim()
        .parse()
        .map_err(|_| format!("commitment '{raw}' has an invalid duration"))?;
    Ok(Commitment {
        title: title.trim().to_string(),
        start: start.trim().to_string(),
        duration_minutes,
    })
}
