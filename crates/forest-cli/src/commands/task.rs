use clap::Subcommand;
use forest_core::{CompletionContext, CompletionReport, Config, ExternalFeedback, SelectionRequest, Sentiment};

use crate::common::{open_service, print_report, split_feedback, GlobalOpts};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Pick the next task
    Next {
        /// Time available ("45 minutes", "1 hour")
        #[arg(long)]
        time: Option<String>,
        /// Energy level 1-5 (defaults to `defaults.energy_level`)
        #[arg(long)]
        energy: Option<u8>,
        /// What you are in the mood for, matched against task descriptions
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Complete a task and evolve the frontier
    Complete {
        /// Task id
        id: String,
        #[arg(long)]
        outcome: String,
        /// 1 (too easy) to 5 (too hard)
        #[arg(long)]
        difficulty: u8,
        #[arg(long, default_value = "")]
        learned: String,
        /// Question to research next
        #[arg(long)]
        question: Option<String>,
        /// Engagement 1-10
        #[arg(long)]
        engagement: Option<u8>,
        /// Unexpected result, repeatable
        #[arg(long = "unexpected")]
        unexpected_results: Vec<String>,
        /// Newly revealed skill, repeatable
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Positive outside feedback as "SOURCE:CONTENT", repeatable
        #[arg(long = "praise")]
        praise: Vec<String>,
        /// Neutral outside feedback as "SOURCE:CONTENT", repeatable
        #[arg(long = "feedback")]
        feedback: Vec<String>,
        /// A shorter path to the goal turned up
        #[arg(long)]
        shorter_path: bool,
    },
    /// List the frontier
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
}

pub fn run(action: TaskAction, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let handle = opts.handle(&config)?;
    let mut service = open_service(&config)?;

    match action {
        TaskAction::Next { time, energy, context } => {
            let request = SelectionRequest {
                time_budget: time,
                energy_level: energy.unwrap_or(config.defaults.energy_level),
                context,
                learning_path: handle.learning_path.clone(),
            };
            let report = service.select_next_task(&handle, &request)?;
            print_report(&report, opts)?;
        }
        TaskAction::Complete {
            id,
            outcome,
            difficulty,
            learned,
            question,
            engagement,
            unexpected_results,
            skills,
            praise,
            feedback,
            shorter_path,
        } => {
            let to_feedback = |raw: &String, sentiment: Sentiment| {
                let (source, content) = split_feedback(raw);
                ExternalFeedback {
                    source,
                    content,
                    sentiment,
                }
            };
            let external_feedback = praise
                .iter()
                .map(|raw| to_feedback(raw, Sentiment::Positive))
                .chain(feedback.iter().map(|raw| to_feedback(raw, Sentiment::Neutral)))
                .collect();

            let report = CompletionReport {
                outcome,
                difficulty_rating: difficulty,
                learned,
                follow_up_question: question,
                context: CompletionContext {
                    engagement_level: engagement,
                    unexpected_results,
                    new_skills_revealed: skills,
                    external_feedback,
                    shorter_path_discovered: shorter_path,
                },
            };
            let report = service.complete_task(&handle, &id, report)?;
            print_report(&report, opts)?;
        }
        TaskAction::List { all } => {
            let state = service.frontier_state(&handle)?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
                return Ok(());
            }
            for node in &state.frontier_nodes {
                let prerequisites = if node.prerequisites.is_empty() {
                    String::new()
                } else {
                    format!("  after: {}", node.prerequisites.join(", "))
                };
                println!(
                    "{}  [{}] {} (magnitude {}, {}){prerequisites}",
                    node.id, node.branch_type, node.title, node.magnitude, node.estimated_time
                );
            }
            if all {
                for done in &state.completed_nodes {
                    println!(
                        "{}  [done {}] {}",
                        done.node.id,
                        done.completed_date.format("%Y-%m-%d"),
                        done.node.title
                    );
                }
            }
        }
    }
    Ok(())
}
