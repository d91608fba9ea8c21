use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod common;

use common::GlobalOpts;

#[derive(Parser)]
#[command(name = "forest", version, about = "Forest learning planner CLI")]
struct Cli {
    /// Print the structured payload as JSON instead of the summary
    #[arg(long, global = true)]
    json: bool,

    /// Project id (defaults to `defaults.project` in the config)
    #[arg(long, short = 'p', global = true)]
    project: Option<String>,

    /// Learning path within the project
    #[arg(long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project management
    Project {
        #[command(subcommand)]
        action: commands::project::ProjectAction,
    },
    /// Daily schedules
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Task selection and completion
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Drop dangling prerequisites; rebuild the frontier if empty or forced
    Repair {
        /// Regenerate the frontier from scratch
        #[arg(long)]
        force: bool,
    },
    /// Frontier progress for the project
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let opts = GlobalOpts {
        json: cli.json,
        project: cli.project,
        path: cli.path,
    };
    let result = match cli.command {
        Commands::Project { action } => commands::project::run(action, &opts),
        Commands::Schedule { action } => commands::schedule::run(action, &opts),
        Commands::Task { action } => commands::task::run(action, &opts),
        Commands::Repair { force } => commands::repair::run(force, &opts),
        Commands::Status => commands::status::run(&opts),
        Commands::Config { action } => commands::config::run(action, &opts),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
