use chrono::{Local, NaiveDate};
use clap::Subcommand;
use forest_core::{BlockCompletion, Config, FocusType};

use crate::common::{open_service, print_report, GlobalOpts};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Generate the schedule for a day
    Generate {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Energy level 1-5 (defaults to `defaults.energy_level`)
        #[arg(long)]
        energy: Option<u8>,
        /// deep, balanced or light
        #[arg(long, default_value = "balanced")]
        focus: String,
    },
    /// Show a stored schedule
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record completion feedback on a block
    Complete {
        /// Block id
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        outcome: String,
        #[arg(long, default_value = "")]
        learned: String,
        #[arg(long, default_value = "")]
        next_questions: String,
        /// Energy afterwards, 1-5
        #[arg(long)]
        energy_after: u8,
        /// 1 (too easy) to 5 (too hard)
        #[arg(long)]
        difficulty: u8,
        #[arg(long)]
        breakthrough: bool,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn run(action: ScheduleAction, opts: &GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let handle = opts.handle(&config)?;
    let mut service = open_service(&config)?;

    match action {
        ScheduleAction::Generate { date, energy, focus } => {
            let focus_type: FocusType = focus.parse()?;
            let energy = energy.unwrap_or(config.defaults.energy_level);
            let report = service.synthesize_schedule(&handle, date.unwrap_or_else(today), energy, focus_type)?;
            print_report(&report, opts)?;
        }
        ScheduleAction::Show { date } => {
            let report = service.schedule(&handle, date.unwrap_or_else(today))?;
            print_report(&report, opts)?;
        }
        ScheduleAction::Complete {
            id,
            date,
            outcome,
            learned,
            next_questions,
            energy_after,
            difficulty,
            breakthrough,
        } => {
            let completion = BlockCompletion {
                outcome,
                learned,
                next_questions,
                energy_after,
                difficulty_rating: difficulty,
                breakthrough,
            };
            let report = service.complete_block(&handle, date.unwrap_or_else(today), &id, completion)?;
            print_report(&report, opts)?;
        }
    }
    Ok(())
}
