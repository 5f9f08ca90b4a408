use clap::Subcommand;
use labdesk_core::timer::format_duration;
use labdesk_core::Config;
use serde_json::json;

use super::open_engine;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
    /// Time credited to one project
    Project {
        /// Project id
        id: String,
        /// Project name, part of the bucket key
        #[arg(long)]
        name: Option<String>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let engine = open_engine(&config)?;

    match action {
        StatsAction::Today => {
            println!("{}", serde_json::to_string_pretty(engine.daily_stats())?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(engine.all_time_stats())?);
        }
        StatsAction::Project { id, name } => {
            let today = engine.project_time_today(&id, name.as_deref());
            let total = engine.project_time_total(&id, name.as_deref());
            let report = json!({
                "project_id": id,
                "project_name": name,
                "today_secs": today,
                "today": format_duration(today),
                "total_secs": total,
                "total": format_duration(total),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
