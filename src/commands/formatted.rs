use anyhow::Result;
use coach_core::{DateRange, Orchestrator};

use crate::utils::tui;

pub async fn run(orchestrator: &Orchestrator, range: DateRange) -> Result<()> {
    let spinner = tui::create_spinner(format!("Reading events {} to {}", range.start, range.end));
    let result = orchestrator.formatted_schedule(range).await;
    spinner.finish_and_clear();

    println!("{}", result?);

    Ok(())
}
