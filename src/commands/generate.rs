use anyhow::Result;
use coach_core::{DateRange, Orchestrator};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(orchestrator: &Orchestrator, range: DateRange) -> Result<()> {
    let spinner = tui::create_spinner(format!(
        "Planning {} to {} into {}",
        range.start,
        range.end,
        orchestrator.config().target_calendar
    ));
    let result = orchestrator.generate_schedule(range).await;
    spinner.finish_and_clear();

    let run = result?;

    println!("{}", run.schedule);
    println!();
    println!("{}", run.render());

    if !run.failed.is_empty() {
        println!(
            "\n{}",
            format!("{} event(s) could not be created", run.failed.len()).red()
        );
    }

    Ok(())
}
