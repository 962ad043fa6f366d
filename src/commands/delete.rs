use anyhow::Result;
use coach_core::{CalendarEvent, Confirmation, DateRange, Orchestrator};
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::utils::tui::pluralize;

fn confirm_delete(events: &[CalendarEvent]) -> bool {
    for event in events {
        println!(
            "   {} {} {}",
            "-".red(),
            event.summary.red(),
            event.start.wall_clock().format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    println!();

    Confirm::new()
        .with_prompt(format!(
            "Delete {} {}?",
            events.len(),
            pluralize("event", events.len())
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub async fn run(
    orchestrator: &Orchestrator,
    range: DateRange,
    prefix: Option<&str>,
    yes: bool,
) -> Result<()> {
    let confirmation = if yes {
        Confirmation::Skip
    } else {
        Confirmation::Ask(&confirm_delete)
    };

    let deleted = orchestrator.delete_schedule(range, prefix, confirmation).await?;

    if deleted == 0 {
        println!("{}", "Nothing deleted".dimmed());
    } else {
        println!(
            "Deleted {} {} from {} ({} to {})",
            deleted,
            pluralize("event", deleted),
            orchestrator.config().target_calendar,
            range.start,
            range.end
        );
    }

    Ok(())
}
