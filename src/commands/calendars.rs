use anyhow::Result;
use coach_core::CalendarService;
use coach_provider_google::GoogleCalendar;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let google = GoogleCalendar::connect()?;

    let spinner = tui::create_spinner("Fetching calendars");
    let result = google.refresh_calendars().await;
    spinner.finish_and_clear();

    let calendars = result?;
    if calendars.is_empty() {
        println!("{}", "No calendars found".dimmed());
        return Ok(());
    }

    for calendar in &calendars {
        println!("{}", calendar.render());
    }

    Ok(())
}
