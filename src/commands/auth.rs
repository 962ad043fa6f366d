use anyhow::Result;
use coach_core::CalendarService;
use coach_provider_google::GoogleCalendar;

use crate::render::Render;

pub async fn run() -> Result<()> {
    println!("Authenticating with Google Calendar...");

    let account = coach_provider_google::authenticate().await?;

    println!("Authenticated as: {}\n", account);
    println!("Fetching calendars...");

    let calendars = GoogleCalendar::connect()?.list_calendars().await?;

    if calendars.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    println!("Found {} calendar(s):\n", calendars.len());
    for calendar in &calendars {
        println!("  {}", calendar.render());
    }

    println!("\nRun `coach generate` to plan next week.");

    Ok(())
}
