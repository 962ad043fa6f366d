//! Colored terminal rendering for coach types.

use coach_core::Calendar;
use coach_core::ExtractedEvent;
use coach_core::ScheduleRun;
use coach_core::orchestrator::FailedCreation;
use coach_core::scanner::ScanFailure;
use owo_colors::OwoColorize;

use crate::utils::tui::pluralize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Calendar {
    fn render(&self) -> String {
        let mut line = format!("📅 {}", self.summary);
        if self.summary != self.id {
            line.push_str(&format!(" {}", self.id.dimmed()));
        }
        if self.primary {
            line.push_str(&format!(" {}", "(primary)".green()));
        }
        line
    }
}

impl Render for ExtractedEvent {
    fn render(&self) -> String {
        let time = format!(
            "{} {}-{}",
            self.date,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        );
        let mut lines = vec![format!("{} {} {}", "+".green(), self.title.green(), time.dimmed())];
        if let Some(description) = &self.description {
            lines.push(format!("    {}", description.dimmed()));
        }
        if let Some(location) = &self.location {
            lines.push(format!("    @ {}", location.dimmed()));
        }
        lines.join("\n")
    }
}

impl Render for ScanFailure {
    fn render(&self) -> String {
        format!(
            "{} line {}: {} {}",
            "!".yellow(),
            self.line,
            self.kind.to_string().yellow(),
            self.text.trim().dimmed()
        )
    }
}

impl Render for FailedCreation {
    fn render(&self) -> String {
        format!(
            "{} {} {} {}",
            "✗".red(),
            self.title.red(),
            self.start.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            self.error.red()
        )
    }
}

impl Render for ScheduleRun {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Deleted {} {}, created {} {}",
            self.deleted,
            pluralize("event", self.deleted),
            self.created,
            pluralize("event", self.created)
        )];

        for failed in &self.failed {
            lines.push(format!("   {}", failed.render()));
        }
        if !self.scan_failures.is_empty() {
            lines.push(format!(
                "{} {} could not be read:",
                self.scan_failures.len(),
                pluralize("line", self.scan_failures.len())
            ));
            for failure in &self.scan_failures {
                lines.push(format!("   {}", failure.render()));
            }
        }
        lines.join("\n")
    }
}
