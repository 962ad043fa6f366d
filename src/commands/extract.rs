use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use coach_core::{ScanReport, scan};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui::pluralize;

/// Read schedule text from a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read schedule from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn render_report(report: &ScanReport) -> Vec<String> {
    let mut lines: Vec<String> = report.events.iter().map(|e| e.render()).collect();

    if report.events.is_empty() {
        lines.push("No events found".dimmed().to_string());
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} {} skipped:",
            report.failures.len(),
            pluralize("line", report.failures.len())
        ));
        lines.extend(report.failures.iter().map(|f| format!("   {}", f.render())));
    }

    lines
}

pub fn run(path: &Path) -> Result<()> {
    let text = read_input(path)?;
    let report = scan(&text);

    for line in render_report(&report) {
        println!("{}", line);
    }

    Ok(())
}
