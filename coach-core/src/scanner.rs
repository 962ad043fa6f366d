//! Extraction of planned events from generated schedule text.
//!
//! The schedule text is line oriented:
//!
//! ```text
//! **LUNES 2025-04-14**
//! * **07:00 - 08:00**: [PLAN] Trote suave
//!   * Descripción: 30 minutos en zona 2
//!   * Ubicación: Parque
//! * **09:00 - 18:00**: Trabajo
//! ```
//!
//! A day header (a `YYYY-MM-DD` token on a line with a bold marker) sets the
//! current date. Only bulleted entries tagged `[PLAN]` under a day header
//! become events; everything else is prose and is skipped.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::event::{EventTime, NewEvent};

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid date regex"));

static PLAN_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[*-]\s*\*\*\s*(\d{1,2}:\d{2})\s*[-–]\s*(\d{1,2}:\d{2})\s*\*\*\s*:\s*\[PLAN\]\s*(.*)$",
    )
    .expect("valid plan entry regex")
});

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*-]\s").expect("valid bullet regex"));

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[*-]\s+(?:descripci[oó]n|description)\s*:\s*(.*)$")
        .expect("valid description regex")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[*-]\s+(?:ubicaci[oó]n|location)\s*:\s*(.*)$")
        .expect("valid location regex")
});

const BOLD_MARKER: &str = "**";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// An event read from a `[PLAN]` entry. Times are local wall-clock times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedEvent {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl ExtractedEvent {
    /// Build the calendar event to create, attaching `tz` to both timestamps
    /// when a zone is known. Without a zone the times stay floating.
    ///
    /// Wall-clock times are kept as written, including ones that fall in a
    /// DST gap; resolving them to an instant is up to the calendar backend.
    pub fn to_new_event(&self, tz: Option<Tz>) -> NewEvent {
        let (start, end) = match tz {
            Some(tz) => (zoned(self.start, tz), zoned(self.end, tz)),
            None => (
                EventTime::DateTimeFloating(self.start),
                EventTime::DateTimeFloating(self.end),
            ),
        };

        NewEvent {
            summary: self.title.clone(),
            start,
            end,
            description: self.description.clone(),
            location: self.location.clone(),
        }
    }
}

fn zoned(datetime: NaiveDateTime, tz: Tz) -> EventTime {
    EventTime::DateTimeZoned {
        datetime,
        tzid: tz.name().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ScanFailureKind {
    #[error("invalid date '{0}' in day header")]
    InvalidDate(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("end {end} is not after start {start}")]
    EmptyRange { start: String, end: String },
}

/// A line that looked like a day header or plan entry but could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub kind: ScanFailureKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub events: Vec<ExtractedEvent>,
    pub failures: Vec<ScanFailure>,
}

/// Cursor carried from line to line. Only day headers change it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub current_date: Option<NaiveDate>,
}

type LineOutcome = Option<Result<ExtractedEvent, ScanFailure>>;

/// Extract every well-formed `[PLAN]` entry. Never fails; malformed entries
/// are logged and skipped.
pub fn extract_events(text: &str) -> Vec<ExtractedEvent> {
    scan(text).events
}

/// Single pass over `text`, returning the extracted events together with
/// the lines that had to be skipped.
pub fn scan(text: &str) -> ScanReport {
    let lines: Vec<&str> = text.lines().collect();
    debug!(lines = lines.len(), "Scanning schedule text");

    let (_, report) = (0..lines.len()).fold(
        (ScanState::default(), ScanReport::default()),
        |(state, mut report), index| {
            let (state, outcome) = step(state, &lines, index);
            match outcome {
                Some(Ok(event)) => report.events.push(event),
                Some(Err(failure)) => {
                    warn!(line = failure.line, text = %failure.text, "{}", failure.kind);
                    report.failures.push(failure);
                }
                None => {}
            }
            (state, report)
        },
    );

    info!(
        events = report.events.len(),
        failures = report.failures.len(),
        "Schedule scan complete"
    );
    report
}

/// Process line `index`: returns the next cursor and at most one outcome.
fn step(state: ScanState, lines: &[&str], index: usize) -> (ScanState, LineOutcome) {
    let line = lines[index].trim();
    let failure = |kind| ScanFailure {
        line: index + 1,
        text: line.to_string(),
        kind,
    };

    if let Some(token) = day_header_token(line) {
        return match NaiveDate::parse_from_str(token, DATE_FORMAT) {
            Ok(date) => {
                if state.current_date != Some(date) {
                    info!(%date, "New day in schedule");
                }
                (
                    ScanState {
                        current_date: Some(date),
                    },
                    None,
                )
            }
            Err(_) => (
                ScanState { current_date: None },
                Some(Err(failure(ScanFailureKind::InvalidDate(token.to_string())))),
            ),
        };
    }

    let Some(date) = state.current_date else {
        debug!(line = index + 1, "Skipping line before first day header");
        return (state, None);
    };

    let Some(captures) = PLAN_ENTRY.captures(line) else {
        return (state, None);
    };

    let start_text = &captures[1];
    let end_text = &captures[2];
    let title = captures[3].trim().to_string();
    info!(%date, start = start_text, end = end_text, %title, "Plan entry found");

    let (description, location) = collect_details(&lines[index + 1..]);

    let outcome = combine(date, start_text)
        .and_then(|start| combine(date, end_text).map(|end| (start, end)))
        .and_then(|(start, end)| {
            if start < end {
                Ok((start, end))
            } else {
                Err(ScanFailureKind::EmptyRange {
                    start: start_text.to_string(),
                    end: end_text.to_string(),
                })
            }
        })
        .map(|(start, end)| ExtractedEvent {
            date,
            start,
            end,
            title,
            description,
            location,
        })
        .map_err(failure);

    (state, Some(outcome))
}

fn day_header_token(line: &str) -> Option<&str> {
    if !line.contains(BOLD_MARKER) {
        return None;
    }
    DATE_TOKEN.find(line).map(|m| m.as_str())
}

fn combine(date: NaiveDate, time: &str) -> Result<NaiveDateTime, ScanFailureKind> {
    NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map(|t| date.and_time(t))
        .map_err(|_| ScanFailureKind::InvalidTime(time.to_string()))
}

/// Look at the bulleted lines right after a plan entry for its description
/// and location. The first of each wins. Stops at the first line that is not
/// a bullet, at a day header, or at the next plan entry.
fn collect_details(following: &[&str]) -> (Option<String>, Option<String>) {
    let mut description = None;
    let mut location = None;

    for raw in following {
        let line = raw.trim();
        if !BULLET.is_match(line) || day_header_token(line).is_some() || PLAN_ENTRY.is_match(line)
        {
            break;
        }

        if description.is_none() {
            if let Some(c) = DESCRIPTION.captures(line) {
                debug!(description = c[1].trim(), "Description found");
                description = Some(c[1].trim().to_string());
                continue;
            }
        }
        if location.is_none() {
            if let Some(c) = LOCATION.captures(line) {
                debug!(location = c[1].trim(), "Location found");
                location = Some(c[1].trim().to_string());
            }
        }
    }

    (description, location)
}
