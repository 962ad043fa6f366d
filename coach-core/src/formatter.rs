//! Human-readable rendering of a week of calendar events.
//!
//! The output uses the same line grammar the scanner reads: bold day headers
//! carrying the date, bulleted entries with a bold time range, and indented
//! detail bullets.
//!
//! The source calendar is written as a `Calendario:` detail bullet, not as a
//! `[Calendar]` tag on the entry line. The scanner only reads an entry when
//! `[PLAN]` directly follows the time range, so an inline tag would hide every
//! plan entry already in the calendar.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::event::CalendarEvent;
use crate::week::DateRange;

const WEEKDAYS: [&str; 7] = [
    "LUNES",
    "MARTES",
    "MIÉRCOLES",
    "JUEVES",
    "VIERNES",
    "SÁBADO",
    "DOMINGO",
];

const NO_EVENTS: &str = "Sin eventos.";
const ALL_DAY: &str = "Todo el día";
const UNTITLED: &str = "Sin título";
const UNKNOWN_CALENDAR: &str = "Desconocido";

/// Group events by the local date they start on, each day sorted by start.
pub fn group_by_day(
    events: impl IntoIterator<Item = CalendarEvent>,
) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        by_day.entry(event.start.date()).or_default().push(event);
    }
    for day in by_day.values_mut() {
        day.sort_by_key(|e| e.start.wall_clock());
    }
    by_day
}

/// Render one block per day in `range`, including days without events.
pub fn format_schedule(
    events_by_day: &BTreeMap<NaiveDate, Vec<CalendarEvent>>,
    range: DateRange,
) -> String {
    let mut lines = vec![
        format!(
            "Eventos de la semana del {} al {}:",
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d")
        ),
        String::new(),
    ];

    for day in range.days() {
        let weekday = WEEKDAYS[day.weekday().num_days_from_monday() as usize];
        lines.push(format!("**{} {}**", weekday, day.format("%Y-%m-%d")));

        match events_by_day.get(&day) {
            Some(events) if !events.is_empty() => {
                for event in events {
                    lines.extend(format_event(event));
                }
            }
            _ => lines.push(NO_EVENTS.to_string()),
        }

        lines.push(String::new());
    }

    lines.join("\n")
}

fn format_event(event: &CalendarEvent) -> Vec<String> {
    let when = if event.start.is_all_day() {
        ALL_DAY.to_string()
    } else {
        format!(
            "{} - {}",
            event.start.wall_clock().format("%H:%M"),
            event.end.wall_clock().format("%H:%M")
        )
    };

    let title = if event.summary.trim().is_empty() {
        UNTITLED
    } else {
        event.summary.trim()
    };

    let mut lines = vec![
        format!("* **{}**: {}", when, title),
        format!(
            "  * Calendario: {}",
            event.calendar_summary.as_deref().unwrap_or(UNKNOWN_CALENDAR)
        ),
    ];

    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        let flattened = description.replace('\r', "").replace('\n', " ");
        lines.push(format!("  * Descripción: {}", flattened));
    }
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("  * Ubicación: {}", location));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use crate::scanner::extract_events;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn timed(day: u32, from: (u32, u32), to: (u32, u32), summary: &str) -> CalendarEvent {
        CalendarEvent {
            id: format!("{}-{}", day, summary),
            summary: summary.to_string(),
            description: None,
            location: None,
            start: EventTime::DateTimeFloating(date(day).and_hms_opt(from.0, from.1, 0).unwrap()),
            end: EventTime::DateTimeFloating(date(day).and_hms_opt(to.0, to.1, 0).unwrap()),
            calendar_summary: Some("Coach".to_string()),
            self_response_status: None,
        }
    }

    #[test]
    fn test_every_day_in_range_gets_a_header() {
        let text = format_schedule(&BTreeMap::new(), DateRange::new(date(14), date(20)));

        assert!(text.starts_with("Eventos de la semana del 2025-04-14 al 2025-04-20:"));
        assert!(text.contains("**LUNES 2025-04-14**"));
        assert!(text.contains("**DOMINGO 2025-04-20**"));
        assert_eq!(text.matches(NO_EVENTS).count(), 7);
    }

    #[test]
    fn test_event_lines() {
        let mut event = timed(14, (9, 0), (10, 30), "Reunión");
        event.description = Some("Punto 1\r\nPunto 2".to_string());
        event.location = Some("Oficina".to_string());
        let by_day = group_by_day(vec![event]);

        let text = format_schedule(&by_day, DateRange::new(date(14), date(14)));

        assert!(text.contains("* **09:00 - 10:30**: Reunión"));
        assert!(text.contains("  * Calendario: Coach"));
        assert!(text.contains("  * Descripción: Punto 1 Punto 2"));
        assert!(text.contains("  * Ubicación: Oficina"));
        assert!(!text.contains(NO_EVENTS));
    }

    #[test]
    fn test_all_day_and_untitled() {
        let event = CalendarEvent {
            id: "x".into(),
            summary: String::new(),
            description: None,
            location: None,
            start: EventTime::Date(date(15)),
            end: EventTime::Date(date(16)),
            calendar_summary: None,
            self_response_status: None,
        };
        let text = format_schedule(&group_by_day(vec![event]), DateRange::new(date(15), date(15)));

        assert!(text.contains("* **Todo el día**: Sin título"));
        assert!(text.contains("  * Calendario: Desconocido"));
    }

    #[test]
    fn test_group_by_day_sorts_by_start() {
        let by_day = group_by_day(vec![
            timed(14, (18, 0), (19, 0), "Tarde"),
            timed(15, (8, 0), (9, 0), "Martes"),
            timed(14, (7, 0), (8, 0), "Mañana"),
        ]);

        let monday: Vec<&str> = by_day[&date(14)].iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(monday, vec!["Mañana", "Tarde"]);
        assert_eq!(by_day[&date(15)].len(), 1);
    }

    #[test]
    fn test_scanner_reads_back_plan_tagged_entries() {
        let mut run = timed(14, (7, 0), (8, 0), "[PLAN] Trote suave");
        run.description = Some("Zona 2".to_string());
        let fixtures = vec![
            run,
            timed(14, (9, 0), (18, 0), "Trabajo"),
            timed(16, (19, 30), (20, 15), "[PLAN] Meditación"),
        ];

        let text = format_schedule(&group_by_day(fixtures), DateRange::new(date(14), date(20)));
        let events = extract_events(&text);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Trote suave");
        assert_eq!(events[0].date, date(14));
        assert_eq!(events[0].start, date(14).and_hms_opt(7, 0, 0).unwrap());
        assert_eq!(events[0].end, date(14).and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(events[0].description.as_deref(), Some("Zona 2"));
        assert_eq!(events[1].title, "Meditación");
        assert_eq!(events[1].date, date(16));
        assert_eq!(events[1].start, date(16).and_hms_opt(19, 30, 0).unwrap());
    }

    #[test]
    fn test_source_calendar_stays_off_the_entry_line() {
        let text = format_schedule(
            &group_by_day(vec![timed(14, (7, 0), (8, 0), "[PLAN] Trote")]),
            DateRange::new(date(14), date(14)),
        );

        assert!(text.contains("* **07:00 - 08:00**: [PLAN] Trote\n  * Calendario: Coach"));

        let events = extract_events(&text);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Trote");
        assert_eq!(events[0].description, None);
    }
}
