//! Conversions between Google Calendar API types and coach types.

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use coach_core::{Calendar, CalendarEvent, EventTime, NewEvent};
use google_calendar::types::{CalendarListEntry, EventDateTime};

pub trait FromGoogle {
    fn from_google(event: google_calendar::types::Event) -> Result<Self>
    where
        Self: Sized;
}

pub trait ToGoogle {
    fn to_google(&self) -> google_calendar::types::Event;
}

impl FromGoogle for CalendarEvent {
    fn from_google(event: google_calendar::types::Event) -> Result<Self> {
        let start = match event.start.as_ref().and_then(event_time_from_google) {
            Some(start) => start,
            None => bail!("Event {} has no start time", event.id),
        };
        let end = match event.end.as_ref().and_then(event_time_from_google) {
            Some(end) => end,
            None => bail!("Event {} has no end time", event.id),
        };

        let self_response_status = event
            .attendees
            .iter()
            .find(|a| a.self_)
            .map(|a| a.response_status.clone())
            .filter(|status| !status.is_empty());

        Ok(CalendarEvent {
            id: event.id,
            summary: event.summary,
            description: non_empty(event.description),
            location: non_empty(event.location),
            start,
            end,
            calendar_summary: None,
            self_response_status,
        })
    }
}

impl ToGoogle for NewEvent {
    fn to_google(&self) -> google_calendar::types::Event {
        google_calendar::types::Event {
            summary: self.summary.clone(),
            description: self.description.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            start: Some(event_time_to_google(&self.start)),
            end: Some(event_time_to_google(&self.end)),
            ..Default::default()
        }
    }
}

pub fn from_google_calendar(entry: &CalendarListEntry) -> Calendar {
    Calendar {
        id: entry.id.clone(),
        summary: entry.summary.clone(),
        primary: entry.primary,
    }
}

pub fn is_cancelled(event: &google_calendar::types::Event) -> bool {
    event.status == "cancelled"
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn event_time_from_google(time: &EventDateTime) -> Option<EventTime> {
    if let Some(dt) = time.date_time {
        Some(EventTime::DateTimeUtc(dt))
    } else {
        time.date.map(EventTime::Date)
    }
}

fn event_time_to_google(time: &EventTime) -> EventDateTime {
    match time {
        EventTime::Date(d) => EventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: String::new(),
        },
        EventTime::DateTimeUtc(dt) => EventDateTime {
            date: None,
            date_time: Some(*dt),
            time_zone: String::new(),
        },
        EventTime::DateTimeFloating(dt) => EventDateTime {
            date: None,
            date_time: Some(dt.and_utc()),
            time_zone: String::new(),
        },
        EventTime::DateTimeZoned { datetime, tzid } => {
            // Send the real instant; the zone name only labels it
            let instant = tzid
                .parse::<Tz>()
                .ok()
                .and_then(|tz| local_instant(tz, *datetime))
                .unwrap_or_else(|| datetime.and_utc());

            EventDateTime {
                date: None,
                date_time: Some(instant),
                time_zone: tzid.clone(),
            }
        }
    }
}

/// UTC instant of a wall-clock time in `tz`. Times skipped by a DST jump use
/// the offset that was in effect just before the jump.
fn local_instant(tz: Tz, datetime: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&datetime).earliest() {
        Some(dt) => Some(dt.with_timezone(&Utc)),
        None => {
            let before = tz.offset_from_utc_datetime(&(datetime - Duration::days(1))).fix();
            before
                .from_local_datetime(&datetime)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}
