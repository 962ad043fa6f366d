//! Provider-neutral calendar types.
//!
//! Calendar providers convert their API responses into these types; the
//! formatter and orchestrator work exclusively with them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A calendar the authenticated user can see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    /// Display name (for the primary calendar, usually the account email)
    pub summary: String,
    pub primary: bool,
}

/// A remote calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Summary of the calendar the event was read from
    pub calendar_summary: Option<String>,
    /// The user's own response when the event is an invitation
    /// ("accepted", "declined", "tentative", "needsAction")
    pub self_response_status: Option<String>,
}

impl CalendarEvent {
    /// True for invitations the user has not accepted.
    pub fn is_unaccepted_invitation(&self) -> bool {
        matches!(&self.self_response_status, Some(status) if status != "accepted")
    }
}

/// An event to be created on a remote calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day event
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    /// Wall-clock time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Wall-clock time in an IANA zone
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Wall-clock date and time as stored; all-day events start at midnight.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            EventTime::Date(d) => d.and_time(NaiveTime::MIN),
            EventTime::DateTimeUtc(dt) => dt.naive_utc(),
            EventTime::DateTimeFloating(dt) => *dt,
            EventTime::DateTimeZoned { datetime, .. } => *datetime,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.wall_clock().date()
    }

    /// Re-express a UTC instant as wall-clock time in `tz`.
    /// Other variants are returned unchanged.
    pub fn into_zone(self, tz: Option<Tz>) -> EventTime {
        match (self, tz) {
            (EventTime::DateTimeUtc(dt), Some(tz)) => EventTime::DateTimeZoned {
                datetime: dt.with_timezone(&tz).naive_local(),
                tzid: tz.name().to_string(),
            },
            (other, _) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_utc_into_zone_shifts_wall_clock() {
        let utc = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2025, 4, 14, 13, 0, 0).unwrap());
        let zoned = utc.into_zone(Some(chrono_tz::America::Santiago));

        assert_eq!(
            zoned,
            EventTime::DateTimeZoned {
                datetime: NaiveDate::from_ymd_opt(2025, 4, 14)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                tzid: "America/Santiago".to_string(),
            }
        );
    }

    #[test]
    fn test_into_zone_without_zone_is_identity() {
        let utc = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2025, 4, 14, 13, 0, 0).unwrap());
        assert_eq!(utc.clone().into_zone(None), utc);
    }

    #[test]
    fn test_all_day_wall_clock_is_midnight() {
        let day = NaiveDate::from_ymd_opt(2025, 4, 14).unwrap();
        let time = EventTime::Date(day);
        assert!(time.is_all_day());
        assert_eq!(time.wall_clock(), day.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_unaccepted_invitation() {
        let mut event = CalendarEvent {
            id: "1".into(),
            summary: "Sync".into(),
            description: None,
            location: None,
            start: EventTime::Date(NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()),
            calendar_summary: None,
            self_response_status: None,
        };
        assert!(!event.is_unaccepted_invitation());

        event.self_response_status = Some("needsAction".into());
        assert!(event.is_unaccepted_invitation());

        event.self_response_status = Some("accepted".into());
        assert!(!event.is_unaccepted_invitation());
    }
}
