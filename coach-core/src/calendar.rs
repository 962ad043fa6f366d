//! Remote calendar access and the operations built on top of it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::error::CoachResult;
use crate::event::{Calendar, CalendarEvent, NewEvent};
use crate::formatter::group_by_day;
use crate::week::DateRange;

const PRIMARY_CALENDAR: &str = "primary";

/// CRUD over a remote calendar account.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Calendars visible to the account. Implementations may cache the list.
    async fn list_calendars(&self) -> CoachResult<Vec<Calendar>>;

    /// Like `list_calendars`, bypassing any cache.
    async fn refresh_calendars(&self) -> CoachResult<Vec<Calendar>> {
        self.list_calendars().await
    }

    /// Single (expanded) events starting within `range`, cancelled ones excluded.
    async fn list_events(&self, calendar_id: &str, range: DateRange)
    -> CoachResult<Vec<CalendarEvent>>;

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> CoachResult<CalendarEvent>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CoachResult<()>;
}

/// How a delete without a title filter gets approved.
#[derive(Clone, Copy)]
pub enum Confirmation<'a> {
    /// The caller opted in to deleting everything.
    Skip,
    /// Ask before deleting; receives the events about to go.
    Ask(&'a (dyn Fn(&[CalendarEvent]) -> bool + Sync)),
}

fn looks_like_id(target: &str) -> bool {
    target.contains('@') || target.contains('.')
}

/// Resolve a calendar name or id. Targets containing `@` or `.` are taken as ids.
pub async fn resolve_calendar_id(
    calendar: &dyn CalendarService,
    target: &str,
) -> CoachResult<Option<String>> {
    if looks_like_id(target) {
        return Ok(Some(target.to_string()));
    }

    let found = calendar
        .list_calendars()
        .await?
        .into_iter()
        .find(|c| c.summary == target)
        .map(|c| c.id);

    if found.is_none() {
        warn!(calendar = target, "No calendar with that name");
    }
    Ok(found)
}

/// Events from the calendars named in `filter_summaries` (all when empty),
/// grouped by local start date.
///
/// Calendars that fail to list are skipped. Invitations the user has not
/// accepted are left out.
pub async fn fetch_events_by_day(
    calendar: &dyn CalendarService,
    range: DateRange,
    filter_summaries: &[String],
    tz: Option<Tz>,
) -> CoachResult<BTreeMap<NaiveDate, Vec<CalendarEvent>>> {
    let calendars: Vec<Calendar> = calendar
        .list_calendars()
        .await?
        .into_iter()
        .filter(|c| filter_summaries.is_empty() || filter_summaries.contains(&c.summary))
        .collect();

    debug!(
        calendars = ?calendars.iter().map(|c| c.summary.as_str()).collect::<Vec<_>>(),
        "Searching calendars"
    );

    let mut events = Vec::new();
    for source in &calendars {
        let listed = match calendar.list_events(&source.id, range).await {
            Ok(listed) => listed,
            Err(e) => {
                error!(calendar = %source.id, error = %e, "Could not list events, skipping calendar");
                continue;
            }
        };

        events.extend(
            listed
                .into_iter()
                .filter(|event| !event.is_unaccepted_invitation())
                .map(|mut event| {
                    event.calendar_summary = Some(source.summary.clone());
                    event.start = event.start.into_zone(tz);
                    event.end = event.end.into_zone(tz);
                    event
                }),
        );
    }

    Ok(group_by_day(events))
}

/// Create an event on `target`, falling back to the primary calendar when
/// no calendar has that name.
pub async fn create_in_target(
    calendar: &dyn CalendarService,
    target: &str,
    event: &NewEvent,
) -> CoachResult<CalendarEvent> {
    let calendar_id = match resolve_calendar_id(calendar, target).await? {
        Some(id) => id,
        None => {
            warn!(calendar = target, "Falling back to the primary calendar");
            PRIMARY_CALENDAR.to_string()
        }
    };

    calendar.create_event(&calendar_id, event).await
}

/// Delete the events of `target` within `range`, optionally only those whose
/// title starts with `prefix`. Returns how many were deleted.
pub async fn delete_events_in_range(
    calendar: &dyn CalendarService,
    range: DateRange,
    target: &str,
    prefix: Option<&str>,
    confirmation: Confirmation<'_>,
) -> CoachResult<usize> {
    let Some(calendar_id) = resolve_calendar_id(calendar, target).await? else {
        warn!(calendar = target, "Calendar not found, nothing deleted");
        return Ok(0);
    };

    let to_delete: Vec<CalendarEvent> = calendar
        .list_events(&calendar_id, range)
        .await?
        .into_iter()
        .filter(|event| prefix.is_none_or(|p| event.summary.starts_with(p)))
        .collect();

    if to_delete.is_empty() {
        info!(calendar = target, "No matching events to delete");
        return Ok(0);
    }

    if prefix.is_none() {
        warn!(
            calendar = target,
            count = to_delete.len(),
            "No title filter, deleting every event in range"
        );
        if let Confirmation::Ask(confirm) = confirmation {
            if !confirm(&to_delete) {
                info!("Deletion cancelled");
                return Ok(0);
            }
        }
    }

    let mut deleted = 0;
    for event in &to_delete {
        match calendar.delete_event(&calendar_id, &event.id).await {
            Ok(()) => {
                debug!(id = %event.id, summary = %event.summary, "Deleted event");
                deleted += 1;
            }
            Err(e) => error!(id = %event.id, error = %e, "Could not delete event"),
        }
    }

    info!(calendar = target, deleted, "Deleted events");
    Ok(deleted)
}
