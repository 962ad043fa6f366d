//! Google Calendar backend for the coach planner.
//!
//! Client credentials are resolved by [`app_config::load`]; `coach auth` writes
//! the OAuth session next to them.

pub mod app_config;
pub mod auth;
pub mod convert;
pub mod session;

use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use coach_core::{
    Calendar, CalendarEvent, CalendarService, CoachError, CoachResult, DateRange, EventTime,
    NewEvent,
};
use google_calendar::Client;
use google_calendar::types::{MinAccessRole, OrderBy, SendUpdates};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::app_config::Credentials;
use crate::convert::{FromGoogle, ToGoogle, from_google_calendar, is_cancelled};
use crate::session::Session;

pub use auth::authenticate;

/// A signed-in Google account.
pub struct GoogleCalendar {
    credentials: Credentials,
    session: AsyncMutex<Session>,
    calendars: Mutex<Option<Vec<Calendar>>>,
}

fn calendar_error(e: anyhow::Error) -> CoachError {
    CoachError::Calendar(format!("{e:#}"))
}

impl GoogleCalendar {
    /// Use the session saved by `coach auth`.
    pub fn connect() -> anyhow::Result<Self> {
        let credentials = app_config::load()?;
        let session = Session::load()?;
        info!(account = session.account(), "Using Google session");

        Ok(GoogleCalendar {
            credentials,
            session: AsyncMutex::new(session),
            calendars: Mutex::new(None),
        })
    }

    /// API client with a valid access token.
    async fn client(&self) -> anyhow::Result<Client> {
        let mut session = self.session.lock().await;
        if session.is_expired() {
            session.refresh(&self.credentials).await?;
        }
        Ok(session.client(&self.credentials))
    }

    fn cached_calendars(&self) -> Option<Vec<Calendar>> {
        self.calendars
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn fetch_calendars(&self) -> anyhow::Result<Vec<Calendar>> {
        let entries = self
            .client()
            .await?
            .calendar_list()
            .list_all(MinAccessRole::default(), false, false)
            .await
            .context("Failed to fetch calendars")?
            .body;

        let calendars: Vec<Calendar> = entries.iter().map(from_google_calendar).collect();
        debug!(count = calendars.len(), "Fetched calendar list");

        *self.calendars.lock().unwrap_or_else(|e| e.into_inner()) = Some(calendars.clone());
        Ok(calendars)
    }

    async fn fetch_events(
        &self,
        calendar_id: &str,
        range: DateRange,
    ) -> anyhow::Result<Vec<CalendarEvent>> {
        let time_min = range.time_min();
        let time_max = range.time_max();

        let response = self
            .client()
            .await?
            .events()
            .list_all(
                calendar_id,
                "",
                0,
                OrderBy::default(),
                &[],
                "", // search query
                &[],
                false, // show_deleted
                false, // show_hidden_invitations
                true,  // single_events: expand recurring events
                &time_max.to_rfc3339(),
                &time_min.to_rfc3339(),
                "",
                "",
            )
            .await
            .with_context(|| format!("Failed to fetch events of {}", calendar_id))?;

        let events = response
            .body
            .into_iter()
            .filter(|event| !is_cancelled(event))
            .map(CalendarEvent::from_google)
            .collect::<anyhow::Result<Vec<_>>>()?
            .into_iter()
            .filter(|event| starts_within(event, range))
            .collect::<Vec<_>>();

        debug!(calendar = calendar_id, count = events.len(), "Fetched events");
        Ok(events)
    }
}

/// The API returns events overlapping the window; keep those starting in it.
fn starts_within(event: &CalendarEvent, range: DateRange) -> bool {
    match &event.start {
        EventTime::DateTimeUtc(dt) => range.time_min() <= *dt && *dt <= range.time_max(),
        other => range.contains(other.date()),
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list_calendars(&self) -> CoachResult<Vec<Calendar>> {
        if let Some(calendars) = self.cached_calendars() {
            return Ok(calendars);
        }
        self.fetch_calendars().await.map_err(calendar_error)
    }

    async fn refresh_calendars(&self) -> CoachResult<Vec<Calendar>> {
        self.fetch_calendars().await.map_err(calendar_error)
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        range: DateRange,
    ) -> CoachResult<Vec<CalendarEvent>> {
        self.fetch_events(calendar_id, range)
            .await
            .map_err(calendar_error)
    }

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> CoachResult<CalendarEvent> {
        let client = self.client().await.map_err(calendar_error)?;

        // Google assigns the id
        let google_event = event.to_google();

        let response = client
            .events()
            .insert(
                calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &google_event,
            )
            .await
            .with_context(|| format!("Failed to create event: {}", google_event.summary))
            .map_err(calendar_error)?;

        CalendarEvent::from_google(response.body).map_err(calendar_error)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CoachResult<()> {
        let client = self.client().await.map_err(calendar_error)?;

        let result = client
            .events()
            .delete(calendar_id, event_id, false, SendUpdates::None)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let error_str = e.to_string();
                // Already gone
                if error_str.contains("410") || error_str.contains("Gone") {
                    Ok(())
                } else {
                    Err(CoachError::Calendar(format!(
                        "Failed to delete event {}: {}",
                        event_id, e
                    )))
                }
            }
        }
    }
}
