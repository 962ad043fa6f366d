//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::assistants::AssistantStore;
use crate::calendar::CalendarService;
use crate::error::{CoachError, CoachResult};
use crate::event::{Calendar, CalendarEvent, NewEvent};
use crate::gpt::TextGenerator;
use crate::week::DateRange;

/// A calendar account held in memory.
#[derive(Default)]
pub struct InMemoryCalendar {
    calendars: Vec<Calendar>,
    events: Mutex<HashMap<String, Vec<CalendarEvent>>>,
    failing_lists: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_creates: HashSet<String>,
    next_id: AtomicUsize,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, id: &str, summary: &str, primary: bool) -> Self {
        self.calendars.push(Calendar {
            id: id.to_string(),
            summary: summary.to_string(),
            primary,
        });
        self
    }

    pub fn with_event(self, calendar_id: &str, event: CalendarEvent) -> Self {
        self.lock().entry(calendar_id.to_string()).or_default().push(event);
        self
    }

    /// Listing events of this calendar fails.
    pub fn failing_list(mut self, calendar_id: &str) -> Self {
        self.failing_lists.insert(calendar_id.to_string());
        self
    }

    /// Deleting the event with this id fails.
    pub fn failing_delete(mut self, event_id: &str) -> Self {
        self.failing_deletes.insert(event_id.to_string());
        self
    }

    /// Creating an event with this title fails.
    pub fn failing_create(mut self, summary: &str) -> Self {
        self.failing_creates.insert(summary.to_string());
        self
    }

    pub fn events_in(&self, calendar_id: &str) -> Vec<CalendarEvent> {
        self.lock().get(calendar_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<CalendarEvent>>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn list_calendars(&self) -> CoachResult<Vec<Calendar>> {
        Ok(self.calendars.clone())
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        range: DateRange,
    ) -> CoachResult<Vec<CalendarEvent>> {
        if self.failing_lists.contains(calendar_id) {
            return Err(CoachError::Calendar(format!("cannot list {calendar_id}")));
        }
        Ok(self
            .events_in(calendar_id)
            .into_iter()
            .filter(|e| range.contains(e.start.date()))
            .collect())
    }

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> CoachResult<CalendarEvent> {
        if self.failing_creates.contains(&event.summary) {
            return Err(CoachError::Calendar(format!("cannot create '{}'", event.summary)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = CalendarEvent {
            id: format!("created-{id}"),
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: event.start.clone(),
            end: event.end.clone(),
            calendar_summary: None,
            self_response_status: None,
        };
        self.lock()
            .entry(calendar_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> CoachResult<()> {
        if self.failing_deletes.contains(event_id) {
            return Err(CoachError::Calendar(format!("cannot delete {event_id}")));
        }
        if let Some(events) = self.lock().get_mut(calendar_id) {
            events.retain(|e| e.id != event_id);
        }
        Ok(())
    }
}

/// A generator that answers from canned responses and records every call.
pub struct ScriptedGenerator {
    assistants: AssistantStore,
    responses: HashMap<String, String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    /// Every name in `templates` becomes a known assistant.
    pub fn new<'a>(templates: impl IntoIterator<Item = &'a str>) -> Self {
        ScriptedGenerator {
            assistants: AssistantStore::from_templates(
                templates.into_iter().map(|name| (name, format!("Eres {name}."))),
            ),
            responses: HashMap::new(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, template: &str, text: impl Into<String>) -> Self {
        self.responses.insert(template.to_string(), text.into());
        self
    }

    pub fn fail(mut self, template: &str) -> Self {
        self.failing.insert(template.to_string());
        self
    }

    /// `(template, user_text)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn assistants(&self) -> &AssistantStore {
        &self.assistants
    }

    async fn generate(&self, template: &str, user_text: &str) -> CoachResult<String> {
        self.assistants.get(template)?;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((template.to_string(), user_text.to_string()));

        if self.failing.contains(template) {
            return Err(CoachError::generation(template, "scripted failure"));
        }
        Ok(self
            .responses
            .get(template)
            .cloned()
            .unwrap_or_else(|| format!("respuesta de {template}")))
    }
}
