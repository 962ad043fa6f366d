//! Weekly planning core: expert fan-out, schedule formatting, extraction of
//! planned events from generated text, and write-back to a calendar.

pub mod assistants;
pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod formatter;
pub mod gpt;
pub mod orchestrator;
pub mod planner;
pub mod scanner;
pub mod week;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use assistants::AssistantStore;
pub use calendar::{CalendarService, Confirmation};
pub use config::CoachConfig;
pub use error::{CoachError, CoachResult};
pub use event::{Calendar, CalendarEvent, EventTime, NewEvent};
pub use gpt::{GptClient, TextGenerator};
pub use orchestrator::{Orchestrator, ScheduleRun};
pub use scanner::{ExtractedEvent, ScanReport, extract_events, scan};
pub use week::DateRange;
