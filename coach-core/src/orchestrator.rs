//! End-to-end weekly planning run.
//!
//! ```text
//! experts ─┐
//!          ├─> planner ─┐
//! experts ─┘            ├─> integrator ─> delete range ─> scan ─> create events
//! remote calendar ─> formatter ─┘
//! ```

use std::sync::Arc;

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::calendar::{self, CalendarService, Confirmation};
use crate::config::CoachConfig;
use crate::error::CoachResult;
use crate::formatter::format_schedule;
use crate::gpt::TextGenerator;
use crate::planner;
use crate::scanner::{self, ExtractedEvent, ScanFailure};
use crate::week::DateRange;

/// A planned event that could not be written to the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCreation {
    pub title: String,
    pub start: NaiveDateTime,
    pub error: String,
}

/// Outcome of a full planning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleRun {
    /// Final schedule text returned by the integrator
    pub schedule: String,
    pub deleted: usize,
    pub created: usize,
    pub failed: Vec<FailedCreation>,
    pub scan_failures: Vec<ScanFailure>,
}

#[derive(Debug, Default)]
struct WriteBack {
    created: usize,
    failed: Vec<FailedCreation>,
}

pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    calendar: Arc<dyn CalendarService>,
    config: CoachConfig,
    tz: Option<Tz>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        calendar: Arc<dyn CalendarService>,
        config: CoachConfig,
    ) -> Self {
        let tz = config.local_timezone();
        match tz {
            Some(tz) => info!(timezone = %tz.name(), "Using local timezone"),
            None => warn!("No local timezone, planned events will have floating times"),
        }

        Orchestrator {
            generator,
            calendar,
            config,
            tz,
        }
    }

    pub fn with_timezone(mut self, tz: Option<Tz>) -> Self {
        self.tz = tz;
        self
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    pub fn calendar(&self) -> &dyn CalendarService {
        self.calendar.as_ref()
    }

    /// Existing events of the source calendars in `range`, as text.
    ///
    /// The text goes through the formatter assistant when it exists; otherwise
    /// the locally formatted text is returned as is.
    pub async fn formatted_schedule(&self, range: DateRange) -> CoachResult<String> {
        info!(start = %range.start, end = %range.end, "Fetching existing schedule");
        let by_day = calendar::fetch_events_by_day(
            self.calendar(),
            range,
            &self.config.source_calendars,
            self.tz,
        )
        .await?;
        info!(days = by_day.len(), "Found events");

        let text = format_schedule(&by_day, range);
        debug!(schedule = %text, "Formatted calendar data");

        let formatter = &self.config.formatter_assistant;
        if !self.generator.has_template(formatter) {
            warn!(assistant = %formatter, "Formatter assistant not found, returning raw schedule");
            return Ok(text);
        }

        info!(assistant = %formatter, "Formatting schedule");
        self.generator.generate(formatter, &text).await
    }

    /// Expert advice integrated by the planner.
    pub async fn weekly_plan(&self) -> CoachResult<String> {
        planner::weekly_plan(
            self.generator(),
            &self.config.expert_assistants,
            &self.config.planner_assistant,
            &self.config.expert_query,
        )
        .await
    }

    /// Plan the week, replace the target calendar's events in `range` with the
    /// `[PLAN]` entries of the integrated schedule.
    ///
    /// Failures before the write-back abort the run. Individual event
    /// creations that fail are reported in the result.
    pub async fn generate_schedule(&self, range: DateRange) -> CoachResult<ScheduleRun> {
        let integrator = &self.config.integrator_assistant;
        self.generator.assistants().require([integrator.as_str()])?;

        info!("Building recommended weekly plan");
        let plan = self.weekly_plan().await?;

        let existing = self.formatted_schedule(range).await?;

        info!(assistant = %integrator, "Generating integrated schedule");
        let schedule = self
            .generator
            .generate(integrator, &integration_prompt(&plan, &existing))
            .await?;
        debug!(schedule = %schedule, "Integrated schedule");

        let deleted = self.delete_schedule(range, None, Confirmation::Skip).await?;

        let report = scanner::scan(&schedule);
        info!(
            events = report.events.len(),
            failures = report.failures.len(),
            "Scanned integrated schedule"
        );

        let write_back = self.create_events(&report.events).await;

        Ok(ScheduleRun {
            schedule,
            deleted,
            created: write_back.created,
            failed: write_back.failed,
            scan_failures: report.failures,
        })
    }

    /// Delete events of the target calendar in `range`.
    pub async fn delete_schedule(
        &self,
        range: DateRange,
        prefix: Option<&str>,
        confirmation: Confirmation<'_>,
    ) -> CoachResult<usize> {
        info!(
            calendar = %self.config.target_calendar,
            start = %range.start,
            end = %range.end,
            prefix = prefix.unwrap_or(""),
            "Deleting events"
        );
        calendar::delete_events_in_range(
            self.calendar(),
            range,
            &self.config.target_calendar,
            prefix,
            confirmation,
        )
        .await
    }

    async fn create_events(&self, events: &[ExtractedEvent]) -> WriteBack {
        let target = &self.config.target_calendar;
        let mut write_back = WriteBack::default();

        for extracted in events {
            let new_event = extracted.to_new_event(self.tz);
            let result = calendar::create_in_target(self.calendar(), target, &new_event).await;

            match result {
                Ok(created) => {
                    info!(title = %extracted.title, id = %created.id, "Created event");
                    write_back.created += 1;
                }
                Err(e) => {
                    error!(title = %extracted.title, start = %extracted.start, error = %e, "Could not create event");
                    write_back.failed.push(FailedCreation {
                        title: extracted.title.clone(),
                        start: extracted.start,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            created = write_back.created,
            failed = write_back.failed.len(),
            "Write-back complete"
        );
        write_back
    }
}

/// Input for the integrator: the recommended plan and the existing calendar.
pub fn integration_prompt(plan: &str, existing_schedule: &str) -> String {
    format!(
        "
**1. PLANIFICACIÓN SEMANAL RECOMENDADA:**

{plan}

---

**2. CALENDARIO EXISTENTE DE LA PRÓXIMA SEMANA (FORMATEADO):**

{existing_schedule}

---

**INSTRUCCIÓN FINAL:** Por favor, integra la planificación recomendada en el calendario existente siguiendo las reglas especificadas en tu prompt base. Genera el calendario final detallado y aumentado.
"
    )
}
