//! Weekly schedule endpoints

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post},
};
use coach_core::Confirmation;
use coach_core::orchestrator::FailedCreation;
use serde::Serialize;
use tracing::info;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/generate-schedule", post(generate_schedule))
        .route("/delete-schedule", delete(delete_schedule))
        .route("/formatted-schedule", get(formatted_schedule))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub schedule: String,
    pub created: usize,
    pub deleted: usize,
    pub failed: Vec<FailedCreation>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_count: usize,
}

#[derive(Serialize)]
pub struct FormattedScheduleResponse {
    pub formatted_schedule: String,
}

/// GET / - Health check
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Personal Coach API is running!",
    })
}

/// POST /generate-schedule - Plan next week and write it to the calendar
async fn generate_schedule(State(state): State<AppState>) -> Result<Json<GenerateResponse>, AppError> {
    let range = state.next_week();
    info!(start = %range.start, end = %range.end, "POST /generate-schedule");

    let run = state.orchestrator().generate_schedule(range).await?;

    Ok(Json(GenerateResponse {
        schedule: run.schedule,
        created: run.created,
        deleted: run.deleted,
        failed: run.failed,
    }))
}

/// DELETE /delete-schedule - Delete every event of next week in the target calendar
async fn delete_schedule(State(state): State<AppState>) -> Result<Json<DeleteResponse>, AppError> {
    let range = state.next_week();
    info!(start = %range.start, end = %range.end, "DELETE /delete-schedule");

    let deleted_count = state
        .orchestrator()
        .delete_schedule(range, None, Confirmation::Skip)
        .await?;

    Ok(Json(DeleteResponse {
        message: format!(
            "Borrado completado para la semana {} a {}.",
            range.start, range.end
        ),
        deleted_count,
    }))
}

/// GET /formatted-schedule - Existing events of next week as text
async fn formatted_schedule(
    State(state): State<AppState>,
) -> Result<Json<FormattedScheduleResponse>, AppError> {
    let range = state.next_week();
    info!(start = %range.start, end = %range.end, "GET /formatted-schedule");

    let formatted_schedule = state.orchestrator().formatted_schedule(range).await?;
    Ok(Json(FormattedScheduleResponse { formatted_schedule }))
}
