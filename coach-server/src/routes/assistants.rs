//! Assistant prompt endpoint

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use tracing::info;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/assistant-prompt/{name}", get(assistant_prompt))
}

#[derive(Serialize)]
pub struct AssistantPromptResponse {
    pub assistant_name: String,
    pub content: String,
}

/// GET /assistant-prompt/{name} - Raw template text of an assistant
async fn assistant_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AssistantPromptResponse>, AppError> {
    info!(assistant = %name, "GET /assistant-prompt");

    let content = state
        .orchestrator()
        .generator()
        .assistants()
        .raw_template(&name)?;

    Ok(Json(AssistantPromptResponse {
        assistant_name: name,
        content,
    }))
}
