//! Execution HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::execution::{ExecutionOutcome, Language};
use crate::domain::project::QuizAnswer;
use crate::service::execution::render_website as render_document;
use crate::service::quiz;
use crate::{AppState, Error, Result};

/// Execute code request
#[derive(Debug, Deserialize)]
pub struct ExecuteCodeRequest {
    pub code: String,
    pub language: String,
    pub session_id: Option<String>,
    /// Previous execution id, passed when resubmitting a dashboard so the
    /// old process is replaced instead of leaked
    pub execution_id: Option<String>,
}

/// Render website request
#[derive(Debug, Deserialize)]
pub struct RenderWebsiteRequest {
    pub html_code: String,
    pub css_code: String,
    pub session_id: Option<String>,
}

/// Render website response
#[derive(Debug, Serialize)]
pub struct RenderWebsiteResponse {
    pub rendered_html: String,
    pub status: String,
}

/// Terminate execution request
#[derive(Debug, Deserialize)]
pub struct TerminateExecutionRequest {
    pub execution_id: String,
}

/// Verify step completion request
#[derive(Debug, Deserialize)]
pub struct VerifyStepRequest {
    #[serde(default)]
    pub answers: Vec<QuizAnswer>,
}

/// Step attempts query parameters
#[derive(Debug, Deserialize)]
pub struct StepAttemptsQuery {
    pub session_id: String,
    pub step_number: u32,
}

/// Execute submitted code and return its structured outcome
pub async fn execute_code(
    State(state): State<AppState>,
    Json(req): Json<ExecuteCodeRequest>,
) -> Result<Json<ExecutionOutcome>> {
    let language = Language::from_str(&req.language)
        .ok_or_else(|| Error::UnsupportedLanguage(req.language.clone()))?;

    if let Some(session_id) = &req.session_id {
        state.sessions.increment_execution_attempts(session_id).await;
        state.sessions.store_code(session_id, language, req.code.clone()).await;
    }

    let outcome = state
        .executions
        .execute(&req.code, language, req.execution_id)
        .await?;
    Ok(Json(outcome))
}

/// Compose HTML and CSS into a complete document
pub async fn render_website(
    State(state): State<AppState>,
    Json(req): Json<RenderWebsiteRequest>,
) -> Result<Json<RenderWebsiteResponse>> {
    if let Some(session_id) = &req.session_id {
        state
            .sessions
            .record_render(session_id, req.html_code.clone(), req.css_code.clone())
            .await;
    }

    Ok(Json(RenderWebsiteResponse {
        rendered_html: render_document(&req.html_code, &req.css_code),
        status: "success".to_string(),
    }))
}

/// Stop a tracked dashboard process
pub async fn terminate_execution(
    State(state): State<AppState>,
    Json(req): Json<TerminateExecutionRequest>,
) -> Json<serde_json::Value> {
    let terminated = state.registry.terminate(&req.execution_id).await;
    info!(execution_id = %req.execution_id, terminated, "Termination requested");
    Json(serde_json::json!({ "success": terminated }))
}

/// Grade a step's quiz answers
pub async fn verify_step_completion(
    Json(req): Json<VerifyStepRequest>,
) -> Json<crate::domain::project::QuizVerification> {
    Json(quiz::verify_answers(&req.answers))
}

/// Execution attempt count for one step of a session
pub async fn get_step_attempts(
    State(state): State<AppState>,
    Query(query): Query<StepAttemptsQuery>,
) -> Result<Json<serde_json::Value>> {
    if state.sessions.get(&query.session_id).await.is_none() {
        return Err(Error::SessionNotFound(query.session_id));
    }

    let attempts = state
        .sessions
        .step_attempts(&query.session_id, query.step_number)
        .await;
    Ok(Json(serde_json::json!({ "attempts": attempts })))
}
