//! Project tutoring HTTP handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::domain::project::NextStepContext;
use crate::service::tutor::QuestionParams;
use crate::{AppState, Error, Result};

/// Start project request
#[derive(Debug, Deserialize)]
pub struct StartProjectRequest {
    pub project_type: String,
    pub expertise_level: String,
    pub project_idea: Option<String>,
}

/// Start project response
#[derive(Debug, Serialize)]
pub struct StartProjectResponse {
    pub session_id: String,
    pub response: Value,
}

/// Next step request
#[derive(Debug, Deserialize)]
pub struct NextStepRequest {
    pub session_id: String,
    pub project_type: String,
    pub expertise_level: String,
    pub project_idea: Option<String>,
    pub current_step: u32,
    pub user_code: Option<String>,
    pub user_question: Option<String>,
    pub user_understanding: Option<String>,
}

/// Step questions request
#[derive(Debug, Deserialize)]
pub struct StepQuestionsRequest {
    pub step_data: Value,
}

/// Ask question request
#[derive(Debug, Deserialize)]
pub struct AskQuestionRequest {
    pub session_id: String,
    pub question: String,
    #[serde(default)]
    pub code: String,
    pub project_type: String,
    #[serde(default)]
    pub is_error_related: bool,
}

/// Generate a project plan and open a session
pub async fn start_project(
    State(state): State<AppState>,
    Json(req): Json<StartProjectRequest>,
) -> Result<Json<StartProjectResponse>> {
    let started = state
        .tutor
        .start_project(req.project_type, req.expertise_level, req.project_idea)
        .await?;

    let response: Value = serde_json::from_str(&started.plan_json)
        .map_err(|e| Error::Internal(e.to_string()))?;
    info!(session_id = %started.session_id, "Project started");

    Ok(Json(StartProjectResponse {
        session_id: started.session_id,
        response,
    }))
}

/// Produce the next step of a session's project
pub async fn next_step(
    State(state): State<AppState>,
    Json(req): Json<NextStepRequest>,
) -> Result<Json<Value>> {
    let ctx = NextStepContext {
        project_type: req.project_type,
        expertise_level: req.expertise_level,
        project_idea: req.project_idea.unwrap_or_default(),
        current_step: req.current_step,
        user_code: req.user_code,
        user_question: req.user_question,
        user_understanding: req.user_understanding,
    };

    let response = state.tutor.next_step(&req.session_id, ctx).await?;
    let value: Value =
        serde_json::from_str(&response).map_err(|e| Error::Internal(e.to_string()))?;
    Ok(Json(value))
}

/// Quiz questions for a step
pub async fn get_step_questions(
    State(state): State<AppState>,
    Json(req): Json<StepQuestionsRequest>,
) -> Json<Value> {
    let questions = state.tutor.step_questions(&req.step_data).await;
    Json(serde_json::json!({ "questions": questions }))
}

/// Answer a user's question about their code or the current step
pub async fn ask_question(
    State(state): State<AppState>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<Json<Value>> {
    let answer = state
        .tutor
        .ask_question(QuestionParams {
            session_id: req.session_id,
            question: req.question,
            code: req.code,
            project_type: req.project_type,
            is_error_related: req.is_error_related,
        })
        .await?;
    Ok(Json(serde_json::json!({ "response": answer })))
}
