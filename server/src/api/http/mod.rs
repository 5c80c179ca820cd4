//! HTTP API handlers

mod execution;
mod health;
mod project;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the HTTP router with all routes.
///
/// Every route is served both at the root and under `/api`, matching the
/// paths historical clients use.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Project tutoring routes
        .route("/start_project", post(project::start_project))
        .route("/next_step", post(project::next_step))
        .route("/get_step_questions", post(project::get_step_questions))
        .route("/ask_question", post(project::ask_question))
        // Execution routes
        .route("/execute_code", post(execution::execute_code))
        .route("/render_website", post(execution::render_website))
        .route("/terminate_execution", post(execution::terminate_execution))
        .route("/verify_step_completion", post(execution::verify_step_completion))
        .route("/get_step_attempts", get(execution::get_step_attempts));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
