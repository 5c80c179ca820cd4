//! Shared helpers for the integration test suite

use serde::{Deserialize, Serialize};

/// Test configuration: target server URL plus a shared HTTP client.
///
/// Built from the `CODEAWARE_TEST_URL` environment variable; when it is not
/// set, tests skip themselves so the suite passes without a running server.
pub struct TestConfig {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestConfig {
    /// Build from the environment, or `None` when no server URL is configured
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CODEAWARE_TEST_URL").ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteCodeRequest {
    pub code: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionOutcomeResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub execution_id: String,
    pub is_dashboard: bool,
    pub dashboard_url: Option<String>,
    pub dashboard_port: Option<u16>,
    pub html_content: Option<String>,
    pub css_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderWebsiteRequest {
    pub html_code: String,
    pub css_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderWebsiteResponse {
    pub rendered_html: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TerminateExecutionRequest {
    pub execution_id: String,
}

#[derive(Debug, Serialize)]
pub struct QuizAnswerPayload {
    pub question_id: String,
    pub answer: serde_json::Value,
    pub correct_answer: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct QuizVerificationResponse {
    pub correct: bool,
    pub score: u32,
    pub feedback: String,
}
