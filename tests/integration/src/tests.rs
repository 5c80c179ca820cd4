//! Integration tests for the CodeAware Tutoring Server
//!
//! These tests require a running server.
//! Run with: CODEAWARE_TEST_URL=http://127.0.0.1:8001 cargo test

use integration_tests::*;

// Each test skips itself when CODEAWARE_TEST_URL is not set, so the suite
// passes in environments without a running server.
macro_rules! require_server {
    () => {
        match TestConfig::from_env() {
            Some(config) => config,
            None => return,
        }
    };
}

// ============================================================================
// Health Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let config = require_server!();

    let response = config
        .client
        .get(config.api_url("/health"))
        .send()
        .await
        .expect("Failed to send health request");

    assert!(
        response.status().is_success(),
        "Health check failed with status: {}",
        response.status()
    );

    let health: HealthResponse = response.json().await.expect("Failed to parse health response");
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_health_check_unprefixed_route() {
    let config = require_server!();

    let response = config
        .client
        .get(format!("{}/health", config.base_url))
        .send()
        .await
        .expect("Failed to send health request");

    assert!(response.status().is_success());
}

// ============================================================================
// Execution Tests
// ============================================================================

#[tokio::test]
async fn test_execute_python_code() {
    let config = require_server!();

    let request = ExecuteCodeRequest {
        code: "print('integration')".to_string(),
        language: "python".to_string(),
        session_id: None,
        execution_id: None,
    };

    let response = config
        .client
        .post(config.api_url("/execute_code"))
        .json(&request)
        .send()
        .await
        .expect("Failed to execute code");

    assert!(response.status().is_success());
    let outcome: ExecutionOutcomeResponse =
        response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.stdout, "integration\n");
    assert!(!outcome.is_dashboard);
    assert!(!outcome.execution_id.is_empty());
}

#[tokio::test]
async fn test_execute_python_error_is_data() {
    let config = require_server!();

    let request = ExecuteCodeRequest {
        code: "raise ValueError('boom')".to_string(),
        language: "python".to_string(),
        session_id: None,
        execution_id: None,
    };

    let response = config
        .client
        .post(config.api_url("/execute_code"))
        .json(&request)
        .send()
        .await
        .expect("Failed to execute code");

    // User code crashing is still a successful API call
    assert!(response.status().is_success());
    let outcome: ExecutionOutcomeResponse =
        response.json().await.expect("Failed to parse outcome");
    assert_ne!(outcome.exit_code, 0);
    assert!(outcome.stderr.contains("ValueError"));
}

#[tokio::test]
async fn test_execute_unsupported_language() {
    let config = require_server!();

    let request = ExecuteCodeRequest {
        code: "puts 'hi'".to_string(),
        language: "ruby".to_string(),
        session_id: None,
        execution_id: None,
    };

    let response = config
        .client
        .post(config.api_url("/execute_code"))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_execute_html_echoes_content() {
    let config = require_server!();

    let request = ExecuteCodeRequest {
        code: "<p>hello</p>".to_string(),
        language: "html".to_string(),
        session_id: None,
        execution_id: None,
    };

    let response = config
        .client
        .post(config.api_url("/execute_code"))
        .json(&request)
        .send()
        .await
        .expect("Failed to execute code");

    assert!(response.status().is_success());
    let outcome: ExecutionOutcomeResponse =
        response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome.html_content.as_deref(), Some("<p>hello</p>"));
    assert_eq!(outcome.exit_code, 0);
}

#[tokio::test]
async fn test_streamlit_dashboard_lifecycle() {
    let config = require_server!();

    let code = "import streamlit as st\nst.title('integration test')\n";
    let request = ExecuteCodeRequest {
        code: code.to_string(),
        language: "python".to_string(),
        session_id: None,
        execution_id: Some(format!("itest-{}", uuid::Uuid::new_v4())),
    };
    let execution_id = request.execution_id.clone().unwrap();

    let response = config
        .client
        .post(config.api_url("/execute_code"))
        .json(&request)
        .send()
        .await
        .expect("Failed to launch dashboard");

    assert!(response.status().is_success());
    let outcome: ExecutionOutcomeResponse =
        response.json().await.expect("Failed to parse outcome");
    assert!(outcome.is_dashboard);
    assert_eq!(outcome.execution_id, execution_id);

    if outcome.dashboard_url.is_some() {
        let port = outcome.dashboard_port.expect("running dashboard has a port");
        assert!((8501..8601).contains(&port));

        // First terminate succeeds, second is a no-op
        let terminate = |id: String| {
            let config = &config;
            async move {
                config
                    .client
                    .post(config.api_url("/terminate_execution"))
                    .json(&TerminateExecutionRequest { execution_id: id })
                    .send()
                    .await
                    .expect("Failed to terminate")
                    .json::<serde_json::Value>()
                    .await
                    .expect("Failed to parse terminate response")
            }
        };

        let first = terminate(execution_id.clone()).await;
        assert_eq!(first["success"], serde_json::json!(true));
        let second = terminate(execution_id).await;
        assert_eq!(second["success"], serde_json::json!(false));
    }
}

// ============================================================================
// Render Tests
// ============================================================================

#[tokio::test]
async fn test_render_website() {
    let config = require_server!();

    let request = RenderWebsiteRequest {
        html_code: "<h1>Title</h1>".to_string(),
        css_code: "h1 { color: blue; }".to_string(),
        session_id: None,
    };

    let response = config
        .client
        .post(config.api_url("/render_website"))
        .json(&request)
        .send()
        .await
        .expect("Failed to render website");

    assert!(response.status().is_success());
    let rendered: RenderWebsiteResponse =
        response.json().await.expect("Failed to parse render response");
    assert_eq!(rendered.status, "success");
    assert!(rendered.rendered_html.contains("<h1>Title</h1>"));
    assert!(rendered.rendered_html.contains("h1 { color: blue; }"));
    assert!(rendered.rendered_html.starts_with("<!DOCTYPE html>"));
}

// ============================================================================
// Quiz Tests
// ============================================================================

#[tokio::test]
async fn test_verify_step_completion() {
    let config = require_server!();

    let answers = serde_json::json!({
        "answers": [
            QuizAnswerPayload {
                question_id: "q1".to_string(),
                answer: serde_json::json!("HTML"),
                correct_answer: serde_json::json!("html"),
            },
            QuizAnswerPayload {
                question_id: "q2".to_string(),
                answer: serde_json::json!("wrong"),
                correct_answer: serde_json::json!("right"),
            },
        ]
    });

    let response = config
        .client
        .post(config.api_url("/verify_step_completion"))
        .json(&answers)
        .send()
        .await
        .expect("Failed to verify answers");

    assert!(response.status().is_success());
    let verification: QuizVerificationResponse =
        response.json().await.expect("Failed to parse verification");
    assert!(!verification.correct);
    assert_eq!(verification.score, 50);
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_step_attempts_unknown_session() {
    let config = require_server!();

    let response = config
        .client
        .get(config.api_url("/get_step_attempts"))
        .query(&[("session_id", "does-not-exist"), ("step_number", "0")])
        .send()
        .await
        .expect("Failed to query attempts");

    assert_eq!(response.status().as_u16(), 404);
}
