//! Session store
//!
//! In-memory registry of tutoring sessions. The map and its lock are owned
//! by this struct and shared via `Arc`; there is no module-level state.
//! Sessions are process-lifetime only.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::execution::{classify_source, DetectedLanguage, Language};
use crate::domain::session::Session;

/// Fallback step count when the generated plan is missing one
const DEFAULT_TOTAL_STEPS: u32 = 10;

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session and return its id.
    ///
    /// `plan_json` is the raw step-generator response; `total_steps` is
    /// parsed out of it, defaulting when the plan is malformed.
    pub async fn create(
        &self,
        project_type: String,
        expertise_level: String,
        project_idea: String,
        plan_json: String,
    ) -> String {
        let total_steps = serde_json::from_str::<serde_json::Value>(&plan_json)
            .ok()
            .and_then(|v| v.get("total_steps").and_then(|n| n.as_u64()))
            .map(|n| n as u32)
            .unwrap_or(DEFAULT_TOTAL_STEPS);

        let id = Uuid::new_v4().to_string();
        let session = Session::new(
            id.clone(),
            project_type,
            expertise_level,
            project_idea,
            plan_json,
            total_steps,
        );

        debug!(session = %id, total_steps, "Created session");
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    /// Snapshot of a session by id
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Advance the session to the next step
    pub async fn increment_step(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.current_step += 1;
                true
            }
            None => false,
        }
    }

    /// Bump the execution counters (session-wide and current-step) and
    /// return the count for the current step
    pub async fn increment_execution_attempts(&self, id: &str) -> u32 {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.execution_attempts += 1;
                let step = session.current_step;
                let count = session.attempts_by_step.entry(step).or_insert(0);
                *count += 1;
                *count
            }
            None => 0,
        }
    }

    /// Attempt count for the step the session is currently on
    pub async fn current_step_attempts(&self, id: &str) -> u32 {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.current_step_attempts())
            .unwrap_or(0)
    }

    /// Attempt count for an arbitrary step
    pub async fn step_attempts(&self, id: &str, step: u32) -> u32 {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.attempts_by_step.get(&step).copied())
            .unwrap_or(0)
    }

    /// Store code under an explicit language slot
    pub async fn store_code(&self, id: &str, language: Language, code: String) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => {
                session.code_files.insert(language, code);
                true
            }
            None => false,
        }
    }

    /// Stored code for a language, if any
    pub async fn code_for(&self, id: &str, language: Language) -> Option<String> {
        self.sessions
            .read()
            .await
            .get(id)
            .and_then(|s| s.code_files.get(&language).cloned())
    }

    /// Record a website render: store both sources and count it as an
    /// execution attempt for the current step. Returns the step's attempt
    /// count, which feeds the hint-vs-solution gate.
    pub async fn record_render(&self, id: &str, html: String, css: String) -> u32 {
        self.store_code(id, Language::Html, html).await;
        self.store_code(id, Language::Css, css).await;
        self.increment_execution_attempts(id).await
    }

    /// Store code by classifying its language from the source text.
    ///
    /// When classification fails, falls back to the session's project type:
    /// HTML for web projects, Python otherwise.
    pub async fn store_user_code(&self, id: &str, code: &str) -> bool {
        if code.is_empty() {
            return false;
        }

        let language = match classify_source(code) {
            DetectedLanguage::Known(language) => language,
            DetectedLanguage::Unknown => {
                let Some(session) = self.get(id).await else {
                    return false;
                };
                if session.project_type == "html+css+js" {
                    Language::Html
                } else {
                    Language::Python
                }
            }
        };

        self.store_code(id, language, code.to_string()).await
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session(project_type: &str) -> (SessionStore, String) {
        let store = SessionStore::new();
        let id = store
            .create(
                project_type.to_string(),
                "beginner".to_string(),
                "a todo list".to_string(),
                r#"{"total_steps": 6, "steps": []}"#.to_string(),
            )
            .await;
        (store, id)
    }

    #[tokio::test]
    async fn create_parses_total_steps() {
        let (store, id) = store_with_session("html+css+js").await;
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.total_steps, 6);
        assert_eq!(session.current_step, 0);
    }

    #[tokio::test]
    async fn malformed_plan_defaults_step_count() {
        let store = SessionStore::new();
        let id = store
            .create(
                "python+streamlit".to_string(),
                "expert".to_string(),
                "dashboard".to_string(),
                "not json".to_string(),
            )
            .await;
        assert_eq!(store.get(&id).await.unwrap().total_steps, 10);
    }

    #[tokio::test]
    async fn attempt_counters_track_per_step() {
        let (store, id) = store_with_session("html+css+js").await;

        assert_eq!(store.increment_execution_attempts(&id).await, 1);
        assert_eq!(store.increment_execution_attempts(&id).await, 2);
        assert_eq!(store.current_step_attempts(&id).await, 2);

        store.increment_step(&id).await;
        assert_eq!(store.current_step_attempts(&id).await, 0);
        assert_eq!(store.increment_execution_attempts(&id).await, 1);

        // Earlier step's count is preserved
        assert_eq!(store.step_attempts(&id, 0).await, 2);
        assert_eq!(store.get(&id).await.unwrap().execution_attempts, 3);
    }

    #[tokio::test]
    async fn render_stores_sources_and_counts_attempt() {
        let (store, id) = store_with_session("html+css+js").await;

        let attempts = store
            .record_render(&id, "<p>hi</p>".to_string(), "p{margin:0}".to_string())
            .await;
        assert_eq!(attempts, 1);
        assert_eq!(store.code_for(&id, Language::Html).await.as_deref(), Some("<p>hi</p>"));
        assert_eq!(store.code_for(&id, Language::Css).await.as_deref(), Some("p{margin:0}"));
        assert_eq!(store.current_step_attempts(&id).await, 1);
    }

    #[tokio::test]
    async fn unknown_session_counters_are_zero() {
        let store = SessionStore::new();
        assert_eq!(store.increment_execution_attempts("nope").await, 0);
        assert_eq!(store.current_step_attempts("nope").await, 0);
        assert!(!store.increment_step("nope").await);
    }

    #[tokio::test]
    async fn user_code_is_classified() {
        let (store, id) = store_with_session("html+css+js").await;
        assert!(store.store_user_code(&id, "def f():\n    print(1)").await);
        assert_eq!(
            store.code_for(&id, Language::Python).await.as_deref(),
            Some("def f():\n    print(1)")
        );
    }

    #[tokio::test]
    async fn unclassifiable_code_falls_back_to_project_type() {
        let (store, id) = store_with_session("html+css+js").await;
        assert!(store.store_user_code(&id, "plain words").await);
        assert!(store.code_for(&id, Language::Html).await.is_some());

        let (store, id) = store_with_session("python+streamlit").await;
        assert!(store.store_user_code(&id, "plain words").await);
        assert!(store.code_for(&id, Language::Python).await.is_some());
    }

    #[tokio::test]
    async fn empty_code_is_rejected() {
        let (store, id) = store_with_session("html+css+js").await;
        assert!(!store.store_user_code(&id, "").await);
    }
}
