//! Session domain model

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::execution::Language;

/// A user's tutoring session.
///
/// Tracks where the user is in their project, how often they have run code
/// on each step, and the latest code they wrote per language. State is
/// process-lifetime only; a restart loses all sessions.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique identifier
    pub id: String,

    /// "python+streamlit" or "html+css+js"
    pub project_type: String,

    /// "beginner", "intermediate" or "expert"
    pub expertise_level: String,

    /// What the user set out to build
    pub project_idea: String,

    /// Zero-based index of the step the user is currently on
    pub current_step: u32,

    /// Total number of steps in the generated plan
    pub total_steps: u32,

    /// Raw generator response the plan was created from
    pub plan_json: String,

    /// Total number of code executions across the whole session
    pub execution_attempts: u32,

    /// Execution attempts broken down per step
    pub attempts_by_step: HashMap<u32, u32>,

    /// Latest user code per language
    pub code_files: HashMap<Language, String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        id: String,
        project_type: String,
        expertise_level: String,
        project_idea: String,
        plan_json: String,
        total_steps: u32,
    ) -> Self {
        Self {
            id,
            project_type,
            expertise_level,
            project_idea,
            current_step: 0,
            total_steps,
            plan_json,
            execution_attempts: 0,
            attempts_by_step: HashMap::new(),
            code_files: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attempt count for the step the user is currently on
    pub fn current_step_attempts(&self) -> u32 {
        self.attempts_by_step
            .get(&self.current_step)
            .copied()
            .unwrap_or(0)
    }
}
