//! Project and quiz domain model

use serde::{Deserialize, Serialize};

/// One multiple-choice question attached to a project step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// A submitted quiz answer, paired with the expected answer
#[derive(Debug, Clone, Deserialize)]
pub struct QuizAnswer {
    pub question_id: Option<String>,
    pub answer: Option<serde_json::Value>,
    pub correct_answer: Option<serde_json::Value>,
}

/// Per-question grading feedback
#[derive(Debug, Clone, Serialize)]
pub struct QuestionFeedback {
    pub question_id: Option<String>,
    pub correct: bool,
    pub feedback: String,
}

/// Aggregate quiz grading result
#[derive(Debug, Clone, Serialize)]
pub struct QuizVerification {
    pub correct: bool,
    pub score: u32,
    pub feedback: String,
    pub question_feedback: Vec<QuestionFeedback>,
}

/// Context handed to the step generator when starting a project
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub project_type: String,
    pub expertise_level: String,
    pub project_idea: String,
}

/// Context handed to the step generator for the next step of a project
#[derive(Debug, Clone)]
pub struct NextStepContext {
    pub project_type: String,
    pub expertise_level: String,
    pub project_idea: String,
    pub current_step: u32,
    pub user_code: Option<String>,
    pub user_question: Option<String>,
    pub user_understanding: Option<String>,
}
