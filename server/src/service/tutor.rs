//! Project tutoring service
//!
//! Orchestrates the step generator: builds prompts, validates the structured
//! responses, and keeps session bookkeeping in sync with the user's
//! progress. All model specifics live behind the [`StepGenerator`] trait.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::project::{NextStepContext, PlanContext, QuizQuestion};
use crate::error::{Error, Result};
use crate::infra::gemini::StepGenerator;
use crate::service::quiz::format_step_title;
use crate::service::session::SessionStore;

/// Attempts on the current step after which a full solution is given
/// instead of hints
const SOLUTION_THRESHOLD: u32 = 4;

pub struct TutorService {
    generator: Arc<dyn StepGenerator>,
    sessions: Arc<SessionStore>,
}

/// Result of starting a project
#[derive(Debug)]
pub struct StartedProject {
    pub session_id: String,
    pub plan_json: String,
}

/// Parameters for an "ask a question" request
#[derive(Debug)]
pub struct QuestionParams {
    pub session_id: String,
    pub question: String,
    pub code: String,
    pub project_type: String,
    pub is_error_related: bool,
}

impl TutorService {
    pub fn new(generator: Arc<dyn StepGenerator>, sessions: Arc<SessionStore>) -> Self {
        Self {
            generator,
            sessions,
        }
    }

    /// Generate a project plan and open a session for it
    pub async fn start_project(
        &self,
        project_type: String,
        expertise_level: String,
        project_idea: Option<String>,
    ) -> Result<StartedProject> {
        let idea = project_idea
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Simple Project".to_string());

        let ctx = PlanContext {
            project_type: project_type.clone(),
            expertise_level: expertise_level.clone(),
            project_idea: idea,
        };

        let plan = self.generator.generate_structured(&plan_prompt(&ctx)).await?;
        validate_plan(&plan)?;

        let plan_json = plan.to_string();
        let session_id = self
            .sessions
            .create(
                project_type,
                expertise_level,
                project_idea
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "AI suggested project".to_string()),
                plan_json.clone(),
            )
            .await;

        debug!(session = %session_id, "Started project");
        Ok(StartedProject {
            session_id,
            plan_json,
        })
    }

    /// Produce the next step of a session's project, or a completion
    /// message once the plan is exhausted.
    pub async fn next_step(&self, session_id: &str, ctx: NextStepContext) -> Result<String> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let user_code = ctx.user_code.clone().unwrap_or_default();
        if user_code.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "Please write some code for the current step before proceeding to the next step."
                    .to_string(),
            ));
        }

        let next = ctx.current_step + 1;
        if next > session.total_steps {
            debug!(session = %session_id, total_steps = session.total_steps, "Project completed");
            return Ok(serde_json::json!({
                "project_completed": true,
                "message": completion_message(&session.project_type, &session.project_idea),
            })
            .to_string());
        }

        self.sessions.store_user_code(session_id, &user_code).await;

        let mut step = self
            .generator
            .generate_structured(&next_step_prompt(&ctx))
            .await?;
        validate_step(&step)?;

        if let Some(title) = step.get("title").and_then(Value::as_str) {
            let normalized = format_step_title(next, title);
            step["title"] = Value::String(normalized);
        }

        self.sessions.increment_step(session_id).await;
        Ok(step.to_string())
    }

    /// Quiz questions for a step: the step's own questions when present,
    /// otherwise freshly generated ones, otherwise a static fallback.
    pub async fn step_questions(&self, step: &Value) -> Vec<QuizQuestion> {
        if let Some(questions) = step.get("quiz_questions") {
            if let Ok(parsed) = serde_json::from_value::<Vec<QuizQuestion>>(questions.clone()) {
                if !parsed.is_empty() {
                    return parsed;
                }
            }
        }

        let title = step.get("title").and_then(Value::as_str).unwrap_or("Coding step");
        let description = step
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("No description available");

        match self
            .generator
            .generate_structured(&quiz_prompt(title, description))
            .await
        {
            Ok(value) => {
                let value = if value.is_array() {
                    value
                } else {
                    Value::Array(vec![value])
                };
                serde_json::from_value(value).unwrap_or_else(|_| fallback_questions(title))
            }
            Err(_) => fallback_questions(title),
        }
    }

    /// Answer a user's question about their code or the current step.
    ///
    /// Error-related questions are answered with hints only until the user
    /// has made enough execution attempts, after which a full solution is
    /// allowed.
    pub async fn ask_question(&self, params: QuestionParams) -> Result<String> {
        let session = self
            .sessions
            .get(&params.session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(params.session_id.clone()))?;

        let attempts = self.sessions.current_step_attempts(&params.session_id).await;
        let context = format!(
            "I'm building a project using {} with expertise level {}.\n\
             Project idea: {}\n\n\
             Here is my current code:\n```\n{}\n```\n\n\
             My question is: {}",
            params.project_type,
            session.expertise_level,
            session.project_idea,
            params.code,
            params.question,
        );
        let trial = trial_message(attempts);

        let prompt = if params.is_error_related {
            if attempts >= SOLUTION_THRESHOLD {
                solution_prompt(&context, attempts, &trial)
            } else {
                hint_prompt(&context, attempts, &trial)
            }
        } else {
            general_prompt(&context, &trial)
        };

        self.generator.generate_text(&prompt).await
    }
}

/// "This is your Nth attempt!" prefix with an English ordinal suffix
fn trial_message(attempts: u32) -> String {
    let suffix = match attempts {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("This is your {attempts}{suffix} attempt! ")
}

/// Closing message once every step of the plan is done
fn completion_message(project_type: &str, project_idea: &str) -> String {
    let mut message = format!(
        "Congratulations! You have successfully completed your {project_idea} project. "
    );

    if project_type.contains("html+css+js") {
        message.push_str(
            "You've built a complete web application from scratch, learning HTML structure, \
             CSS styling, and JavaScript functionality along the way.",
        );
    } else if project_type.contains("python+streamlit") {
        message.push_str(
            "You've created a fully functional data application with Python and Streamlit, \
             learning key concepts in data visualization and interactive dashboards.",
        );
    } else {
        message.push_str(
            "You've mastered each step of the development process and now have a complete \
             project to showcase your skills.",
        );
    }

    message
}

/// Estimate a step count from the project idea's complexity keywords and
/// the user's expertise level
pub fn suggested_step_count(project_idea: &str, expertise_level: &str) -> u32 {
    const COMPLEXITY_KEYWORDS: &[(&str, u32)] = &[
        ("simple", 6),
        ("basic", 6),
        ("beginner", 6),
        ("easy", 6),
        ("straightforward", 6),
        ("intermediate", 8),
        ("moderate", 8),
        ("medium", 8),
        ("complex", 10),
        ("advanced", 10),
        ("sophisticated", 10),
        ("comprehensive", 12),
        ("complete", 12),
        ("full", 12),
        ("extensive", 12),
    ];

    let mut steps = 8;
    if project_idea.is_empty() {
        return steps;
    }

    let idea = project_idea.to_lowercase();
    for (keyword, count) in COMPLEXITY_KEYWORDS {
        if idea.contains(keyword) {
            steps = *count;
            break;
        }
    }

    match expertise_level {
        "beginner" => steps = steps.saturating_sub(1).max(6),
        "expert" => steps = (steps + 1).min(12),
        _ => {}
    }

    if idea.contains("dashboard") || idea.contains("visualization") {
        steps = (steps + 1).min(12);
    }
    if idea.contains("game") {
        steps = (steps + 2).min(12);
    }

    steps
}

fn plan_prompt(ctx: &PlanContext) -> String {
    let steps = suggested_step_count(&ctx.project_idea, &ctx.expertise_level);
    format!(
        "I want to build a project using {project_type}. My expertise level is {level}.\n\
         Specifically, I want to build: {idea}\n\n\
         I need a project broken down into multiple small steps (levels) where each level \
         completes a small part of the project, like a game with different levels.\n\n\
         Please format the content of each step differently based on my expertise level:\n\
         - beginner: Provide small code snippets with detailed explanation of each line\n\
         - intermediate: Provide text instructions first with full steps of what to do \
         (don't give code initially)\n\
         - expert: Provide only workflow description, very minimal guidance\n\n\
         Please provide:\n\
         1. A brief introduction to the project\n\
         2. A clear breakdown of steps to complete it (approximately {steps} different steps/levels)\n\
         3. The first step with detailed explanation in the appropriate format for my expertise level\n\n\
         IMPORTANT: ALL STEPS MUST BE DIRECTLY RELATED TO \"{idea}\" AND BUILD ON EACH OTHER \
         SEQUENTIALLY. THE PROJECT SHOULD BE FULLY COMPLETE BY THE FINAL STEP.\n\n\
         Format your response as a JSON object with these fields:\n\
         - project_title: A descriptive name for the {idea} project\n\
         - project_description: A brief overview of what we're building\n\
         - total_steps: Total number of steps to complete the project (should be around {steps})\n\
         - steps: An array of step objects, where each step has:\n\
           - step_number: The numerical order of this step (1, 2, 3, etc.)\n\
           - title: Step title\n\
           - description: Detailed explanation formatted for my expertise level\n\
           - language: The programming language for this step (html, css, javascript, python)\n\
           - code: Starter code for this step (for beginners), or empty for intermediate/expert\n\
           - expected_outcome: What should happen after completing this step\n\
           - quiz_questions: An array of quiz questions, each with question_id, question_text, \
         options (4 possible answers) and correct_answer (exactly as written in options)\n\n\
         For this request, just include the first step in the 'steps' array.\n\n\
         IMPORTANT: Return only the raw JSON without any markdown formatting or code blocks.",
        project_type = ctx.project_type,
        level = ctx.expertise_level,
        idea = ctx.project_idea,
    )
}

fn next_step_prompt(ctx: &NextStepContext) -> String {
    let mut prompt = format!(
        "I'm building a project using {project_type} with expertise level {level}.\n\
         Project idea: {idea}\n\n\
         I have completed step {current} and here is my code:\n```\n{code}\n```\n",
        project_type = ctx.project_type,
        level = ctx.expertise_level,
        idea = ctx.project_idea,
        current = ctx.current_step,
        code = ctx.user_code.as_deref().unwrap_or("No code provided"),
    );

    if let Some(question) = ctx.user_question.as_deref().filter(|q| !q.is_empty()) {
        prompt.push_str(&format!("\nI have a question: {question}\n"));
    }
    if let Some(understanding) = ctx.user_understanding.as_deref().filter(|u| !u.is_empty()) {
        prompt.push_str(&format!("\nThis is my understanding of the step: {understanding}\n"));
    }

    prompt.push_str(&format!(
        "\nPlease provide step {next} for the \"{idea}\" project with:\n\
         1. Detailed feedback on my current code - be specific about what I did well and what \
         could be improved\n\
         2. Detailed explanation of the next step, formatted based on my expertise level\n\
         3. Starter code for the next step (if I'm a beginner)\n\n\
         IMPORTANT: This step MUST continue building on the previous step and be directly \
         related to the \"{idea}\" project.\n\n\
         Format your response as a JSON object with these fields:\n\
         - step_number: {next}\n\
         - title: Step title\n\
         - feedback: Feedback on the user's current code\n\
         - description: Detailed explanation of this step\n\
         - language: The programming language for this step (html, css, javascript, python)\n\
         - code: Starter code for this step (detailed for beginners, minimal or empty for others)\n\
         - expected_outcome: What should happen after completing this step\n\
         - quiz_questions: An array of quiz questions, each with question_id, question_text, \
         options (4 possible answers) and correct_answer (exactly as written in options)\n\n\
         IMPORTANT: Return only the raw JSON without any markdown formatting or code blocks.",
        next = ctx.current_step + 1,
        idea = ctx.project_idea,
    ));

    prompt
}

fn quiz_prompt(title: &str, description: &str) -> String {
    format!(
        "Generate 2-3 multiple choice questions about the following step in a coding project.\n\n\
         The step is about: {title}\n\
         Step description: {description}\n\n\
         These questions should:\n\
         1. Test understanding of key concepts from this specific step ONLY\n\
         2. Be simple and straightforward\n\
         3. Each have exactly 4 possible answers with only one correct answer\n\
         4. Cover different aspects of what was taught in this step\n\n\
         Respond with a JSON array of question objects, each containing question_id, \
         question_text, options and correct_answer (exactly as written in options).\n\n\
         Only return the JSON array with no additional text."
    )
}

fn hint_prompt(context: &str, attempts: u32, trial: &str) -> String {
    format!(
        "{context}\n\n\
         The user has made only {attempts} attempts to solve this problem.\n\
         DO NOT give them the full solution yet. Instead, provide helpful debugging hints \
         that will guide them toward fixing the error on their own.\n\n\
         Start your response with \"{trial}\" followed by an encouraging message like \
         \"Keep trying!\" or \"You're on the right track!\".\n\n\
         Focus on:\n\
         1. What might be causing the error\n\
         2. General approaches to fix it\n\
         3. Documentation references or concepts they should look up\n\n\
         DO NOT provide any direct code solutions or exact fixes."
    )
}

fn solution_prompt(context: &str, attempts: u32, trial: &str) -> String {
    format!(
        "{context}\n\n\
         The user has made {attempts} attempts to solve this problem.\n\
         Since they've been struggling, provide a complete solution with detailed code.\n\
         Be very clear and thorough in explaining both the error and how to fix it.\n\n\
         Start your response with \"{trial}\" followed by an encouraging message like \
         \"Keep going!\" or \"You're making progress!\".\n\
         Then provide your detailed solution."
    )
}

fn general_prompt(context: &str, trial: &str) -> String {
    format!(
        "{context}\n\n\
         Start your response with \"{trial}\" followed by a brief acknowledgment of their \
         question.\n\n\
         Please provide a helpful answer to this general question, considering the user's \
         expertise level. Include code examples if relevant to illustrate concepts, but focus \
         on explaining the concepts clearly."
    )
}

fn validate_plan(plan: &Value) -> Result<()> {
    for field in ["project_title", "project_description", "total_steps", "steps"] {
        if plan.get(field).is_none() {
            return Err(Error::StepGeneration(format!(
                "Missing required field in project data: {field}"
            )));
        }
    }

    let steps = plan["steps"]
        .as_array()
        .ok_or_else(|| Error::StepGeneration("Steps must be a list".to_string()))?;
    let first = steps
        .first()
        .ok_or_else(|| Error::StepGeneration("Project must have at least one step".to_string()))?;

    validate_step(first)
}

fn validate_step(step: &Value) -> Result<()> {
    for field in ["title", "description", "expected_outcome"] {
        if step.get(field).is_none() {
            return Err(Error::StepGeneration(format!(
                "Missing required field in step data: {field}"
            )));
        }
    }
    Ok(())
}

fn fallback_questions(title: &str) -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            question_id: "q1".to_string(),
            question_text: format!("What is the main topic of the step '{title}'?"),
            options: vec![
                "HTML basics".to_string(),
                "CSS styling".to_string(),
                "JavaScript functions".to_string(),
                "Python coding".to_string(),
            ],
            correct_answer: "HTML basics".to_string(),
        },
        QuizQuestion {
            question_id: "q2".to_string(),
            question_text: "What is the expected outcome of this step?".to_string(),
            options: vec![
                "A styled webpage".to_string(),
                "A functional form".to_string(),
                "Basic HTML structure".to_string(),
                "Running Python code".to_string(),
            ],
            correct_answer: "Basic HTML structure".to_string(),
        },
    ]
}
