//! Quiz grading

use regex::Regex;

use crate::domain::project::{QuestionFeedback, QuizAnswer, QuizVerification};

/// Grade a set of submitted answers.
///
/// Strings compare case-insensitively after trimming; other value types
/// compare for equality. Passing requires every answer to be correct,
/// which holds vacuously for an empty submission.
pub fn verify_answers(answers: &[QuizAnswer]) -> QuizVerification {
    let total = answers.len();
    let mut correct_count = 0;
    let mut question_feedback = Vec::with_capacity(total);

    for answer in answers {
        let (Some(given), Some(expected)) = (&answer.answer, &answer.correct_answer) else {
            question_feedback.push(QuestionFeedback {
                question_id: answer.question_id.clone(),
                correct: false,
                feedback: "Invalid answer format".to_string(),
            });
            continue;
        };

        let is_correct = match (given.as_str(), expected.as_str()) {
            (Some(g), Some(e)) => g.trim().eq_ignore_ascii_case(e.trim()),
            _ => given == expected,
        };

        if is_correct {
            correct_count += 1;
            question_feedback.push(QuestionFeedback {
                question_id: answer.question_id.clone(),
                correct: true,
                feedback: "Correct answer!".to_string(),
            });
        } else {
            let expected_text = expected
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| expected.to_string());
            question_feedback.push(QuestionFeedback {
                question_id: answer.question_id.clone(),
                correct: false,
                feedback: format!("Incorrect. The correct answer is: {expected_text}"),
            });
        }
    }

    let score = if total > 0 {
        (correct_count * 100 / total) as u32
    } else {
        0
    };
    let passed = correct_count == total;

    QuizVerification {
        correct: passed,
        score,
        feedback: if passed {
            "All answers correct!".to_string()
        } else {
            "Some answers were incorrect. Please try again.".to_string()
        },
        question_feedback,
    }
}

/// Normalize a step title to carry its step number exactly once
pub fn format_step_title(step_number: u32, title: &str) -> String {
    let stripped = Regex::new(r"^Step\s+\d+:\s*")
        .expect("static pattern")
        .replace(title, "");
    format!("Step {step_number}: {stripped}")
}
