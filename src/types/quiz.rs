//! Quiz and question types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A titled set of questions tied to one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Questions in ordinal order
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// One question with exactly four candidate answers.
///
/// The correct answer is stored as an index into `answers`, which keeps
/// grading unambiguous even if two answer strings were ever equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    /// Ordinal index within the quiz
    pub idx: u32,
    pub question: String,
    pub answers: Vec<String>,
    pub correct_index: u32,
}

impl Question {
    /// The correct answer text
    pub fn correct_answer(&self) -> &str {
        &self.answers[self.correct_index as usize]
    }
}

/// Quiz shape as produced by the structured completion, before validation.
///
/// The model emits the correct answer as a string drawn from the answer set;
/// validation converts it to an index.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    pub questions: Vec<QuestionDraft>,
}

/// One question as produced by the structured completion
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    pub question: String,
    pub answers: Vec<String>,
    #[serde(rename = "correct_answer", alias = "correctAnswer")]
    pub correct_answer: String,
}

/// A validated question ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question: String,
    pub answers: Vec<String>,
    pub correct_index: u32,
}

/// Result of grading one submitted answer sheet
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub quiz_id: Uuid,
    pub total: usize,
    pub correct: usize,
    /// Per-question verdicts in ordinal order
    pub results: Vec<QuestionGrade>,
}

/// Verdict for one question
#[derive(Debug, Clone, Serialize)]
pub struct QuestionGrade {
    pub idx: u32,
    pub selected_index: Option<u32>,
    pub correct_index: u32,
    pub correct: bool,
}
