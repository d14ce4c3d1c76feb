// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_attempts' table in the database.
///
/// Lifecycle is one-way: created in progress (completed_at null), then
/// completed exactly once (completed_at and score set). An abandoned
/// attempt simply stays in progress.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,

    /// Count of correct answers, set on completion.
    pub score: Option<i64>,

    /// Question count of the quiz at attempt start. Frozen so later quiz
    /// edits do not change the denominator of past attempts.
    pub max_score: i64,

    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'quiz_answers' table in the database.
/// At most one row per (attempt, question); resubmission overwrites.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,

    /// Whether the selected option carried the is_correct flag at
    /// submission time.
    pub is_correct: Option<bool>,
}

/// An attempt hydrated with its answers.
#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub answers: Vec<QuizAnswer>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: i64,
}

/// DTO for submitting (or re-submitting) an answer.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub selected_option_id: i64,
}
