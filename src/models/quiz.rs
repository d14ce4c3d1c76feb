// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Quiz difficulty level. Stored as lowercase text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// Owning user.
    pub user_id: i64,

    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,

    /// Human-readable estimate, e.g. "About 10 minutes".
    pub time_estimate: Option<String>,

    /// Subject area the quiz was generated for.
    pub subject_area: String,

    /// False while the generator is still writing questions; flipped to
    /// true once the last row has landed. A quiz that stays false is a
    /// partially generated draft.
    pub is_generated: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'quiz_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,

    /// Explanation shown after answering.
    pub explanation: Option<String>,

    /// Zero-based display order, dense within a quiz.
    pub order_index: i64,
}

/// Represents the 'quiz_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i64,
}

/// A question with its options, ordered by order_index.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub options: Vec<QuizOption>,
}

/// A quiz hydrated with its questions and options.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionDetail>,
}

/// DTO for requesting a single quiz generation.
#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub difficulty: Difficulty,

    /// Clamped to 1..=MAX_QUESTION_COUNT by the generator.
    pub question_count: Option<u32>,
}
