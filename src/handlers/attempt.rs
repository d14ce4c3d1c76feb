// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::attempt::{
        AttemptDetail, QuizAnswer, QuizAttempt, StartAttemptRequest, SubmitAnswerRequest,
    },
    utils::jwt::Claims,
};

async fn fetch_attempt<'e, E>(
    executor: E,
    attempt_id: i64,
    user_id: i64,
) -> Result<Option<QuizAttempt>, AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_id, score, max_score, started_at, completed_at
        FROM quiz_attempts
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(attempt_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(attempt)
}

async fn fetch_answers(pool: &SqlitePool, attempt_id: i64) -> Result<Vec<QuizAnswer>, AppError> {
    let answers = sqlx::query_as::<_, QuizAnswer>(
        r#"
        SELECT id, attempt_id, question_id, selected_option_id, is_correct
        FROM quiz_answers
        WHERE attempt_id = ?
        ORDER BY question_id ASC
        "#,
    )
    .bind(attempt_id)
    .fetch_all(pool)
    .await?;

    Ok(answers)
}

/// Starts a new attempt on a quiz.
///
/// max_score is frozen to the quiz's question count at this moment, so
/// later quiz edits do not change the denominator of this attempt.
/// Several in-progress attempts on the same quiz are allowed.
pub async fn start_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let quiz = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM quizzes WHERE id = ? AND user_id = ?",
    )
    .bind(payload.quiz_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    if quiz.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let question_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = ?",
    )
    .bind(payload.quiz_id)
    .fetch_one(&pool)
    .await?;

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        INSERT INTO quiz_attempts (user_id, quiz_id, score, max_score, started_at, completed_at)
        VALUES (?, ?, NULL, ?, ?, NULL)
        RETURNING id, user_id, quiz_id, score, max_score, started_at, completed_at
        "#,
    )
    .bind(user_id)
    .bind(payload.quiz_id)
    .bind(question_count)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start attempt: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submits (or re-submits) an answer for one question of an attempt.
///
/// The selected option must belong to the given question and the question
/// to the attempt's quiz; correctness is computed here from the option's
/// flag. Re-answering the same question overwrites the earlier row (last
/// write wins), which is what lets users go back and change an answer.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let attempt = fetch_attempt(&pool, attempt_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.completed_at.is_some() {
        return Err(AppError::Conflict("Attempt already completed".to_string()));
    }

    // The question must be part of the attempt's quiz.
    let question_quiz_id = sqlx::query_scalar::<_, i64>(
        "SELECT quiz_id FROM quiz_questions WHERE id = ?",
    )
    .bind(payload.question_id)
    .fetch_optional(&pool)
    .await?;

    if question_quiz_id != Some(attempt.quiz_id) {
        return Err(AppError::BadRequest(
            "Invalid option or question".to_string(),
        ));
    }

    // The option must belong to the question; its flag decides correctness.
    let is_correct = sqlx::query_scalar::<_, bool>(
        "SELECT is_correct FROM quiz_options WHERE id = ? AND question_id = ?",
    )
    .bind(payload.selected_option_id)
    .bind(payload.question_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::BadRequest(
        "Invalid option or question".to_string(),
    ))?;

    let answer = sqlx::query_as::<_, QuizAnswer>(
        r#"
        INSERT INTO quiz_answers (attempt_id, question_id, selected_option_id, is_correct)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (attempt_id, question_id) DO UPDATE SET
            selected_option_id = excluded.selected_option_id,
            is_correct = excluded.is_correct
        RETURNING id, attempt_id, question_id, selected_option_id, is_correct
        "#,
    )
    .bind(attempt_id)
    .bind(payload.question_id)
    .bind(payload.selected_option_id)
    .bind(is_correct)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to submit answer: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(answer))
}

/// Completes an attempt and computes its score.
///
/// The transition is one-way: completing twice is a conflict and leaves
/// the stored score untouched. Score counts correct answers only;
/// unanswered questions contribute nothing.
pub async fn complete_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let attempt = fetch_attempt(&mut *tx, attempt_id, user_id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.completed_at.is_some() {
        return Err(AppError::Conflict("Attempt already completed".to_string()));
    }

    let score = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_answers WHERE attempt_id = ? AND is_correct = TRUE",
    )
    .bind(attempt_id)
    .fetch_one(&mut *tx)
    .await?;

    let completed_at = Utc::now();

    sqlx::query("UPDATE quiz_attempts SET score = ?, completed_at = ? WHERE id = ?")
        .bind(score)
        .bind(completed_at)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let attempt = QuizAttempt {
        score: Some(score),
        completed_at: Some(completed_at),
        ..attempt
    };
    let answers = fetch_answers(&pool, attempt_id).await?;

    Ok(Json(AttemptDetail { attempt, answers }))
}

/// Fetches one attempt with its answers.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_attempt(&pool, attempt_id, claims.user_id())
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let answers = fetch_answers(&pool, attempt_id).await?;

    Ok(Json(AttemptDetail { attempt, answers }))
}

/// Lists the current user's attempts, newest first.
pub async fn list_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, quiz_id, score, max_score, started_at, completed_at
        FROM quiz_attempts
        WHERE user_id = ?
        ORDER BY started_at DESC, id DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}
