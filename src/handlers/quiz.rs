// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::AppError,
    generator,
    llm::TextGenerator,
    models::quiz::{GenerateQuizRequest, QuestionDetail, Quiz, QuizDetail, QuizOption, QuizQuestion},
    utils::jwt::Claims,
};

/// Loads a quiz owned by the user, hydrated with its questions (ordered
/// by order_index) and each question's options (ordered by order_index).
/// Returns None when the quiz is absent or belongs to someone else.
pub async fn fetch_quiz_detail(
    pool: &SqlitePool,
    quiz_id: i64,
    user_id: i64,
) -> Result<Option<QuizDetail>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, user_id, title, description, difficulty, time_estimate,
               subject_area, is_generated, created_at, updated_at
        FROM quizzes
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(quiz) = quiz else {
        return Ok(None);
    };

    let question_rows = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_text, explanation, order_index
        FROM quiz_questions
        WHERE quiz_id = ?
        ORDER BY order_index ASC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut questions = Vec::with_capacity(question_rows.len());
    for question in question_rows {
        let options = sqlx::query_as::<_, QuizOption>(
            r#"
            SELECT id, question_id, option_text, is_correct, order_index
            FROM quiz_options
            WHERE question_id = ?
            ORDER BY order_index ASC
            "#,
        )
        .bind(question.id)
        .fetch_all(pool)
        .await?;

        questions.push(QuestionDetail { question, options });
    }

    Ok(Some(QuizDetail { quiz, questions }))
}

/// Lists the current user's quizzes, newest first.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, user_id, title, description, difficulty, time_estimate,
               subject_area, is_generated, created_at, updated_at
        FROM quizzes
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(quizzes))
}

/// Fetches one quiz with questions and options.
///
/// Note: options carry their is_correct flag; clients rendering an
/// in-progress attempt are expected not to display it.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = fetch_quiz_detail(&pool, quiz_id, claims.user_id())
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(detail))
}

/// Deletes a quiz and everything hanging off it.
///
/// Rows go in dependency order (answers, attempts, options, questions,
/// quiz) inside one transaction, so a partial failure cannot leave
/// orphans.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM quizzes WHERE id = ? AND user_id = ?",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if owned.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    sqlx::query(
        r#"
        DELETE FROM quiz_answers
        WHERE question_id IN (SELECT id FROM quiz_questions WHERE quiz_id = ?)
        "#,
    )
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM quiz_attempts WHERE quiz_id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM quiz_options
        WHERE question_id IN (SELECT id FROM quiz_questions WHERE quiz_id = ?)
        "#,
    )
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM quiz_questions WHERE quiz_id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to delete quiz {}: {:?}", quiz_id, e);
        AppError::from(e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Generates one quiz from the user's interest profile.
pub async fn generate_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(provider): State<Arc<dyn TextGenerator>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let quiz_id = generator::generate_quiz(
        &pool,
        &provider,
        &config,
        user_id,
        payload.difficulty,
        payload.question_count,
    )
    .await?;

    let detail = fetch_quiz_detail(&pool, quiz_id, user_id)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError(format!("generated quiz {} vanished", quiz_id))
        })?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Generates a batch of quizzes, one per top interest.
///
/// Partial success is not an error: a quiz that fails to generate is
/// skipped and the rest are returned.
pub async fn generate_personalized(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(provider): State<Arc<dyn TextGenerator>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let quiz_ids = generator::generate_personalized(&pool, &provider, &config, user_id).await?;

    let mut quizzes = Vec::with_capacity(quiz_ids.len());
    for quiz_id in quiz_ids {
        if let Some(detail) = fetch_quiz_detail(&pool, quiz_id, user_id).await? {
            quizzes.push(detail);
        }
    }

    Ok((StatusCode::CREATED, Json(quizzes)))
}
