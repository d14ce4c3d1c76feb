// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        interest::{Interest, UpdateInterestsRequest},
        user::{MeResponse, User},
    },
    utils::jwt::Claims,
};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, onboarded, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Subquery counts are cheap given the user_id indexes.
    let (quiz_count, attempt_count) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM quizzes WHERE user_id = ?),
            (SELECT COUNT(*) FROM quiz_attempts WHERE user_id = ?)
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        onboarded: user.onboarded,
        created_at: user.created_at,
        quiz_count,
        attempt_count,
    }))
}

/// List the current user's interests, strongest first.
pub async fn list_interests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let interests = sqlx::query_as::<_, Interest>(
        r#"
        SELECT id, user_id, subject, level, created_at
        FROM interests
        WHERE user_id = ?
        ORDER BY level DESC, subject ASC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(interests))
}

/// Replace the current user's interest profile.
///
/// Runs as one transaction: the old rows go away, the new set is written,
/// and the user is marked onboarded. Quiz generation reads this profile.
pub async fn update_interests(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateInterestsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM interests WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for interest in &payload.interests {
        sqlx::query(
            r#"
            INSERT INTO interests (user_id, subject, level, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&interest.subject)
        .bind(interest.level)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::BadRequest(format!("Duplicate interest subject '{}'", interest.subject))
            } else {
                AppError::from(e)
            }
        })?;
    }

    sqlx::query("UPDATE users SET onboarded = TRUE WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let interests = sqlx::query_as::<_, Interest>(
        r#"
        SELECT id, user_id, subject, level, created_at
        FROM interests
        WHERE user_id = ?
        ORDER BY level DESC, subject ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(interests))
}
