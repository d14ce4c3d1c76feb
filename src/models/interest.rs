// src/models/interest.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'interests' table in the database.
/// One row per (user, subject); the level drives quiz personalization.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub user_id: i64,

    /// Free-text subject area, e.g. "Programming".
    pub subject: String,

    /// Interest strength on a 1-10 scale.
    pub level: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of the interest profile submitted during onboarding.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InterestInput {
    #[validate(length(min = 1, max = 100, message = "Subject must be 1-100 characters."))]
    pub subject: String,
    #[validate(range(min = 1, max = 10, message = "Level must be between 1 and 10."))]
    pub level: i64,
}

/// DTO replacing the caller's whole interest profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInterestsRequest {
    #[validate(length(min = 1, max = 20), nested)]
    pub interests: Vec<InterestInput>,
}
