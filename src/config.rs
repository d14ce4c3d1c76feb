// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Hard cap on the number of questions a single generation call may request.
/// Bounds the cost and latency of the provider call.
pub const MAX_QUESTION_COUNT: u32 = 10;

/// Question count used when the caller does not specify one.
pub const DEFAULT_QUESTION_COUNT: u32 = 5;

/// How many of the user's strongest interests are considered when picking
/// a quiz subject or generating the personalized batch.
pub const TOP_INTEREST_COUNT: i64 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Generative text provider settings.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub generation_timeout_secs: u64,
    pub generation_max_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let gemini_api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let generation_timeout_secs = env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let generation_max_retries = env::var("GENERATION_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            gemini_api_key,
            gemini_model,
            generation_timeout_secs,
            generation_max_retries,
        }
    }
}
