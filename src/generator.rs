// src/generator.rs
//
// Quiz generation workflow: interest profile -> prompt -> provider call
// -> validated parse -> persisted quiz.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    config::{Config, DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, TOP_INTEREST_COUNT},
    error::AppError,
    llm::TextGenerator,
    models::{interest::Interest, quiz::Difficulty},
};

/// Typed shape of the provider's JSON payload. Unknown fields are ignored;
/// anything missing or mis-shaped is rejected by `parse_generated` before
/// a single row is written.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time_estimate: Option<String>,
    #[serde(default)]
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question_text: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub options: Vec<GeneratedOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOption {
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Generates one quiz for the user at the given difficulty.
///
/// The subject is picked at random from the user's top interests, which
/// avoids always generating the same quiz while still biasing toward
/// strong interests. Returns the id of the persisted quiz.
pub async fn generate_quiz(
    pool: &SqlitePool,
    provider: &Arc<dyn TextGenerator>,
    config: &Config,
    user_id: i64,
    difficulty: Difficulty,
    question_count: Option<u32>,
) -> Result<i64, AppError> {
    let interests = fetch_top_interests(pool, user_id).await?;

    if interests.is_empty() {
        return Err(AppError::BadRequest(
            "No interests on file. Complete onboarding before generating quizzes.".to_string(),
        ));
    }

    let subject = {
        let mut rng = rand::thread_rng();
        interests[rng.gen_range(0..interests.len())].subject.clone()
    };

    let count = clamp_question_count(question_count);

    generate_for_subject(pool, provider, config, user_id, &subject, difficulty, count).await
}

/// Generates one quiz per top interest, with difficulty derived from the
/// interest level. A failed interest is logged and skipped; the result is
/// whatever succeeded, possibly empty.
pub async fn generate_personalized(
    pool: &SqlitePool,
    provider: &Arc<dyn TextGenerator>,
    config: &Config,
    user_id: i64,
) -> Result<Vec<i64>, AppError> {
    let interests = fetch_top_interests(pool, user_id).await?;

    if interests.is_empty() {
        return Err(AppError::BadRequest(
            "No interests on file. Complete onboarding before generating quizzes.".to_string(),
        ));
    }

    let mut quiz_ids = Vec::new();
    for interest in &interests {
        let difficulty = difficulty_for_level(interest.level);
        match generate_for_subject(
            pool,
            provider,
            config,
            user_id,
            &interest.subject,
            difficulty,
            DEFAULT_QUESTION_COUNT,
        )
        .await
        {
            Ok(quiz_id) => quiz_ids.push(quiz_id),
            Err(e) => {
                tracing::warn!(
                    "Skipping personalized quiz for subject '{}': {}",
                    interest.subject,
                    e
                );
            }
        }
    }

    Ok(quiz_ids)
}

async fn fetch_top_interests(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<Interest>, AppError> {
    let interests = sqlx::query_as::<_, Interest>(
        r#"
        SELECT id, user_id, subject, level, created_at
        FROM interests
        WHERE user_id = ?
        ORDER BY level DESC, subject ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(TOP_INTEREST_COUNT)
    .fetch_all(pool)
    .await?;

    Ok(interests)
}

async fn generate_for_subject(
    pool: &SqlitePool,
    provider: &Arc<dyn TextGenerator>,
    config: &Config,
    user_id: i64,
    subject: &str,
    difficulty: Difficulty,
    question_count: u32,
) -> Result<i64, AppError> {
    let prompt = build_prompt(subject, difficulty, question_count);

    let raw = call_with_retry(provider, config, &prompt).await?;

    let generated = parse_generated(&raw)?;

    persist_quiz(pool, user_id, subject, difficulty, &generated).await
}

/// Calls the provider with a per-call timeout and a bounded
/// exponential-backoff retry. Callers see either text or a single
/// "generation failed" error once the budget is exhausted.
async fn call_with_retry(
    provider: &Arc<dyn TextGenerator>,
    config: &Config,
    prompt: &str,
) -> Result<String, AppError> {
    let timeout = Duration::from_secs(config.generation_timeout_secs);
    let mut backoff = Duration::from_millis(500);
    let mut last_err = None;

    let attempts = config.generation_max_retries.max(1);
    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, provider.generate(prompt)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => {
                tracing::warn!("Provider call failed (attempt {}): {}", attempt, e);
                last_err = Some(e);
            }
            Err(_) => {
                tracing::warn!("Provider call timed out (attempt {})", attempt);
                last_err = Some(AppError::GenerationFailed(
                    "provider call timed out".to_string(),
                ));
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(last_err
        .unwrap_or_else(|| AppError::GenerationFailed("provider call failed".to_string())))
}

fn clamp_question_count(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_QUESTION_COUNT)
        .clamp(1, MAX_QUESTION_COUNT)
}

/// Buckets a 1-10 interest level into the three difficulty bands.
fn difficulty_for_level(level: i64) -> Difficulty {
    match level {
        i64::MIN..=3 => Difficulty::Beginner,
        4..=7 => Difficulty::Intermediate,
        _ => Difficulty::Advanced,
    }
}

fn build_prompt(subject: &str, difficulty: Difficulty, question_count: u32) -> String {
    format!(
        "Create a {difficulty} level quiz about {subject} with exactly {count} multiple-choice \
         questions. Respond with a single JSON object and nothing else, shaped as:\n\
         {{\n\
           \"title\": \"...\",\n\
           \"description\": \"...\",\n\
           \"timeEstimate\": \"...\",\n\
           \"questions\": [\n\
             {{\n\
               \"questionText\": \"...\",\n\
               \"explanation\": \"...\",\n\
               \"options\": [\n\
                 {{\"optionText\": \"...\", \"isCorrect\": true}},\n\
                 {{\"optionText\": \"...\", \"isCorrect\": false}},\n\
                 {{\"optionText\": \"...\", \"isCorrect\": false}},\n\
                 {{\"optionText\": \"...\", \"isCorrect\": false}}\n\
               ]\n\
             }}\n\
           ]\n\
         }}\n\
         Each question must have exactly four options with exactly one marked correct. \
         The explanation should briefly justify the correct answer.",
        difficulty = difficulty.as_str(),
        subject = subject,
        count = question_count,
    )
}

/// Parses and shape-checks the provider's response.
///
/// The text may wrap the JSON object in Markdown code fences or prose, so
/// parsing starts at the first '{' and ends at the last '}'. A payload
/// that deserializes but violates the generation contract (empty title,
/// no questions, a question without exactly one correct option) is
/// rejected as malformed rather than persisted partially.
fn parse_generated(raw: &str) -> Result<GeneratedQuiz, AppError> {
    let start = raw.find('{');
    let end = raw.rfind('}');

    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(AppError::GenerationFailed(
                "generation returned malformed data: no JSON object found".to_string(),
            ));
        }
    };

    let quiz: GeneratedQuiz = serde_json::from_str(json).map_err(|e| {
        AppError::GenerationFailed(format!("generation returned malformed data: {}", e))
    })?;

    if quiz.title.trim().is_empty() {
        return Err(AppError::GenerationFailed(
            "generation returned malformed data: empty title".to_string(),
        ));
    }

    if quiz.questions.is_empty() {
        return Err(AppError::GenerationFailed(
            "generation returned malformed data: no questions".to_string(),
        ));
    }

    for (i, question) in quiz.questions.iter().enumerate() {
        if question.question_text.trim().is_empty() {
            return Err(AppError::GenerationFailed(format!(
                "generation returned malformed data: question {} has empty text",
                i
            )));
        }
        if question.options.is_empty() {
            return Err(AppError::GenerationFailed(format!(
                "generation returned malformed data: question {} has no options",
                i
            )));
        }
        let correct = question.options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            return Err(AppError::GenerationFailed(format!(
                "generation returned malformed data: question {} has {} correct options",
                i, correct
            )));
        }
    }

    Ok(quiz)
}

/// Persists a parsed quiz.
///
/// Writes proceed row by row rather than in one large transaction, to
/// keep individual statements small. The quiz is inserted as a draft
/// (is_generated = false) and the flag is flipped only after the last
/// option has landed, so readers can tell a finished quiz from one whose
/// generation died partway through.
async fn persist_quiz(
    pool: &SqlitePool,
    user_id: i64,
    subject: &str,
    difficulty: Difficulty,
    generated: &GeneratedQuiz,
) -> Result<i64, AppError> {
    let now = Utc::now();

    let quiz_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes
            (user_id, title, description, difficulty, time_estimate,
             subject_area, is_generated, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, FALSE, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&generated.title)
    .bind(&generated.description)
    .bind(difficulty)
    .bind(&generated.time_estimate)
    .bind(subject)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert generated quiz: {:?}", e);
        AppError::from(e)
    })?;

    for (q_index, question) in generated.questions.iter().enumerate() {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quiz_questions (quiz_id, question_text, explanation, order_index)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(&question.question_text)
        .bind(&question.explanation)
        .bind(q_index as i64)
        .fetch_one(pool)
        .await?;

        for (o_index, option) in question.options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quiz_options (question_id, option_text, is_correct, order_index)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(question_id)
            .bind(&option.option_text)
            .bind(option.is_correct)
            .bind(o_index as i64)
            .execute(pool)
            .await?;
        }
    }

    sqlx::query("UPDATE quizzes SET is_generated = TRUE, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(quiz_id)
        .execute(pool)
        .await?;

    Ok(quiz_id)
}
