// tests/common/mod.rs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sensiai_backend::{config::Config, error::AppError, llm::TextGenerator, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// A scripted stand-in for the generative text provider. Each call pops
/// the next queued response; calls beyond the script fail.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn push_err(&self, msg: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Err(msg.into()));
    }
}

#[async_trait]
impl TextGenerator for ScriptedProvider {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(AppError::GenerationFailed(msg)),
            None => Err(AppError::GenerationFailed(
                "no scripted response".to_string(),
            )),
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub provider: Arc<ScriptedProvider>,
}

/// Spawns the app on a random port against an in-memory database with a
/// scripted provider. Returns handles to all three.
pub async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let provider = Arc::new(ScriptedProvider::new());

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        gemini_api_key: String::new(),
        gemini_model: "scripted".to_string(),
        generation_timeout_secs: 2,
        generation_max_retries: 2,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        generator: provider.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        provider,
    }
}

/// Registers a fresh user and logs in. Returns (user_id, bearer token).
pub async fn register_and_login(client: &reqwest::Client, address: &str) -> (i64, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let register_resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse register json");

    let user_id = register_resp["id"].as_i64().expect("User id not found");

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    let token = login_resp["token"].as_str().expect("Token not found");

    (user_id, token.to_string())
}

/// Saves an interest profile for the user (completes onboarding).
pub async fn seed_interests(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    interests: &[(&str, i64)],
) {
    let body: Vec<serde_json::Value> = interests
        .iter()
        .map(|(subject, level)| serde_json::json!({ "subject": subject, "level": level }))
        .collect();

    let resp = client
        .put(format!("{}/api/profile/interests", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "interests": body }))
        .send()
        .await
        .expect("Failed to save interests");

    assert_eq!(resp.status().as_u16(), 200);
}

/// A well-formed provider payload: `question_count` questions, four
/// options each, the first option correct.
pub fn sample_quiz_json(title: &str, question_count: usize) -> String {
    let questions: Vec<serde_json::Value> = (0..question_count)
        .map(|i| {
            serde_json::json!({
                "questionText": format!("Question {}?", i),
                "explanation": format!("Explanation {}", i),
                "options": [
                    { "optionText": "Right answer", "isCorrect": true },
                    { "optionText": "Wrong A", "isCorrect": false },
                    { "optionText": "Wrong B", "isCorrect": false },
                    { "optionText": "Wrong C", "isCorrect": false }
                ]
            })
        })
        .collect();

    serde_json::json!({
        "title": title,
        "description": "A scripted quiz",
        "timeEstimate": "About 5 minutes",
        "questions": questions
    })
    .to_string()
}

/// Generates a quiz through the API with a scripted payload and returns
/// the hydrated quiz JSON.
pub async fn generate_quiz(
    app: &TestApp,
    client: &reqwest::Client,
    token: &str,
    question_count: usize,
) -> serde_json::Value {
    app.provider
        .push_ok(sample_quiz_json("Scripted Quiz", question_count));

    let resp = client
        .post(format!("{}/api/quizzes/generate", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "difficulty": "beginner" , "question_count": question_count }))
        .send()
        .await
        .expect("Generate request failed");

    assert_eq!(resp.status().as_u16(), 201);
    resp.json().await.expect("Failed to parse quiz json")
}
