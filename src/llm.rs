// src/llm.rs

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// Abstraction over the generative text provider.
///
/// The quiz generator only needs "prompt in, text out"; model choice,
/// temperature and transport are configuration of the concrete client.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Google Generative Language API (Gemini).
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Override the API endpoint, e.g. to point at a local stub.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let req_body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .http
            .post(&url)
            .json(&req_body)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed(format!("provider request failed: {}", e)))?;

        if !res.status().is_success() {
            return Err(AppError::GenerationFailed(format!(
                "provider returned status {}",
                res.status()
            )));
        }

        let parsed: GenerateContentResponse = res.json().await.map_err(|e| {
            AppError::GenerationFailed(format!("provider response unreadable: {}", e))
        })?;

        parsed
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    c.remove(0).content.parts
                }
            })
            .and_then(|parts| parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| {
                AppError::GenerationFailed("provider response contained no text".to_string())
            })
    }
}
