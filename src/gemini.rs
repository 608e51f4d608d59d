//! Gemini API client
//!
//! Text generation against Google's Generative Language REST API.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::answer::LanguageModel;
use crate::error::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Models tried in order when none is configured explicitly
pub const PREFERRED_MODELS: &[&str] = &[
    "gemini-1.5-pro-latest",
    "gemini-1.5-flash-latest",
    "gemini-2.0-pro-exp",
    "gemini-2.0-flash-lite",
];

/// Header carrying the API key; keeps the key out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

const HARM_CATEGORIES: &[&str] = &[
    "HARASSMENT",
    "HATE_SPEECH",
    "SEXUALLY_EXPLICIT",
    "DANGEROUS_CONTENT",
];

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub max_output_tokens: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 1.0,
            top_k: 32,
            max_output_tokens: 4096,
        }
    }
}

/// Connection settings for the client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub generation: GenerationConfig,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model: String = model.into();
        Self {
            api_key: api_key.into(),
            model: normalize_model_name(&model).to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            generation: GenerationConfig::default(),
        }
    }
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> crate::Result<Self> {
        let client = build_http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate text for a single prompt
    pub async fn generate(&self, prompt: &str) -> crate::Result<String> {
        ensure_api_key(&self.config.api_key)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: self.config.generation,
            safety_settings: default_safety_settings(),
        };

        info!("Calling Gemini API (model: {})", self.config.model);

        let response = self.client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                PipelineError::HttpError(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(PipelineError::LlmError(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            PipelineError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let answer = gemini_response.first_text()?;
        info!("Gemini response received ({} chars)", answer.len());

        Ok(answer)
    }

    /// Names of the models available to this API key, without the `models/` prefix
    pub async fn list_models(&self) -> crate::Result<Vec<String>> {
        list_models(&self.client, &self.config.base_url, &self.config.api_key).await
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        GeminiClient::generate(self, prompt).await
    }
}

/// Resolve a model for `api_key`: the explicit one if given, otherwise the
/// first entry of [`PREFERRED_MODELS`] the account can use.
pub async fn resolve_model(
    api_key: &str,
    base_url: &str,
    explicit: Option<&str>,
) -> crate::Result<String> {
    if let Some(model) = explicit.filter(|m| !m.trim().is_empty()) {
        return Ok(normalize_model_name(model).to_string());
    }

    let client = build_http_client(Duration::from_secs(30))?;
    let available = list_models(&client, base_url, api_key).await?;
    info!("Available Gemini models: {:?}", available);

    select_preferred_model(&available, PREFERRED_MODELS).ok_or_else(|| {
        PipelineError::ConfigError(
            "No suitable Gemini model found; check API access for this key".to_string(),
        )
    })
}

/// First preferred model present in `available`
pub fn select_preferred_model(available: &[String], preferred: &[&str]) -> Option<String> {
    preferred
        .iter()
        .find(|candidate| {
            available
                .iter()
                .any(|m| normalize_model_name(m) == normalize_model_name(candidate))
        })
        .map(|m| normalize_model_name(m).to_string())
}

/// Strip the `models/` resource prefix the list endpoint returns
pub fn normalize_model_name(name: &str) -> &str {
    name.trim().trim_start_matches("models/")
}

fn ensure_api_key(api_key: &str) -> crate::Result<()> {
    if api_key.is_empty() {
        return Err(PipelineError::ConfigError(
            "GEMINI_API_KEY not configured".to_string(),
        ));
    }
    Ok(())
}

fn build_http_client(timeout: Duration) -> crate::Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()
        .map_err(PipelineError::HttpError)
}

async fn list_models(client: &Client, base_url: &str, api_key: &str) -> crate::Result<Vec<String>> {
    ensure_api_key(api_key)?;

    let url = format!("{}/models", base_url);
    let response = client
        .get(&url)
        .header(API_KEY_HEADER, api_key)
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        error!("Failed to fetch Gemini models: {}", error_text);
        return Err(PipelineError::LlmError(format!(
            "Failed to fetch models: {}",
            error_text
        )));
    }

    let listing: ModelList = response.json().await?;
    Ok(listing
        .models
        .into_iter()
        .map(|m| normalize_model_name(&m.name).to_string())
        .collect())
}

fn default_safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: format!("HARM_CATEGORY_{}", category),
            threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GeminiResponse {
    fn first_text(&self) -> crate::Result<String> {
        let candidate = self.candidates.first().ok_or_else(|| {
            PipelineError::LlmError("No response from Gemini API".to_string())
        })?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(PipelineError::LlmError(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}
