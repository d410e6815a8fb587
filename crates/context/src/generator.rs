//! Text-generation collaborator interface
//!
//! Generation is an external service; the engine only needs
//! `generate(prompt, temperature, max_tokens)`. `GeminiGenerator` is the
//! reqwest wrapper for the provider the rest of the stack already uses.

use async_trait::async_trait;
use paperdex_common::config::GenerationConfig;
use paperdex_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for grounded text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt. Provider failure is a hard error.
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Gemini generation client
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

impl GeminiGenerator {
    /// Create a new Gemini generator from the generation configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "generation.api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationParams {
                temperature,
                max_output_tokens: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::GenerationError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: GenerateResponse =
            response.json().await.map_err(|e| AppError::GenerationError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AppError::GenerationError {
                message: "Empty response".to_string(),
            })?;

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
