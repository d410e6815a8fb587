//! Embedding service abstraction
//!
//! Wraps the external embedding provider behind one trait. The provider
//! produces asymmetric embeddings: text indexed with the `Document` task
//! type must be queried with the `Query` task type, so the task type is
//! part of the contract rather than a provider detail.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding task type.
///
/// `Document` is used at index time (chunks, titles, abstracts, citation
/// titles); `Query` at query time. The two must never be silently swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Document,
    Query,
}

impl TaskType {
    /// Provider wire name for this task type
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            TaskType::Document => "RETRIEVAL_DOCUMENT",
            TaskType::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input, same
    /// order. Provider failure is a hard error; no partial results.
    async fn embed(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text
    async fn embed_one(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()], task).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingError {
                message: "Empty response".to_string(),
            })
    }

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// Format a vector as a pgvector literal: `[0.1,0.2,...]`
pub fn to_vector_literal(vector: &[f32]) -> String {
    format!(
        "[{}]",
        vector
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Parse a pgvector literal back into a vector
pub fn parse_vector_literal(s: &str) -> Option<Vec<f32>> {
    let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|v| v.trim().parse::<f32>().ok())
        .collect()
}

/// Cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Gemini embedding client
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_retries: u32,
    batch_size: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: ContentPart,
    task_type: String,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct ContentPart {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder from the embedding configuration
    pub fn new(config: &crate::config::EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            max_retries: config.max_retries,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Make request with retry and exponential backoff
    async fn request_with_retry(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(texts, task).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::EmbeddingError {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: ContentPart {
                        parts: vec![TextPart { text: text.clone() }],
                    },
                    task_type: task.as_provider_str().to_string(),
                    output_dimensionality: self.dimension,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: BatchEmbedResponse =
            response.json().await.map_err(|e| AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })?;

        if result.embeddings.len() != texts.len() {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "Provider returned {} embeddings for {} inputs",
                    result.embeddings.len(),
                    texts.len()
                ),
            });
        }

        let mut vectors = Vec::with_capacity(result.embeddings.len());
        for embedding in result.embeddings {
            if embedding.values.len() != self.dimension {
                return Err(AppError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.values.len(),
                });
            }
            vectors.push(embedding.values);
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.request_with_retry(batch, task).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for tests: the vector depends only on the text
/// and the task type, so identical inputs always produce identical output.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str, task: TaskType) -> Vec<f32> {
        // FNV-1a over the text seeds a small LCG
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            seed ^= byte as u64;
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }
        // Asymmetric task types diverge in the seed, not the contract
        if task == TaskType::Query {
            seed = seed.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15;
        }

        let mut state = seed;
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32) - 1.0
            })
            .collect();

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t, task)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_shape() {
        let embedder = MockEmbedder::new(768);
        let embedding = embedder.embed_one("test text", TaskType::Document).await.unwrap();
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed_one("same text", TaskType::Document).await.unwrap();
        let b = embedder.embed_one("same text", TaskType::Document).await.unwrap();
        assert_eq!(a, b);

        let query = embedder.embed_one("same text", TaskType::Query).await.unwrap();
        assert_ne!(a, query);
    }

    #[tokio::test]
    async fn test_mock_batch_order() {
        let embedder = MockEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = embedder.embed(&texts, TaskType::Document).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_one("alpha", TaskType::Document).await.unwrap());
        assert_eq!(batch[1], embedder.embed_one("beta", TaskType::Document).await.unwrap());
    }

    #[test]
    fn test_vector_literal_round_trip() {
        let vector = vec![0.1, -0.2, 0.3];
        let literal = to_vector_literal(&vector);
        assert_eq!(literal, "[0.1,-0.2,0.3]");
        assert_eq!(parse_vector_literal(&literal), Some(vector));
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn test_task_type_wire_names() {
        assert_eq!(TaskType::Document.as_provider_str(), "RETRIEVAL_DOCUMENT");
        assert_eq!(TaskType::Query.as_provider_str(), "RETRIEVAL_QUERY");
    }
}
