//! Configuration management for the paperdex engine
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{env}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Text-generation provider configuration
    pub generation: GenerationConfig,

    /// Search and indexing settings
    #[serde(default)]
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// API key for the embedding provider
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension, fixed for the whole corpus
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Maximum texts per provider request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// API key for the generation provider
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

/// Configurable settings for paper search and indexing.
///
/// Process-wide singleton, read-mostly; serve it through
/// [`crate::cache::SettingsCache`] so writes invalidate readers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct SearchSettings {
    /// Size of text chunks for embedding, in characters
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 100, max = 5000))]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[serde(default = "default_chunk_overlap")]
    #[validate(range(min = 0, max = 1000))]
    pub chunk_overlap: usize,

    /// Character count after which to check for appendices
    #[serde(default = "default_appendix_cutoff")]
    pub appendix_cutoff: usize,

    /// Number of top results to return
    #[serde(default = "default_top_k_results")]
    #[validate(range(min = 1, max = 50))]
    pub top_k_results: usize,

    /// Minimum similarity score threshold
    #[serde(default = "default_min_similarity_score")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_similarity_score: f32,

    /// Weight for lexical (BM25-style) matching
    #[serde(default = "default_bm25_weight")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub bm25_weight: f32,

    /// Weight for vector similarity
    #[serde(default = "default_vector_weight")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub vector_weight: f32,

    /// Maximum chunks to scan in keyword search
    #[serde(default = "default_max_chunks_scan")]
    #[validate(range(min = 100, max = 10000))]
    pub max_chunks_scan: usize,

    /// Multiplier for the initial hybrid candidate fetch (top_k * multiplier)
    #[serde(default = "default_hybrid_search_multiplier")]
    #[validate(range(min = 1, max = 10))]
    pub hybrid_search_multiplier: usize,

    /// Minimum candidates to fetch for hybrid search
    #[serde(default = "default_hybrid_search_min_results")]
    pub hybrid_search_min_results: usize,

    /// Number of top tags to extract
    #[serde(default = "default_tag_extraction_top_n")]
    #[validate(range(min = 1, max = 20))]
    pub tag_extraction_top_n: usize,

    /// Minimum similarity score for tag extraction
    #[serde(default = "default_tag_extraction_min_score")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub tag_extraction_min_score: f32,

    /// Cache timeout for the active-tag list, in seconds
    #[serde(default = "default_tag_cache_timeout")]
    #[validate(range(min = 300, max = 86400))]
    pub tag_cache_timeout_secs: u64,

    /// How long to cache these settings, in seconds
    #[serde(default = "default_settings_cache_timeout")]
    pub settings_cache_timeout_secs: u64,
}

// Default value functions
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_embedding_model() -> String { "gemini-embedding-001".to_string() }
fn default_embedding_dimension() -> usize { 768 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_embedding_batch_size() -> usize { 100 }
fn default_generation_model() -> String { "gemini-2.0-flash".to_string() }
fn default_temperature() -> f32 { 0.3 }
fn default_max_output_tokens() -> u32 { 2048 }
fn default_generation_timeout() -> u64 { 60 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_appendix_cutoff() -> usize { 5000 }
fn default_top_k_results() -> usize { 5 }
fn default_min_similarity_score() -> f32 { 0.25 }
fn default_bm25_weight() -> f32 { 0.5 }
fn default_vector_weight() -> f32 { 0.5 }
fn default_max_chunks_scan() -> usize { 2000 }
fn default_hybrid_search_multiplier() -> usize { 2 }
fn default_hybrid_search_min_results() -> usize { 20 }
fn default_tag_extraction_top_n() -> usize { 5 }
fn default_tag_extraction_min_score() -> f32 { 0.5 }
fn default_tag_cache_timeout() -> u64 { 3600 }
fn default_settings_cache_timeout() -> u64 { 900 }

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            appendix_cutoff: default_appendix_cutoff(),
            top_k_results: default_top_k_results(),
            min_similarity_score: default_min_similarity_score(),
            bm25_weight: default_bm25_weight(),
            vector_weight: default_vector_weight(),
            max_chunks_scan: default_max_chunks_scan(),
            hybrid_search_multiplier: default_hybrid_search_multiplier(),
            hybrid_search_min_results: default_hybrid_search_min_results(),
            tag_extraction_top_n: default_tag_extraction_top_n(),
            tag_extraction_min_score: default_tag_extraction_min_score(),
            tag_cache_timeout_secs: default_tag_cache_timeout(),
            settings_cache_timeout_secs: default_settings_cache_timeout(),
        }
    }
}

impl SearchSettings {
    /// Candidate count for the initial lexical fetch of hybrid search
    pub fn initial_limit(&self, top_k: usize) -> usize {
        std::cmp::max(self.hybrid_search_min_results, top_k * self.hybrid_search_multiplier)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__EMBEDDING__DIMENSION=768
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Get the embedding request timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/paperdex".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            embedding: EmbeddingConfig {
                api_key: None,
                api_base: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
                batch_size: default_embedding_batch_size(),
            },
            generation: GenerationConfig {
                api_key: None,
                api_base: None,
                model: default_generation_model(),
                temperature: default_temperature(),
                max_output_tokens: default_max_output_tokens(),
                timeout_secs: default_generation_timeout(),
            },
            search: SearchSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.model, "gemini-embedding-001");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.search.chunk_size, 1000);
        assert_eq!(config.search.chunk_overlap, 200);
        assert!((config.search.bm25_weight - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/paperdex");
    }

    #[test]
    fn test_initial_limit_uses_floor() {
        let settings = SearchSettings::default();
        // 5 * 2 = 10 is below the configured minimum of 20
        assert_eq!(settings.initial_limit(5), 20);
        assert_eq!(settings.initial_limit(15), 30);
    }

    #[test]
    fn test_settings_validation_ranges() {
        let mut settings = SearchSettings::default();
        assert!(settings.validate().is_ok());

        settings.chunk_size = 10;
        assert!(settings.validate().is_err());
    }
}
