//! Retrieval over the chunk index
//!
//! Two ranking paths:
//! - Hybrid search: full-text candidates scored by a min-max-normalized
//!   fusion of lexical rank and vector similarity, with a pure-vector
//!   fallback when the query matches no terms at all
//! - Keyword search: literal substring scan, independent of embeddings

mod fusion;
mod highlight;
mod hybrid;
mod keyword;

pub use highlight::highlight_query;
pub use hybrid::HybridSearchEngine;

use paperdex_common::config::SearchSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ranking path that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Fused lexical + vector ranking
    Hybrid,
    /// Pure vector similarity (lexical retrieval found nothing)
    Vector,
    /// Literal keyword scan
    Keyword,
}

/// One ranked search result; at most one per paper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    /// Page of the best-matching chunk
    pub page: i32,
    /// Best-matching chunk text with query occurrences highlighted
    pub snippet: String,
    pub score: f64,
    pub mode: SearchMode,
}

/// Tunable parameters for one semantic search call
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_score: f32,
    pub bm25_weight: f32,
    pub vector_weight: f32,
    pub multiplier: usize,
    pub min_results: usize,
}

impl SearchOptions {
    /// Candidate count for the initial lexical fetch
    pub fn initial_limit(&self) -> usize {
        std::cmp::max(self.min_results, self.top_k * self.multiplier)
    }
}

impl From<&SearchSettings> for SearchOptions {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            top_k: settings.top_k_results,
            min_score: settings.min_similarity_score,
            bm25_weight: settings.bm25_weight,
            vector_weight: settings.vector_weight,
            multiplier: settings.hybrid_search_multiplier,
            min_results: settings.hybrid_search_min_results,
        }
    }
}
