//! Hybrid search engine
//!
//! Ranks queries against the chunk index with a fused lexical + vector
//! score. Lexical retrieval proposes candidates; when the query matches
//! no terms at all, ranking falls back to pure vector similarity over the
//! whole corpus.

use super::fusion::{collapse_vector_hits, fuse_candidates};
use super::highlight::highlight_query;
use super::keyword::rank_keyword_matches;
use super::{SearchOptions, SearchResult};
use paperdex_common::db::Repository;
use paperdex_common::embeddings::{Embedder, TaskType};
use paperdex_common::errors::Result;
use paperdex_common::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Hybrid search over the chunk index
pub struct HybridSearchEngine {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
}

impl HybridSearchEngine {
    pub fn new(repository: Repository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repository,
            embedder,
        }
    }

    /// Fused lexical + vector search, one result per paper.
    ///
    /// An empty result list is a normal outcome: it means nothing in the
    /// corpus cleared `min_score`.
    #[instrument(skip(self, opts), fields(top_k = opts.top_k))]
    pub async fn semantic_search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let query_embedding = self.embedder.embed_one(query, TaskType::Query).await?;

        let initial_limit = opts.initial_limit();
        let candidates = self
            .repository
            .lexical_candidates(query, &query_embedding, initial_limit)
            .await?;

        let mut results = if candidates.is_empty() {
            debug!("No lexical candidates, falling back to vector search");
            let hits = self
                .repository
                .vector_search(&query_embedding, initial_limit, opts.min_score)
                .await?;
            collapse_vector_hits(hits, opts.top_k)
        } else {
            debug!(candidate_count = candidates.len(), "Fusing candidate set");
            fuse_candidates(
                candidates,
                opts.bm25_weight as f64,
                opts.vector_weight as f64,
                opts.min_score as f64,
                opts.top_k,
            )
        };

        for result in &mut results {
            result.snippet = highlight_query(&result.snippet, query);
        }

        metrics::record_search("semantic", started.elapsed(), results.len());
        info!(
            result_count = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Semantic search complete"
        );

        Ok(results)
    }

    /// Literal keyword search over up to `max_chunks_scan` chunks.
    ///
    /// Fully independent of the embedding provider; used when a plain
    /// substring match is wanted or the provider is unavailable.
    #[instrument(skip(self))]
    pub async fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
        max_chunks_scan: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let chunks = self.repository.scan_chunks(max_chunks_scan).await?;
        let results = rank_keyword_matches(&chunks, query, top_k);

        metrics::record_search("keyword", started.elapsed(), results.len());
        info!(
            scanned = chunks.len(),
            result_count = results.len(),
            "Keyword search complete"
        );

        Ok(results)
    }
}
