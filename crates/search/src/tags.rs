//! Embedding-based tag extraction
//!
//! Scores a paper's abstract (or title) embedding against a cached bank
//! of pre-embedded tags. The tag bank is read-mostly and served through a
//! TTL cache with explicit invalidation for when tags are edited.

use paperdex_common::cache::TtlCache;
use paperdex_common::config::SearchSettings;
use paperdex_common::db::Repository;
use paperdex_common::embeddings::cosine_similarity;
use paperdex_common::errors::Result;
use std::time::Duration;
use tracing::{debug, instrument};

/// A tag candidate with its pre-computed embedding
#[derive(Debug, Clone)]
pub struct TagCandidate {
    pub name: String,
    pub description: Option<String>,
    pub embedding: Vec<f32>,
}

/// An extracted tag with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct TagScore {
    pub name: String,
    pub description: Option<String>,
    pub score: f32,
}

/// Tag extractor over the cached active-tag bank
pub struct TagExtractor {
    repository: Repository,
    cache: TtlCache<Vec<TagCandidate>>,
}

impl TagExtractor {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            cache: TtlCache::new("active_tags"),
        }
    }

    /// Drop the cached tag bank; call after tags are created or edited
    pub async fn invalidate_cache(&self) {
        self.cache.invalidate().await;
    }

    async fn tag_bank(&self, ttl: Duration) -> Result<Vec<TagCandidate>> {
        if let Some(bank) = self.cache.get().await {
            return Ok(bank);
        }

        let tags = self.repository.active_tags_with_embeddings().await?;
        let bank: Vec<TagCandidate> = tags
            .into_iter()
            .filter_map(|tag| {
                let embedding = tag.parse_embedding()?;
                Some(TagCandidate {
                    name: tag.name,
                    description: tag.description,
                    embedding,
                })
            })
            .collect();

        debug!(tag_count = bank.len(), "Loaded tag bank from database");
        self.cache.set(bank.clone(), ttl).await;
        Ok(bank)
    }

    /// Extract the most similar tags for a document embedding.
    ///
    /// Uses the paper's abstract embedding when present, otherwise the
    /// title embedding; the caller picks which to pass.
    #[instrument(skip(self, doc_embedding, settings))]
    pub async fn extract_tags(
        &self,
        doc_embedding: &[f32],
        settings: &SearchSettings,
    ) -> Result<Vec<TagScore>> {
        let bank = self
            .tag_bank(Duration::from_secs(settings.tag_cache_timeout_secs))
            .await?;
        if bank.is_empty() {
            return Ok(Vec::new());
        }

        let scored: Vec<TagScore> = bank
            .iter()
            .map(|tag| TagScore {
                name: tag.name.clone(),
                description: tag.description.clone(),
                score: cosine_similarity(doc_embedding, &tag.embedding),
            })
            .collect();

        Ok(select_tags(
            scored,
            settings.tag_extraction_top_n,
            settings.tag_extraction_min_score,
        ))
    }
}

/// Pick the final tag set: top-n by score, drop tags whose name is a
/// substring of a longer selected tag, then apply the score floor
pub(crate) fn select_tags(mut scored: Vec<TagScore>, top_n: usize, min_score: f32) -> Vec<TagScore> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    scored.truncate(top_n);

    let names: Vec<String> = scored.iter().map(|t| t.name.clone()).collect();
    scored
        .into_iter()
        .filter(|tag| {
            !names
                .iter()
                .any(|other| *other != tag.name && other.contains(&tag.name))
        })
        .filter(|tag| tag.score >= min_score)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, score: f32) -> TagScore {
        TagScore {
            name: name.to_string(),
            description: None,
            score,
        }
    }

    #[test]
    fn test_select_tags_orders_and_truncates() {
        let selected = select_tags(
            vec![tag("beta", 0.6), tag("alpha", 0.9), tag("gamma", 0.7)],
            2,
            0.5,
        );
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "alpha");
        assert_eq!(selected[1].name, "gamma");
    }

    #[test]
    fn test_select_tags_applies_score_floor() {
        let selected = select_tags(vec![tag("alpha", 0.9), tag("beta", 0.3)], 5, 0.5);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "alpha");
    }

    #[test]
    fn test_substring_tags_suppressed() {
        // "learning" is contained in "machine learning", so only the
        // longer tag survives
        let selected = select_tags(
            vec![tag("machine learning", 0.8), tag("learning", 0.75)],
            5,
            0.5,
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "machine learning");
    }

    #[test]
    fn test_empty_input() {
        assert!(select_tags(Vec::new(), 5, 0.5).is_empty());
    }
}
