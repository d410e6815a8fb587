//! Citation matching
//!
//! Extracts bibliography entries from a document, embeds their titles,
//! and matches them against the corpus by title-embedding similarity plus
//! author and year agreement. Matches persist through a monotonic upsert:
//! a (source, matched) pair is unique and its score only ever increases,
//! so concurrent matchers converge without locking.

mod extract;
mod parse;

pub use extract::{extract_references, MAX_PAGES_TO_CHECK};
pub use parse::{parse_citation, parse_title, ParsedCitation};

use paperdex_common::db::models::Paper;
use paperdex_common::db::{Repository, TitleCandidate};
use paperdex_common::embeddings::{Embedder, TaskType};
use paperdex_common::errors::Result;
use paperdex_common::metrics;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Weight of title-embedding similarity in the match score
const TITLE_WEIGHT: f64 = 0.7;
/// Weight of author overlap
const AUTHOR_WEIGHT: f64 = 0.2;
/// Weight of exact year agreement
const YEAR_WEIGHT: f64 = 0.1;

/// Default score threshold for persisting a match
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Default number of title candidates considered per citation
pub const DEFAULT_CANDIDATES_PER_CITATION: usize = 5;

/// One persisted citation match
#[derive(Debug, Clone)]
pub struct CitationOutcome {
    pub matched_paper_id: Uuid,
    pub raw_citation: String,
    pub score: f64,
}

/// Score a candidate paper against a parsed citation.
///
/// `0.7 * title_similarity + 0.2 * author_overlap + 0.1 * year_match`,
/// where author overlap is the fraction of the candidate's authors found
/// among the parsed names (0 when the candidate lists none) and year
/// match is all-or-nothing.
pub fn score_candidate(parsed: &ParsedCitation, candidate: &TitleCandidate) -> f64 {
    let title_similarity = candidate.title_similarity.clamp(0.0, 1.0);

    let parsed_authors: HashSet<String> =
        parsed.authors.iter().map(|a| a.to_lowercase()).collect();
    let candidate_authors: HashSet<String> =
        candidate.authors.iter().map(|a| a.to_lowercase()).collect();

    let author_overlap = if candidate_authors.is_empty() {
        0.0
    } else {
        parsed_authors.intersection(&candidate_authors).count() as f64
            / candidate_authors.len() as f64
    };

    let candidate_year = candidate.year.map(|y| y.to_string()).unwrap_or_default();
    let year_match = if !parsed.year.is_empty() && parsed.year == candidate_year {
        1.0
    } else {
        0.0
    };

    TITLE_WEIGHT * title_similarity + AUTHOR_WEIGHT * author_overlap + YEAR_WEIGHT * year_match
}

/// Citation matcher over the paper title-embedding column
pub struct CitationMatcher {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
}

impl CitationMatcher {
    pub fn new(repository: Repository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repository,
            embedder,
        }
    }

    /// Extract this paper's references and match them against the corpus.
    ///
    /// A citation that fails to parse or embed is skipped; one bad
    /// reference never aborts the batch. After the batch, the cached
    /// citation counters of every touched paper are recomputed.
    #[instrument(skip(self, paper, page_texts), fields(paper_id = %paper.id))]
    pub async fn match_paper(
        &self,
        paper: &Paper,
        page_texts: &[String],
        threshold: f64,
        candidates_per_citation: usize,
    ) -> Result<Vec<CitationOutcome>> {
        let started = Instant::now();

        let raw_citations = extract_references(page_texts, MAX_PAGES_TO_CHECK);
        if raw_citations.is_empty() {
            info!("No references found in document");
            return Ok(Vec::new());
        }

        info!(citation_count = raw_citations.len(), "Matching extracted references");

        let mut outcomes = Vec::new();

        for (index, citation) in raw_citations.iter().enumerate() {
            let parsed = parse_citation(citation);
            let title = if parsed.title.is_empty() {
                citation.clone()
            } else {
                parsed.title.clone()
            };

            let embedding = match self.embedder.embed_one(&title, TaskType::Document).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(citation_index = index, error = %e, "Failed to embed citation title, skipping");
                    continue;
                }
            };

            let candidates = self
                .repository
                .title_candidates(paper.id, &embedding, candidates_per_citation)
                .await?;

            let mut best: Option<(&TitleCandidate, f64)> = None;
            for candidate in &candidates {
                let score = score_candidate(&parsed, candidate);
                debug!(
                    candidate = %candidate.title,
                    score,
                    "Scored citation candidate"
                );
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((candidate, score));
                }
            }

            match best {
                Some((candidate, score)) if score >= threshold => {
                    self.repository
                        .upsert_matched_citation(paper.id, candidate.paper_id, citation, score)
                        .await?;
                    outcomes.push(CitationOutcome {
                        matched_paper_id: candidate.paper_id,
                        raw_citation: citation.clone(),
                        score,
                    });
                }
                Some((_, score)) => {
                    debug!(citation_index = index, score, "Best candidate below threshold");
                }
                None => {
                    debug!(citation_index = index, "No candidates with title embeddings");
                }
            }
        }

        // Recompute cached counters for every paper touched by this batch
        let mut refreshed = HashSet::new();
        for outcome in &outcomes {
            if refreshed.insert(outcome.matched_paper_id) {
                self.repository
                    .refresh_citation_count(outcome.matched_paper_id)
                    .await?;
            }
        }
        self.repository.refresh_matched_count(paper.id).await?;

        metrics::record_citation_batch(outcomes.len(), started.elapsed());
        info!(matched = outcomes.len(), "Citation matching complete");

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title_similarity: f64, authors: &[&str], year: Option<i32>) -> TitleCandidate {
        TitleCandidate {
            paper_id: Uuid::from_u128(1),
            title: "Candidate".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
            title_similarity,
        }
    }

    fn parsed(title: &str, authors: &[&str], year: &str) -> ParsedCitation {
        ParsedCitation {
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year: year.to_string(),
        }
    }

    #[test]
    fn test_perfect_match_scores_near_one() {
        // Exact title embedding, full author overlap, exact year
        let score = score_candidate(
            &parsed("Deep retrieval", &["Smith", "Jones"], "2019"),
            &candidate(1.0, &["Smith", "Jones"], Some(2019)),
        );
        assert!(score > 0.99);
        assert!(score >= DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn test_author_overlap_is_case_insensitive() {
        let score = score_candidate(
            &parsed("T", &["smith"], "2019"),
            &candidate(1.0, &["Smith"], Some(2019)),
        );
        assert!(score > 0.99);
    }

    #[test]
    fn test_no_candidate_authors_gives_zero_overlap() {
        let score = score_candidate(
            &parsed("T", &["Smith"], "2019"),
            &candidate(1.0, &[], Some(2019)),
        );
        assert!((score - (0.7 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_year_mismatch_drops_year_weight() {
        let score = score_candidate(
            &parsed("T", &["Smith"], "2018"),
            &candidate(1.0, &["Smith"], Some(2019)),
        );
        assert!((score - (0.7 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_parsed_year_never_matches() {
        let score = score_candidate(&parsed("T", &[], ""), &candidate(1.0, &[], None));
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_partial_author_overlap() {
        // One of the candidate's two authors appears in the citation
        let score = score_candidate(
            &parsed("T", &["Smith", "Garcia"], "2019"),
            &candidate(0.9, &["Smith", "Jones"], Some(2019)),
        );
        let expected = 0.7 * 0.9 + 0.2 * 0.5 + 0.1;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_clamped_to_unit_interval() {
        // Floating-point drift in cosine distance can nudge past 1.0
        let score = score_candidate(
            &parsed("T", &["Smith"], "2019"),
            &candidate(1.0000002, &["Smith"], Some(2019)),
        );
        assert!(score <= 1.0 + 1e-9);
    }
}
