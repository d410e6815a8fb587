//! Literal keyword search
//!
//! Independent fallback path with no embedding dependency: scan chunks in
//! (paper_id, chunk_id) order, count case-insensitive occurrences of the
//! query per paper, and return the first matching chunk of each paper as
//! its snippet.

use super::highlight::highlight_query;
use super::{SearchMode, SearchResult};
use paperdex_common::db::ScannedChunk;
use std::collections::HashMap;
use uuid::Uuid;

struct PaperMatches {
    total: usize,
    first: SearchResult,
}

/// Rank scanned chunks by total occurrence count per paper.
///
/// `chunks` must already be in (paper_id, chunk_id) order; the first
/// matching chunk per paper becomes the snippet. Ties break by ascending
/// paper id.
pub(crate) fn rank_keyword_matches(
    chunks: &[ScannedChunk],
    query: &str,
    top_k: usize,
) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut papers: HashMap<Uuid, PaperMatches> = HashMap::new();

    for chunk in chunks {
        let count = chunk.text.to_lowercase().matches(&needle).count();
        if count == 0 {
            continue;
        }

        papers
            .entry(chunk.paper_id)
            .and_modify(|m| m.total += count)
            .or_insert_with(|| PaperMatches {
                total: count,
                first: SearchResult {
                    paper_id: chunk.paper_id,
                    title: chunk.title.clone(),
                    authors: chunk.authors.clone(),
                    page: chunk.page,
                    snippet: highlight_query(&chunk.text, query),
                    score: 0.0,
                    mode: SearchMode::Keyword,
                },
            });
    }

    let mut results: Vec<SearchResult> = papers
        .into_values()
        .map(|m| {
            let mut result = m.first;
            result.score = m.total as f64;
            result
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.paper_id.cmp(&b.paper_id))
    });
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(paper: u128, chunk_id: i32, page: i32, text: &str) -> ScannedChunk {
        ScannedChunk {
            paper_id: Uuid::from_u128(paper),
            title: format!("Paper {}", paper),
            authors: vec![],
            page,
            chunk_id,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_only_matching_papers_returned() {
        // A holds the exact phrase, B is related but lacks it, C is noise
        let chunks = vec![
            chunk(1, 0, 1, "We evaluate semantic search on this corpus."),
            chunk(2, 0, 1, "A survey of dense retrieval methods."),
            chunk(3, 0, 1, "Unrelated agricultural yields."),
        ];
        let results = rank_keyword_matches(&chunks, "semantic search", 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].paper_id, Uuid::from_u128(1));
        assert_eq!(results[0].mode, SearchMode::Keyword);
        assert!(results[0].snippet.contains("<mark>semantic search</mark>"));
    }

    #[test]
    fn test_occurrences_accumulate_across_chunks() {
        let chunks = vec![
            chunk(1, 0, 1, "cache cache"),
            chunk(1, 1, 2, "cache again"),
            chunk(2, 0, 1, "cache"),
        ];
        let results = rank_keyword_matches(&chunks, "cache", 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].paper_id, Uuid::from_u128(1));
        assert_eq!(results[0].score, 3.0);
        // Snippet comes from the first matching chunk
        assert_eq!(results[0].page, 1);
        assert_eq!(results[1].score, 1.0);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let chunks = vec![chunk(1, 0, 1, "Transformer models and TRANSFORMER variants")];
        let results = rank_keyword_matches(&chunks, "transformer", 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 2.0);
    }

    #[test]
    fn test_ties_break_by_paper_id() {
        let chunks = vec![chunk(9, 0, 1, "term"), chunk(2, 0, 1, "term")];
        let results = rank_keyword_matches(&chunks, "term", 5);

        assert_eq!(results[0].paper_id, Uuid::from_u128(2));
        assert_eq!(results[1].paper_id, Uuid::from_u128(9));
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let chunks = vec![chunk(1, 0, 1, "anything")];
        assert!(rank_keyword_matches(&chunks, "   ", 5).is_empty());
    }

    #[test]
    fn test_top_k_truncation() {
        let chunks: Vec<ScannedChunk> = (1..=4u128).map(|p| chunk(p, 0, 1, "hit")).collect();
        let results = rank_keyword_matches(&chunks, "hit", 2);
        assert_eq!(results.len(), 2);
    }
}
