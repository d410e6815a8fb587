//! Score fusion for hybrid search
//!
//! Pure functions over the candidate set: min-max normalization of both
//! signal distributions, weighted combination, collapse to the best chunk
//! per paper, threshold, and deterministic ordering. Kept free of any
//! database access so the ranking behavior is testable in isolation.

use super::{SearchMode, SearchResult};
use paperdex_common::db::{ChunkHit, LexicalCandidate};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Min-max normalize a distribution to [0, 1].
///
/// A degenerate all-equal distribution normalizes to 1.0 so a
/// single-signal candidate set still scores in range.
pub(crate) fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let (min, max) = values.iter().fold((first, first), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });

    if max > min {
        values.iter().map(|v| (v - min) / (max - min)).collect()
    } else {
        vec![1.0; values.len()]
    }
}

/// Fuse lexical candidates into per-paper hybrid results.
///
/// Returns at most `top_k` results, sorted by descending hybrid score;
/// equal scores break by ascending paper id.
pub(crate) fn fuse_candidates(
    candidates: Vec<LexicalCandidate>,
    bm25_weight: f64,
    vector_weight: f64,
    min_score: f64,
    top_k: usize,
) -> Vec<SearchResult> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let lexical: Vec<f64> = candidates.iter().map(|c| c.lexical_rank).collect();
    let vector: Vec<f64> = candidates.iter().map(|c| c.vector_similarity).collect();
    let lexical_norm = min_max_normalize(&lexical);
    let vector_norm = min_max_normalize(&vector);

    // Best chunk per paper, first-seen wins ties within a paper
    let mut best: HashMap<Uuid, (usize, f64)> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let hybrid =
            (bm25_weight * lexical_norm[i] + vector_weight * vector_norm[i]).clamp(0.0, 1.0);
        match best.get(&candidate.paper_id) {
            Some((_, existing)) if *existing >= hybrid => {}
            _ => {
                best.insert(candidate.paper_id, (i, hybrid));
            }
        }
    }

    let mut results: Vec<SearchResult> = best
        .into_iter()
        .filter(|(_, (_, score))| *score >= min_score)
        .map(|(paper_id, (i, score))| {
            let candidate = &candidates[i];
            SearchResult {
                paper_id,
                title: candidate.title.clone(),
                authors: candidate.authors.clone(),
                page: candidate.page,
                snippet: candidate.text.clone(),
                score,
                mode: SearchMode::Hybrid,
            }
        })
        .collect();

    sort_and_truncate(&mut results, top_k);
    results
}

/// Collapse corpus-wide vector hits to the best chunk per paper.
///
/// Hits arrive ordered by descending similarity, so the first hit per
/// paper is its best.
pub(crate) fn collapse_vector_hits(hits: Vec<ChunkHit>, top_k: usize) -> Vec<SearchResult> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut results: Vec<SearchResult> = Vec::new();

    for hit in hits {
        if !seen.insert(hit.paper_id) {
            continue;
        }
        results.push(SearchResult {
            paper_id: hit.paper_id,
            title: hit.title,
            authors: hit.authors,
            page: hit.page,
            snippet: hit.text,
            score: hit.score.clamp(0.0, 1.0),
            mode: SearchMode::Vector,
        });
    }

    sort_and_truncate(&mut results, top_k);
    results
}

/// Descending score, ties by ascending paper id, then truncate
pub(crate) fn sort_and_truncate(results: &mut Vec<SearchResult>, top_k: usize) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.paper_id.cmp(&b.paper_id))
    });
    results.truncate(top_k);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        paper: u128,
        chunk_id: i32,
        text: &str,
        lexical_rank: f64,
        vector_similarity: f64,
    ) -> LexicalCandidate {
        LexicalCandidate {
            paper_id: Uuid::from_u128(paper),
            title: format!("Paper {}", paper),
            authors: vec!["Doe".to_string()],
            page: 1,
            chunk_id,
            text: text.to_string(),
            lexical_rank,
            vector_similarity,
        }
    }

    #[test]
    fn test_min_max_normalize() {
        let normalized = min_max_normalize(&[1.0, 3.0, 2.0]);
        assert_eq!(normalized, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_min_max_normalize_degenerate() {
        assert_eq!(min_max_normalize(&[0.7, 0.7]), vec![1.0, 1.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_fusion_scores_bounded_and_sorted() {
        let candidates = vec![
            candidate(1, 0, "exact phrase chunk", 0.9, 0.8),
            candidate(2, 0, "related chunk", 0.2, 0.7),
            candidate(3, 0, "weak chunk", 0.1, 0.1),
        ];
        let results = fuse_candidates(candidates, 0.5, 0.5, 0.0, 10);

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!((0.0..=1.0).contains(&result.score));
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_fusion_collapses_to_one_chunk_per_paper() {
        let candidates = vec![
            candidate(1, 0, "good chunk", 0.9, 0.9),
            candidate(1, 3, "weaker chunk from same paper", 0.3, 0.3),
            candidate(2, 0, "other paper", 0.5, 0.5),
        ];
        let results = fuse_candidates(candidates, 0.5, 0.5, 0.0, 10);

        assert_eq!(results.len(), 2);
        let paper1 = results
            .iter()
            .find(|r| r.paper_id == Uuid::from_u128(1))
            .unwrap();
        assert_eq!(paper1.snippet, "good chunk");
    }

    #[test]
    fn test_fusion_min_score_filter() {
        let candidates = vec![
            candidate(1, 0, "strong", 0.9, 0.9),
            candidate(2, 0, "weak", 0.0, 0.0),
        ];
        let results = fuse_candidates(candidates, 0.5, 0.5, 0.25, 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].paper_id, Uuid::from_u128(1));
    }

    #[test]
    fn test_fusion_tie_breaks_by_paper_id() {
        let candidates = vec![
            candidate(7, 0, "same", 0.5, 0.5),
            candidate(3, 0, "same", 0.5, 0.5),
        ];
        let results = fuse_candidates(candidates, 0.5, 0.5, 0.0, 10);

        assert_eq!(results[0].paper_id, Uuid::from_u128(3));
        assert_eq!(results[1].paper_id, Uuid::from_u128(7));
    }

    #[test]
    fn test_exact_match_outranks_related_paper() {
        // Paper A holds the exact phrase (top lexical rank and vector
        // similarity); paper B is topically related; paper C is noise.
        // A and B survive a 0.25 threshold, C does not, and A >= B.
        let candidates = vec![
            candidate(1, 0, "uses semantic search end to end", 1.2, 0.92),
            candidate(2, 0, "related retrieval methods", 0.4, 0.80),
            candidate(3, 0, "unrelated material", 0.05, 0.05),
        ];
        let results = fuse_candidates(candidates, 0.5, 0.5, 0.25, 5);

        let ids: Vec<Uuid> = results.iter().map(|r| r.paper_id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_collapse_vector_hits_dedupes_papers() {
        let hit = |paper: u128, score: f64| ChunkHit {
            paper_id: Uuid::from_u128(paper),
            title: "t".to_string(),
            authors: vec![],
            page: 1,
            chunk_id: 0,
            text: "text".to_string(),
            score,
        };
        let results = collapse_vector_hits(vec![hit(1, 0.9), hit(1, 0.8), hit(2, 0.7)], 5);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].paper_id, Uuid::from_u128(1));
        assert!((results[0].score - 0.9).abs() < 1e-9);
        assert_eq!(results[0].mode, SearchMode::Vector);
    }
}
