//! Context assembly
//!
//! Retrieves the chunks of one paper nearest to a question, optionally
//! widens each hit to its neighboring pages, and renders the result as a
//! bounded, page-ordered block with explicit page markers — the context
//! handed to generation.

use crate::generator::TextGenerator;
use paperdex_common::config::GenerationConfig;
use paperdex_common::db::{NearChunk, Repository};
use paperdex_common::embeddings::{Embedder, TaskType};
use paperdex_common::errors::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Tunable parameters for one assembly
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Nearest chunks retrieved within the paper
    pub top_k: usize,
    /// Pages of surrounding context pulled in around each hit
    pub window: i32,
    /// Whether to expand hits to their page window at all
    pub expand: bool,
    /// Whether to nudge hit order by query-term overlap
    pub rerank: bool,
    /// Upper bound on the rendered context, in bytes
    pub max_chars: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            window: 1,
            expand: true,
            rerank: true,
            max_chars: 16_000,
        }
    }
}

/// Rendered context plus its retrieval metadata
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub chunk_count: usize,
    pub page_count: usize,
}

impl AssembledContext {
    fn empty() -> Self {
        Self {
            text: String::new(),
            chunk_count: 0,
            page_count: 0,
        }
    }
}

/// A generated answer plus retrieval metadata
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub answer: String,
    pub chunk_count: usize,
    pub page_count: usize,
}

/// One chunk participating in assembly
#[derive(Debug, Clone)]
struct ContextChunk {
    id: Uuid,
    chunk_id: i32,
    page: i32,
    text: String,
}

/// Context assembler over one paper's chunks
pub struct ContextAssembler {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
}

impl ContextAssembler {
    pub fn new(repository: Repository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repository,
            embedder,
        }
    }

    /// Assemble a bounded context block for a question about one paper
    #[instrument(skip(self, opts), fields(paper_id = %paper_id))]
    pub async fn assemble(
        &self,
        paper_id: Uuid,
        query: &str,
        opts: &AssemblyOptions,
    ) -> Result<AssembledContext> {
        let query_embedding = self.embedder.embed_one(query, TaskType::Query).await?;

        let mut hits = self
            .repository
            .near_chunks_in_paper(paper_id, &query_embedding, opts.top_k)
            .await?;

        if hits.is_empty() {
            debug!("No chunks retrieved for paper");
            return Ok(AssembledContext::empty());
        }

        if opts.rerank {
            rerank_hits(query, &mut hits);
        }

        let mut chunks: Vec<ContextChunk> = Vec::new();
        if opts.expand && opts.window > 0 {
            for hit in &hits {
                let window = self
                    .repository
                    .chunks_in_page_window(
                        paper_id,
                        (hit.page - opts.window).max(1),
                        hit.page + opts.window,
                    )
                    .await?;
                chunks.extend(window.into_iter().map(|c| ContextChunk {
                    id: c.id,
                    chunk_id: c.chunk_id,
                    page: c.page,
                    text: c.text,
                }));
            }
        } else {
            chunks.extend(hits.iter().map(|hit| ContextChunk {
                id: hit.id,
                chunk_id: hit.chunk_id,
                page: hit.page,
                text: hit.text.clone(),
            }));
        }

        let mut chunks = dedupe_chunks(chunks);
        chunks.sort_by_key(|c| (c.page, c.chunk_id));

        let text = render_context(&chunks, opts.max_chars);
        let page_count = chunks.iter().map(|c| c.page).collect::<HashSet<_>>().len();

        info!(
            chunk_count = chunks.len(),
            page_count,
            context_len = text.len(),
            "Context assembled"
        );

        Ok(AssembledContext {
            text,
            chunk_count: chunks.len(),
            page_count,
        })
    }

    /// Answer a question about one paper, grounded in its assembled
    /// context. Returns the generated answer plus retrieval metadata.
    #[instrument(skip(self, generator, opts, generation), fields(paper_id = %paper_id))]
    pub async fn answer_question(
        &self,
        generator: &dyn TextGenerator,
        paper_id: Uuid,
        query: &str,
        opts: &AssemblyOptions,
        generation: &GenerationConfig,
    ) -> Result<RagAnswer> {
        let context = self.assemble(paper_id, query, opts).await?;

        if context.text.is_empty() {
            return Ok(RagAnswer {
                answer: "I couldn't find relevant information in this paper.".to_string(),
                chunk_count: 0,
                page_count: 0,
            });
        }

        let prompt = build_prompt(&context.text, query);
        let answer = generator
            .generate(&prompt, generation.temperature, generation.max_output_tokens)
            .await?;

        Ok(RagAnswer {
            answer,
            chunk_count: context.chunk_count,
            page_count: context.page_count,
        })
    }
}

/// Nudge hit ordering by query-term overlap, combined with the vector
/// distance rather than replacing it
fn rerank_hits(query: &str, hits: &mut [NearChunk]) {
    let query_words: HashSet<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let overlap = |text: &str| -> usize {
        let chunk_words: HashSet<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        query_words.intersection(&chunk_words).count()
    };

    hits.sort_by(|a, b| {
        let score_a = a.distance - 0.01 * overlap(&a.text) as f64;
        let score_b = b.distance - 0.01 * overlap(&b.text) as f64;
        score_a
            .partial_cmp(&score_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Remove duplicate chunks while preserving order
fn dedupe_chunks(chunks: Vec<ContextChunk>) -> Vec<ContextChunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.id))
        .collect()
}

/// Render page-ordered chunks with page-boundary markers, bounded to
/// `max_chars` bytes on a char boundary
fn render_context(chunks: &[ContextChunk], max_chars: usize) -> String {
    let mut out = String::new();
    let mut current_page = None;

    for chunk in chunks {
        if current_page != Some(chunk.page) {
            out.push_str(&format!("\n==== PAGE {} ====\n\n", chunk.page));
            current_page = Some(chunk.page);
        }
        out.push_str(&chunk.text);
        out.push_str("\n\n");
    }

    if out.len() > max_chars {
        let mut cut = max_chars;
        while cut > 0 && !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }

    out.trim().to_string()
}

/// Build the grounded generation prompt
fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an expert research assistant. Answer based ONLY on the \
following context from the paper.\n\
Always reference page numbers when providing specific information.\n\n\
CONTEXT:\n{}\n\n\
QUESTION: {}\n\n\
ANSWER:",
        context, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: u128, chunk_id: i32, page: i32, text: &str) -> ContextChunk {
        ContextChunk {
            id: Uuid::from_u128(id),
            chunk_id,
            page,
            text: text.to_string(),
        }
    }

    fn hit(id: u128, chunk_id: i32, page: i32, text: &str, distance: f64) -> NearChunk {
        NearChunk {
            id: Uuid::from_u128(id),
            chunk_id,
            page,
            text: text.to_string(),
            distance,
        }
    }

    #[test]
    fn test_rerank_boosts_term_overlap() {
        // Equal distances; the chunk sharing query terms must come first
        let mut hits = vec![
            hit(1, 0, 1, "completely unrelated content", 0.40),
            hit(2, 1, 2, "gradient descent convergence analysis", 0.40),
        ];
        rerank_hits("gradient descent convergence", &mut hits);
        assert_eq!(hits[0].id, Uuid::from_u128(2));
    }

    #[test]
    fn test_rerank_keeps_distance_dominant() {
        // A much closer chunk stays ahead despite zero term overlap
        let mut hits = vec![
            hit(1, 0, 1, "nothing in common", 0.05),
            hit(2, 1, 2, "gradient descent", 0.50),
        ];
        rerank_hits("gradient descent", &mut hits);
        assert_eq!(hits[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn test_dedupe_preserves_first_occurrence() {
        let chunks = vec![
            chunk(1, 0, 1, "a"),
            chunk(2, 1, 1, "b"),
            chunk(1, 0, 1, "a"),
        ];
        let deduped = dedupe_chunks(chunks);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, Uuid::from_u128(1));
        assert_eq!(deduped[1].id, Uuid::from_u128(2));
    }

    #[test]
    fn test_render_groups_by_page() {
        let chunks = vec![
            chunk(1, 0, 1, "first page text"),
            chunk(2, 1, 1, "more of page one"),
            chunk(3, 2, 2, "second page text"),
        ];
        let rendered = render_context(&chunks, 10_000);

        assert_eq!(rendered.matches("==== PAGE 1 ====").count(), 1);
        assert_eq!(rendered.matches("==== PAGE 2 ====").count(), 1);
        let page1 = rendered.find("==== PAGE 1 ====").unwrap();
        let page2 = rendered.find("==== PAGE 2 ====").unwrap();
        assert!(page1 < page2);
    }

    #[test]
    fn test_render_respects_bound() {
        let chunks = vec![chunk(1, 0, 1, &"long text ".repeat(100))];
        let rendered = render_context(&chunks, 120);
        assert!(rendered.len() <= 120);
        assert!(!rendered.is_empty());
    }

    #[test]
    fn test_prompt_contains_context_and_question() {
        let prompt = build_prompt("==== PAGE 3 ====\n\nresult text", "What was measured?");
        assert!(prompt.contains("==== PAGE 3 ===="));
        assert!(prompt.contains("What was measured?"));
        assert!(prompt.contains("page numbers"));
    }
}
