//! Page-attributed text chunking
//!
//! Splits extracted document pages into size-bounded chunks for
//! embedding. Page texts are concatenated into one buffer with a
//! char-offset→page map so each chunk is attributed to the page its start
//! falls on; once the buffer has grown past the appendix cutoff, pages
//! carrying an APPENDIX heading (and everything after them) are dropped
//! as non-substantive back matter.
//!
//! Splitting is recursive by separator specificity: paragraph break,
//! line break, sentence end, space, then raw characters. Identical input
//! and settings always produce an identical chunk sequence; re-indexing
//! depends on it.

use crate::extract::DocumentPage;
use paperdex_common::config::SearchSettings;
use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Separators in decreasing order of specificity
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk
    pub chunk_overlap: usize,
    /// Buffer length after which appendix pages are cut off
    pub appendix_cutoff: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            appendix_cutoff: 5000,
        }
    }
}

impl From<&SearchSettings> for ChunkingConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            appendix_cutoff: settings.appendix_cutoff,
        }
    }
}

/// A chunk of document text with its page attribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub text: String,
    /// 1-based page the chunk starts on
    pub page: i32,
    /// 0-based emission order within the document
    pub chunk_id: i32,
}

fn appendix_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\s*appendi(?:x|ces)\b").expect("static pattern"))
}

/// True if the page carries an APPENDIX / APPENDICES heading line
fn has_appendix_heading(page_text: &str) -> bool {
    appendix_heading_re().is_match(page_text)
}

/// Split document pages into page-attributed, size-bounded chunks
pub fn chunk_pages(pages: &[DocumentPage], config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut buffer = String::new();
    // (start offset in buffer, page number)
    let mut page_starts: Vec<(usize, i32)> = Vec::new();

    for page in pages {
        if buffer.len() > config.appendix_cutoff && has_appendix_heading(&page.text) {
            debug!(
                page = page.number,
                buffer_len = buffer.len(),
                "Appendix heading past cutoff, dropping remaining pages"
            );
            break;
        }
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        page_starts.push((buffer.len(), page.number));
        buffer.push_str(&page.text);
    }

    let spans = split_spans(&buffer, config.chunk_size, config.chunk_overlap);

    let mut chunks = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        let text = &buffer[start..end];
        if text.trim().is_empty() {
            continue;
        }
        chunks.push(TextChunk {
            text: text.to_string(),
            page: page_at(&page_starts, start),
            chunk_id: chunks.len() as i32,
        });
    }

    debug!(
        page_count = pages.len(),
        buffer_len = buffer.len(),
        chunk_count = chunks.len(),
        "Document chunked"
    );

    chunks
}

/// Compute chunk spans over the buffer.
///
/// Each span is at most `chunk_size` bytes; every span after the first
/// starts `overlap` bytes before the previous cut, so the non-overlap
/// cores tile the buffer exactly. Cuts snap to the most specific
/// separator available inside the size budget and fall back to a raw
/// character cut when none is present.
pub(crate) fn split_spans(buffer: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let len = buffer.len();
    if len == 0 || chunk_size == 0 {
        return spans;
    }

    // Overlap must leave room for forward progress
    let overlap = if overlap >= chunk_size {
        chunk_size / 2
    } else {
        overlap
    };

    // Start of the not-yet-covered core
    let mut pos: usize = 0;
    loop {
        let start = if spans.is_empty() {
            0
        } else {
            floor_char_boundary(buffer, pos.saturating_sub(overlap))
        };

        if len - start <= chunk_size {
            spans.push((start, len));
            break;
        }

        let budget_end = floor_char_boundary(buffer, start + chunk_size);
        let cut = find_cut(buffer, pos, budget_end);
        spans.push((start, cut));
        pos = cut;
    }

    spans
}

/// Find the cut position in `(lo, hi]`: the last occurrence of the most
/// specific separator, or `hi` when no separator is present
fn find_cut(buffer: &str, lo: usize, hi: usize) -> usize {
    let window = &buffer[lo..hi];
    for sep in SEPARATORS {
        if let Some(idx) = window.rfind(sep) {
            let cut = lo + idx + sep.len();
            if cut > lo {
                return cut;
            }
        }
    }
    hi
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Page attribution for a chunk starting at `offset`
fn page_at(page_starts: &[(usize, i32)], offset: usize) -> i32 {
    let idx = page_starts.partition_point(|(start, _)| *start <= offset);
    if idx == 0 {
        page_starts.first().map(|(_, page)| *page).unwrap_or(1)
    } else {
        page_starts[idx - 1].1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: i32, text: &str) -> DocumentPage {
        DocumentPage::new(number, text)
    }

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
            appendix_cutoff: 5000,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_pages(&[], &ChunkingConfig::default()).is_empty());
        assert!(chunk_pages(&[page(1, "")], &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_short_document_is_one_chunk() {
        let chunks = chunk_pages(&[page(1, "A short page.")], &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].text, "A short page.");
    }

    #[test]
    fn test_1200_chars_500_size_50_overlap() {
        // No separators at all forces raw character cuts, so the overlap
        // is exact: [0,500), [450,950), [900,1200)
        let text = "x".repeat(1200);
        let chunks = chunk_pages(&[page(1, &text)], &config(500, 50));

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 500);
        }
        for pair in chunks.windows(2) {
            let prev_tail = &pair[0].text[pair[0].text.len() - 50..];
            assert_eq!(&pair[1].text[..50], prev_tail);
        }
    }

    #[test]
    fn test_bounded_size_with_sentences() {
        let text = "This is a sentence about retrieval. ".repeat(60);
        let chunks = chunk_pages(&[page(1, &text)], &config(500, 50));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 500, "chunk too long: {}", chunk.text.len());
        }
    }

    #[test]
    fn test_coverage_cores_tile_buffer() {
        let buffer = "Paragraph one.\n\nParagraph two is a bit longer. It has two sentences.\n\nThird paragraph here. ".repeat(20);
        let spans = split_spans(&buffer, 300, 40);

        assert_eq!(spans[0].0, 0);
        assert_eq!(spans.last().unwrap().1, buffer.len());
        // Ignoring the overlap prefixes, the spans reconstruct the buffer
        let mut rebuilt = String::new();
        let mut prev_end = 0;
        for (start, end) in &spans {
            assert!(*start <= prev_end, "gap between spans");
            rebuilt.push_str(&buffer[prev_end.max(*start)..*end]);
            prev_end = *end;
        }
        assert_eq!(rebuilt, buffer);
    }

    #[test]
    fn test_determinism() {
        let pages = vec![
            page(1, &"First page sentence. ".repeat(40)),
            page(2, &"Second page sentence. ".repeat(40)),
        ];
        let cfg = config(400, 80);
        let first = chunk_pages(&pages, &cfg);
        let second = chunk_pages(&pages, &cfg);
        assert_eq!(first, second);
    }

    #[test]
    fn test_pages_are_monotonic_and_attributed() {
        let pages = vec![
            page(1, &"Alpha section text. ".repeat(30)),
            page(2, &"Beta section text. ".repeat(30)),
            page(3, &"Gamma section text. ".repeat(30)),
        ];
        let chunks = chunk_pages(&pages, &config(300, 50));

        assert_eq!(chunks[0].page, 1);
        for pair in chunks.windows(2) {
            assert!(pair[1].page >= pair[0].page);
        }
        assert_eq!(chunks.last().unwrap().page, 3);
        // chunk_id is emission order
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i as i32);
        }
    }

    #[test]
    fn test_appendix_pages_dropped_after_cutoff() {
        let body = "Substantive result discussion. ".repeat(40); // > 1000 chars
        let pages = vec![
            page(1, &body),
            page(2, "APPENDIX A\nRaw tables nobody should embed."),
            page(3, "More appendix material."),
        ];
        let cfg = ChunkingConfig {
            chunk_size: 500,
            chunk_overlap: 50,
            appendix_cutoff: 1000,
        };
        let chunks = chunk_pages(&pages, &cfg);

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.page == 1));
        assert!(chunks.iter().all(|c| !c.text.contains("APPENDIX")));
    }

    #[test]
    fn test_appendix_kept_before_cutoff() {
        // Below the cutoff the appendix heading is not acted on
        let pages = vec![page(1, "Short body."), page(2, "APPENDIX A\ntables")];
        let chunks = chunk_pages(&pages, &ChunkingConfig::default());
        assert!(chunks.iter().any(|c| c.text.contains("APPENDIX")));
    }

    #[test]
    fn test_appendix_heading_detection() {
        assert!(has_appendix_heading("APPENDIX"));
        assert!(has_appendix_heading("  Appendices\nstuff"));
        assert!(has_appendix_heading("preamble\nAPPENDIX B: Proofs"));
        assert!(!has_appendix_heading("the appendix is discussed"));
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let buffer = format!("{}\n\n{}", "a".repeat(200), "b".repeat(200));
        let spans = split_spans(&buffer, 300, 0);
        // Cut lands on the paragraph break, not mid-run
        assert_eq!(spans[0], (0, 202));
        assert_eq!(spans[1], (202, buffer.len()));
    }
}
