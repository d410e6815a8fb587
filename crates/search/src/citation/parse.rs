//! APA-style citation parsing
//!
//! Best-effort field extraction; a citation that defeats every heuristic
//! still yields a usable title fallback rather than an error.

use regex_lite::Regex;
use std::sync::OnceLock;

/// Longest prefix kept when no title heuristic matches
const TITLE_FALLBACK_CHARS: usize = 80;

/// Maximum parsed author names kept per citation
const MAX_AUTHORS: usize = 3;

/// Fields parsed out of one raw citation string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCitation {
    pub title: String,
    pub authors: Vec<String>,
    pub year: String,
}

fn year_capture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d{4})\)").expect("static pattern"))
}

fn title_after_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Text following "(YYYY)." up to the next period
    RE.get_or_init(|| Regex::new(r"\)\.\s*(.+?)\.").expect("static pattern"))
}

/// Parse title, authors, and year from an APA-style citation
pub fn parse_citation(raw: &str) -> ParsedCitation {
    let year = year_capture_re()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    ParsedCitation {
        title: parse_title(raw),
        authors: parse_authors(raw),
        year,
    }
}

/// Extract the citation title.
///
/// Tries, in order: the clause after "(YYYY)." up to the next period;
/// any period-delimited clause with more than 3 words and no
/// parentheses; a truncated prefix of the raw string.
pub fn parse_title(raw: &str) -> String {
    if let Some(caps) = title_after_year_re().captures(raw) {
        if let Some(title) = caps.get(1) {
            let title = title.as_str().trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    for clause in raw.split('.') {
        let clause = clause.trim();
        if clause.split_whitespace().count() > 3 && !clause.contains('(') && !clause.contains(')') {
            return clause.to_string();
        }
    }

    let cut = raw
        .char_indices()
        .take(TITLE_FALLBACK_CHARS)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    raw[..cut].trim().to_string()
}

/// Extract up to three author names from the text before the first paren
fn parse_authors(raw: &str) -> Vec<String> {
    let author_part = raw.split('(').next().unwrap_or(raw);

    author_part
        .split([',', '&'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .take(MAX_AUTHORS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_apa_citation() {
        let parsed = parse_citation(
            "Smith, J. & Jones, K. (2019). Deep retrieval at scale. Journal of Retrieval, 4(2).",
        );
        assert_eq!(parsed.title, "Deep retrieval at scale");
        assert_eq!(parsed.year, "2019");
        assert_eq!(parsed.authors, vec!["Smith", "J.", "Jones"]);
    }

    #[test]
    fn test_title_fallback_to_long_clause() {
        // No "(YYYY)." pattern, so the first >3-word paren-free clause wins
        let parsed = parse_citation("Smith J. A thorough survey of dense passage retrieval. 2019.");
        assert_eq!(parsed.title, "A thorough survey of dense passage retrieval");
        assert_eq!(parsed.year, "");
    }

    #[test]
    fn test_title_final_fallback_truncates() {
        let raw = "x".repeat(200);
        let parsed = parse_citation(&raw);
        assert_eq!(parsed.title.len(), 80);
    }

    #[test]
    fn test_authors_capped_at_three() {
        let parsed =
            parse_citation("Alpha, Beta, Gamma, Delta & Epsilon (2020). Many authors. Venue.");
        assert_eq!(parsed.authors.len(), 3);
        assert_eq!(parsed.authors, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_year_absent() {
        let parsed = parse_citation("Anonymous. Untitled pamphlet of unknown provenance found.");
        assert_eq!(parsed.year, "");
        assert!(!parsed.title.is_empty());
    }
}
