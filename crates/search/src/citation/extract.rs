//! Reference-section extraction
//!
//! Scans the last pages of a document for a references heading and
//! accumulates entry lines until the section visibly ends. Multi-line
//! entries are merged on the heuristic that a new citation begins at a
//! line carrying a parenthesized 4-digit year.

use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// How many trailing pages to scan for the references section
pub const MAX_PAGES_TO_CHECK: usize = 3;

/// Lines that terminate the references section
const TERMINATOR_LINES: [&str; 4] = [
    "appendix",
    "acknowledgements",
    "about the authors",
    "glossary",
];

fn reference_heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(references|bibliography|works cited)\s*$").expect("static pattern")
    })
}

fn numbered_section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s+[A-Z]").expect("static pattern"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\d{4}\)").expect("static pattern"))
}

/// Extract raw citation entries from the last pages of a document
pub fn extract_references(page_texts: &[String], max_pages_to_check: usize) -> Vec<String> {
    let start = page_texts.len().saturating_sub(max_pages_to_check);
    let mut raw_lines: Vec<String> = Vec::new();
    let mut found_section = false;

    'pages: for (offset, text) in page_texts[start..].iter().enumerate() {
        for line in text.lines() {
            let line_clean = line.trim();

            if !found_section {
                if reference_heading_re().is_match(line_clean) {
                    found_section = true;
                    debug!(page = start + offset + 1, "Found references section");
                }
                continue;
            }

            let lower = line_clean.to_lowercase();
            if TERMINATOR_LINES.contains(&lower.as_str()) {
                break 'pages;
            }
            if numbered_section_re().is_match(line_clean) {
                break 'pages;
            }

            if !line_clean.is_empty() {
                raw_lines.push(line_clean.to_string());
            }
        }
    }

    merge_reference_lines(&raw_lines)
}

/// Merge continuation lines into single citation entries
fn merge_reference_lines(lines: &[String]) -> Vec<String> {
    let mut citations = Vec::new();
    let mut current = String::new();

    for line in lines {
        if year_re().is_match(line) && !current.is_empty() {
            citations.push(current.trim().to_string());
            current = line.clone();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        citations.push(current.trim().to_string());
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_extracts_entries_after_heading() {
        let last_page = "\
Some closing discussion.
References
Smith, J. (2019). A study of things. Journal of Studies.
Jones, K. (2020). Another study. Proceedings.
";
        let citations = extract_references(&pages(&["body", last_page]), MAX_PAGES_TO_CHECK);

        assert_eq!(citations.len(), 2);
        assert!(citations[0].starts_with("Smith, J. (2019)."));
        assert!(citations[1].starts_with("Jones, K. (2020)."));
    }

    #[test]
    fn test_merges_continuation_lines() {
        let last_page = "\
Bibliography
Smith, J. (2019). A very long title that wraps
across two lines. Journal of Studies.
Jones, K. (2020). Short title. Proceedings.
";
        let citations = extract_references(&pages(&[last_page]), MAX_PAGES_TO_CHECK);

        assert_eq!(citations.len(), 2);
        assert!(citations[0].contains("wraps across two lines"));
    }

    #[test]
    fn test_stops_at_terminating_heading() {
        let last_page = "\
References
Smith, J. (2019). A study. Journal.
Appendix
Table 1: raw data that is not a citation (2001).
";
        let citations = extract_references(&pages(&[last_page]), MAX_PAGES_TO_CHECK);

        assert_eq!(citations.len(), 1);
        assert!(!citations[0].contains("raw data"));
    }

    #[test]
    fn test_stops_at_new_numbered_section() {
        let last_page = "\
Works Cited
Smith, J. (2019). A study. Journal.
7. Conclusion
Closing remarks (2020).
";
        let citations = extract_references(&pages(&[last_page]), MAX_PAGES_TO_CHECK);

        assert_eq!(citations.len(), 1);
    }

    #[test]
    fn test_heading_must_be_exact_line() {
        let last_page = "The references below are discussed.\nNo entries here.";
        assert!(extract_references(&pages(&[last_page]), MAX_PAGES_TO_CHECK).is_empty());
    }

    #[test]
    fn test_only_last_pages_scanned() {
        let early_page = "References\nSmith, J. (2019). Too early. Journal.";
        let texts = pages(&[early_page, "filler", "filler", "filler", "no refs here"]);
        assert!(extract_references(&texts, MAX_PAGES_TO_CHECK).is_empty());
    }

    #[test]
    fn test_no_references_section() {
        assert!(extract_references(&pages(&["just text"]), MAX_PAGES_TO_CHECK).is_empty());
    }
}
