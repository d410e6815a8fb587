//! Snippet highlighting

use regex_lite::Regex;

/// Wrap every case-insensitive literal occurrence of `query` in
/// `<mark>` tags, preserving the original casing of the text
pub fn highlight_query(text: &str, query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        return text.to_string();
    }

    let pattern = format!("(?i){}", regex_lite::escape(query));
    let Ok(re) = Regex::new(&pattern) else {
        return text.to_string();
    };

    re.replace_all(text, |caps: &regex_lite::Captures| {
        format!("<mark>{}</mark>", &caps[0])
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_preserves_case() {
        let highlighted = highlight_query("Semantic Search beats semantic search", "semantic search");
        assert_eq!(
            highlighted,
            "<mark>Semantic Search</mark> beats <mark>semantic search</mark>"
        );
    }

    #[test]
    fn test_highlight_no_match() {
        assert_eq!(highlight_query("nothing here", "query"), "nothing here");
    }

    #[test]
    fn test_highlight_empty_query() {
        assert_eq!(highlight_query("text", "  "), "text");
    }

    #[test]
    fn test_highlight_escapes_regex_metacharacters() {
        let highlighted = highlight_query("cost is $5 (approx)", "$5 (approx)");
        assert_eq!(highlighted, "cost is <mark>$5 (approx)</mark>");
    }
}
