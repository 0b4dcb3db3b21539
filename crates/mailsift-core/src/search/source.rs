//! Evidence search across source document texts
//!
//! Case-insensitive verbatim substring matching: a value must appear in the
//! source, modulo case, for a hit to register. No tokenization, no fuzzing.

use super::snippet::{build_snippet, DEFAULT_CONTEXT_CHARS};

/// A located match inside a page-structured document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHit {
    /// 1-based page number
    pub page: usize,
    pub snippet: String,
}

/// Search a paged document for `term`. First occurrence per page, pages in
/// document order, stopping once `max_hits` hits have been collected.
pub fn search_pages(pages: &[String], term: &str, max_hits: usize) -> Vec<PageHit> {
    let mut hits = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        if hits.len() >= max_hits {
            break;
        }
        if let Some((start, end)) = find_ignore_case(page, term) {
            hits.push(PageHit {
                page: idx + 1,
                snippet: build_snippet(page, start, end, DEFAULT_CONTEXT_CHARS),
            });
        }
    }
    hits
}

/// Search flat text for the first occurrence of `term`
pub fn search_flat(text: &str, term: &str) -> Option<String> {
    let (start, end) = find_ignore_case(text, term)?;
    Some(build_snippet(text, start, end, DEFAULT_CONTEXT_CHARS))
}

/// Locate `needle` in `haystack` ignoring case, returning byte offsets into
/// the original haystack. Walks chars so offsets are always valid boundaries,
/// even when case folding would shift byte positions.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }

    for (start, _) in haystack.char_indices() {
        let mut consumed = 0;
        let mut n_iter = needle.iter();
        let mut h_iter = haystack[start..].chars();
        loop {
            let Some(&nc) = n_iter.next() else {
                return Some((start, start + consumed));
            };
            let Some(hc) = h_iter.next() else {
                break;
            };
            let mut folded = hc.to_lowercase();
            if folded.next() != Some(nc) || folded.next().is_some() {
                break;
            }
            consumed += hc.len_utf8();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ignore_case_basic() {
        let text = "Contact: john.smith@acmebrokerage.com";
        let (start, end) = find_ignore_case(text, "JOHN.SMITH").unwrap();
        assert_eq!(&text[start..end], "john.smith");
    }

    #[test]
    fn test_find_ignore_case_no_match() {
        assert!(find_ignore_case("nothing here", "absent").is_none());
        assert!(find_ignore_case("text", "").is_none());
    }

    #[test]
    fn test_search_pages_first_occurrence_per_page() {
        let pages = vec![
            "nothing relevant on page one".to_string(),
            "Acme Brokerage appears here, and Acme Brokerage again".to_string(),
            "Acme Brokerage also on page three".to_string(),
        ];
        let hits = search_pages(&pages, "acme brokerage", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].page, 2);
        assert_eq!(hits[1].page, 3);
    }

    #[test]
    fn test_search_pages_stops_at_max_hits() {
        let pages = vec![
            "match here".to_string(),
            "match here too".to_string(),
        ];
        let hits = search_pages(&pages, "match", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, 1);
    }

    #[test]
    fn test_blank_pages_keep_physical_numbering() {
        let pages = vec![String::new(), "Acme Brokerage".to_string()];
        let hits = search_pages(&pages, "acme", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page, 2);
    }

    #[test]
    fn test_search_pages_empty_document() {
        let hits = search_pages(&[], "anything", 1);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_flat() {
        let text = "10 Market St, San Francisco, CA 94103,wood";
        let snippet = search_flat(text, "10 market st").unwrap();
        assert!(snippet.contains("10 Market St"));
        assert!(search_flat(text, "99 Absent Ave").is_none());
    }

    #[test]
    fn test_search_flat_empty_text() {
        assert!(search_flat("", "anything").is_none());
    }
}
