//! Term lookup in a generated summary.

use serde::Serialize;

/// Outcome of looking up a term in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermSearch {
    pub term: String,
    pub found: bool,
}

impl TermSearch {
    /// The sentence shown to the user.
    pub fn message(&self) -> String {
        if self.found {
            format!("The term '{}' was found in the summary.", self.term)
        } else {
            format!("The term '{}' was not found in the summary.", self.term)
        }
    }
}

impl std::fmt::Display for TermSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Case-insensitive substring test of `term` in `summary`.
pub fn locate(summary: &str, term: &str) -> TermSearch {
    TermSearch {
        term: term.to_string(),
        found: summary.to_lowercase().contains(&term.to_lowercase()),
    }
}

/// Look up `term` unless it is absent or empty.
pub fn locate_optional(summary: &str, term: Option<&str>) -> Option<TermSearch> {
    term.filter(|t| !t.is_empty())
        .map(|t| locate(summary, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        for summary in ["a cat sat", "A CAT SAT", "a caT sat"] {
            assert!(locate(summary, "Cat").found, "{}", summary);
        }
    }

    #[test]
    fn test_found_message() {
        let result = locate("Rust is fast.", "rust");
        assert_eq!(result.message(), "The term 'rust' was found in the summary.");
    }

    #[test]
    fn test_not_found_message_verbatim() {
        let result = locate("nothing to see here", "xyz123");
        assert!(!result.found);
        assert_eq!(
            result.to_string(),
            "The term 'xyz123' was not found in the summary."
        );
    }

    #[test]
    fn test_unicode_lowercase() {
        assert!(locate("ÜBER alles", "über").found);
    }

    #[test]
    fn test_empty_term_is_not_searched() {
        assert_eq!(locate_optional("summary", None), None);
        assert_eq!(locate_optional("summary", Some("")), None);
        assert!(locate_optional("summary", Some("SUM")).unwrap().found);

        // Whitespace is a term like any other
        assert!(locate_optional("two words", Some(" ")).unwrap().found);
        assert!(!locate_optional("summary", Some("   ")).unwrap().found);
    }
}
