//! Heading detection heuristic.
//!
//! Section detection is inherently fuzzy, so the entire heuristic lives in one
//! predicate that returns the normalized heading text when it matches. Callers
//! never inspect case or keywords inline.

const MAX_HEADING_CHARS: usize = 80;

/// Leading words that mark a line as a structural heading regardless of case.
const STRUCTURAL_KEYWORDS: [&str; 12] = [
    "introduction",
    "abstract",
    "conclusion",
    "references",
    "appendix",
    "acknowledgments",
    "summary",
    "overview",
    "background",
    "methodology",
    "results",
    "discussion",
];

/// Decide whether `text` reads as a section heading.
///
/// Returns the whitespace-normalized heading when the text is short, does not
/// end in a sentence terminator, and is fully upper-case, title-case, or
/// starts with a structural keyword. Returns `None` otherwise.
pub fn detect_heading(text: &str) -> Option<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() || normalized.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    if ends_with_sentence_terminator(&normalized) {
        return None;
    }
    if !normalized.chars().any(|c| c.is_alphabetic()) {
        return None;
    }

    if is_all_uppercase(&normalized)
        || is_title_case(&normalized)
        || starts_with_structural_keyword(&normalized)
    {
        Some(normalized)
    } else {
        None
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ends_with_sentence_terminator(text: &str) -> bool {
    matches!(text.chars().last(), Some('.' | '!' | '?' | ';' | ','))
}

fn is_all_uppercase(text: &str) -> bool {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .all(|c| c.is_uppercase())
}

fn is_title_case(text: &str) -> bool {
    let mut words = 0;
    for word in text.split(' ') {
        let Some(first_alpha) = word.chars().find(|c| c.is_alphabetic()) else {
            continue;
        };
        words += 1;
        if !first_alpha.is_uppercase() {
            return false;
        }
    }
    words > 0
}

fn starts_with_structural_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    STRUCTURAL_KEYWORDS.iter().any(|keyword| {
        lowered == *keyword
            || lowered
                .strip_prefix(keyword)
                .is_some_and(|rest| rest.starts_with([' ', ':']))
    })
}
