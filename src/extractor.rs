//! Candidate class extraction.
//!
//! The input is treated as an undifferentiated character stream. A candidate is
//!
//! ```text
//! candidate := segment (":" segment)*
//! segment   := (word | bracket)+
//! word      := [A-Za-z0-9_-]
//! bracket   := "[" ... "]"   balanced, no whitespace, opaque
//! ```
//!
//! A candidate may start wherever the previous character is not a word
//! character, so `hover:text-x` also yields `text-x` and the contents of
//! `["flex"]` yield `flex`. Over-matching is fine; the resolver drops noise.

use std::collections::HashSet;

/// Longest candidate considered; anything longer is minified or encoded data
const MAX_CANDIDATE_LEN: usize = 256;

/// A candidate class and where it was found
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// The candidate class name
    pub value: String,
    /// Source file path
    pub file_path: String,
    /// Line number in source file (1-indexed)
    pub line: usize,
    /// Column number in source file (0-indexed, in characters)
    pub column: usize,
}

/// Extract the deduplicated set of candidate classes from `text`
pub fn extract(text: &str) -> HashSet<String> {
    let mut found = HashSet::new();
    for_each_candidate(text, |_, value| {
        found.insert(value.to_string());
    });
    found
}

/// Extract every candidate occurrence together with its location
pub fn extract_candidates(text: &str, file_path: &str) -> Vec<Candidate> {
    let lines = LineIndex::new(text);
    let mut candidates = Vec::new();
    for_each_candidate(text, |start, value| {
        let (line, column) = lines.locate(text, start);
        candidates.push(Candidate {
            value: value.to_string(),
            file_path: file_path.to_string(),
            line,
            column,
        });
    });
    candidates
}

fn for_each_candidate<'t>(text: &'t str, mut emit: impl FnMut(usize, &'t str)) {
    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        let byte = bytes[start];
        if !(is_word(byte) || byte == b'[') {
            continue;
        }
        if start > 0 && is_word(bytes[start - 1]) {
            continue;
        }
        // Lexing never looks past one byte beyond the length cap, which keeps
        // long runs of `a:a:a:` or `[[[` linear in the input size.
        let window = &bytes[..bytes.len().min(start + MAX_CANDIDATE_LEN + 1)];
        let end = lex_candidate(window, start);
        if end == start || end - start > MAX_CANDIDATE_LEN {
            continue;
        }
        // Both ends sit on ASCII bytes, so the slice is on char boundaries.
        let value = &text[start..end];
        if value.bytes().any(|b| b.is_ascii_alphabetic()) {
            emit(start, value);
        }
    }
}

fn is_word(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// End offset of the candidate starting at `start`, or `start` if none
fn lex_candidate(bytes: &[u8], start: usize) -> usize {
    let mut end = lex_segment(bytes, start);
    if end == start {
        return start;
    }
    while end < bytes.len() && bytes[end] == b':' {
        let next = lex_segment(bytes, end + 1);
        if next == end + 1 {
            break;
        }
        end = next;
    }
    end
}

fn lex_segment(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() {
        if is_word(bytes[pos]) {
            pos += 1;
        } else if bytes[pos] == b'[' {
            match lex_bracket(bytes, pos) {
                Some(end) => pos = end,
                None => break,
            }
        } else {
            break;
        }
    }
    pos
}

/// Match a balanced bracket group starting at `start`; whitespace or end of
/// input before the group closes means it is not part of a class
fn lex_bracket(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            b if b.is_ascii_whitespace() => return None,
            _ => {}
        }
    }
    None
}

/// Byte offsets of line starts, for turning offsets into line/column pairs
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn locate(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = text[self.starts[line]..offset].chars().count();
        (line + 1, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(text: &str) -> Vec<String> {
        let mut found: Vec<String> = extract(text).into_iter().collect();
        found.sort();
        found
    }

    #[test]
    fn test_extracts_from_html_attribute() {
        let found = extract(r#"<div class="text-brown-3 p-4">Hi</div>"#);
        assert!(found.contains("text-brown-3"));
        assert!(found.contains("p-4"));
        assert!(found.contains("div"));
    }

    #[test]
    fn test_variants_and_stripped_suffixes() {
        assert_eq!(
            sorted("md:hover:bg-brown-2"),
            vec!["bg-brown-2", "hover:bg-brown-2", "md:hover:bg-brown-2"]
        );
    }

    #[test]
    fn test_arbitrary_values_are_opaque() {
        let found = extract(r#"class="bg-[#A27B4C] grid-cols-[repeat(2,minmax(0,[a]))]""#);
        assert!(found.contains("bg-[#A27B4C]"));
        assert!(found.contains("grid-cols-[repeat(2,minmax(0,[a]))]"));
    }

    #[test]
    fn test_unbalanced_or_spaced_brackets_stop_the_segment() {
        let found = extract("w-[10px text-white");
        assert!(found.contains("w-"));
        assert!(found.contains("text-white"));
        assert!(!found.iter().any(|c| c.contains('[')));
    }

    #[test]
    fn test_classes_inside_bracketed_string_literals() {
        let found = extract(r#"const xs = ["flex","hidden"];"#);
        assert!(found.contains("flex"));
        assert!(found.contains("hidden"));
    }

    #[test]
    fn test_trailing_colon_and_punctuation() {
        let found = extract("Use text-red-500: or p-2. (m-1)");
        assert!(found.contains("text-red-500"));
        assert!(found.contains("p-2"));
        assert!(found.contains("m-1"));
        assert!(!found.contains("text-red-500:"));
    }

    #[test]
    fn test_negative_and_numeric_tokens() {
        let found = extract("-mt-4 123 2xl:p-4");
        assert!(found.contains("-mt-4"));
        assert!(found.contains("2xl:p-4"));
        assert!(!found.contains("123"));
    }

    #[test]
    fn test_rust_view_macro() {
        let source = r#"
            view! {
                <button class="bg-brown-2 hover:bg-brown-1 text-brown-5 rounded-lg">"Sign in"</button>
            }
        "#;
        let found = extract(source);
        for expected in ["bg-brown-2", "hover:bg-brown-1", "text-brown-5", "rounded-lg"] {
            assert!(found.contains(expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_candidate_locations() {
        let text = "<p class=\"flex\">\n  <span class=\"ümlaut text-white\">";
        let candidates = extract_candidates(text, "index.html");

        let white = candidates.iter().find(|c| c.value == "text-white").unwrap();
        assert_eq!(white.file_path, "index.html");
        assert_eq!(white.line, 2);
        assert_eq!(white.column, 22);

        let flex = candidates.iter().find(|c| c.value == "flex").unwrap();
        assert_eq!((flex.line, flex.column), (1, 10));
    }

    #[test]
    fn test_overlong_runs_are_ignored() {
        let blob = "a".repeat(MAX_CANDIDATE_LEN + 1);
        assert!(extract(&blob).is_empty());
    }

    #[test]
    fn test_pathological_runs_stay_linear() {
        let started = std::time::Instant::now();
        for blob in ["a:".repeat(200_000), "[".repeat(400_000), "a[".repeat(200_000)] {
            let found = extract(&blob);
            assert!(found.iter().all(|c| c.len() <= MAX_CANDIDATE_LEN));
        }
        assert!(
            started.elapsed() < std::time::Duration::from_secs(20),
            "extraction took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_candidate_at_length_cap_is_kept() {
        let exact = format!("p-{}", "a".repeat(MAX_CANDIDATE_LEN - 2));
        assert!(extract(&format!("{} x", exact)).contains(&exact));
    }

    #[test]
    fn test_empty_and_symbol_only_input() {
        assert!(extract("").is_empty());
        assert!(extract("{}();:::[[[]]]\n\t").is_empty());
    }
}
