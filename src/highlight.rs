use regex::{Regex, RegexBuilder};

use crate::search::normalize_search_text;

/// Builds a regex that finds `search_text` inside a title or description the
/// same way the list filter does: case-insensitive, with any whitespace in
/// either the query or the text ignored.
pub fn build_highlight_regex(search_text: &str) -> Option<Regex> {
    let needle = normalize_search_text(search_text);
    if needle.is_empty() {
        return None;
    }
    let pattern = needle
        .chars()
        .map(|ch| regex::escape(&ch.to_string()))
        .collect::<Vec<_>>()
        .join(r"\s*");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Wraps every match of `regex` in `open`/`close` markers.
pub fn mark_matches(text: &str, regex: &Regex, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in regex.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        out.push_str(open);
        out.push_str(found.as_str());
        out.push_str(close);
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}
