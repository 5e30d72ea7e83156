//! Full-text search over the index: term matching, scoring and snippets.

use std::ops::Range;

use crate::index::{Index, IndexEntry};
use crate::matcher::Kind;

/// A title occurrence counts this many times a body occurrence.
pub const TITLE_WEIGHT: usize = 5;

/// Characters of context kept on each side of the first match.
const SNIPPET_CONTEXT: usize = 80;

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub route: String,
    pub title: String,
    pub kind: Kind,
    pub score: usize,
    pub snippet: Snippet,
}

/// Excerpt of the body around the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    /// Byte ranges in `text` of every term occurrence, sorted and non-overlapping.
    pub highlights: Vec<Range<usize>>,
    /// Whether text was cut before / after the excerpt.
    pub truncated_start: bool,
    pub truncated_end: bool,
}

/// Lowercase whitespace-separated terms of a query.
pub fn terms(query: &str) -> Vec<String> {
    let mut t: Vec<String> = query.split_whitespace().map(|s| Folded::new(s).lower).collect();
    t.sort();
    t.dedup();
    t
}

/// Every entry whose title or text contains all query terms, best first.
/// Ties are broken by route so results are deterministic.
pub fn search(index: &Index, query: &str) -> Vec<SearchHit> {
    let terms = terms(query);
    if terms.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<SearchHit> = index.entries().filter_map(|e| score_entry(e, &terms)).collect();
    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.route.cmp(&b.route)));
    hits
}

fn score_entry(entry: &IndexEntry, terms: &[String]) -> Option<SearchHit> {
    if entry.searchable_text.is_empty() {
        return None;
    }
    let body = Folded::new(&entry.searchable_text);
    let title = Folded::new(&entry.title).lower;
    let mut score = 0;
    for term in terms {
        let in_body = body.lower.matches(term.as_str()).count();
        let in_title = title.matches(term.as_str()).count();
        if in_body + in_title == 0 {
            return None;
        }
        score += in_body + TITLE_WEIGHT * in_title;
    }
    Some(SearchHit {
        route: entry.route.clone(),
        title: entry.title.clone(),
        kind: entry.kind,
        score,
        snippet: body.snippet(terms),
    })
}

/// Lowercased copy of a text that remembers where each of its bytes came from.
///
/// Lowercasing one char can change its byte length (`İ` grows, `Ω` shrinks), so
/// offsets in `lower` are only ever turned into offsets in `text` through the maps.
struct Folded<'a> {
    text: &'a str,
    lower: String,
    /// For each byte of `lower`: start of the source char in `text`.
    char_start: Vec<usize>,
    /// For each byte of `lower`: end of the source char in `text`.
    char_end: Vec<usize>,
}

impl<'a> Folded<'a> {
    fn new(text: &'a str) -> Self {
        let mut lower = String::with_capacity(text.len());
        let mut char_start = Vec::with_capacity(text.len());
        let mut char_end = Vec::with_capacity(text.len());
        for (i, c) in text.char_indices() {
            let before = lower.len();
            lower.extend(c.to_lowercase());
            let grown = lower.len() - before;
            char_start.extend(std::iter::repeat(i).take(grown));
            char_end.extend(std::iter::repeat(i + c.len_utf8()).take(grown));
        }
        Self {
            text,
            lower,
            char_start,
            char_end,
        }
    }

    /// Range in `text` covering the chars that produced `lower[range]`.
    fn source_range(&self, range: Range<usize>) -> Range<usize> {
        self.char_start[range.start]..self.char_end[range.end - 1]
    }

    fn snippet(&self, terms: &[String]) -> Snippet {
        let text = self.text;
        let mut matches: Vec<Range<usize>> = Vec::new();
        for term in terms.iter().filter(|t| !t.is_empty()) {
            for (i, m) in self.lower.match_indices(term.as_str()) {
                matches.push(self.source_range(i..i + m.len()));
            }
        }
        matches.sort_by_key(|r| r.start);
        let center = matches.first().map_or(0, |r| r.start);

        let mut start = center.saturating_sub(SNIPPET_CONTEXT);
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (center + SNIPPET_CONTEXT * 2).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }

        let mut merged: Vec<Range<usize>> = Vec::new();
        for r in matches.into_iter().filter(|r| r.start >= start && r.end <= end) {
            let r = r.start - start..r.end - start;
            match merged.last_mut() {
                Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
                _ => merged.push(r),
            }
        }

        Snippet {
            text: text[start..end].to_string(),
            highlights: merged,
            truncated_start: start > 0,
            truncated_end: end < text.len(),
        }
    }
}

/// Build a snippet of `text` around the first occurrence of any term.
pub fn snippet(text: &str, terms: &[String]) -> Snippet {
    Folded::new(text).snippet(terms)
}
