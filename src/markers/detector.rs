//! Marker detection: scans segment text against the catalog.

use crate::markers::catalog::MarkerCatalog;
use crate::model::RelationType;

/// A marker match inside a piece of text, before it is bound to a segment.
///
/// `offset` is a byte offset into the scanned text, always on a UTF-8
/// boundary. The resegmenter turns hits into `MarkerOccurrence`s by
/// attaching the owning segment id.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHit {
    pub offset: usize,
    pub keyword: String,
    pub category: RelationType,
}

/// Scans `text` for catalog keywords, longest-keyword-first at each position.
///
/// Comparison is case-normalized. Matches at the same offset keep only the
/// longest keyword; scanning resumes after a match, so matches never overlap.
/// Results are ordered by offset ascending. No side effects, no failures;
/// catalog validity was established at load time.
pub fn detect(text: &str, catalog: &MarkerCatalog) -> Vec<MarkerHit> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut hits = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let mut matched = None;
        for entry in catalog.entries_longest_first() {
            if let Some(consumed) = match_at(&chars, i, &entry.normalized) {
                matched = Some((entry, consumed));
                break;
            }
        }
        match matched {
            Some((entry, consumed)) => {
                hits.push(MarkerHit {
                    offset: chars[i].0,
                    keyword: entry.keyword.clone(),
                    category: entry.category,
                });
                i += consumed;
            }
            None => i += 1,
        }
    }
    hits
}

/// Number of text characters consumed when `keyword` (normalized) matches at
/// `start`, or None. Text characters are case-folded on the fly; a keyword
/// that would end in the middle of a character's folded expansion does not
/// match.
fn match_at(chars: &[(usize, char)], start: usize, keyword: &str) -> Option<usize> {
    let mut kw = keyword.chars().peekable();
    let mut consumed = 0;
    while kw.peek().is_some() {
        let (_, ch) = *chars.get(start + consumed)?;
        for folded in ch.to_lowercase() {
            match kw.next() {
                Some(expected) if expected == folded => {}
                _ => return None,
            }
        }
        consumed += 1;
    }
    Some(consumed)
}
