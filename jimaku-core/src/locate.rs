use crate::normalize::NormalizedText;
use serde::Serialize;

/// Half-open byte range in source (plain text) or markup coordinates.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn contains(&self, r: &std::ops::Range<usize>) -> bool { r.start >= self.start && r.end <= self.end }

    pub fn is_empty(&self) -> bool { self.start >= self.end }
}

/// Leftmost occurrence of an already-normalized `query` in `hay`, projected back
/// to source offsets. The span starts at the source of the first matched unit
/// and ends after the whole source character of the last one, so characters
/// that expanded to several units are never cut.
pub fn locate(hay: &NormalizedText, query: &str) -> Option<MatchSpan> {
    if query.is_empty() {
        return None;
    }
    let pos = hay.text.find(query)?;
    let first = hay.text[..pos].chars().count();
    let last = first + query.chars().count() - 1;
    Some(MatchSpan { start: *hay.map.get(first)?, end: *hay.ends.get(last)? })
}
