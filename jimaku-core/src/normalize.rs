//! Comparison forms for search, with a position map back to the source.
//!
//! Script folding (CJK languages): NFKC, lowercase, Katakana → Hiragana, with
//! whitespace and annotation brackets removed. Case folding (everything else):
//! lowercase only. Every normalized character records the byte range of the
//! source character (or entity, or base + combining marks cluster) it came from.

use crate::annotation::find_annotations;
use crate::markup::{scan, Unit};
use crate::script::{katakana_to_hiragana, Language};
use serde::Serialize;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Folding {
    Script,
    Case,
}

impl Folding {
    pub fn for_language(lang: Language) -> Self {
        if lang.is_cjk() { Folding::Script } else { Folding::Case }
    }
}

/// `map[i]..ends[i]` is the source range that produced normalized char `i`.
/// Both vectors are non-decreasing.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub map: Vec<usize>,
    pub ends: Vec<usize>,
}

impl NormalizedText {
    fn push(&mut self, c: char, start: usize, end: usize) {
        self.text.push(c);
        self.map.push(start);
        self.ends.push(end);
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

/// Whether `c` attaches to the preceding character under normalization
/// (combining marks, half-width sound marks that compose under NFKC, and
/// conjoining Hangul vowel/final jamo, which have combining class 0).
fn is_continuation(c: char) -> bool {
    matches!(c, '\u{1160}'..='\u{11FF}' | '\u{D7B0}'..='\u{D7FF}')
        || c.nfkd().next().map_or(false, |d| canonical_combining_class(d) != 0)
}

fn excluded(c: char) -> bool { c.is_whitespace() || c == '[' || c == ']' }

/// Fold a run of `(char, start, end)` source items into `out`. Runs are broken
/// at structural boundaries; clusters never span two runs.
fn fold_run(out: &mut NormalizedText, run: &[(char, usize, usize)], folding: Folding) {
    match folding {
        Folding::Case => {
            for &(c, s, e) in run {
                for l in c.to_lowercase() {
                    out.push(l, s, e);
                }
            }
        }
        Folding::Script => {
            let mut i = 0usize;
            while i < run.len() {
                let mut j = i + 1;
                while j < run.len() && is_continuation(run[j].0) {
                    j += 1;
                }
                let cluster: String = run[i..j].iter().map(|(c, _, _)| *c).collect();
                let (start, end) = (run[i].1, run[j - 1].2);
                for c in cluster.nfkc() {
                    for l in c.to_lowercase() {
                        let h = katakana_to_hiragana(l);
                        if !excluded(h) {
                            out.push(h, start, end);
                        }
                    }
                }
                i = j;
            }
        }
    }
}

fn run_of(text: &str, offset: usize) -> Vec<(char, usize, usize)> {
    text.char_indices()
        .map(|(i, c)| (c, offset + i, offset + i + c.len_utf8()))
        .collect()
}

/// Normalize raw subtitle text. Well-formed `[reading]` payloads (with their
/// brackets) are skipped; offsets refer to `raw`.
pub fn normalize_plain(raw: &str, folding: Folding) -> NormalizedText {
    let mut out = NormalizedText::default();
    let mut last = 0usize;
    for m in find_annotations(raw) {
        fold_run(&mut out, &run_of(&raw[last..m.base.end], last), folding);
        last = m.whole.end;
    }
    fold_run(&mut out, &run_of(&raw[last..], last), folding);
    out
}

/// Normalize rendered markup. Tags contribute nothing, reading-container
/// content is skipped, entities count as the character they encode. Offsets
/// refer to `markup`. Returns `None` for malformed markup.
pub fn normalize_markup(markup: &str, folding: Folding) -> Option<NormalizedText> {
    let units = scan(markup)?;
    let mut out = NormalizedText::default();
    let mut run: Vec<(char, usize, usize)> = Vec::new();
    for u in &units {
        match u {
            Unit::Char { ch, raw, in_reading: false } => run.push((*ch, raw.start, raw.end)),
            _ => {
                fold_run(&mut out, &run, folding);
                run.clear();
            }
        }
    }
    fold_run(&mut out, &run, folding);
    Some(out)
}

/// Fold a bare string (query or reading text) without tracking positions.
pub fn normalize_query(q: &str, folding: Folding) -> String {
    let mut out = NormalizedText::default();
    fold_run(&mut out, &run_of(q, 0), folding);
    out.text
}
