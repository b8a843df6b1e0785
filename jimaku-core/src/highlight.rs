use crate::locate::MatchSpan;
use crate::log::log;
use crate::markup::{escape_html, scan, tag_has_class, Unit, MARK_CLOSE, MARK_OPEN};
use crate::normalize::{normalize_query, Folding};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub markup: String,
    /// Number of highlight wrappers inserted.
    pub wrappers: usize,
}

impl Projection {
    fn unchanged(markup: &str) -> Self { Projection { markup: markup.to_string(), wrappers: 0 } }
}

/// 平文: before + <mark>match</mark> + after（すべてエスケープ）
pub fn project_plain(text: &str, span: MatchSpan) -> Projection {
    let parts = (text.get(..span.start), text.get(span.start..span.end), text.get(span.end..));
    match parts {
        (Some(before), Some(hit), Some(after)) if !span.is_empty() => Projection {
            markup: format!(
                "{}{}{}{}{}",
                escape_html(before),
                MARK_OPEN,
                escape_html(hit),
                MARK_CLOSE,
                escape_html(after)
            ),
            wrappers: 1,
        },
        _ => Projection { markup: escape_html(text), wrappers: 0 },
    }
}

/// Copy markup through, wrapping each maximal run of selected characters that
/// is not interrupted by a tag. Wrappers therefore never straddle a tag.
fn emit(markup: &str, units: &[Unit], selected: &[bool]) -> Projection {
    let mut out = String::with_capacity(markup.len() + 16);
    let mut open = false;
    let mut wrappers = 0usize;
    for (u, sel) in units.iter().zip(selected) {
        let on = *sel && matches!(u, Unit::Char { .. });
        if on && !open {
            out.push_str(MARK_OPEN);
            open = true;
            wrappers += 1;
        } else if !on && open {
            out.push_str(MARK_CLOSE);
            open = false;
        }
        out.push_str(&markup[u.raw()]);
    }
    if open {
        out.push_str(MARK_CLOSE);
    }
    Projection { markup: out, wrappers }
}

/// Highlight the visible characters of `markup` whose source range lies inside
/// `span` (markup coordinates). Reading text is never highlighted here.
/// Malformed markup is returned unchanged.
pub fn project_markup(markup: &str, span: MatchSpan) -> Projection {
    let Some(units) = scan(markup) else {
        log("highlight: malformed markup, leaving unchanged");
        return Projection::unchanged(markup);
    };
    let selected: Vec<bool> = units
        .iter()
        .map(|u| match u {
            Unit::Char { raw, in_reading: false, .. } => span.contains(raw),
            _ => false,
        })
        .collect();
    emit(markup, &units, &selected)
}

/// Highlight every ruby group whose reading contains `query` (already
/// normalized with `folding`). The reading is the `<rt>` text plus any
/// okurigana span that directly follows the group; base, reading and
/// okurigana are all wrapped. Returns zero wrappers when no group matches.
pub fn project_reading_groups(markup: &str, query: &str, folding: Folding) -> Projection {
    if query.is_empty() {
        return Projection::unchanged(markup);
    }
    let Some(units) = scan(markup) else {
        log("highlight: malformed markup, leaving unchanged");
        return Projection::unchanged(markup);
    };
    let mut selected = vec![false; units.len()];
    let mut matched = false;
    let mut i = 0usize;
    while i < units.len() {
        if !units[i].is_open("ruby") {
            i += 1;
            continue;
        }
        let mut members: Vec<usize> = Vec::new();
        let mut reading = String::new();
        let mut j = i + 1;
        while j < units.len() && !units[j].is_close("ruby") {
            if let Unit::Char { ch, in_reading, .. } = &units[j] {
                members.push(j);
                if *in_reading {
                    reading.push(*ch);
                }
            }
            j += 1;
        }
        let mut next = j + 1;
        let okurigana = match units.get(next) {
            Some(Unit::Tag { name, closing: false, raw }) => {
                name == "span" && tag_has_class(&markup[raw.clone()], "okurigana")
            }
            _ => false,
        };
        if okurigana {
            next += 1;
            while next < units.len() && !units[next].is_close("span") {
                if let Unit::Char { ch, .. } = &units[next] {
                    members.push(next);
                    reading.push(*ch);
                }
                next += 1;
            }
        }
        if normalize_query(&reading, folding).contains(query) {
            for m in members {
                selected[m] = true;
            }
            matched = true;
        }
        i = next;
    }
    if !matched {
        return Projection::unchanged(markup);
    }
    emit(markup, &units, &selected)
}
