//! Ruby markup vocabulary and the tag-aware scanner shared by markup
//! normalization and highlight projection.

use std::ops::Range;

pub const RUBY_OPEN: &str = "<ruby>";
pub const RUBY_CLOSE: &str = "</ruby>";
pub const BASE_OPEN: &str = "<rb>";
pub const BASE_CLOSE: &str = "</rb>";
pub const READING_OPEN: &str = "<rt>";
pub const READING_CLOSE: &str = "</rt>";
pub const OKURIGANA_OPEN: &str = "<span class=\"okurigana\">";
pub const OKURIGANA_CLOSE: &str = "</span>";
pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Tag name of the reading container.
pub const READING_TAG: &str = "rt";

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One structural piece of markup. Units are contiguous and cover every byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Tag { name: String, closing: bool, raw: Range<usize> },
    /// A visible character; entities decode to one `Char` spanning the whole reference.
    Char { ch: char, raw: Range<usize>, in_reading: bool },
}

impl Unit {
    pub fn raw(&self) -> Range<usize> {
        match self {
            Unit::Tag { raw, .. } | Unit::Char { raw, .. } => raw.clone(),
        }
    }

    pub fn is_open(&self, tag: &str) -> bool {
        matches!(self, Unit::Tag { name, closing: false, .. } if name == tag)
    }

    pub fn is_close(&self, tag: &str) -> bool {
        matches!(self, Unit::Tag { name, closing: true, .. } if name == tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InTag,
    InReadingContainer,
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    // s は '&' から始まる
    let semi = s.char_indices().take(12).find(|(_, c)| *c == ';').map(|(i, _)| i)?;
    let name = &s[1..semi];
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, semi + 1))
}

fn tag_name(inner: &str) -> (String, bool) {
    let closing = inner.starts_with('/');
    let name = inner
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    (name, closing)
}

/// Scan markup into units. Returns `None` for malformed markup: an unterminated
/// tag, a `<` inside a tag, a reading close without an open, or a reading
/// container still open at end of input.
pub fn scan(markup: &str) -> Option<Vec<Unit>> {
    let mut units: Vec<Unit> = Vec::new();
    let mut state = State::Outside;
    let mut depth = 0usize;
    let mut tag_start = 0usize;
    let mut pos = 0usize;
    while let Some(c) = markup[pos..].chars().next() {
        let len = c.len_utf8();
        match state {
            State::Outside | State::InReadingContainer => {
                if c == '<' {
                    tag_start = pos;
                    state = State::InTag;
                } else if c == '&' {
                    let (ch, n) = decode_entity(&markup[pos..]).unwrap_or(('&', 1));
                    units.push(Unit::Char { ch, raw: pos..pos + n, in_reading: depth > 0 });
                    pos += n;
                    continue;
                } else {
                    units.push(Unit::Char { ch: c, raw: pos..pos + len, in_reading: depth > 0 });
                }
            }
            State::InTag => {
                if c == '<' {
                    return None;
                }
                if c == '>' {
                    let (name, closing) = tag_name(&markup[tag_start + 1..pos]);
                    if name == READING_TAG {
                        if closing {
                            depth = depth.checked_sub(1)?;
                        } else if !markup[tag_start..pos].ends_with('/') {
                            depth += 1;
                        }
                    }
                    units.push(Unit::Tag { name, closing, raw: tag_start..pos + 1 });
                    state = if depth > 0 { State::InReadingContainer } else { State::Outside };
                }
            }
        }
        pos += len;
    }
    (state == State::Outside).then_some(units)
}

/// `class="a b"` 属性にクラス名が含まれるか
pub fn tag_has_class(raw_tag: &str, class: &str) -> bool {
    for quote in ['"', '\''] {
        let key = format!("class={}", quote);
        if let Some(i) = raw_tag.find(&key) {
            let rest = &raw_tag[i + key.len()..];
            let value = rest.split(quote).next().unwrap_or("");
            return value.split_whitespace().any(|c| c == class);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(units: &[Unit]) -> String {
        units
            .iter()
            .filter_map(|u| match u {
                Unit::Char { ch, in_reading: false, .. } => Some(*ch),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(escape_html("漢字"), "漢字");
    }

    #[test]
    fn scans_ruby_group() {
        let m = "x<ruby><rb>漢</rb><rt>かん</rt></ruby>y";
        let units = scan(m).unwrap();
        assert_eq!(visible(&units), "x漢y");
        let reading: String = units
            .iter()
            .filter_map(|u| match u {
                Unit::Char { ch, in_reading: true, .. } => Some(*ch),
                _ => None,
            })
            .collect();
        assert_eq!(reading, "かん");
        // units tile the input
        let mut end = 0;
        for u in &units {
            assert_eq!(u.raw().start, end);
            end = u.raw().end;
        }
        assert_eq!(end, m.len());
    }

    #[test]
    fn entities_are_single_characters() {
        let m = "a&amp;b&lt;&#x6F22;&#23383;&bogus c";
        let units = scan(m).unwrap();
        assert_eq!(visible(&units), "a&b<漢字&bogus c");
        assert_eq!(units[1].raw(), 1..6);
    }

    #[test]
    fn malformed_markup_is_rejected() {
        assert!(scan("<ruby").is_none());
        assert!(scan("a<b<c>").is_none());
        assert!(scan("</rt>").is_none());
        assert!(scan("<rt>open").is_none());
        assert!(scan("plain text").is_some());
    }

    #[test]
    fn tag_classes() {
        assert!(tag_has_class(OKURIGANA_OPEN, "okurigana"));
        assert!(tag_has_class("<span class='x okurigana'>", "okurigana"));
        assert!(!tag_has_class("<span>", "okurigana"));
    }
}
