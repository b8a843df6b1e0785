use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::OnceLock;

/// Parsed subtitle content, left to right.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    Plain { text: String },
    Annotated { base: String, reading: String },
}

impl Token {
    /// Text shown on the line itself (readings excluded).
    pub fn visible(&self) -> &str {
        match self {
            Token::Plain { text } => text,
            Token::Annotated { base, .. } => base,
        }
    }
}

/// A recognized `base[reading]` occurrence as byte ranges into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMatch {
    pub whole: Range<usize>,
    pub base: Range<usize>,
    pub reading: Range<usize>,
}

fn annotation_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // base: 空白類と角括弧を含まない連続; reading: 角括弧を含まない1文字以上
    RE.get_or_init(|| Regex::new(r"([^\s\[\]]+)\[([^\[\]]+)\]").ok()).as_ref()
}

/// Locate every well-formed annotation. Whitespace-only readings are not annotations.
pub fn find_annotations(raw: &str) -> Vec<AnnotationMatch> {
    let Some(re) = annotation_re() else { return Vec::new() };
    re.captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let base = caps.get(1)?;
            let reading = caps.get(2)?;
            if reading.as_str().trim().is_empty() {
                return None;
            }
            Some(AnnotationMatch {
                whole: whole.range(),
                base: base.range(),
                reading: reading.range(),
            })
        })
        .collect()
}

/// Split raw subtitle text into plain runs and annotated runs. Never fails:
/// anything that is not a well-formed annotation stays verbatim in a plain run.
pub fn parse(raw: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    let mut last = 0usize;
    for m in find_annotations(raw) {
        if m.whole.start > last {
            out.push(Token::Plain { text: raw[last..m.whole.start].to_string() });
        }
        out.push(Token::Annotated {
            base: raw[m.base.clone()].to_string(),
            reading: raw[m.reading.clone()].trim().to_string(),
        });
        last = m.whole.end;
    }
    if last < raw.len() {
        out.push(Token::Plain { text: raw[last..].to_string() });
    }
    out
}

pub fn has_annotations(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| matches!(t, Token::Annotated { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 括弧を除いた表示テキスト
    fn visible_text(tokens: &[Token]) -> String {
        tokens.iter().map(Token::visible).collect()
    }

    fn annotated(base: &str, reading: &str) -> Token {
        Token::Annotated { base: base.into(), reading: reading.into() }
    }

    fn plain(text: &str) -> Token {
        Token::Plain { text: text.into() }
    }

    #[test]
    fn parses_furigana_line() {
        let toks = parse("幸せ[しあわせ]に暮[く]らしていました");
        assert_eq!(
            toks,
            vec![
                annotated("幸せ", "しあわせ"),
                // base は空白までの連続なので、直前のかなも含む
                annotated("に暮", "く"),
                plain("らしていました"),
            ]
        );
        assert_eq!(visible_text(&toks), "幸せに暮らしていました");
    }

    #[test]
    fn whitespace_delimits_base() {
        let toks = parse("今日 天気[てんき]\u{3000}学校[がっこう]");
        assert_eq!(
            toks,
            vec![
                plain("今日 "),
                annotated("天気", "てんき"),
                plain("\u{3000}"),
                annotated("学校", "がっこう"),
            ]
        );
        let toks = parse("a\u{00A0}b[c]");
        assert_eq!(toks, vec![plain("a\u{00A0}"), annotated("b", "c")]);
    }

    #[test]
    fn pinyin_reading_may_contain_spaces() {
        let toks = parse("中国[zhōng guó]人");
        assert_eq!(toks, vec![annotated("中国", "zhōng guó"), plain("人")]);
    }

    #[test]
    fn malformed_brackets_stay_plain() {
        assert_eq!(parse("foo[bar"), vec![plain("foo[bar")]);
        assert_eq!(parse("foo[]"), vec![plain("foo[]")]);
        assert_eq!(parse("foo[  ]"), vec![plain("foo[  ]")]);
        assert_eq!(parse("[orphan]"), vec![plain("[orphan]")]);
        assert_eq!(parse("x ]y["), vec![plain("x ]y[")]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn nested_open_bracket_is_text() {
        assert_eq!(parse("a[b[c]"), vec![plain("a["), annotated("b", "c")]);
    }

    #[test]
    fn plain_text_round_trips() {
        let s = "hello, world 123";
        assert_eq!(parse(s), vec![plain(s)]);
        assert!(!has_annotations(&parse(s)));
    }

    #[test]
    fn match_ranges_point_into_source() {
        let raw = "x 漢字[かんじ]";
        let ms = find_annotations(raw);
        assert_eq!(ms.len(), 1);
        assert_eq!(&raw[ms[0].base.clone()], "漢字");
        assert_eq!(&raw[ms[0].reading.clone()], "かんじ");
        assert_eq!(&raw[ms[0].whole.clone()], "漢字[かんじ]");
    }
}
