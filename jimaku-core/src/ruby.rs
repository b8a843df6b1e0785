use crate::annotation::Token;
use crate::markup::{
    escape_html, BASE_CLOSE, BASE_OPEN, OKURIGANA_CLOSE, OKURIGANA_OPEN, READING_CLOSE, READING_OPEN,
    RUBY_CLOSE, RUBY_OPEN,
};
use crate::okurigana::split;
use crate::script::{is_cjk_char, Language};

enum Piece<'a> {
    Text(&'a str),
    Group { prefix: String, base: String, reading: String, okurigana: String },
}

fn group<'a>(base: &str, reading: &str, lang: Language) -> Piece<'a> {
    match split(base, reading, lang) {
        Some(s) => Piece::Group {
            prefix: s.prefix,
            base: s.core,
            reading: s.reading_core,
            okurigana: s.trailing,
        },
        None => Piece::Group {
            prefix: String::new(),
            base: base.to_string(),
            reading: reading.to_string(),
            okurigana: String::new(),
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Edge,
    Group,
    Cjk,
    Other,
}

fn side_of_char(c: Option<char>) -> Side {
    match c {
        None => Side::Edge,
        Some(c) if is_cjk_char(c) => Side::Cjk,
        Some(_) => Side::Other,
    }
}

/// Drop whitespace runs that touch a ruby group on one side and CJK text,
/// another group or the line edge on the other.
fn trim_incidental(text: &str, left: Side, right: Side) -> String {
    let touches = |a: Side, b: Side| {
        (a == Side::Group && b != Side::Other) || (b == Side::Group && a != Side::Other)
    };
    let trimmed = text.trim_matches(char::is_whitespace);
    if trimmed.is_empty() {
        return if touches(left, right) { String::new() } else { text.to_string() };
    }
    let lead = &text[..text.len() - text.trim_start_matches(char::is_whitespace).len()];
    let tail = &text[text.trim_end_matches(char::is_whitespace).len()..];
    let first = side_of_char(trimmed.chars().next());
    let last = side_of_char(trimmed.chars().next_back());
    let mut out = String::with_capacity(text.len());
    if !touches(left, first) {
        out.push_str(lead);
    }
    out.push_str(trimmed);
    if !touches(last, right) {
        out.push_str(tail);
    }
    out
}

/// Render tokens as ruby markup. Plain runs are escaped; annotated runs become
/// `<ruby><rb>…</rb><rt>…</rt></ruby>` groups with okurigana emitted after the
/// group. For languages written without word spaces, whitespace that only
/// separates a group from its neighbours is dropped.
pub fn render(tokens: &[Token], lang: Language) -> String {
    let pieces: Vec<Piece<'_>> = tokens
        .iter()
        .map(|t| match t {
            Token::Plain { text } => Piece::Text(text),
            Token::Annotated { base, reading } => group(base, reading, lang),
        })
        .collect();

    let mut out = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Text(text) => {
                if !lang.is_unspaced() {
                    out.push_str(&escape_html(text));
                    continue;
                }
                let neighbour = |p: Option<&Piece<'_>>, from_end: bool| match p {
                    None => Side::Edge,
                    Some(Piece::Group { .. }) => Side::Group,
                    Some(Piece::Text(t)) => {
                        side_of_char(if from_end { t.chars().next_back() } else { t.chars().next() })
                    }
                };
                let left = neighbour(i.checked_sub(1).and_then(|j| pieces.get(j)), true);
                let right = neighbour(pieces.get(i + 1), false);
                out.push_str(&escape_html(&trim_incidental(text, left, right)));
            }
            Piece::Group { prefix, base, reading, okurigana } => {
                out.push_str(&escape_html(prefix));
                out.push_str(RUBY_OPEN);
                out.push_str(BASE_OPEN);
                out.push_str(&escape_html(base));
                out.push_str(BASE_CLOSE);
                out.push_str(READING_OPEN);
                out.push_str(&escape_html(reading));
                out.push_str(READING_CLOSE);
                out.push_str(RUBY_CLOSE);
                if !okurigana.is_empty() {
                    out.push_str(OKURIGANA_OPEN);
                    out.push_str(&escape_html(okurigana));
                    out.push_str(OKURIGANA_CLOSE);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse;
    use crate::markup::{scan, Unit};

    fn ja(raw: &str) -> String { render(&parse(raw), Language::Japanese) }

    #[test]
    fn plain_text_is_escaped_verbatim() {
        for s in ["hello world", "a < b & c", "今日はいい天気", ""] {
            assert_eq!(render(&parse(s), Language::Japanese), escape_html(s));
            assert_eq!(render(&parse(s), Language::Other), escape_html(s));
        }
    }

    #[test]
    fn renders_okurigana_after_group() {
        assert_eq!(
            ja("幸せ[しあわせ]に暮[く]らしていました"),
            "<ruby><rb>幸</rb><rt>しあわ</rt></ruby><span class=\"okurigana\">せ</span>に\
             <ruby><rb>暮</rb><rt>く</rt></ruby>らしていました"
        );
    }

    #[test]
    fn prefix_is_plain_text_before_group() {
        assert_eq!(
            ja("お茶を飲む[のむ]"),
            "お茶を<ruby><rb>飲</rb><rt>の</rt></ruby><span class=\"okurigana\">む</span>"
        );
    }

    #[test]
    fn fallback_annotates_whole_base() {
        assert_eq!(
            ja("今日は天気[きょうはてんき]"),
            "<ruby><rb>今日は天気</rb><rt>きょうはてんき</rt></ruby>"
        );
        assert_eq!(
            render(&parse("中国[zhōng guó]"), Language::Mandarin),
            "<ruby><rb>中国</rb><rt>zhōng guó</rt></ruby>"
        );
    }

    #[test]
    fn drops_separator_whitespace_between_cjk_and_groups() {
        assert_eq!(
            ja("日本[にほん] 語[ご]"),
            "<ruby><rb>日本</rb><rt>にほん</rt></ruby><ruby><rb>語</rb><rt>ご</rt></ruby>"
        );
        assert_eq!(ja("今日 天気[てんき]"), "今日<ruby><rb>天気</rb><rt>てんき</rt></ruby>");
        assert_eq!(ja(" 天気[てんき]です"), "<ruby><rb>天気</rb><rt>てんき</rt></ruby>です");
    }

    #[test]
    fn leading_kana_of_base_stays_outside_group() {
        assert_eq!(ja("に暮[く]らす"), "に<ruby><rb>暮</rb><rt>く</rt></ruby>らす");
    }

    #[test]
    fn whole_word_reading_annotates_whole_base() {
        assert_eq!(ja("落ち着く[おちつく]"), "<ruby><rb>落ち着く</rb><rt>おちつく</rt></ruby>");
        assert_eq!(ja("乗り場[のりば]"), "<ruby><rb>乗り場</rb><rt>のりば</rt></ruby>");
    }

    #[test]
    fn korean_word_spaces_are_kept() {
        assert_eq!(
            render(&parse("한국어[hangugeo] 공부[gongbu]"), Language::Korean),
            "<ruby><rb>한국어</rb><rt>hangugeo</rt></ruby> <ruby><rb>공부</rb><rt>gongbu</rt></ruby>"
        );
    }

    #[test]
    fn keeps_whitespace_next_to_latin_text() {
        assert_eq!(ja("Hello 世界[せかい]"), "Hello <ruby><rb>世界</rb><rt>せかい</rt></ruby>");
        assert_eq!(
            render(&parse("hola mundo[world] ok"), Language::Other),
            "hola <ruby><rb>mundo</rb><rt>world</rt></ruby> ok"
        );
    }

    #[test]
    fn group_text_is_escaped() {
        assert_eq!(
            render(&parse("a<b[x&y]"), Language::Other),
            "<ruby><rb>a&lt;b</rb><rt>x&amp;y</rt></ruby>"
        );
    }

    #[test]
    fn one_group_per_annotation_preserving_base_and_reading() {
        let m = ja("食べた[たべた]");
        let units = scan(&m).unwrap();
        assert_eq!(units.iter().filter(|u| u.is_open("ruby")).count(), 1);
        let base: String = units
            .iter()
            .filter_map(|u| match u {
                Unit::Char { ch, in_reading: false, .. } => Some(*ch),
                _ => None,
            })
            .collect();
        let reading: String = units
            .iter()
            .filter_map(|u| match u {
                Unit::Char { ch, in_reading: true, .. } => Some(*ch),
                _ => None,
            })
            .collect();
        assert_eq!(base, "食べた");
        // reading core + okurigana
        assert_eq!(format!("{}{}", reading, "べた"), "たべた");
    }
}
