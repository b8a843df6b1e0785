use rayon::prelude::*;
use serde::Serialize;

pub mod annotation;
pub mod highlight;
pub mod locate;
pub mod log;
pub mod markup;
pub mod normalize;
pub mod okurigana;
pub mod ruby;
pub mod script;

use annotation::{has_annotations, parse};
use highlight::{project_markup, project_plain, project_reading_groups, Projection};
use locate::{locate, MatchSpan};
use markup::escape_html;
use normalize::{normalize_markup, normalize_plain, normalize_query, Folding};
use script::Language;

/// How the highlight was found.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    /// Visible text matched; only the matched characters are wrapped.
    Text,
    /// A ruby reading matched; base and reading of the group are wrapped.
    Reading,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub markup: String,
    pub language: Language,
    /// Markup contains ruby groups.
    pub ruby: bool,
    pub highlighted: bool,
    pub highlight_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<HighlightKind>,
    /// Text matches only: source span (plain) or markup span (ruby).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<MatchSpan>,
}

impl RenderResult {
    fn plain(markup: String, language: Language, ruby: bool) -> Self {
        RenderResult {
            markup,
            language,
            ruby,
            highlighted: false,
            highlight_count: 0,
            kind: None,
            span: None,
        }
    }

    fn with(mut self, p: Projection, kind: HighlightKind, span: Option<MatchSpan>) -> Self {
        if p.wrappers == 0 {
            return self;
        }
        self.markup = p.markup;
        self.highlighted = true;
        self.highlight_count = p.wrappers;
        self.kind = Some(kind);
        self.span = span;
        self
    }
}

/// Parse `base[reading]` annotations, render ruby markup and highlight the
/// first occurrence of `query`. An empty or absent query only renders.
///
/// Never fails: malformed annotations render as text, unmatched queries leave
/// the markup unhighlighted, unknown language hints use case-insensitive
/// matching without script folding.
pub fn annotate_and_highlight(text: &str, language_hint: &str, query: Option<&str>) -> RenderResult {
    let lang = Language::from_hint(language_hint);
    let folding = Folding::for_language(lang);
    let tokens = parse(text);
    let has_ruby = has_annotations(&tokens);
    let markup = if has_ruby { ruby::render(&tokens, lang) } else { escape_html(text) };
    let base = RenderResult::plain(markup, lang, has_ruby);

    let q = match query.map(|q| normalize_query(q, folding)) {
        Some(q) if !q.is_empty() => q,
        _ => return base,
    };

    if !has_ruby {
        let hay = normalize_plain(text, folding);
        return match locate(&hay, &q) {
            Some(span) => base.with(project_plain(text, span), HighlightKind::Text, Some(span)),
            None => base,
        };
    }

    let by_reading = project_reading_groups(&base.markup, &q, folding);
    if by_reading.wrappers > 0 {
        return base.with(by_reading, HighlightKind::Reading, None);
    }
    let Some(hay) = normalize_markup(&base.markup, folding) else {
        log::log("render: markup rejected by scanner, skipping highlight");
        return base;
    };
    match locate(&hay, &q) {
        Some(span) => {
            let p = project_markup(&base.markup, span);
            base.with(p, HighlightKind::Text, Some(span))
        }
        None => base,
    }
}

/// Render many lines at once (in parallel); output order follows input order.
pub fn annotate_lines<S>(lines: &[S], language_hint: &str, query: Option<&str>) -> Vec<RenderResult>
where
    S: AsRef<str> + Sync,
{
    lines
        .par_iter()
        .map(|l| annotate_and_highlight(l.as_ref(), language_hint, query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_query_highlights_group() {
        let r = annotate_and_highlight("幸せ[しあわせ]に暮[く]らしていました", "ja", Some("しあわせ"));
        assert!(r.ruby);
        assert!(r.highlighted);
        assert_eq!(r.kind, Some(HighlightKind::Reading));
        assert!(r.markup.starts_with("<ruby><rb><mark>幸</mark></rb><rt><mark>しあわ</mark></rt></ruby>"));
        assert!(r.markup.contains("<ruby><rb>暮</rb><rt>く</rt></ruby>"));
    }

    #[test]
    fn visible_text_query_in_ruby_markup() {
        // く is only a reading, never visible text
        let r = annotate_and_highlight("幸せ[しあわせ]に暮[く]らしていました", "ja", Some("クラシテ"));
        assert!(!r.highlighted);
        assert_eq!(r.kind, None);
        let r = annotate_and_highlight("幸せ[しあわせ]に暮[く]らしていました", "ja", Some("暮らして"));
        assert_eq!(r.kind, Some(HighlightKind::Text));
        assert_eq!(r.highlight_count, 2);
        assert!(r.markup.contains("<rb><mark>暮</mark></rb>"));
        assert!(r.markup.contains("<mark>らして</mark>いました"));
    }

    #[test]
    fn latin_path_is_case_insensitive() {
        let r = annotate_and_highlight("hello world", "en", Some("WORLD"));
        assert_eq!(r.markup, "hello <mark>world</mark>");
        assert_eq!(r.span, Some(MatchSpan { start: 6, end: 11 }));
        assert_eq!(r.kind, Some(HighlightKind::Text));
        assert!(!r.ruby);
    }

    #[test]
    fn unknown_hint_does_not_fold_scripts() {
        let r = annotate_and_highlight("カタカナ", "xx", Some("かたかな"));
        assert!(!r.highlighted);
        let r = annotate_and_highlight("カタカナ", "ja", Some("かたかな"));
        assert_eq!(r.markup, "<mark>カタカナ</mark>");
    }

    #[test]
    fn malformed_annotation_renders_as_text() {
        let r = annotate_and_highlight("foo[bar", "ja", None);
        assert_eq!(r.markup, "foo[bar");
        assert!(!r.ruby);
        assert!(!r.highlighted);
    }

    #[test]
    fn empty_inputs() {
        let r = annotate_and_highlight("", "ja", Some("x"));
        assert_eq!(r.markup, "");
        assert!(!r.highlighted);
        let r = annotate_and_highlight("猫[ねこ]", "ja", Some("   "));
        assert!(!r.highlighted);
        assert_eq!(r.markup, "<ruby><rb>猫</rb><rt>ねこ</rt></ruby>");
        let r = annotate_and_highlight("猫[ねこ]", "ja", None);
        assert!(!r.highlighted);
    }

    #[test]
    fn not_found_is_plain_render() {
        let r = annotate_and_highlight("a < b", "en", Some("zzz"));
        assert_eq!(r.markup, "a &lt; b");
        assert!(!r.highlighted);
        assert_eq!(r.highlight_count, 0);
    }

    #[test]
    fn width_and_whitespace_insensitive_cjk_search() {
        let r = annotate_and_highlight("ＡＢＣ　テスト です", "ja", Some("abcてすと"));
        assert_eq!(r.markup, "<mark>ＡＢＣ　テスト</mark> です");
    }

    #[test]
    fn precomposed_query_finds_decomposed_hangul() {
        let nfd = "\u{1112}\u{1161}\u{11AB}\u{1100}\u{116E}\u{11A8}어";
        let r = annotate_and_highlight(nfd, "ko", Some("한국"));
        assert!(r.highlighted);
        assert_eq!(r.span, Some(MatchSpan { start: 0, end: 18 }));
    }

    #[test]
    fn batch_preserves_order() {
        let lines = vec!["猫[ねこ]", "犬[いぬ]", "plain"];
        let out = annotate_lines(&lines, "ja", Some("いぬ"));
        assert_eq!(out.len(), 3);
        assert!(!out[0].highlighted);
        assert!(out[1].highlighted);
        assert!(!out[2].highlighted);
    }

    #[test]
    fn result_serializes_for_callers() {
        let r = annotate_and_highlight("hello world", "en", Some("world"));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["language"], "other");
        assert_eq!(v["kind"], "text");
        assert_eq!(v["span"]["start"], 6);
        assert_eq!(v["highlighted"], true);
    }
}
