use serde::Serialize;

/// 言語ヒントから決まる処理系統
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Japanese,
    Mandarin,
    Cantonese,
    Korean,
    Other,
}

impl Language {
    /// Map a canonical language code (`ja`, `zh-TW`, `yue`, ...) to a language.
    /// Unknown or empty hints yield `Other`.
    pub fn from_hint(hint: &str) -> Self {
        let h = hint.trim().to_ascii_lowercase().replace('_', "-");
        if h == "zh-hk" || h == "zh-yue" || h.starts_with("zh-yue-") || h.starts_with("zh-hk-") {
            return Language::Cantonese;
        }
        let primary = h.split('-').next().unwrap_or("");
        match primary {
            "ja" | "jpn" => Language::Japanese,
            "zh" | "zho" | "chi" | "cmn" => Language::Mandarin,
            "yue" => Language::Cantonese,
            "ko" | "kor" => Language::Korean,
            _ => Language::Other,
        }
    }

    /// Script-folding search and whitespace-insensitive matching apply.
    pub fn is_cjk(self) -> bool { !matches!(self, Language::Other) }

    /// Written without spaces between words, so a space next to a ruby
    /// group is only a separator for the annotation syntax.
    pub fn is_unspaced(self) -> bool { matches!(self, Language::Japanese | Language::Mandarin | Language::Cantonese) }

    /// Kanji stems with kana suffixes (okurigana) are split before annotation.
    pub fn uses_okurigana(self) -> bool { matches!(self, Language::Japanese) }
}

pub fn is_kanji(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2FA1F}'
        // 々 〆 〇 and the counter-like ヵ ヶ
        | '\u{3005}'..='\u{3007}'
        | '\u{30F5}' | '\u{30F6}')
}

pub fn is_hiragana(c: char) -> bool { matches!(c, '\u{3041}'..='\u{309F}') }

pub fn is_katakana(c: char) -> bool {
    !is_kanji(c)
        && matches!(c, '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}')
}

pub fn is_kana(c: char) -> bool { is_hiragana(c) || is_katakana(c) }

pub fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

/// Characters typeset without inter-word spaces (ideographs, kana, CJK punctuation,
/// full-width forms).
pub fn is_cjk_char(c: char) -> bool {
    is_kanji(c)
        || is_kana(c)
        || is_hangul(c)
        || matches!(c, '\u{3000}'..='\u{303F}' | '\u{FF00}'..='\u{FFEF}' | '\u{3100}'..='\u{312F}')
}

/// カタカナ→ひらがな（1文字単位、対応がなければそのまま）
pub fn katakana_to_hiragana(c: char) -> char {
    match c {
        '\u{30A1}'..='\u{30F6}' | '\u{30FD}' | '\u{30FE}' => {
            char::from_u32(c as u32 - 0x60).unwrap_or(c)
        }
        _ => c,
    }
}

pub fn fold_kana(s: &str) -> String { s.chars().map(katakana_to_hiragana).collect() }
