//! Okurigana splitting for Japanese `base[reading]` pairs.
//!
//! A base such as `食べた` is split into a kanji core (`食`) and trailing kana
//! (`べた`) so that the reading can be anchored over the kanji only. Bases that
//! do not fit the `kana* kanji+ kana*` shape go through a second pass that
//! annotates the last kanji cluster; anything else is left to the caller to
//! annotate whole.

use crate::log::log;
use crate::script::{fold_kana, is_kana, is_kanji, Language};
use serde::Serialize;

/// Upper bound on reading length per kanji for the trailing-cluster pass.
const MAX_READING_PER_KANJI: usize = 3;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitShape {
    /// Whole base is `kana* kanji+ kana*`.
    Simple,
    /// Only the trailing kanji cluster is annotated; `prefix` may hold anything.
    TrailingCluster,
}

/// `prefix + core + trailing == base` always holds.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub prefix: String,
    pub core: String,
    pub trailing: String,
    pub reading_core: String,
    pub shape: SplitShape,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Class {
    Kanji,
    Kana,
    Other,
}

fn class_of(c: char) -> Class {
    if is_kanji(c) {
        Class::Kanji
    } else if is_kana(c) {
        Class::Kana
    } else {
        Class::Other
    }
}

fn text(chars: &[char]) -> String { chars.iter().collect() }

/// 読みの末尾が送り仮名と一致する場合のみ削る（かな種別は同一視）
fn trim_reading(reading: &[char], trailing: &[char]) -> String {
    if trailing.is_empty() || reading.len() <= trailing.len() {
        return text(reading);
    }
    if fold_kana(&text(reading)).ends_with(&fold_kana(&text(trailing))) {
        text(&reading[..reading.len() - trailing.len()])
    } else {
        text(reading)
    }
}

/// Split `base` for annotation. Returns `None` when splitting does not apply
/// (non-Japanese hint, non-kana reading) or no heuristic fits; the caller then
/// annotates the whole base with the unmodified reading.
pub fn split(base: &str, reading: &str, lang: Language) -> Option<SplitResult> {
    if !lang.uses_okurigana() {
        return None;
    }
    let reading: Vec<char> = reading.chars().collect();
    if reading.is_empty() || !reading.iter().all(|c| is_kana(*c)) {
        return None;
    }
    let chars: Vec<char> = base.chars().collect();
    let classes: Vec<Class> = chars.iter().map(|c| class_of(*c)).collect();
    let n = chars.len();

    // simple shape: kana* kanji+ kana*
    let i = classes.iter().take_while(|c| **c == Class::Kana).count();
    let j = i + classes[i..].iter().take_while(|c| **c == Class::Kanji).count();
    let k = j + classes[j..].iter().take_while(|c| **c == Class::Kana).count();
    if j > i && k == n {
        // 読みが接頭のかなを含む場合は接頭をコアに含める（読みは削らない）
        let prefix_len = if fold_kana(&text(&reading)).starts_with(&fold_kana(&text(&chars[..i]))) { 0 } else { i };
        return Some(SplitResult {
            prefix: text(&chars[..prefix_len]),
            core: text(&chars[prefix_len..j]),
            trailing: text(&chars[j..]),
            reading_core: trim_reading(&reading, &chars[j..]),
            shape: SplitShape::Simple,
        });
    }

    // trailing-most kanji(+kana) cluster
    let t = classes.iter().rev().take_while(|c| **c == Class::Kana).count();
    let e = n - t;
    let kanji = classes[..e].iter().rev().take_while(|c| **c == Class::Kanji).count();
    if kanji == 0 {
        log(&format!("okurigana: no kanji cluster at end of {:?}, annotating whole", base));
        return None;
    }
    if reading.len() > kanji * MAX_READING_PER_KANJI + t {
        log(&format!("okurigana: reading too long for cluster in {:?}, annotating whole", base));
        return None;
    }
    let s = e - kanji;
    // 直前のかなが読みに現れるなら、読みは語全体を覆っている
    let before = classes[..s].iter().rev().take_while(|c| **c == Class::Kana).count();
    if before > 0 && fold_kana(&text(&reading)).contains(&fold_kana(&text(&chars[s - before..s]))) {
        log(&format!("okurigana: reading of {:?} spans kana before the cluster, annotating whole", base));
        return None;
    }
    Some(SplitResult {
        prefix: text(&chars[..s]),
        core: text(&chars[s..e]),
        trailing: text(&chars[e..]),
        reading_core: trim_reading(&reading, &chars[e..]),
        shape: SplitShape::TrailingCluster,
    })
}
