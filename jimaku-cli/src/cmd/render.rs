use crate::{resolve_lang, text_or_stdin};
use jimaku_core::annotate_and_highlight;
use jimaku_core::normalize::{normalize_markup, normalize_plain, Folding};
use jimaku_core::okurigana::split as okurigana_split;
use jimaku_core::script::Language;

pub fn render(args: &crate::Commands) -> anyhow::Result<()> {
    if let crate::Commands::Render { text, lang, query, json } = args {
        let input = text_or_stdin(text.as_deref())?;
        let lang = resolve_lang(lang.as_deref());
        let res = annotate_and_highlight(&input, &lang, query.as_deref());
        if *json {
            println!("{}", serde_json::to_string_pretty(&res)?);
        } else {
            println!("{}", res.markup);
        }
    }
    Ok(())
}

pub fn normalize(text: Option<&str>, lang: Option<&str>, markup: bool) -> anyhow::Result<()> {
    let input = text_or_stdin(text)?;
    let lang = Language::from_hint(&resolve_lang(lang));
    let folding = Folding::for_language(lang);
    let norm = if markup {
        normalize_markup(&input, folding)
            .ok_or_else(|| anyhow::anyhow!("malformed markup: tags or reading containers are unbalanced"))?
    } else {
        normalize_plain(&input, folding)
    };
    let sources: Vec<&str> = norm
        .map
        .iter()
        .zip(&norm.ends)
        .map(|(s, e)| input.get(*s..*e).unwrap_or(""))
        .collect();
    let envelope = serde_json::json!({
        "language": lang,
        "folding": folding,
        "normalized": norm.text,
        "map": norm.map,
        "ends": norm.ends,
        "sources": sources,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

pub fn split(base: &str, reading: &str, lang: Option<&str>) -> anyhow::Result<()> {
    let lang = Language::from_hint(&resolve_lang(lang));
    let envelope = match okurigana_split(base, reading, lang) {
        Some(r) => serde_json::json!({"split": true, "result": r}),
        // 分割できない場合は全体に読みを付ける
        None => serde_json::json!({
            "split": false,
            "result": {"prefix": "", "core": base, "trailing": "", "reading_core": reading},
        }),
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
