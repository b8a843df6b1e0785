use crate::{decode_subtitle_bytes, has_cues, is_cue_metadata, resolve_lang};
use jimaku_core::{annotate_lines, RenderResult};
use std::path::Path;

/// Subtitle lines of a file with their 1-based line numbers. Blank lines are
/// dropped, and for `.srt`/`.vtt` files so are cue numbers, timecodes and headers.
pub(crate) fn subtitle_lines(path: &Path, encoding: Option<&str>) -> anyhow::Result<Vec<(usize, String)>> {
    let bytes = std::fs::read(path)?;
    let text = decode_subtitle_bytes(&bytes, encoding);
    let cues = has_cues(path);
    Ok(text
        .lines()
        .enumerate()
        .filter(|(_, l)| !is_cue_metadata(l, cues))
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r').to_string()))
        .collect())
}

pub(crate) fn render_file(
    path: &Path,
    lang: &str,
    query: Option<&str>,
    encoding: Option<&str>,
) -> anyhow::Result<Vec<(usize, RenderResult)>> {
    let lines = subtitle_lines(path, encoding)?;
    let texts: Vec<&str> = lines.iter().map(|(_, l)| l.as_str()).collect();
    let results = annotate_lines(&texts, lang, query);
    Ok(lines.iter().map(|(n, _)| *n).zip(results).collect())
}

pub fn file(args: &crate::Commands) -> anyhow::Result<()> {
    if let crate::Commands::File { path, lang, query, encoding, matches_only, json } = args {
        let lang = resolve_lang(lang.as_deref());
        let rendered = render_file(path, &lang, query.as_deref(), encoding.as_deref())?;
        let total = rendered.len();
        let shown: Vec<_> = rendered
            .into_iter()
            .filter(|(_, r)| !*matches_only || r.highlighted)
            .collect();
        let matched = shown.iter().filter(|(_, r)| r.highlighted).count();
        if *json {
            let items: Vec<_> = shown
                .iter()
                .map(|(n, r)| serde_json::json!({"line": n, "result": r}))
                .collect();
            let envelope = serde_json::json!({
                "path": path.display().to_string(),
                "language": lang,
                "query": query,
                "lineCount": total,
                "matchedLines": matched,
                "lines": items,
            });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        } else {
            for (n, r) in &shown {
                println!("{}: {}", n, r.markup);
            }
        }
    }
    Ok(())
}
