use crate::cmd::file::subtitle_lines;
use crate::resolve_lang;
use jimaku_core::{annotate_and_highlight, RenderResult};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub(crate) struct GrepHit {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
    pub result: RenderResult,
}

fn has_ext(path: &Path, exts: &[String]) -> bool {
    let Some(e) = path.extension().and_then(|e| e.to_str()) else { return false };
    exts.iter().any(|x| x.trim_start_matches('.').eq_ignore_ascii_case(e))
}

/// 全ファイルを走査（インデックスなし）。結果はパス順・行順
pub(crate) fn grep_dir(
    root: &Path,
    query: &str,
    lang: &str,
    exts: &[String],
    max_results: usize,
) -> Vec<GrepHit> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_ext(e.path(), exts))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let per_file: Vec<Vec<GrepHit>> = files
        .par_iter()
        .map(|p| {
            let Ok(lines) = subtitle_lines(p, None) else {
                if jimaku_core::log::debug_enabled() {
                    eprintln!("[jimaku-cli] grep: unreadable file {}", p.display());
                }
                return Vec::new();
            };
            lines
                .into_iter()
                .filter_map(|(n, text)| {
                    let result = annotate_and_highlight(&text, lang, Some(query));
                    result
                        .highlighted
                        .then(|| GrepHit { path: p.clone(), line: n, text, result })
                })
                .collect()
        })
        .collect();
    per_file.into_iter().flatten().take(max_results).collect()
}

pub fn grep(args: &crate::Commands) -> anyhow::Result<()> {
    if let crate::Commands::Grep { root, query, lang, ext, max_results, json } = args {
        if !root.is_dir() {
            anyhow::bail!("not a directory: {}", root.display());
        }
        let lang = resolve_lang(lang.as_deref());
        let hits = grep_dir(root, query, &lang, ext, *max_results);
        if *json {
            let items: Vec<_> = hits
                .iter()
                .map(|h| {
                    serde_json::json!({
                        "path": h.path.display().to_string(),
                        "line": h.line,
                        "text": h.text,
                        "markup": h.result.markup,
                        "kind": h.result.kind,
                    })
                })
                .collect();
            let envelope = serde_json::json!({
                "query": query,
                "language": lang,
                "count": items.len(),
                "results": items,
            });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        } else {
            println!("Found {} matching lines for '{}':\n", hits.len(), query);
            for h in &hits {
                println!("{}:{}: {}", h.path.display(), h.line, h.result.markup);
            }
        }
    }
    Ok(())
}
