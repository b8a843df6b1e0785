use anyhow::Result;
use jimaku_core::normalize::{normalize_markup, normalize_plain, Folding};
use jimaku_core::okurigana::split as okurigana_split;
use jimaku_core::script::Language;
use jimaku_core::{annotate_and_highlight, annotate_lines, RenderResult};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::sync::OnceLock;

// ============ MCP stdio framing ============

fn dbg_enabled() -> bool { std::env::var("JIMAKU_DEBUG").ok().as_deref() == Some("1") }
fn dbg_log(msg: &str) {
    if !dbg_enabled() { return; }
    eprintln!("[jimaku-mcp] {}", msg);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FramingMode { Lsp, Lines }

static MODE: OnceLock<FramingMode> = OnceLock::new();

fn set_mode(m: FramingMode) { let _ = MODE.set(m); }
fn get_mode() -> FramingMode { *MODE.get().unwrap_or(&FramingMode::Lsp) }

/// 1メッセージ読む。LSP ヘッダ形式と改行区切り JSON の両方を受け付ける
fn read_framed(stdin: &mut impl BufRead) -> Result<Option<(FramingMode, serde_json::Value)>> {
    let mut line = String::new();
    let n = stdin.read_line(&mut line)?;
    if n == 0 { return Ok(None); }

    if line.trim_start().starts_with('{') {
        dbg_log(&format!("[lines] {}", line.trim_end()));
        let v: serde_json::Value = serde_json::from_str(line.trim_end())?;
        return Ok(Some((FramingMode::Lines, v)));
    }

    // ヘッダを空行まで集める（最初に読んだ行も含む）
    let mut headers = String::new();
    headers.push_str(&line);
    while !line.trim().is_empty() {
        line.clear();
        if stdin.read_line(&mut line)? == 0 { break; }
        headers.push_str(&line);
    }
    dbg_log(&format!("[hdr]{}", headers.replace('\r', "\\r").replace('\n', "\\n")));

    let content_length = headers
        .lines()
        .filter_map(|h| h.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length == 0 {
        dbg_log("[body] skip len=0");
        return Ok(Some((FramingMode::Lsp, serde_json::Value::Null)));
    }
    let mut content = vec![0u8; content_length];
    stdin.read_exact(&mut content)?;
    dbg_log(&format!("[body-bytes]{}", content_length));
    let v: serde_json::Value = serde_json::from_slice(&content)?;
    Ok(Some((FramingMode::Lsp, v)))
}

fn read_message(stdin: &mut impl BufRead) -> Result<Option<serde_json::Value>> {
    Ok(read_framed(stdin)?.map(|(mode, v)| {
        set_mode(mode);
        v
    }))
}

fn write_framed(stdout: &mut impl Write, mode: FramingMode, v: &serde_json::Value) -> Result<()> {
    match mode {
        FramingMode::Lines => {
            let body = serde_json::to_string(v)?;
            writeln!(stdout, "{}", body)?;
            dbg_log(&format!("[send-lines] {} chars", body.len()));
        }
        FramingMode::Lsp => {
            let body = serde_json::to_vec(v)?;
            write!(
                stdout,
                "Content-Length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n",
                body.len()
            )?;
            stdout.write_all(&body)?;
            dbg_log(&format!("[send-lsp] {} bytes", body.len()));
        }
    }
    stdout.flush()?;
    Ok(())
}

fn write_message(stdout: &mut impl Write, v: &serde_json::Value) -> Result<()> {
    write_framed(stdout, get_mode(), v)
}

#[derive(Deserialize)]
struct Request {
    id: serde_json::Value,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

// ============ Handlers ============

fn handle_initialize(id: serde_json::Value) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "jimaku-mcp", "version": env!("CARGO_PKG_VERSION") }
        }
    })
}

fn tools_list() -> Vec<serde_json::Value> {
    vec![
        tool("annotate", "Render base[reading] subtitle text as ruby markup and highlight a query", json!({"type":"object","properties":{
            "text":{"type":"string"},"lang":{"type":"string"},"query":{"type":"string"}
        },"required":["text"]})),
        tool("annotate_lines", "Render many subtitle lines at once", json!({"type":"object","properties":{
            "lines":{"type":"array","items":{"type":"string"}},"lang":{"type":"string"},"query":{"type":"string"}
        },"required":["lines"]})),
        tool("normalize", "Show the search comparison form and its position map", json!({"type":"object","properties":{
            "text":{"type":"string"},"lang":{"type":"string"},"markup":{"type":"boolean"}
        },"required":["text"]})),
        tool("okurigana_split", "Split a base[reading] pair around trailing okurigana", json!({"type":"object","properties":{
            "base":{"type":"string"},"reading":{"type":"string"},"lang":{"type":"string"}
        },"required":["base","reading"]})),
    ]
}

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> serde_json::Value {
    json!({"name": name, "description": description, "inputSchema": input_schema })
}

fn handle_tools_list(id: serde_json::Value) -> serde_json::Value {
    json!({"jsonrpc":"2.0","id":id,"result": {"tools": tools_list()}})
}

fn error(id: serde_json::Value, code: i64, message: &str) -> serde_json::Value {
    json!({"jsonrpc":"2.0","id":id,"error":{"code": code, "message": message}})
}

/// 任意の文字列引数。型違いは Err
fn opt_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<Option<&'a str>, String> {
    match args.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| format!("'{}' must be a string", key)),
    }
}

fn req_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, String> {
    opt_str(args, key)?.ok_or_else(|| format!("missing required argument '{}'", key))
}

fn default_lang() -> String {
    std::env::var("JIMAKU_LANG").ok().filter(|l| !l.trim().is_empty()).unwrap_or_else(|| "ja".to_string())
}

fn lang_arg(args: &serde_json::Value) -> Result<String, String> {
    Ok(opt_str(args, "lang")?.map(str::to_string).unwrap_or_else(default_lang))
}

fn result_meta(r: &RenderResult) -> serde_json::Value {
    json!({
        "language": r.language,
        "ruby": r.ruby,
        "highlighted": r.highlighted,
        "highlightCount": r.highlight_count,
        "kind": r.kind,
        "span": r.span,
    })
}

/// tools/call の本体。Err は引数の形が不正（-32602）
fn call_tool(name: &str, args: &serde_json::Value) -> Result<serde_json::Value, String> {
    match name {
        "annotate" => {
            let text = req_str(args, "text")?;
            let lang = lang_arg(args)?;
            let r = annotate_and_highlight(text, &lang, opt_str(args, "query")?);
            Ok(json!({ "content": [{"type":"text","text": r.markup}], "_meta": result_meta(&r) }))
        }
        "annotate_lines" => {
            let lines: Vec<&str> = args
                .get("lines")
                .and_then(|v| v.as_array())
                .ok_or_else(|| "'lines' must be an array of strings".to_string())?
                .iter()
                .map(|v| v.as_str().ok_or_else(|| "'lines' must be an array of strings".to_string()))
                .collect::<Result<_, _>>()?;
            let lang = lang_arg(args)?;
            let results = annotate_lines(&lines, &lang, opt_str(args, "query")?);
            let content: Vec<_> = results.iter().map(|r| json!({"type":"text","text": r.markup})).collect();
            let metas: Vec<_> = results.iter().map(result_meta).collect();
            let matched = results.iter().filter(|r| r.highlighted).count();
            Ok(json!({ "content": content, "_meta": {"count": results.len(), "matchedLines": matched, "lines": metas} }))
        }
        "normalize" => {
            let text = req_str(args, "text")?;
            let lang = Language::from_hint(&lang_arg(args)?);
            let folding = Folding::for_language(lang);
            let markup = match args.get("markup") {
                None | Some(serde_json::Value::Null) => false,
                Some(v) => v.as_bool().ok_or_else(|| "'markup' must be a boolean".to_string())?,
            };
            let norm = if markup { normalize_markup(text, folding) } else { Some(normalize_plain(text, folding)) };
            Ok(match norm {
                Some(n) => json!({
                    "content": [{"type":"text","text": n.text}],
                    "_meta": {"language": lang, "folding": folding, "map": n.map, "ends": n.ends}
                }),
                None => json!({
                    "content": [{"type":"text","text": "malformed markup"}],
                    "isError": true
                }),
            })
        }
        "okurigana_split" => {
            let base = req_str(args, "base")?;
            let reading = req_str(args, "reading")?;
            let lang = Language::from_hint(&lang_arg(args)?);
            Ok(match okurigana_split(base, reading, lang) {
                Some(s) => json!({
                    "content": [{"type":"text","text": format!("{}|{}[{}]|{}", s.prefix, s.core, s.reading_core, s.trailing)}],
                    "_meta": {"split": true, "result": s}
                }),
                None => json!({
                    "content": [{"type":"text","text": format!("{}[{}]", base, reading)}],
                    "_meta": {"split": false}
                }),
            })
        }
        _ => Err(format!("unknown tool: {}", name)),
    }
}

fn handle_call(id: serde_json::Value, params: &serde_json::Value) -> serde_json::Value {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));
    match call_tool(name, &args) {
        Ok(result) => json!({"jsonrpc":"2.0","id": id, "result": result}),
        Err(msg) => {
            dbg_log(&format!("[call] {} rejected: {}", name, msg));
            error(id, -32602, &format!("Invalid params: {}", msg))
        }
    }
}

fn dispatch(req: Request) -> serde_json::Value {
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id),
        "tools/list" => handle_tools_list(req.id),
        "tools/call" => handle_call(req.id, &req.params),
        _ => error(req.id, -32601, "Method not found"),
    }
}

fn main() -> Result<()> {
    jimaku_core::log::set_debug(dbg_enabled());
    let stdin = std::io::stdin();
    let mut stdin = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout();
    loop {
        let Some(msg) = read_message(&mut stdin)? else { break };
        if let Ok(req) = serde_json::from_value::<Request>(msg) {
            dbg_log(&format!("[recv] method={} id={}", req.method, req.id));
            let resp = dispatch(req);
            write_message(&mut stdout, &resp)?;
        } else {
            // notifications などは無視
            dbg_log("[recv] non-request/ignored");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn call(name: &str, args: serde_json::Value) -> serde_json::Value {
        handle_call(json!(1), &json!({"name": name, "arguments": args}))
    }

    #[test]
    fn reads_both_framings() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let lsp = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let (mode, v) = read_framed(&mut Cursor::new(lsp)).unwrap().unwrap();
        assert_eq!(mode, FramingMode::Lsp);
        assert_eq!(v["method"], "tools/list");

        let (mode, v) = read_framed(&mut Cursor::new(format!("{}\n", body))).unwrap().unwrap();
        assert_eq!(mode, FramingMode::Lines);
        assert_eq!(v["id"], 1);

        assert!(read_framed(&mut Cursor::new("")).unwrap().is_none());
    }

    #[test]
    fn writes_lsp_header() {
        let mut out = Vec::new();
        write_framed(&mut out, FramingMode::Lsp, &json!({"a": 1})).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("Content-Length: 7\r\n"));
        assert!(s.ends_with("\r\n\r\n{\"a\":1}"));

        let mut out = Vec::new();
        write_framed(&mut out, FramingMode::Lines, &json!({"a": 1})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n");
    }

    #[test]
    fn lists_four_tools() {
        let v = handle_tools_list(json!(2));
        let names: Vec<&str> = v["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["annotate", "annotate_lines", "normalize", "okurigana_split"]);
    }

    #[test]
    fn annotate_returns_markup_and_meta() {
        let v = call("annotate", json!({"text": "幸せ[しあわせ]に暮[く]らしていました", "lang": "ja", "query": "しあわせ"}));
        let text = v["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("<ruby><rb><mark>幸</mark></rb>"));
        let meta = &v["result"]["_meta"];
        assert_eq!(meta["highlighted"], true);
        assert_eq!(meta["highlightCount"], 3);
        assert_eq!(meta["ruby"], true);
        assert_eq!(meta["kind"], "reading");
    }

    #[test]
    fn annotate_lines_keeps_order() {
        let v = call("annotate_lines", json!({"lines": ["猫[ねこ]", "hello"], "lang": "ja", "query": "hello"}));
        assert_eq!(v["result"]["_meta"]["count"], 2);
        assert_eq!(v["result"]["_meta"]["matchedLines"], 1);
        assert_eq!(v["result"]["content"][1]["text"], "<mark>hello</mark>");
    }

    #[test]
    fn normalize_and_split_tools() {
        let v = call("normalize", json!({"text": "カタカナ", "lang": "ja"}));
        assert_eq!(v["result"]["content"][0]["text"], "かたかな");
        assert_eq!(v["result"]["_meta"]["map"], json!([0, 3, 6, 9]));

        let v = call("normalize", json!({"text": "<rt>x", "markup": true}));
        assert_eq!(v["result"]["isError"], true);

        let v = call("okurigana_split", json!({"base": "食べた", "reading": "たべた", "lang": "ja"}));
        assert_eq!(v["result"]["_meta"]["split"], true);
        assert_eq!(v["result"]["_meta"]["result"]["core"], "食");

        let v = call("okurigana_split", json!({"base": "幸せ", "reading": "xyz", "lang": "ja"}));
        assert_eq!(v["result"]["_meta"]["split"], false);
    }

    #[test]
    fn wrong_shaped_arguments_are_invalid_params() {
        let v = call("annotate", json!({"text": 5}));
        assert_eq!(v["error"]["code"], -32602);
        let v = call("annotate_lines", json!({"lines": [1, 2]}));
        assert_eq!(v["error"]["code"], -32602);
        let v = call("okurigana_split", json!({"base": "x"}));
        assert_eq!(v["error"]["code"], -32602);
        let v = call("nope", json!({}));
        assert_eq!(v["error"]["code"], -32602);
    }

    #[test]
    fn unknown_method_is_not_found() {
        let v = dispatch(Request { id: json!(9), method: "resources/list".into(), params: json!(null) });
        assert_eq!(v["error"]["code"], -32601);
        let v = dispatch(Request { id: json!(1), method: "initialize".into(), params: json!({}) });
        assert_eq!(v["result"]["serverInfo"]["name"], "jimaku-mcp");
    }
}
