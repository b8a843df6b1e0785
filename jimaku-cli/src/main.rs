use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;

/// バージョン情報を生成
fn long_version() -> &'static str {
    concat!(
        env!("JIMAKU_VERSION"),
        "\nBuilt: ",
        env!("BUILD_DATE"),
        "\nCommit: ",
        env!("GIT_HASH")
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "jimaku-cli",
    about = "Ruby annotation and search highlighting for subtitle text",
    version = env!("JIMAKU_VERSION"),
    long_version = long_version()
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Render one subtitle line (from --text or stdin) as ruby markup
    Render {
        /// Subtitle text with base[reading] annotations (stdin when omitted)
        #[arg(long)]
        text: Option<String>,
        /// Language hint (fallback: $JIMAKU_LANG or "ja")
        #[arg(long)]
        lang: Option<String>,
        /// Search query to highlight
        #[arg(long)]
        query: Option<String>,
        /// Output JSON result
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Render every line of a subtitle file
    File {
        /// Path to a subtitle text/SRT/VTT file
        #[arg(long)]
        path: PathBuf,
        /// Language hint (fallback: $JIMAKU_LANG or "ja")
        #[arg(long)]
        lang: Option<String>,
        /// Search query to highlight
        #[arg(long)]
        query: Option<String>,
        /// Force a text encoding label (e.g. shift_jis); sniffed otherwise
        #[arg(long)]
        encoding: Option<String>,
        /// Print only lines with a highlight
        #[arg(long, default_value_t = false)]
        matches_only: bool,
        /// Output JSON envelope
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Search subtitle files under a directory (no index; scans every file)
    Grep {
        /// Root directory
        #[arg(long)]
        root: PathBuf,
        /// Search query
        #[arg(long)]
        query: String,
        /// Language hint (fallback: $JIMAKU_LANG or "ja")
        #[arg(long)]
        lang: Option<String>,
        /// File extensions to scan
        #[arg(long, value_delimiter = ',', default_value = "txt,srt,vtt")]
        ext: Vec<String>,
        /// Maximum matching lines to report
        #[arg(long, default_value_t = 50)]
        max_results: usize,
        /// Output JSON envelope
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the normalized comparison form and its position map
    Normalize {
        /// Text to normalize (stdin when omitted)
        #[arg(long)]
        text: Option<String>,
        /// Language hint (fallback: $JIMAKU_LANG or "ja")
        #[arg(long)]
        lang: Option<String>,
        /// Treat the input as rendered ruby markup
        #[arg(long, default_value_t = false)]
        markup: bool,
    },
    /// Show how a base[reading] pair is split around okurigana
    Split {
        #[arg(long)]
        base: String,
        #[arg(long)]
        reading: String,
        /// Language hint (fallback: $JIMAKU_LANG or "ja")
        #[arg(long)]
        lang: Option<String>,
    },
}

/// 言語ヒント: 引数 > $JIMAKU_LANG > "ja"
pub(crate) fn resolve_lang(arg: Option<&str>) -> String {
    if let Some(l) = arg.filter(|l| !l.trim().is_empty()) {
        return l.to_string();
    }
    std::env::var("JIMAKU_LANG")
        .ok()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "ja".to_string())
}

pub(crate) fn text_or_stdin(text: Option<&str>) -> anyhow::Result<String> {
    if let Some(t) = text {
        return Ok(t.to_string());
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

/// Decode subtitle bytes: BOM first, then a forced label, then UTF-8, then
/// Shift_JIS (the usual legacy encoding for Japanese subtitle files).
pub(crate) fn decode_subtitle_bytes(bytes: &[u8], label: Option<&str>) -> String {
    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        return String::from_utf8_lossy(&bytes[3..]).to_string();
    }
    if bytes.len() >= 2 && bytes[..2] == [0xFE, 0xFF] {
        let (cow, _, _) = encoding_rs::UTF_16BE.decode(bytes);
        return cow.into_owned();
    }
    if bytes.len() >= 2 && bytes[..2] == [0xFF, 0xFE] {
        let (cow, _, _) = encoding_rs::UTF_16LE.decode(bytes);
        return cow.into_owned();
    }
    if let Some(enc) = label.and_then(|l| encoding_rs::Encoding::for_label(l.trim().as_bytes())) {
        let (cow, _, _) = enc.decode(bytes);
        return cow.into_owned();
    }
    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => {
            let (cow, _, _) = encoding_rs::SHIFT_JIS.decode(bytes);
            cow.into_owned()
        }
    }
}

/// SRT/VTT 形式か（拡張子で判定）
pub(crate) fn has_cues(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("srt") || e.eq_ignore_ascii_case("vtt"))
}

/// 空行、および SRT/VTT のキュー番号・タイムコード・ヘッダ行。
/// 平文ファイルでは数字だけの台詞も残す
pub(crate) fn is_cue_metadata(line: &str, cues: bool) -> bool {
    let t = line.trim();
    if t.is_empty() {
        return true;
    }
    cues && (t.contains("-->")
        || t == "WEBVTT"
        || t.starts_with("WEBVTT ")
        || t.chars().all(|c| c.is_ascii_digit()))
}

fn main() -> anyhow::Result<()> {
    jimaku_core::log::set_debug(std::env::var("JIMAKU_DEBUG").ok().as_deref() == Some("1"));
    let cli = Cli::parse();
    match &cli.command {
        Commands::Render { .. } => cmd_render::render(&cli.command),
        Commands::File { .. } => cmd_file::file(&cli.command),
        Commands::Grep { .. } => cmd_grep::grep(&cli.command),
        Commands::Normalize { text, lang, markup } => {
            cmd_render::normalize(text.as_deref(), lang.as_deref(), *markup)
        }
        Commands::Split { base, reading, lang } => cmd_render::split(base, reading, lang.as_deref()),
    }
}


mod cmd;
use cmd::{file as cmd_file, grep as cmd_grep, render as cmd_render};
