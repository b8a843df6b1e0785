use std::sync::OnceLock;

static DEBUG: OnceLock<bool> = OnceLock::new();

/// 診断出力の有効/無効を設定（最初の呼び出しのみ有効）
pub fn set_debug(on: bool) { let _ = DEBUG.set(on); }

pub fn debug_enabled() -> bool { DEBUG.get().copied().unwrap_or(false) }

pub(crate) fn log(msg: &str) {
    if !debug_enabled() { return; }
    eprintln!("[jimaku-core] {}", msg);
}
