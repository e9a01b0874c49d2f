//! `init_tracing` writes to the configured file (one global subscriber per test binary).

use telegram_bot::init_tracing;
use tempfile::TempDir;

#[test]
fn init_tracing_creates_log_file_and_writes_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("bot.log");
    let path_str = path.to_str().unwrap();

    init_tracing(path_str).unwrap();
    tracing::info!(chat_id = 42, "logger smoke event");

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("logger smoke event"));
    assert!(content.contains("chat_id=42"));
    assert!(!content.contains('\u{1b}'));

    assert!(init_tracing(path_str).is_err());
}
