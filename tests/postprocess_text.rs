use scantext::config::Config;
use scantext::postprocess::{merge_pages, normalize_text};

#[test]
fn sanitizes_control_chars_but_keeps_whitespace() {
    let cfg = Config::default();
    let out = normalize_text(&cfg.postprocess, "Alpha\u{0002}Beta\nLine\tTabbed");

    assert!(!out.contains('\u{0002}'));
    assert!(out.contains("AlphaBeta"));
    assert!(out.contains('\n'));
    assert!(out.contains('\t'));
}

#[test]
fn normalizes_newlines_and_trailing_whitespace() {
    let cfg = Config::default();
    let out = normalize_text(&cfg.postprocess, "first   \r\nsecond\r\n");
    assert_eq!(out, "first\nsecond");
}

#[test]
fn normalization_can_be_disabled() {
    let mut cfg = Config::default();
    cfg.postprocess.normalize_newlines = false;
    cfg.postprocess.trim_trailing_whitespace = false;
    cfg.postprocess.control_chars_to_sanitize.clear();

    let raw = "as-is   \r\n";
    assert_eq!(normalize_text(&cfg.postprocess, raw), raw);
}

#[test]
fn merge_joins_pages_with_separator() {
    let merged = merge_pages(&["one".to_string(), "two".to_string()]);
    assert_eq!(merged, "one\n\n---\n\ntwo");
}
