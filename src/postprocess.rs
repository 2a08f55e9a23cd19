use crate::config::Postprocess;
use unicode_normalization::UnicodeNormalization;

/// Normalize one page of recognized text before it is committed to the
/// result set.
pub fn normalize_text(cfg: &Postprocess, text: &str) -> String {
    let mut out = text.to_string();

    if cfg.normalize_newlines {
        out = out.replace("\r\n", "\n");
    }

    if cfg.normalize_unicode {
        out = out.nfkc().collect::<String>();
    }

    out = sanitize_control_chars(&out, &cfg.control_chars_to_sanitize);

    if cfg.trim_trailing_whitespace {
        out = out
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
    }

    out
}

/// Join per-page texts into the plain-text transcript artifact.
pub fn merge_pages(parts: &[String]) -> String {
    parts.join("\n\n---\n\n")
}

fn sanitize_control_chars(s: &str, codes: &[u8]) -> String {
    if codes.is_empty() {
        return s.to_string();
    }

    s.chars()
        .filter(|&ch| {
            // Structural whitespace controls stay, or documents flatten.
            if matches!(ch, '\n' | '\r' | '\t') {
                return true;
            }
            match u8::try_from(u32::from(ch)) {
                Ok(code) => !codes.contains(&code),
                Err(_) => true,
            }
        })
        .collect()
}
