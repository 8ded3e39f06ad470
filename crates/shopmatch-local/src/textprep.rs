//! Minimal, deterministic text normalization helpers.
//!
//! Everything here is matching-only: output is never shown to users and never fed back
//! into links.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Conservative “scrub” used for matching keys.
///
/// - NFD + combining-mark removal + lowercase (č→c, š→s, ž→z, ć→c)
/// - letters that do not decompose are folded by hand (đ→d, ł→l, ø→o, ß→ss, æ→ae)
/// - non-alphanumeric characters become separators (collapsed to single spaces)
pub fn scrub(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        let folded: Option<&'static str> = match ch {
            'đ' | 'Đ' => Some("d"),
            'ł' | 'Ł' => Some("l"),
            'ø' | 'Ø' => Some("o"),
            'ß' => Some("ss"),
            'æ' | 'Æ' => Some("ae"),
            _ => None,
        };
        if let Some(f) = folded {
            out.push_str(f);
            last_space = false;
            continue;
        }
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Scrubbed whitespace tokens, in order (duplicates kept).
pub fn words(s: &str) -> Vec<String> {
    scrub(s).split_whitespace().map(str::to_string).collect()
}

/// Collapse runs of whitespace into single spaces and trim. Case is preserved.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
