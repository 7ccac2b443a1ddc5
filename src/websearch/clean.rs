//! Normalization of scraped text.
//!
//! Markup and entities are already handled by the HTML parser; this only
//! tidies the resulting plain text.

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s\-.,!?()&:;/]").expect("valid character class"))
}

/// Tidy a title or snippet.
///
/// Anything outside letters, digits, whitespace and `-.,!?()&:;/` is
/// dropped, then whitespace is collapsed.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = disallowed_re().replace_all(text, "");
    let text = whitespace_re().replace_all(&text, " ");
    text.trim().to_string()
}
