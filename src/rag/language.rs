//! Answer language resolution.

use crate::source::VideoMetadata;

const LANGUAGE_NAMES: [(&str, &str); 5] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("tr", "Turkish"),
];

/// Human-readable name for a language code; unknown codes are returned as is.
pub fn language_name(code: &str) -> &str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Pick the answer language: explicit override, then the first ingested
/// video's language, then `default`.
pub fn resolve_language(override_language: Option<&str>, videos: &[VideoMetadata], default: &str) -> String {
    override_language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or_else(|| videos.first().map(|v| v.language.as_str()))
        .unwrap_or(default)
        .to_string()
}
