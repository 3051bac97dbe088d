use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Timestamp-derived record id. Monotonic enough for a single low-volume
/// process; collisions under burst load are an accepted limitation.
pub fn next_record_id() -> i64 {
    Utc::now().timestamp_millis()
}

/// Reduces a title to a filesystem-safe name: punctuation and whitespace
/// collapse to underscores. Two assessments with the same title sanitize to
/// the same name.
pub fn sanitize_title(title: &str) -> String {
    let replaced = NON_WORD.replace_all(title, "_");
    WHITESPACE.replace_all(&replaced, "_").trim().to_string()
}

/// Current time formatted for embedding in a file name (no `:` or `.`).
pub fn file_timestamp() -> String {
    Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_punctuation_and_spaces() {
        assert_eq!(sanitize_title("Rust 101: Basics!"), "Rust_101__Basics_");
        assert_eq!(sanitize_title("plain"), "plain");
        assert_eq!(sanitize_title("a  b"), "a_b");
    }

    #[test]
    fn sanitize_keeps_hyphens() {
        assert_eq!(sanitize_title("intro-course"), "intro-course");
    }

    #[test]
    fn file_timestamp_has_no_reserved_chars() {
        let ts = file_timestamp();
        assert!(!ts.contains(':'));
        assert!(!ts.contains('.'));
    }
}
