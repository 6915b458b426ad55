use regex::Regex;
use std::sync::LazyLock;

// Word characters plus the CJK Unified Ideographs block.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\x{4e00}-\x{9fa5}]").expect("static regex"));

/// Flatten search snippets into one matchable blob.
///
/// The parts are serialized as a JSON array first (non-ASCII stays verbatim),
/// then everything that is not a word character or CJK ideograph is dropped.
pub fn normalize_snippets<S: AsRef<str>>(parts: &[S]) -> String {
    let parts: Vec<&str> = parts.iter().map(|p| p.as_ref()).collect();
    let blob = serde_json::to_string(&parts).unwrap_or_default();
    normalize_snippet_text(&blob)
}

/// Strip whitespace, punctuation and control characters.
pub fn normalize_snippet_text(text: &str) -> String {
    NON_WORD.replace_all(text, "").into_owned()
}

/// Page text keeps punctuation so multi-word variants and `\b` anchors still
/// work; only runs of whitespace are folded.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
