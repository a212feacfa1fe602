//! Free-text answer canonicalization and exact match.

use regex::Regex;
use std::sync::LazyLock;

/// Article joined to the next word by punctuation ("the-thing", "(the/thing)").
/// Must run before punctuation removal, which would otherwise fuse it into "thething".
/// A lone `a` followed by `.` or `'` is left alone so "A.C." and "A's" keep their letter.
static JOINED_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s[:punct:]])(?:(?:an|the)[[:punct:]]+|a[[:punct:]&&[^.']]+)(\w)")
        .expect("Invalid regex pattern")
});

static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:a|an|the)\b").expect("Invalid regex pattern"));

/// Canonicalize an answer: lowercase, drop the articles `a`/`an`/`the` and all
/// ASCII punctuation, collapse whitespace runs to single spaces and trim.
///
/// Idempotent: `normalize_answer(&normalize_answer(s)) == normalize_answer(s)`.
pub fn normalize_answer(text: &str) -> String {
    let lowered = text.to_lowercase();
    let unjoined = JOINED_ARTICLE.replace_all(&lowered, "${1} ${2}");
    let without_punct: String = unjoined
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let without_articles = ARTICLE.replace_all(&without_punct, " ");
    without_articles.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if both answers normalize to the same string.
pub fn text_exact_match(prediction: &str, ground_truth: &str) -> bool {
    normalize_answer(prediction) == normalize_answer(ground_truth)
}
