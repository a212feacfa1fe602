//! Quantity answers: "about 2,700", "five times", "twenty-two".

use super::number_words::words_to_digits;

/// Extract the quantity written in `text`.
///
/// Spelled-out numbers are rewritten as digits, then every character that is
/// not a digit or `.` is dropped and the rest parsed as a float. Returns `None`
/// when nothing parseable remains. Several numbers in one string run together
/// ("5 times in 2 years" -> 52).
pub fn extract_amount(text: &str) -> Option<f64> {
    let digits: String = words_to_digits(text)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// True if both answers carry the same amount.
pub fn numeric_equivalent(prediction: &str, ground_truth: &str) -> bool {
    amounts_equal(extract_amount(prediction), extract_amount(ground_truth))
}

pub(crate) fn amounts_equal(prediction: Option<f64>, ground_truth: Option<f64>) -> bool {
    match (prediction, ground_truth) {
        (Some(p), Some(g)) => p == g,
        _ => false,
    }
}
