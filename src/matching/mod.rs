//! Answer equivalence: typed matchers (text, date, numeric) and the
//! orchestrator that routes a prediction / ground-truth pair through them.

pub mod date;
pub mod number_words;
pub mod numeric;
pub mod text;

pub use date::{date_equivalent, render_iso_date, DateFormat};
pub use numeric::{extract_amount, numeric_equivalent};
pub use text::{normalize_answer, text_exact_match};

use crate::cache::MemoCache;
use crate::config::CacheConfig;
use crate::error::{EvalError, Result};

/// Comparison rule applied to one prediction / ground-truth pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    TextExact,
    DateEquivalent,
    NumericEquivalent,
}

impl MatchStrategy {
    /// Strategies to try for `question`, in order. Text is always first;
    /// numeric matching only applies to "how many" / "how much" questions.
    pub fn for_question(question: &str) -> &'static [MatchStrategy] {
        const GENERAL: &[MatchStrategy] = &[MatchStrategy::TextExact, MatchStrategy::DateEquivalent];
        const QUANTITY: &[MatchStrategy] = &[
            MatchStrategy::TextExact,
            MatchStrategy::DateEquivalent,
            MatchStrategy::NumericEquivalent,
        ];
        if asks_for_quantity(question) {
            QUANTITY
        } else {
            GENERAL
        }
    }

    /// Apply this strategy without memoization.
    pub fn matches(self, prediction: &str, ground_truth: &str) -> bool {
        match self {
            MatchStrategy::TextExact => text_exact_match(prediction, ground_truth),
            MatchStrategy::DateEquivalent => date_equivalent(prediction, ground_truth),
            MatchStrategy::NumericEquivalent => numeric_equivalent(prediction, ground_truth),
        }
    }
}

/// True for questions asking for a quantity ("how many ...", "how much ...").
pub fn asks_for_quantity(question: &str) -> bool {
    let question = question.to_lowercase();
    question.starts_with("how many ") || question.starts_with("how much ")
}

/// Equivalence orchestrator with injected memo tables for the date and
/// amount matchers. `Sync`: one matcher can be shared by all scoring workers.
pub struct AnswerMatcher {
    dates: Option<MemoCache<(String, String), bool>>,
    amounts: Option<MemoCache<String, Option<f64>>>,
}

impl AnswerMatcher {
    /// Create a matcher; a capacity of 0 disables that cache.
    pub fn new(date_capacity: usize, amount_capacity: usize) -> Self {
        Self {
            dates: (date_capacity > 0).then(|| MemoCache::new(date_capacity)),
            amounts: (amount_capacity > 0).then(|| MemoCache::new(amount_capacity)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.date_capacity, config.amount_capacity)
    }

    /// Matcher that recomputes everything.
    pub fn uncached() -> Self {
        Self::new(0, 0)
    }

    pub fn date_equivalent(&self, prediction: &str, ground_truth: &str) -> bool {
        match &self.dates {
            Some(cache) => cache.get_or_insert_with(
                (prediction.to_string(), ground_truth.to_string()),
                || date_equivalent(prediction, ground_truth),
            ),
            None => date_equivalent(prediction, ground_truth),
        }
    }

    pub fn extract_amount(&self, text: &str) -> Option<f64> {
        match &self.amounts {
            Some(cache) => cache.get_or_insert_with(text.to_string(), || extract_amount(text)),
            None => extract_amount(text),
        }
    }

    pub fn numeric_equivalent(&self, prediction: &str, ground_truth: &str) -> bool {
        numeric::amounts_equal(self.extract_amount(prediction), self.extract_amount(ground_truth))
    }

    /// Apply one strategy, going through the memo tables.
    pub fn matches_with(&self, strategy: MatchStrategy, prediction: &str, ground_truth: &str) -> bool {
        match strategy {
            MatchStrategy::TextExact => text_exact_match(prediction, ground_truth),
            MatchStrategy::DateEquivalent => self.date_equivalent(prediction, ground_truth),
            MatchStrategy::NumericEquivalent => self.numeric_equivalent(prediction, ground_truth),
        }
    }

    /// True if any strategy selected for `question` accepts the pair.
    pub fn is_match(&self, prediction: &str, ground_truth: &str, question: &str) -> bool {
        MatchStrategy::for_question(question)
            .iter()
            .any(|&strategy| self.matches_with(strategy, prediction, ground_truth))
    }

    /// Log memo table hit rates at debug level.
    pub fn log_cache_stats(&self) {
        if let Some(cache) = &self.dates {
            let (hits, misses) = cache.stats();
            log::debug!("date cache: {} entries, {} hits, {} misses", cache.len(), hits, misses);
        }
        if let Some(cache) = &self.amounts {
            let (hits, misses) = cache.stats();
            log::debug!("amount cache: {} entries, {} hits, {} misses", cache.len(), hits, misses);
        }
    }
}

/// True if `match_fn` accepts at least one (prediction, ground truth) pair.
///
/// `predictions` holds the alternate phrasings of one predicted answer. Both
/// lists must be non-empty: an empty one is reported as an error rather than
/// a silent non-match.
pub fn metric_max_over_ground_truths<P, G>(
    match_fn: impl Fn(&str, &str, &str) -> bool,
    predictions: &[P],
    ground_truths: &[G],
    question: &str,
) -> Result<bool>
where
    P: AsRef<str>,
    G: AsRef<str>,
{
    if ground_truths.is_empty() {
        return Err(EvalError::EmptyGroundTruth {
            question: question.to_string(),
        });
    }
    if predictions.is_empty() {
        return Err(EvalError::EmptyAnswerGroup {
            question: question.to_string(),
        });
    }
    Ok(predictions.iter().any(|prediction| {
        ground_truths
            .iter()
            .any(|gt| match_fn(prediction.as_ref(), gt.as_ref(), question))
    }))
}
