pub mod cache;
pub mod config;
pub mod error;
pub mod eval;
pub mod matching;

pub use config::Config;
pub use error::{EvalError, Result};
pub use matching::{
    date_equivalent, extract_amount, metric_max_over_ground_truths, normalize_answer,
    numeric_equivalent, text_exact_match, AnswerMatcher, MatchStrategy,
};
