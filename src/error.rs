use thiserror::Error;

/// Main error type for QAEval
#[derive(Error, Debug)]
pub enum EvalError {
    /// A record reached scoring with no reference answers
    #[error("Empty ground truth for question: {question:?}")]
    EmptyGroundTruth { question: String },

    /// A record reached scoring with no ranked predictions
    #[error("Empty prediction list for question: {question:?}")]
    EmptyPredictions { question: String },

    /// A ranked prediction carried no answer phrasings
    #[error("Empty answer group in predictions for question: {question:?}")]
    EmptyAnswerGroup { question: String },

    /// Two inputs that must be aligned line-by-line are not
    #[error("Length mismatch: {left_name} has {left} records, {right_name} has {right}")]
    LengthMismatch {
        left_name: String,
        left: usize,
        right_name: String,
        right: usize,
    },

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON on a given line of a JSONL file
    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using EvalError
pub type Result<T> = std::result::Result<T, EvalError>;
