//! Evaluation framework: QA records, Exact Match at k, run comparison and JSONL I/O.

pub mod compare;
pub mod jsonl;
pub mod metrics;
pub mod record;

pub use compare::{compare_runs, metric_deltas, read_hits, MetricDeltas, RunComparison};
pub use metrics::{
    format_percentage, hit_at_k, score_dataset, score_record, scored_line, DatasetMetrics,
    RecordScores, ScoringMode, DEFAULT_CUTOFFS,
};
pub use record::{PredictedAnswer, QaRecord, RetrievalResult};
