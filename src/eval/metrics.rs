//! Exact Match at k: per-record hits at cutoffs and dataset-level hit rates.

use crate::error::{EvalError, Result};
use crate::eval::{read_hits, PredictedAnswer, QaRecord, RetrievalResult};
use crate::matching::{metric_max_over_ground_truths, text_exact_match, AnswerMatcher};
use rayon::prelude::*;
use serde_json::{json, Map, Value};

/// Cutoffs reported when none are configured.
pub const DEFAULT_CUTOFFS: [usize; 4] = [1, 5, 10, 50];

/// How a prediction is compared with a record's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringMode {
    /// Text exact match against the reference answers only (`em_k`).
    Strict,
    /// Full equivalence orchestrator against answers and aliases (`em_n_k`).
    Normalized,
}

impl ScoringMode {
    pub const ALL: [ScoringMode; 2] = [ScoringMode::Strict, ScoringMode::Normalized];

    /// Output field carrying the hit at cutoff `k`.
    pub fn field_name(self, k: usize) -> String {
        match self {
            ScoringMode::Strict => format!("em_{}", k),
            ScoringMode::Normalized => format!("em_n_{}", k),
        }
    }
}

/// 1-based rank of the first of the top `limit` predictions that matches a
/// ground truth, or `None` if none of them does.
pub fn first_hit_rank(
    matcher: &AnswerMatcher,
    mode: ScoringMode,
    record: &QaRecord,
    predictions: &[PredictedAnswer],
    limit: usize,
) -> Result<Option<usize>> {
    let ground_truths = record.ground_truths(mode);
    if ground_truths.is_empty() {
        return Err(EvalError::EmptyGroundTruth {
            question: record.question.clone(),
        });
    }
    if predictions.is_empty() {
        return Err(EvalError::EmptyPredictions {
            question: record.question.clone(),
        });
    }

    for (rank, predicted) in predictions.iter().take(limit).enumerate() {
        let hit = match mode {
            ScoringMode::Strict => metric_max_over_ground_truths(
                |p, g, _| text_exact_match(p, g),
                &predicted.answer,
                &ground_truths,
                &record.question,
            )?,
            ScoringMode::Normalized => metric_max_over_ground_truths(
                |p, g, q| matcher.is_match(p, g, q),
                &predicted.answer,
                &ground_truths,
                &record.question,
            )?,
        };
        if hit {
            return Ok(Some(rank + 1));
        }
    }
    Ok(None)
}

/// Whether any of the top `k` predictions matches a ground truth.
pub fn hit_at_k(
    matcher: &AnswerMatcher,
    mode: ScoringMode,
    record: &QaRecord,
    predictions: &[PredictedAnswer],
    k: usize,
) -> Result<bool> {
    Ok(first_hit_rank(matcher, mode, record, predictions, k)?.is_some())
}

/// Hits of one record at every cutoff, in both scoring modes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordScores {
    pub cutoffs: Vec<usize>,
    pub strict: Vec<bool>,
    pub normalized: Vec<bool>,
    /// Score of the top-ranked prediction.
    pub top_score: Option<f64>,
}

impl RecordScores {
    /// Hit at cutoff `k`, if `k` is one of the scored cutoffs.
    pub fn hit(&self, mode: ScoringMode, k: usize) -> Option<bool> {
        let idx = self.cutoffs.iter().position(|&c| c == k)?;
        let hits = match mode {
            ScoringMode::Strict => &self.strict,
            ScoringMode::Normalized => &self.normalized,
        };
        hits.get(idx).copied()
    }

    /// `em_k` / `em_n_k` output fields as 0 or 1.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for (&k, (&strict, &normalized)) in self
            .cutoffs
            .iter()
            .zip(self.strict.iter().zip(&self.normalized))
        {
            fields.insert(ScoringMode::Strict.field_name(k), json!(u8::from(strict)));
            fields.insert(ScoringMode::Normalized.field_name(k), json!(u8::from(normalized)));
        }
        fields
    }
}

/// Score one record at the given cutoffs.
///
/// Each mode walks the ranking once up to the largest cutoff; the hit at k is
/// then `first_hit_rank <= k`, so hits never decrease as k grows. Cutoffs may
/// come in any order.
pub fn score_record(
    matcher: &AnswerMatcher,
    record: &QaRecord,
    result: &RetrievalResult,
    cutoffs: &[usize],
) -> Result<RecordScores> {
    let limit = cutoffs.iter().copied().max().unwrap_or(0);
    let hits_for = |mode| -> Result<Vec<bool>> {
        let rank = first_hit_rank(matcher, mode, record, &result.retrieved_qas, limit)?;
        Ok(cutoffs
            .iter()
            .map(|&k| rank.is_some_and(|r| r <= k))
            .collect())
    };

    Ok(RecordScores {
        cutoffs: cutoffs.to_vec(),
        strict: hits_for(ScoringMode::Strict)?,
        normalized: hits_for(ScoringMode::Normalized)?,
        top_score: result.top_score(),
    })
}

/// Score every record in parallel. `records` and `results` are aligned by index.
pub fn score_dataset(
    matcher: &AnswerMatcher,
    records: &[QaRecord],
    results: &[RetrievalResult],
    cutoffs: &[usize],
) -> Result<Vec<RecordScores>> {
    if records.len() != results.len() {
        return Err(EvalError::LengthMismatch {
            left_name: "dataset".to_string(),
            left: records.len(),
            right_name: "results".to_string(),
            right: results.len(),
        });
    }

    let scores = records
        .par_iter()
        .zip(results.par_iter())
        .map(|(record, result)| {
            let scores = score_record(matcher, record, result, cutoffs)?;
            if !scores.normalized.last().copied().unwrap_or(false) {
                log::debug!("miss: {:?}", record.question);
            }
            Ok(scores)
        })
        .collect::<Result<Vec<_>>>()?;

    matcher.log_cache_stats();
    Ok(scores)
}

/// Output line for one record: the input record, the ranked predictions, the
/// top retrieval score and the hit fields.
pub fn scored_line(record: &QaRecord, result: &RetrievalResult, scores: &RecordScores) -> Value {
    let mut line = record.extra.clone();
    line.insert("question".to_string(), json!(record.question));
    line.insert("answer".to_string(), json!(record.answer));
    line.insert("answer_alias".to_string(), json!(record.answer_alias));
    line.insert("retrieved_qas".to_string(), json!(result.retrieved_qas));
    if let Some(score) = scores.top_score {
        line.insert("retrieved_qa_score".to_string(), json!(score));
    }
    line.extend(scores.to_fields());
    Value::Object(line)
}

/// Percentage of records hit at each cutoff, per scoring mode.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMetrics {
    pub name: String,
    pub records: usize,
    pub cutoffs: Vec<usize>,
    pub strict: Vec<f64>,
    pub normalized: Vec<f64>,
}

impl DatasetMetrics {
    /// Fold per-record scores (all scored at the same cutoffs) into hit rates.
    pub fn from_scores(name: impl Into<String>, scores: &[RecordScores]) -> Result<Self> {
        let first = scores
            .first()
            .ok_or_else(|| EvalError::InvalidInput("no records to aggregate".to_string()))?;
        let cutoffs = first.cutoffs.clone();
        if scores.iter().any(|s| s.cutoffs != cutoffs) {
            return Err(EvalError::InvalidInput(
                "records were scored at different cutoffs".to_string(),
            ));
        }
        if let Some(i) = scores
            .iter()
            .position(|s| s.strict.len() != cutoffs.len() || s.normalized.len() != cutoffs.len())
        {
            return Err(EvalError::InvalidInput(format!(
                "record {} has {} cutoffs but {} strict and {} normalized hits",
                i + 1,
                cutoffs.len(),
                scores[i].strict.len(),
                scores[i].normalized.len()
            )));
        }

        let strict = (0..cutoffs.len())
            .map(|i| hit_rate(scores, |s| s.strict.get(i).copied().unwrap_or(false)))
            .collect();
        let normalized = (0..cutoffs.len())
            .map(|i| hit_rate(scores, |s| s.normalized.get(i).copied().unwrap_or(false)))
            .collect();

        Ok(Self {
            name: name.into(),
            records: scores.len(),
            cutoffs,
            strict,
            normalized,
        })
    }

    /// Rebuild hit rates from scored output lines (`em_k` / `em_n_k` fields).
    pub fn from_scored_lines(name: impl Into<String>, lines: &[Value], cutoffs: &[usize]) -> Result<Self> {
        if lines.is_empty() {
            return Err(EvalError::InvalidInput("no records to aggregate".to_string()));
        }
        let rates = |mode: ScoringMode| -> Result<Vec<f64>> {
            cutoffs
                .iter()
                .map(|&k| -> Result<f64> {
                    let hits = read_hits(lines, mode, k)?;
                    let count = hits.iter().filter(|&&hit| hit).count();
                    Ok(count as f64 / lines.len() as f64 * 100.0)
                })
                .collect()
        };

        Ok(Self {
            name: name.into(),
            records: lines.len(),
            cutoffs: cutoffs.to_vec(),
            strict: rates(ScoringMode::Strict)?,
            normalized: rates(ScoringMode::Normalized)?,
        })
    }

    /// Hit rate (0-100) at cutoff `k`.
    pub fn percentage(&self, mode: ScoringMode, k: usize) -> Option<f64> {
        let idx = self.cutoffs.iter().position(|&c| c == k)?;
        match mode {
            ScoringMode::Strict => self.strict.get(idx).copied(),
            ScoringMode::Normalized => self.normalized.get(idx).copied(),
        }
    }

    /// `{"name": .., "em_1": "xx.xx", .., "em_n_1": "xx.xx", ..}`
    pub fn to_summary(&self) -> Value {
        let mut summary = Map::new();
        summary.insert("name".to_string(), json!(self.name));
        for mode in ScoringMode::ALL {
            for &k in &self.cutoffs {
                let pct = self.percentage(mode, k).unwrap_or(0.0);
                summary.insert(mode.field_name(k), json!(format_percentage(pct)));
            }
        }
        Value::Object(summary)
    }
}

fn hit_rate(scores: &[RecordScores], hit: impl Fn(&RecordScores) -> bool) -> f64 {
    let count = scores.iter().filter(|s| hit(s)).count();
    count as f64 / scores.len() as f64 * 100.0
}

/// Two-decimal rendering used in reports.
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(groups: &[&[&str]]) -> RetrievalResult {
        RetrievalResult::new(
            groups
                .iter()
                .enumerate()
                .map(|(i, g)| PredictedAnswer::new(g.iter().copied(), 1.0 - i as f64 * 0.1))
                .collect(),
        )
    }

    #[test]
    fn field_names() {
        assert_eq!(ScoringMode::Strict.field_name(5), "em_5");
        assert_eq!(ScoringMode::Normalized.field_name(50), "em_n_50");
    }

    #[test]
    fn first_hit_rank_finds_earliest_match() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("who", ["Paris"]);
        let preds = result(&[&["Lyon"], &["Nice"], &["paris"], &["Paris"]]).retrieved_qas;
        assert_eq!(
            first_hit_rank(&matcher, ScoringMode::Strict, &record, &preds, 10).unwrap(),
            Some(3)
        );
        assert_eq!(first_hit_rank(&matcher, ScoringMode::Strict, &record, &preds, 2).unwrap(), None);
    }

    #[test]
    fn hit_at_k_uses_whole_answer_group() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("who", ["Robert Zimmerman"]);
        let preds = result(&[&["Bob Dylan", "Robert Zimmerman"]]).retrieved_qas;
        assert!(hit_at_k(&matcher, ScoringMode::Strict, &record, &preds, 1).unwrap());
    }

    #[test]
    fn normalized_mode_uses_aliases_and_typed_matchers() {
        let matcher = AnswerMatcher::uncached();
        let mut record = QaRecord::new("when was it founded", ["December 2, 2021"]);
        let preds = result(&[&["2021"]]).retrieved_qas;
        // "2021" vs a full-date ground truth: prediction defaults to January 1
        assert!(!hit_at_k(&matcher, ScoringMode::Normalized, &record, &preds, 1).unwrap());

        record.answer_alias = vec!["2021".to_string()];
        assert!(hit_at_k(&matcher, ScoringMode::Normalized, &record, &preds, 1).unwrap());
        assert!(!hit_at_k(&matcher, ScoringMode::Strict, &record, &preds, 1).unwrap());
    }

    #[test]
    fn empty_inputs_are_errors() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("q", ["a"]);
        let err = hit_at_k(&matcher, ScoringMode::Strict, &record, &[], 1).unwrap_err();
        assert!(matches!(err, EvalError::EmptyPredictions { .. }));

        let empty_gt = QaRecord::new("q", Vec::<String>::new());
        let preds = result(&[&["a"]]).retrieved_qas;
        let err = hit_at_k(&matcher, ScoringMode::Normalized, &empty_gt, &preds, 1).unwrap_err();
        assert!(matches!(err, EvalError::EmptyGroundTruth { .. }));

        let empty_group = result(&[&[]]).retrieved_qas;
        let err = hit_at_k(&matcher, ScoringMode::Strict, &record, &empty_group, 1).unwrap_err();
        assert!(matches!(err, EvalError::EmptyAnswerGroup { .. }));
    }

    #[test]
    fn score_record_is_monotonic_in_k() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("how many moons does mars have", ["two"]);
        let three: &[&str] = &["three"];
        let mut groups = vec![three; 7];
        groups.push(&["2 moons"]);
        let res = result(&groups);

        let scores = score_record(&matcher, &record, &res, &DEFAULT_CUTOFFS).unwrap();
        assert_eq!(scores.normalized, vec![false, false, true, true]);
        assert_eq!(scores.strict, vec![false, false, false, false]);
        for hits in [&scores.strict, &scores.normalized] {
            assert!(hits.windows(2).all(|w| !w[0] || w[1]), "hits decreased: {:?}", hits);
        }
    }

    #[test]
    fn score_record_accepts_unsorted_cutoffs() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("who", ["Paris"]);
        let res = result(&[&["Lyon"], &["Paris"]]);
        let scores = score_record(&matcher, &record, &res, &[5, 1]).unwrap();
        assert_eq!(scores.strict, vec![true, false]);
        assert_eq!(scores.hit(ScoringMode::Strict, 5), Some(true));
        assert_eq!(scores.hit(ScoringMode::Normalized, 1), Some(false));
    }

    #[test]
    fn score_record_agrees_with_hit_at_k() {
        let matcher = AnswerMatcher::uncached();
        let record = QaRecord::new("when did it open", ["October 2021"]);
        let res = result(&[&["2020"], &["September 2021"], &["October 3, 2021"], &["x"], &["y"], &["October 2021"]]);
        let scores = score_record(&matcher, &record, &res, &DEFAULT_CUTOFFS).unwrap();
        for (i, &k) in DEFAULT_CUTOFFS.iter().enumerate() {
            for mode in ScoringMode::ALL {
                let expected = hit_at_k(&matcher, mode, &record, &res.retrieved_qas, k).unwrap();
                assert_eq!(scores.hit(mode, k), Some(expected));
                let hits = if mode == ScoringMode::Strict { &scores.strict } else { &scores.normalized };
                assert_eq!(hits[i], expected);
            }
        }
        assert_eq!(scores.hit(ScoringMode::Normalized, 1), Some(false));
        assert_eq!(scores.hit(ScoringMode::Normalized, 5), Some(true));
        assert_eq!(scores.hit(ScoringMode::Strict, 5), Some(false));
        assert_eq!(scores.hit(ScoringMode::Strict, 10), Some(true));
        assert_eq!(scores.hit(ScoringMode::Strict, 3), None);
    }

    #[test]
    fn to_fields_renders_zero_or_one() {
        let scores = RecordScores {
            cutoffs: vec![1, 5],
            strict: vec![false, true],
            normalized: vec![true, true],
            top_score: None,
        };
        let fields = scores.to_fields();
        assert_eq!(fields["em_1"], 0);
        assert_eq!(fields["em_5"], 1);
        assert_eq!(fields["em_n_1"], 1);
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn short_hit_vectors_do_not_panic() {
        let short = RecordScores {
            cutoffs: vec![1, 5],
            strict: vec![true],
            normalized: vec![],
            top_score: None,
        };
        let fields = short.to_fields();
        assert_eq!(fields.len(), 0);

        let err = DatasetMetrics::from_scores("x", &[short]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidInput(_)));
    }

    #[test]
    fn score_dataset_checks_alignment() {
        let matcher = AnswerMatcher::uncached();
        let records = vec![QaRecord::new("q", ["a"])];
        let err = score_dataset(&matcher, &records, &[], &DEFAULT_CUTOFFS).unwrap_err();
        assert!(matches!(err, EvalError::LengthMismatch { left: 1, right: 0, .. }));
    }

    #[test]
    fn score_dataset_preserves_order() {
        let matcher = AnswerMatcher::new(64, 64);
        let records: Vec<QaRecord> = (0..50).map(|i| QaRecord::new(format!("q{}", i), [format!("a{}", i)])).collect();
        let results: Vec<RetrievalResult> = (0..50)
            .map(|i| {
                let answer = if i % 2 == 0 { format!("a{}", i) } else { "wrong".to_string() };
                RetrievalResult::new(vec![PredictedAnswer::new([answer], 1.0)])
            })
            .collect();
        let scores = score_dataset(&matcher, &records, &results, &[1]).unwrap();
        for (i, s) in scores.iter().enumerate() {
            assert_eq!(s.strict[0], i % 2 == 0, "record {}", i);
        }
    }

    #[test]
    fn dataset_metrics_percentages() {
        let score = |strict: [bool; 2], normalized: [bool; 2]| RecordScores {
            cutoffs: vec![1, 5],
            strict: strict.to_vec(),
            normalized: normalized.to_vec(),
            top_score: Some(1.0),
        };
        let scores = vec![
            score([true, true], [true, true]),
            score([false, true], [false, true]),
            score([false, false], [true, true]),
        ];
        let metrics = DatasetMetrics::from_scores("baseline", &scores).unwrap();
        assert_eq!(metrics.records, 3);
        assert!((metrics.percentage(ScoringMode::Strict, 1).unwrap() - 100.0 / 3.0).abs() < 1e-9);
        assert!((metrics.percentage(ScoringMode::Strict, 5).unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.percentage(ScoringMode::Normalized, 5), Some(100.0));

        let summary = metrics.to_summary();
        assert_eq!(summary["name"], "baseline");
        assert_eq!(summary["em_1"], "33.33");
        assert_eq!(summary["em_5"], "66.67");
        assert_eq!(summary["em_n_1"], "66.67");
        assert_eq!(summary["em_n_5"], "100.00");
    }

    #[test]
    fn dataset_metrics_from_scored_lines() {
        let lines = vec![
            json!({"em_1": 1, "em_5": 1, "em_n_1": 1, "em_n_5": 1}),
            json!({"em_1": 0, "em_5": 1, "em_n_1": 1, "em_n_5": 1}),
            json!({"em_1": 0, "em_5": 0, "em_n_1": 0, "em_n_5": 1}),
            json!({"em_1": 0, "em_5": 0, "em_n_1": 0, "em_n_5": 0}),
        ];
        let metrics = DatasetMetrics::from_scored_lines("run", &lines, &[1, 5]).unwrap();
        assert_eq!(metrics.records, 4);
        assert_eq!(metrics.percentage(ScoringMode::Strict, 1), Some(25.0));
        assert_eq!(metrics.percentage(ScoringMode::Strict, 5), Some(50.0));
        assert_eq!(metrics.percentage(ScoringMode::Normalized, 5), Some(75.0));

        assert!(DatasetMetrics::from_scored_lines("run", &lines, &[10]).is_err());
        assert!(DatasetMetrics::from_scored_lines("run", &[], &[1]).is_err());
    }

    #[test]
    fn dataset_metrics_rejects_empty_and_mixed_cutoffs() {
        assert!(DatasetMetrics::from_scores("x", &[]).is_err());
        let a = RecordScores { cutoffs: vec![1], strict: vec![true], normalized: vec![true], top_score: None };
        let b = RecordScores { cutoffs: vec![5], ..a.clone() };
        assert!(DatasetMetrics::from_scores("x", &[a, b]).is_err());
    }

    #[test]
    fn scored_line_carries_record_and_fields() {
        let matcher = AnswerMatcher::uncached();
        let mut record = QaRecord::new("q", ["a"]);
        record.extra.insert("id".to_string(), json!(7));
        let res = result(&[&["a"]]);
        let scores = score_record(&matcher, &record, &res, &[1]).unwrap();
        let line = scored_line(&record, &res, &scores);
        assert_eq!(line["id"], 7);
        assert_eq!(line["question"], "q");
        assert_eq!(line["retrieved_qa_score"], 1.0);
        assert_eq!(line["em_1"], 1);
        assert_eq!(line["em_n_1"], 1);
        assert_eq!(line["retrieved_qas"][0]["answer"][0], "a");
    }

    #[test]
    fn format_percentage_two_decimals() {
        assert_eq!(format_percentage(100.0 / 3.0), "33.33");
        assert_eq!(format_percentage(0.0), "0.00");
    }
}
