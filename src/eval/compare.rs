//! Hits and misses of one scored run relative to a baseline run.

use crate::error::{EvalError, Result};
use crate::eval::{format_percentage, DatasetMetrics, ScoringMode};
use serde_json::{json, Map, Value};

/// Records (1-based ids) that changed outcome between a baseline and an experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunComparison {
    /// Hit by the experiment, missed by the baseline.
    pub hits: Vec<usize>,
    /// Missed by the experiment, hit by the baseline.
    pub misses: Vec<usize>,
    pub both: usize,
    pub neither: usize,
}

impl RunComparison {
    /// Experiment hits gained minus hits lost.
    pub fn net_gain(&self) -> i64 {
        self.hits.len() as i64 - self.misses.len() as i64
    }
}

/// Compare per-record outcomes of two runs over the same dataset.
pub fn compare_runs(experiment: &[bool], baseline: &[bool]) -> Result<RunComparison> {
    if experiment.len() != baseline.len() {
        return Err(EvalError::LengthMismatch {
            left_name: "experiment".to_string(),
            left: experiment.len(),
            right_name: "baseline".to_string(),
            right: baseline.len(),
        });
    }

    let mut comparison = RunComparison::default();
    for (i, (&exp, &base)) in experiment.iter().zip(baseline).enumerate() {
        match (exp, base) {
            (true, false) => comparison.hits.push(i + 1),
            (false, true) => comparison.misses.push(i + 1),
            (true, true) => comparison.both += 1,
            (false, false) => comparison.neither += 1,
        }
    }
    Ok(comparison)
}

/// Read the `em_k` / `em_n_k` field of each scored output line.
pub fn read_hits(lines: &[Value], mode: ScoringMode, k: usize) -> Result<Vec<bool>> {
    let field = mode.field_name(k);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| match line.get(&field).and_then(Value::as_u64) {
            Some(hit) => Ok(hit != 0),
            None => Err(EvalError::InvalidInput(format!(
                "line {} has no numeric {} field",
                i + 1,
                field
            ))),
        })
        .collect()
}

/// Experiment hit rate minus baseline hit rate at each cutoff, in percentage points.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDeltas {
    pub cutoffs: Vec<usize>,
    pub strict: Vec<f64>,
    pub normalized: Vec<f64>,
}

impl MetricDeltas {
    pub fn delta(&self, mode: ScoringMode, k: usize) -> Option<f64> {
        let idx = self.cutoffs.iter().position(|&c| c == k)?;
        match mode {
            ScoringMode::Strict => self.strict.get(idx).copied(),
            ScoringMode::Normalized => self.normalized.get(idx).copied(),
        }
    }

    /// `em_k_delta` / `em_n_k_delta` fields, two decimals.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for mode in ScoringMode::ALL {
            for &k in &self.cutoffs {
                if let Some(delta) = self.delta(mode, k) {
                    fields.insert(format!("{}_delta", mode.field_name(k)), json!(format_percentage(delta)));
                }
            }
        }
        fields
    }
}

/// Per-cutoff difference between two runs scored at the same cutoffs.
pub fn metric_deltas(experiment: &DatasetMetrics, baseline: &DatasetMetrics) -> Result<MetricDeltas> {
    if experiment.cutoffs != baseline.cutoffs {
        return Err(EvalError::InvalidInput(format!(
            "{} was scored at cutoffs {:?} but {} at {:?}",
            experiment.name, experiment.cutoffs, baseline.name, baseline.cutoffs
        )));
    }
    let diff = |exp: &[f64], base: &[f64]| -> Vec<f64> { exp.iter().zip(base).map(|(e, b)| e - b).collect() };

    Ok(MetricDeltas {
        cutoffs: experiment.cutoffs.clone(),
        strict: diff(&experiment.strict, &baseline.strict),
        normalized: diff(&experiment.normalized, &baseline.normalized),
    })
}
