//! QA records and ranked retrieval results as they appear in JSONL files.

use crate::error::{EvalError, Result};
use crate::matching::render_iso_date;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::metrics::ScoringMode;

/// One question with its reference answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    /// Reference answers, in the order the dataset lists them.
    pub answer: Vec<String>,
    /// Extra accepted surface forms (e.g. from entity linking), disjoint from `answer`.
    #[serde(default)]
    pub answer_alias: Vec<String>,
    /// Any other fields on the line, carried through to the scored output.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One ranked prediction: alternate phrasings of the same answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedAnswer {
    pub answer: Vec<String>,
    /// Retriever score; only the ranking order matters for scoring.
    #[serde(default)]
    pub score: f64,
    /// Question of the retrieved QA pair, if the retriever returns pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Retriever output for one dataset line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub retrieved_qas: Vec<PredictedAnswer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RetrievalResult {
    pub fn new(retrieved_qas: Vec<PredictedAnswer>) -> Self {
        Self {
            retrieved_qas,
            extra: Map::new(),
        }
    }

    /// Score of the top-ranked prediction.
    pub fn top_score(&self) -> Option<f64> {
        self.retrieved_qas.first().map(|p| p.score)
    }
}

impl PredictedAnswer {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>, score: f64) -> Self {
        Self {
            answer: answers.into_iter().map(Into::into).collect(),
            score,
            question: None,
        }
    }
}

/// Drop duplicates keeping the first occurrence of each string.
fn unique_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn trimmed_non_empty(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

impl QaRecord {
    pub fn new<S: Into<String>>(question: impl Into<String>, answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            question: question.into(),
            answer: answers.into_iter().map(Into::into).collect(),
            answer_alias: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Trim answers and aliases, drop empty ones and duplicates (first
    /// occurrence wins), and remove aliases that are also answers.
    ///
    /// Fails if no answer is left.
    pub fn normalize_answers(&mut self) -> Result<()> {
        self.answer = unique_in_order(trimmed_non_empty(&self.answer));
        if self.answer.is_empty() {
            return Err(EvalError::EmptyGroundTruth {
                question: self.question.clone(),
            });
        }

        let answers: HashSet<&str> = self.answer.iter().map(String::as_str).collect();
        let aliases: Vec<String> = trimmed_non_empty(&self.answer_alias)
            .filter(|alias| !answers.contains(alias.as_str()))
            .collect();
        self.answer_alias = unique_in_order(aliases);
        Ok(())
    }

    /// Make `original` the reference answers and move every other current
    /// answer (added by augmentation) to the alias list, preserving order.
    pub fn split_aliases(&mut self, original: &[String]) {
        let original_set: HashSet<&str> = original.iter().map(String::as_str).collect();
        let augmented = std::mem::take(&mut self.answer)
            .into_iter()
            .filter(|a| !original_set.contains(a.as_str()));
        let existing = std::mem::take(&mut self.answer_alias);
        self.answer_alias = unique_in_order(augmented.chain(existing));
        self.answer = original.to_vec();
    }

    /// Rewrite ISO-8601 answers and aliases ("2021-12-02T00:00:00Z") as
    /// written dates ("December 2, 2021") so the date matcher can read them.
    pub fn render_iso_dates(&mut self) {
        for answer in self.answer.iter_mut().chain(self.answer_alias.iter_mut()) {
            *answer = render_iso_date(answer);
        }
    }

    /// Ground truths a prediction is checked against under `mode`.
    pub fn ground_truths(&self, mode: ScoringMode) -> Vec<&str> {
        let answers = self.answer.iter().map(String::as_str);
        match mode {
            ScoringMode::Strict => answers.collect(),
            ScoringMode::Normalized => answers
                .chain(self.answer_alias.iter().map(String::as_str))
                .collect(),
        }
    }
}
