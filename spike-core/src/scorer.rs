//! Decode the simulator's result matrix into predicted labels and score them.

use core::fmt;

use crate::error::{CoreError, CoreResult};
use crate::tensor::Label;

/// Rows x columns of numbers read back from the simulator.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl ResultMatrix {
    /// All rows must have the same, non-zero, number of columns.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> CoreResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(CoreError::invalid_shape("result matrix has no values"));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != cols) {
            return Err(CoreError::ShapeMismatch {
                what: "result columns",
                expected: cols,
                actual: row.len(),
            });
        }
        let n = rows.len();
        let values = rows.into_iter().flatten().collect();
        Ok(Self { rows: n, cols, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }
}

/// How one result row turns into a predicted label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DecodeRule {
    /// `Direct` for single-column matrices, `ArgMax` otherwise.
    #[default]
    Auto,
    /// Index of the largest column; the first index wins ties.
    ArgMax,
    /// The single column holds the label itself and must equal it exactly.
    Direct,
}

impl DecodeRule {
    fn resolve(self, cols: usize) -> CoreResult<Self> {
        match self {
            DecodeRule::Auto if cols == 1 => Ok(DecodeRule::Direct),
            DecodeRule::Auto => Ok(DecodeRule::ArgMax),
            DecodeRule::Direct if cols != 1 => Err(CoreError::ShapeMismatch {
                what: "result columns for direct decoding",
                expected: 1,
                actual: cols,
            }),
            rule => Ok(rule),
        }
    }
}

/// Fraction of samples whose decoded result matches the label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccuracyScore {
    pub correct: usize,
    pub total: usize,
}

impl AccuracyScore {
    pub fn value(&self) -> f64 {
        self.correct as f64 / self.total as f64
    }
}

impl fmt::Display for AccuracyScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}% ({}/{})", self.value() * 100.0, self.correct, self.total)
    }
}

/// Index of the maximal value; earlier indices win ties.
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate().skip(1) {
        if v > row[best] {
            best = i;
        }
    }
    best
}

fn is_match(row: &[f64], label: Label, rule: DecodeRule) -> bool {
    match rule {
        DecodeRule::ArgMax => argmax(row) == label as usize,
        // Auto has been resolved before this point
        DecodeRule::Direct | DecodeRule::Auto => row[0] == label as f64,
    }
}

/// Score `results` against `labels`, one result row per label.
pub fn score(results: &ResultMatrix, labels: &[Label], rule: DecodeRule) -> CoreResult<AccuracyScore> {
    if labels.is_empty() {
        return Err(CoreError::invalid_shape("cannot score an empty label vector"));
    }
    if results.rows() != labels.len() {
        return Err(CoreError::ShapeMismatch {
            what: "result rows",
            expected: labels.len(),
            actual: results.rows(),
        });
    }
    let rule = rule.resolve(results.cols())?;

    let correct = labels
        .iter()
        .enumerate()
        .filter(|&(i, &label)| is_match(results.row(i), label, rule))
        .count();

    Ok(AccuracyScore { correct, total: labels.len() })
}
