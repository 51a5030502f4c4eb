//! Classifier adapter
//!
//! A [`Classifier`] exposes the schema it was fit on and per-class
//! probabilities for a reconciled matrix. [`predict`] turns one probability
//! call into labelled predictions, so the chosen class and its confidence can
//! never disagree.

pub mod xgboost;

pub use xgboost::XGBoostModel;

use crate::errors::{ClassifierError, Result};
use crate::matrix::FeatureMatrix;
use crate::schema::ModelSchema;
use crate::types::{DocumentCategory, Prediction};

pub trait Classifier: Send + Sync {
    /// Columns the model expects, in the order it evaluates them
    fn schema(&self) -> &ModelSchema;

    /// One probability vector per row, indexed by class
    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<Vec<f32>>>;

    /// Classifier name for debugging/logging
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Label every row of a reconciled matrix.
///
/// `rows[i]` is the input row identity of matrix row `i`.
pub fn predict(
    classifier: &dyn Classifier,
    matrix: &FeatureMatrix,
    rows: &[usize],
) -> Result<Vec<Prediction>> {
    if rows.len() != matrix.n_rows() {
        return Err(ClassifierError::Invariant(format!(
            "{} row identities for {} matrix rows",
            rows.len(),
            matrix.n_rows()
        )));
    }

    let probabilities = classifier.predict_proba(matrix)?;
    if probabilities.len() != matrix.n_rows() {
        return Err(ClassifierError::Invariant(format!(
            "classifier returned {} probability vectors for {} rows",
            probabilities.len(),
            matrix.n_rows()
        )));
    }

    probabilities
        .iter()
        .zip(rows)
        .map(|(probs, &row)| {
            let (class, confidence) = arg_max(probs).ok_or_else(|| {
                ClassifierError::Invariant(format!("empty probability vector for row {row}"))
            })?;
            let label = DocumentCategory::from_index(class).ok_or_else(|| {
                ClassifierError::Invariant(format!(
                    "class index {class} outside the {} known categories",
                    DocumentCategory::ALL.len()
                ))
            })?;
            Ok(Prediction {
                row,
                label,
                confidence,
            })
        })
        .collect()
}

/// Index and value of the first maximum
fn arg_max(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}
