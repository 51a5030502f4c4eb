//! Aligning a batch's feature matrix with the columns a model was fit on.
//!
//! A small batch rarely sees the full training vocabulary, and it usually
//! sees tokens the model never did. Reconciliation fabricates all-zero
//! columns for the former, drops the latter and imposes the model's canonical
//! column order. Models evaluate columns by position, so the order is part of
//! the contract.

use crate::errors::{ClassifierError, Result};
use crate::matrix::FeatureMatrix;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Column names a model expects, in canonical (byte-wise lexicographic) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    columns: Vec<String>,
}

impl ModelSchema {
    /// Build from any ordering of names. Empty or duplicated schemas are invalid.
    pub fn new<I, S>(names: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let total = names.len();
        let unique: BTreeSet<String> = names.into_iter().collect();

        if unique.is_empty() {
            return Err("model declares no feature names".to_string());
        }
        if unique.len() != total {
            return Err(format!(
                "model declares {} duplicate feature name(s)",
                total - unique.len()
            ));
        }

        Ok(Self {
            columns: unique.into_iter().collect(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns
            .binary_search_by(|c| c.as_str().cmp(name))
            .is_ok()
    }

    /// Whether `matrix` already has exactly this schema's columns in order
    pub fn matches(&self, matrix: &FeatureMatrix) -> bool {
        matrix.column_names() == self.columns.as_slice()
    }
}

/// Reshape `matrix` to exactly `schema`.
///
/// Postcondition: the result's column list equals `schema.columns()`, every
/// fabricated column is all zeros and row count is unchanged. Reconciling an
/// already reconciled matrix returns it unchanged.
pub fn reconcile(matrix: FeatureMatrix, schema: &ModelSchema) -> Result<FeatureMatrix> {
    if schema.matches(&matrix) {
        return Ok(matrix);
    }

    let n_rows = matrix.n_rows();
    let candidate: HashSet<&str> = matrix.column_names().iter().map(String::as_str).collect();
    let missing = schema
        .columns()
        .iter()
        .filter(|c| !candidate.contains(c.as_str()))
        .count();
    let dropped = matrix
        .column_names()
        .iter()
        .filter(|c| !schema.contains(c))
        .count();

    let mut available: HashMap<String, Vec<f32>> = matrix
        .into_columns()
        .filter(|(name, _)| schema.contains(name))
        .collect();

    let mut reconciled = FeatureMatrix::new(n_rows);
    for name in schema.columns() {
        let values = available
            .remove(name)
            .unwrap_or_else(|| vec![0.0; n_rows]);
        reconciled.push_column(name.clone(), values)?;
    }

    verify(&reconciled, schema)?;

    info!(
        "Reconciled feature matrix to model schema: {} columns ({} filled with zeros, {} dropped)",
        reconciled.n_cols(),
        missing,
        dropped
    );
    Ok(reconciled)
}

/// Fail unless `matrix` carries exactly the schema's columns, in order.
pub fn verify(matrix: &FeatureMatrix, schema: &ModelSchema) -> Result<()> {
    if schema.matches(matrix) {
        return Ok(());
    }

    let present: HashSet<&str> = matrix.column_names().iter().map(String::as_str).collect();
    let missing: Vec<String> = schema
        .columns()
        .iter()
        .filter(|c| !present.contains(c.as_str()))
        .cloned()
        .collect();
    let unexpected: Vec<String> = matrix
        .column_names()
        .iter()
        .filter(|c| !schema.contains(c))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        return Err(ClassifierError::Invariant(
            "matrix has the model's columns but not in canonical order".to_string(),
        ));
    }
    Err(ClassifierError::SchemaMismatch {
        missing,
        unexpected,
    })
}
