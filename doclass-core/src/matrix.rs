use crate::errors::{ClassifierError, Result};
use crate::types::{DocumentFeatures, FeatureKey, ScalarFeature, TokenFamily, TokenSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Named `f32` columns over a fixed number of rows, stored column-major.
///
/// Row `i` is the `i`-th document of the batch it was built from. Column
/// names are unique; values are never NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "MatrixParts", try_from = "MatrixParts")]
pub struct FeatureMatrix {
    n_rows: usize,
    columns: Vec<String>,
    values: Vec<Vec<f32>>,
    index: HashMap<String, usize>,
}

/// Serialized form; the lookup index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct MatrixParts {
    n_rows: usize,
    columns: Vec<String>,
    values: Vec<Vec<f32>>,
}

impl From<FeatureMatrix> for MatrixParts {
    fn from(matrix: FeatureMatrix) -> Self {
        Self {
            n_rows: matrix.n_rows,
            columns: matrix.columns,
            values: matrix.values,
        }
    }
}

impl TryFrom<MatrixParts> for FeatureMatrix {
    type Error = ClassifierError;

    fn try_from(parts: MatrixParts) -> Result<Self> {
        if parts.columns.len() != parts.values.len() {
            return Err(ClassifierError::Invariant(format!(
                "{} column names for {} value columns",
                parts.columns.len(),
                parts.values.len()
            )));
        }
        let mut matrix = FeatureMatrix::new(parts.n_rows);
        for (name, values) in parts.columns.into_iter().zip(parts.values) {
            matrix.push_column(name, values)?;
        }
        Ok(matrix)
    }
}

impl PartialEq for FeatureMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.n_rows == other.n_rows && self.columns == other.columns && self.values == other.values
    }
}

impl FeatureMatrix {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f32>) -> Result<()> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(ClassifierError::Invariant(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.n_rows
            )));
        }
        if values.iter().any(|v| v.is_nan()) {
            return Err(ClassifierError::Invariant(format!("column '{name}' contains NaN")));
        }
        if self.index.contains_key(&name) {
            return Err(ClassifierError::Invariant(format!("duplicate column '{name}'")));
        }
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(name);
        self.values.push(values);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.position(name).map(|i| self.values[i].as_slice())
    }

    pub fn get(&self, row: usize, name: &str) -> Option<f32> {
        self.column(name).and_then(|values| values.get(row).copied())
    }

    /// Values of one row in column order
    pub fn row(&self, row: usize) -> Option<Vec<f32>> {
        (row < self.n_rows).then(|| self.values.iter().map(|column| column[row]).collect())
    }

    /// Consume the matrix, yielding `(name, values)` pairs in column order
    pub fn into_columns(self) -> impl Iterator<Item = (String, Vec<f32>)> {
        self.columns.into_iter().zip(self.values)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Expand token families into indicator columns and append the scalars.
///
/// Per family, one column per distinct token in the batch (sorted), named by
/// the family prefix plus the token; cell is 1 when the document has the
/// token, else 0. The three scalar columns follow.
pub fn build_feature_matrix(features: &[DocumentFeatures]) -> Result<FeatureMatrix> {
    let n_rows = features.len();
    let empty = TokenSet::new();
    let mut keys: Vec<(FeatureKey, Vec<f32>)> = Vec::new();

    for family in TokenFamily::ALL {
        let vocabulary: BTreeSet<&String> = features
            .iter()
            .filter_map(|doc| doc.family(family))
            .flatten()
            .collect();

        for token in vocabulary {
            let values = features
                .iter()
                .map(|doc| {
                    let present = doc.family(family).unwrap_or(&empty).contains(token);
                    if present {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            keys.push((FeatureKey::token(family, token.as_str()), values));
        }
    }

    for scalar in ScalarFeature::ALL {
        let values = features.iter().map(|doc| doc.scalar(scalar)).collect();
        keys.push((FeatureKey::Scalar(scalar), values));
    }

    let mut matrix = FeatureMatrix::new(n_rows);
    for (key, values) in keys {
        matrix.push_column(key.column_name(), values)?;
    }

    tracing::debug!(
        "Built feature matrix: {} rows x {} columns",
        matrix.n_rows(),
        matrix.n_cols()
    );
    Ok(matrix)
}
