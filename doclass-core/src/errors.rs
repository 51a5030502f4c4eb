use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

/// A single field value that could not be interpreted.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot parse {field} value {value:?}: {reason}")]
pub struct FieldParseError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl FieldParseError {
    pub fn new(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the classification pipeline. Every variant is fatal to
/// the batch; recoverable fetch failures never reach this type.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Malformed scalar field on an input row
    #[error("row {row}: {source}")]
    Parse {
        row: usize,
        #[source]
        source: FieldParseError,
    },

    /// Reconciled matrix does not carry exactly the model's columns
    #[error(
        "schema mismatch: {} missing column(s) {:?}, {} unexpected column(s) {:?}",
        .missing.len(),
        preview(.missing),
        .unexpected.len(),
        preview(.unexpected)
    )]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Model artifact missing or corrupt
    #[error("failed to load model artifact {}: {reason}", .path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    /// Input table is structurally unusable (missing header, bad width)
    #[error("invalid input table: {0}")]
    Input(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Internal defect; should be unreachable after reconciliation
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl ClassifierError {
    pub fn parse(row: usize, source: FieldParseError) -> Self {
        Self::Parse { row, source }
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

fn preview(names: &[String]) -> &[String] {
    &names[..names.len().min(10)]
}
