// doclass Core Library
//
// Classifies downloaded documents from their metadata: filename, URL, the
// pages linking to them, size and page count. Main interface for turning an
// input table into category predictions with a pre-trained model.

pub mod types;
pub mod errors;
pub mod tokenizer;
pub mod records;
pub mod config;
pub mod cache;
pub mod storage;
pub mod context;
pub mod link_context;
pub mod features;
pub mod matrix;
pub mod schema;
pub mod classifier;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use errors::{ClassifierError, FieldParseError};
pub use classifier::{Classifier, XGBoostModel};
pub use config::{FetchConfig, PipelineConfig};
pub use context::{FetchStats, RunContext};
pub use link_context::{LinkContextFetcher, PageFetcher};
pub use matrix::FeatureMatrix;
pub use processor::{DocumentPipeline, PipelineStages};
pub use records::InputTable;
pub use schema::ModelSchema;
