//! Shared test doubles: an in-memory page fetcher and a fixed classifier.

#![allow(dead_code)]

use doclass_core::classifier::Classifier;
use doclass_core::errors::Result;
use doclass_core::link_context::{FetchError, LinkContextFetcher, PageFetcher};
use doclass_core::storage::{NoOpStorage, PageStorage};
use doclass_core::{FeatureMatrix, FetchConfig, ModelSchema};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves canned pages; unknown URLs are 404, `timeouts` fail in transport.
#[derive(Clone, Default)]
pub struct StubFetcher {
    pages: HashMap<String, String>,
    timeouts: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_timeout(mut self, url: &str) -> Self {
        self.timeouts.push(url.to_string());
        self
    }

    /// Every URL requested so far, in request order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| *u == url).count()
    }
}

impl PageFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.timeouts.iter().any(|u| u == url) {
            return Err(FetchError::Transport("timed out reading response".to_string()));
        }
        self.pages.get(url).cloned().ok_or(FetchError::Status(404))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Same probability vector for every row.
pub struct FixedClassifier {
    pub schema: ModelSchema,
    pub probs: Vec<f32>,
}

impl FixedClassifier {
    /// `class` gets `confidence`, the rest share the remainder evenly
    pub fn favoring(columns: &[&str], class: usize, confidence: f32) -> Self {
        let rest = (1.0 - confidence) / 10.0;
        let mut probs = vec![rest; 11];
        probs[class] = confidence;
        Self {
            schema: ModelSchema::new(columns.iter().copied()).unwrap(),
            probs,
        }
    }
}

impl Classifier for FixedClassifier {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<Vec<f32>>> {
        Ok(vec![self.probs.clone(); matrix.n_rows()])
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub fn fetch_config(workers: usize) -> FetchConfig {
    FetchConfig {
        workers,
        ..FetchConfig::default()
    }
}

pub fn link_context(fetcher: StubFetcher, config: &FetchConfig) -> LinkContextFetcher {
    link_context_with_storage(fetcher, Box::new(NoOpStorage::new()), config)
}

pub fn link_context_with_storage(
    fetcher: StubFetcher,
    storage: Box<dyn PageStorage>,
    config: &FetchConfig,
) -> LinkContextFetcher {
    LinkContextFetcher::new(Box::new(fetcher), storage, config).unwrap()
}
