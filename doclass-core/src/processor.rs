use crate::classifier::{self, Classifier, XGBoostModel};
use crate::config::PipelineConfig;
use crate::context::{FetchStats, RunContext};
use crate::features::FeatureExtractor;
use crate::link_context::LinkContextFetcher;
use crate::matrix::{build_feature_matrix, FeatureMatrix};
use crate::schema::reconcile;
use crate::types::{DocumentFeatures, DocumentRecord, Prediction};
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::info;

/// Captured intermediate outputs from each pipeline stage
/// Used for diagnostics: lets you inspect/compare each boundary
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStages {
    pub features: Vec<DocumentFeatures>,
    pub matrix: FeatureMatrix,
    pub reconciled: FeatureMatrix,
    pub predictions: Vec<Prediction>,
    pub fetch_stats: FetchStats,
}

/// Collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        tracing::debug!("{step_name}: {}ms", elapsed.as_millis());
        self.timings.push((step_name.to_string(), elapsed));
        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let total_secs = total.as_secs_f64().max(f64::EPSILON);

        for (step, duration) in &self.timings {
            println!(
                "   {:.<35} {}ms ({:.1}%)",
                step,
                duration.as_millis(),
                duration.as_secs_f64() / total_secs * 100.0
            );
        }
        println!("   {:.<35} {}ms", "Total", total.as_millis());
    }
}

/// Records in, one prediction per record out.
pub struct DocumentPipeline {
    extractor: FeatureExtractor,
    classifier: Box<dyn Classifier>,
}

impl DocumentPipeline {
    /// Create a pipeline with full dependency injection
    pub fn new_with_dependencies(
        link_context: LinkContextFetcher,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        Self {
            extractor: FeatureExtractor::new(link_context),
            classifier,
        }
    }

    /// XGBoost model from `model_path`, HTTP link context per `fetch`
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let model = XGBoostModel::load(&config.model_path)?;
        let link_context = LinkContextFetcher::from_config(&config.fetch)
            .context("setting up link-context fetcher")?;
        Ok(Self::new_with_dependencies(link_context, Box::new(model)))
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Classify a batch. Predictions are in input order.
    pub fn classify_batch(
        &self,
        records: &[DocumentRecord],
        ctx: &RunContext,
    ) -> Result<Vec<Prediction>> {
        self.classify_batch_with_profiling(records, ctx, false)
    }

    pub fn classify_batch_with_profiling(
        &self,
        records: &[DocumentRecord],
        ctx: &RunContext,
        enable_profiling: bool,
    ) -> Result<Vec<Prediction>> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let stages = self.run(records, ctx, &mut profiler)?;
        profiler.print_summary();
        Ok(stages.predictions)
    }

    /// Classify a batch and keep every intermediate output
    pub fn classify_batch_capture_stages(
        &self,
        records: &[DocumentRecord],
        ctx: &RunContext,
    ) -> Result<PipelineStages> {
        let stages = self.run(records, ctx, &mut StepProfiler::new(false))?;
        println!(
            "📋 Stages captured: {} feature rows, {} candidate columns, {} model columns, {} predictions",
            stages.features.len(),
            stages.matrix.n_cols(),
            stages.reconciled.n_cols(),
            stages.predictions.len()
        );
        Ok(stages)
    }

    fn run(
        &self,
        records: &[DocumentRecord],
        ctx: &RunContext,
        profiler: &mut StepProfiler,
    ) -> Result<PipelineStages> {
        let start = Instant::now();
        info!(
            "Run {}: classifying {} documents with {} ({} model columns)",
            ctx.run_id,
            records.len(),
            self.classifier.name(),
            self.classifier.schema().len()
        );

        let features = profiler.time_step("1. Feature Extraction", || {
            self.extractor.extract(records, ctx)
        })?;

        let matrix = profiler.time_step("2. Feature Matrix", || build_feature_matrix(&features))?;

        let reconciled = profiler.time_step("3. Schema Reconciliation", || {
            reconcile(matrix.clone(), self.classifier.schema())
        })?;

        let rows: Vec<usize> = features.iter().map(|f| f.row).collect();
        let predictions = profiler.time_step("4. Prediction", || {
            classifier::predict(self.classifier.as_ref(), &reconciled, &rows)
        })?;

        let fetch_stats = ctx.fetch_stats();
        info!(
            "Run {} finished in {}ms: {} predictions; pages requested {}, fetched {}, failed {}, cache hits {}",
            ctx.run_id,
            start.elapsed().as_millis(),
            predictions.len(),
            fetch_stats.pages_requested,
            fetch_stats.pages_fetched,
            fetch_stats.pages_failed,
            fetch_stats.cache_hits
        );

        Ok(PipelineStages {
            features,
            matrix,
            reconciled,
            predictions,
            fetch_stats,
        })
    }
}
