use anyhow::Result;
use doclass_core::{PipelineStages, RunContext};
use std::fs;
use std::path::{Path, PathBuf};

/// Write each captured stage plus a `summary.json` into `output_dir`.
/// Returns the written paths in stage order.
pub fn save_stages(
    stages: &PipelineStages,
    output_dir: &Path,
    input: &str,
    ctx: &RunContext,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    // Stage 1: per-document features
    let features_path = output_dir.join("stage1_features.json");
    fs::write(&features_path, serde_json::to_string_pretty(&stages.features)?)?;
    println!("  💾 {} ({} documents)", features_path.display(), stages.features.len());
    written.push(features_path);

    // Stage 2: candidate matrix
    let matrix_path = output_dir.join("stage2_matrix.json");
    fs::write(&matrix_path, serde_json::to_string_pretty(&stages.matrix)?)?;
    println!("  💾 {} ({} columns)", matrix_path.display(), stages.matrix.n_cols());
    written.push(matrix_path);

    // Stage 3: model-shaped matrix
    let reconciled_path = output_dir.join("stage3_reconciled.json");
    fs::write(&reconciled_path, serde_json::to_string_pretty(&stages.reconciled)?)?;
    println!("  💾 {} ({} columns)", reconciled_path.display(), stages.reconciled.n_cols());
    written.push(reconciled_path);

    // Stage 4: predictions
    let predictions_path = output_dir.join("stage4_predictions.json");
    fs::write(&predictions_path, serde_json::to_string_pretty(&stages.predictions)?)?;
    println!("  💾 {} ({} predictions)", predictions_path.display(), stages.predictions.len());
    written.push(predictions_path);

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input_table": input,
        "run_id": ctx.run_id.to_string(),
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "fetch_stats": stages.fetch_stats,
        "stage_counts": {
            "documents": stages.features.len(),
            "candidate_columns": stages.matrix.n_cols(),
            "model_columns": stages.reconciled.n_cols(),
            "predictions": stages.predictions.len(),
        }
    });
    let summary_path = output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path.display());
    written.push(summary_path);

    Ok(written)
}
