use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// Import from doclass-core
use doclass_core::{DocumentPipeline, InputTable, PipelineConfig, Prediction, RunContext};

// Import CLI utilities
use doclass_cli::{logging, save_stages, ConfigOverrides};

#[derive(Parser)]
#[command(name = "doclass")]
#[command(about = "Classify downloaded PDFs from their filename, URL and linking pages")]
struct Args {
    /// Path to the CSV describing the downloaded PDFs
    pdfs_path: String,

    /// Where to write the input rows plus predicted category and confidence
    output_path: String,

    /// XGBoost JSON model (overrides config `model_path`)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Concurrent link-context fetches
    #[arg(long)]
    workers: Option<usize>,

    /// Per-request timeout for source pages
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Cache fetched source pages on disk (`--cache-dir=DIR`).
    /// Without a value, uses the platform cache directory
    #[arg(long, num_args = 0..=1, require_equals = true, value_name = "DIR")]
    cache_dir: Option<Option<PathBuf>>,

    /// Skip fetching source pages; link-context features stay empty
    #[arg(long)]
    no_link_context: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: features, candidate matrix, reconciled matrix and predictions
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            workers: self.workers,
            timeout_secs: self.timeout_secs,
            cache_dir: self.cache_dir.clone(),
            no_link_context: self.no_link_context,
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init("info");

    println!("🦀 doclass Document Classifier");

    if let Err(e) = run(&args) {
        eprintln!("❌ Classification failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if !Path::new(&args.pdfs_path).exists() {
        bail!("input table not found at: {}", args.pdfs_path);
    }

    let mut config = match &args.config {
        Some(config_path) => {
            let config = PipelineConfig::load_from_file(config_path)?;
            println!("📋 Loaded config from: {}", config_path);
            config
        }
        None => {
            println!("📋 Using default config");
            PipelineConfig::default()
        }
    };
    args.overrides().apply(&mut config);
    config.validate()?;
    tracing::debug!(?config, "Resolved configuration");

    let table = InputTable::read_path(Path::new(&args.pdfs_path))
        .with_context(|| format!("reading {}", args.pdfs_path))?;
    let records = table.documents()?;
    println!("📄 Loaded {} documents from {}", records.len(), args.pdfs_path);

    let pipeline = DocumentPipeline::from_config(&config)?;
    println!("🧠 Model: {}", config.model_path.display());
    if !config.fetch.enabled {
        println!("🔌 Link context disabled");
    } else if let Some(dir) = &config.fetch.cache_dir {
        println!("🗄️  Page cache: {}", dir.display());
    }

    let ctx = RunContext::new();
    let predictions = if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        let stages = pipeline.classify_batch_capture_stages(&records, &ctx)?;
        save_stages(&stages, Path::new(&args.stages_dir), &args.pdfs_path, &ctx)?;
        println!("✅ All stages dumped to: {}", args.stages_dir);
        stages.predictions
    } else {
        pipeline.classify_batch_with_profiling(&records, &ctx, args.profile)?
    };

    table.write_predictions_path(Path::new(&args.output_path), &predictions)?;
    println!("✅ Classified {} documents", predictions.len());
    print_label_counts(&predictions);
    println!("💾 Results saved to: {}", args.output_path);
    Ok(())
}

fn print_label_counts(predictions: &[Prediction]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for prediction in predictions {
        *counts.entry(prediction.label.label()).or_insert(0) += 1;
    }
    println!("📊 Categories:");
    for (label, count) in counts {
        println!("   - {label}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_cache_flag_before_positionals() {
        let args = Args::try_parse_from(["doclass", "--cache-dir", "in.csv", "out.csv"]).unwrap();
        assert_eq!(args.cache_dir, Some(None));
        assert_eq!(args.pdfs_path, "in.csv");
        assert_eq!(args.output_path, "out.csv");
    }

    #[test]
    fn test_cache_dir_value_needs_equals() {
        let args =
            Args::try_parse_from(["doclass", "--cache-dir=/tmp/pages", "in.csv", "out.csv"]).unwrap();
        assert_eq!(args.cache_dir, Some(Some(PathBuf::from("/tmp/pages"))));
        assert_eq!(args.pdfs_path, "in.csv");

        let args = Args::try_parse_from(["doclass", "in.csv", "out.csv", "--cache-dir"]).unwrap();
        assert_eq!(args.cache_dir, Some(None));

        let args = Args::try_parse_from(["doclass", "in.csv", "out.csv"]).unwrap();
        assert_eq!(args.cache_dir, None);
    }

    #[test]
    fn test_flags_map_to_overrides() {
        let args = Args::try_parse_from([
            "doclass",
            "--workers",
            "3",
            "--no-link-context",
            "--model",
            "m.json",
            "in.csv",
            "out.csv",
        ])
        .unwrap();
        let overrides = args.overrides();
        assert_eq!(overrides.workers, Some(3));
        assert_eq!(overrides.model, Some(PathBuf::from("m.json")));
        assert!(overrides.no_link_context);
        assert_eq!(overrides.cache_dir, None);
    }

    #[test]
    fn test_unreadable_config_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("in.csv");
        std::fs::write(&input, "url,file_name,source,file_size,number_of_pages\n").unwrap();
        let config = temp_dir.path().join("broken.yaml");
        std::fs::write(&config, "fetch: [not, a, map]\n").unwrap();

        let args = Args::try_parse_from([
            "doclass".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            input.display().to_string(),
            temp_dir.path().join("out.csv").display().to_string(),
        ])
        .unwrap();
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yaml"));
        assert!(!temp_dir.path().join("out.csv").exists());
    }
}
