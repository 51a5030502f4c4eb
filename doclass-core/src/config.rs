use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_model_path() -> PathBuf {
    PathBuf::from("xgboost_model.json")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_workers() -> usize {
    8
}

fn default_user_agent() -> String {
    format!("doclass/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pre-trained XGBoost model (JSON format)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Link-context fetching behaviour
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// When false, no source pages are requested and link-context features are empty
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Size of the fetch worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// On-disk page cache; disabled when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Cached pages older than this are fetched again (no limit when unset)
    #[serde(default)]
    pub cache_max_age_hours: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_timeout_secs(),
            workers: default_workers(),
            user_agent: default_user_agent(),
            cache_dir: None,
            cache_max_age_hours: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: PipelineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {p}, using defaults: {e:#}");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.workers == 0 {
            bail!("fetch.workers must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be at least 1");
        }
        Ok(())
    }
}
