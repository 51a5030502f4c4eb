use doclass_core::PipelineConfig;
use std::path::PathBuf;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub model: Option<PathBuf>,
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    /// `Some(None)` asks for the platform cache directory
    pub cache_dir: Option<Option<PathBuf>>,
    pub no_link_context: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(workers) = self.workers {
            config.fetch.workers = workers;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.fetch.timeout_secs = timeout_secs;
        }
        match &self.cache_dir {
            Some(Some(dir)) => config.fetch.cache_dir = Some(dir.clone()),
            Some(None) => config.fetch.cache_dir = default_cache_dir(),
            None => {}
        }
        if self.no_link_context {
            config.fetch.enabled = false;
        }
    }
}

/// `<platform cache dir>/doclass`, e.g. `~/.cache/doclass` on Linux
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("doclass"))
}
