use crate::cache::{PageCacheKey, PageCacheValue};
use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for caching fetched source pages
pub trait PageStorage: Send + Sync {
    fn get_page(&self, key: &PageCacheKey) -> Result<Option<PageCacheValue>>;
    fn store_page(&self, key: &PageCacheKey, value: &PageCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        // Ensure cache directory exists
        fs::create_dir_all(cache_dir.join("pages"))?;

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    fn page_path(&self, key: &PageCacheKey) -> PathBuf {
        self.cache_dir
            .join("pages")
            .join(format!("{}.json", key.to_cache_hash()))
    }
}

impl PageStorage for FileStorage {
    fn get_page(&self, key: &PageCacheKey) -> Result<Option<PageCacheValue>> {
        let path = self.page_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json_str = fs::read_to_string(path)?;
        let value: PageCacheValue = serde_json::from_str(&json_str)
            .map_err(|e| anyhow!("Failed to deserialize cached page: {}", e))?;
        // Hash collision, hand-edited entry or older writer
        if value.url != key.url || !value.is_current_version() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn store_page(&self, key: &PageCacheKey, value: &PageCacheValue) -> Result<()> {
        let path = self.page_path(key);
        let json_str = serde_json::to_string(value)
            .map_err(|e| anyhow!("Failed to serialize cached page: {}", e))?;
        // Readers never observe a partially written entry
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp, json_str)?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl PageStorage for NoOpStorage {
    fn get_page(&self, _key: &PageCacheKey) -> Result<Option<PageCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_page(&self, _key: &PageCacheKey, _value: &PageCacheValue) -> Result<()> {
        Ok(()) // No-op
    }
}
