use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const DOCLASS_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const FETCH_VERSION: &str = "1.0.0";
}

/// Page cache key (source URL → page body)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PageCacheKey {
    pub url: String,
    pub fetch_version: String,
}

impl PageCacheKey {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            fetch_version: versions::FETCH_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.url);
        hasher.update(&self.fetch_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached page body with fetch metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCacheValue {
    pub url: String,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub fetch_time_ms: u64,
    pub cache_version: String,
}

impl PageCacheValue {
    pub fn new(url: &str, body: String, fetch_time_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            body,
            fetched_at: Utc::now(),
            fetch_time_ms,
            cache_version: versions::DOCLASS_VERSION.to_string(),
        }
    }

    /// Written by this build of the cache format
    pub fn is_current_version(&self) -> bool {
        self.cache_version == versions::DOCLASS_VERSION
    }

    /// Whether the entry is still usable under an optional age limit
    pub fn is_fresh(&self, max_age_hours: Option<u64>, now: DateTime<Utc>) -> bool {
        match max_age_hours {
            Some(hours) => now - self.fetched_at <= Duration::hours(hours as i64),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hash_is_stable_and_url_specific() {
        let a = PageCacheKey::new("https://x.org/meetings");
        let b = PageCacheKey::new("https://x.org/meetings");
        let c = PageCacheKey::new("https://x.org/meetings/");
        assert_eq!(a.to_cache_hash(), b.to_cache_hash());
        assert_ne!(a.to_cache_hash(), c.to_cache_hash());
        assert_eq!(a.to_cache_hash().len(), 64);
    }

    #[test]
    fn test_freshness() {
        let mut value = PageCacheValue::new("https://x.org", "<html/>".to_string(), 12);
        let now = Utc::now();
        assert!(value.is_fresh(None, now));
        assert!(value.is_fresh(Some(1), now));

        value.fetched_at = now - Duration::hours(5);
        assert!(!value.is_fresh(Some(1), now));
        assert!(value.is_fresh(Some(24), now));
        assert!(value.is_fresh(None, now));
    }
}
