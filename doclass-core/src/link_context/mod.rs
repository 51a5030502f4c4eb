//! Link-context gathering
//!
//! For each document, visit the pages that claim to link to it, find the
//! elements whose `href` is exactly the document URL and collect the words
//! of their link text.
//!
//! ## Execution
//!
//! ```text
//! records ──► unique source pages ──► [worker pool: cache → fetch → parse] ──► per-page anchor tokens
//!                                                                                  │
//! per-document TokenSet ◄──────────────── union over the document's sources ◄──────┘
//! ```
//!
//! Each source page is requested once per batch, however many documents list
//! it, and parsed once for all of them. A failed page contributes nothing.

pub mod anchors;
pub mod fetcher;

pub use anchors::{anchor_tokens, link_text_tokens};
pub use fetcher::{FetchError, HttpFetcher, PageFetcher};

use crate::cache::{PageCacheKey, PageCacheValue};
use crate::config::FetchConfig;
use crate::context::RunContext;
use crate::storage::{FileStorage, NoOpStorage, PageStorage};
use crate::types::{DocumentRecord, TokenSet};
use anyhow::Result;
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct LinkContextFetcher {
    fetcher: Box<dyn PageFetcher>,
    storage: Box<dyn PageStorage>,
    pool: rayon::ThreadPool,
    enabled: bool,
    cache_max_age_hours: Option<u64>,
}

impl LinkContextFetcher {
    /// Create a fetcher with full dependency injection
    pub fn new(
        fetcher: Box<dyn PageFetcher>,
        storage: Box<dyn PageStorage>,
        config: &FetchConfig,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("doclass-fetch-{i}"))
            .build()?;

        Ok(Self {
            fetcher,
            storage,
            pool,
            enabled: config.enabled,
            cache_max_age_hours: config.cache_max_age_hours,
        })
    }

    /// HTTP fetcher plus on-disk cache when `cache_dir` is configured
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let storage: Box<dyn PageStorage> = match &config.cache_dir {
            Some(dir) => Box::new(FileStorage::new(dir)?),
            None => Box::new(NoOpStorage::new()),
        };
        Self::new(Box::new(HttpFetcher::from_config(config)), storage, config)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Link-context tokens for a single document.
    pub fn get_link_context(
        &self,
        document_url: &str,
        source_urls: &[String],
        ctx: &RunContext,
    ) -> TokenSet {
        self.gather(&[(document_url, source_urls)], ctx)
            .pop()
            .unwrap_or_default()
    }

    /// Link-context tokens for a batch, aligned with `records`.
    pub fn collect(&self, records: &[DocumentRecord], ctx: &RunContext) -> Vec<TokenSet> {
        let requests: Vec<(&str, &[String])> = records
            .iter()
            .map(|r| (r.url.as_str(), r.source_list.as_slice()))
            .collect();
        self.gather(&requests, ctx)
    }

    fn gather(&self, requests: &[(&str, &[String])], ctx: &RunContext) -> Vec<TokenSet> {
        if !self.enabled {
            return vec![TokenSet::new(); requests.len()];
        }

        // Source page → document URLs to look for on it
        let mut targets_by_page: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for (document_url, sources) in requests {
            for source in sources.iter() {
                targets_by_page
                    .entry(source.as_str())
                    .or_default()
                    .insert(document_url.to_string());
            }
        }

        let pages: Vec<(&str, BTreeSet<String>)> = targets_by_page.into_iter().collect();
        info!(
            "Gathering link context: {} documents, {} unique source pages using {} fetcher ({} workers)",
            requests.len(),
            pages.len(),
            self.fetcher.name(),
            self.pool.current_num_threads()
        );

        let found: HashMap<&str, BTreeMap<String, TokenSet>> = self.pool.install(|| {
            pages
                .par_iter()
                .filter_map(|(page_url, targets)| {
                    let html = self.load_page(page_url, ctx)?;
                    Some((*page_url, anchor_tokens(&html, targets)))
                })
                .collect()
        });

        requests
            .iter()
            .map(|(document_url, sources)| {
                let mut tokens = TokenSet::new();
                for source in sources.iter() {
                    if let Some(page_tokens) = found
                        .get(source.as_str())
                        .and_then(|by_target| by_target.get(*document_url))
                    {
                        tokens.extend(page_tokens.iter().cloned());
                    }
                }
                tokens
            })
            .collect()
    }

    /// Page body from cache or network; `None` when the source is unusable.
    fn load_page(&self, url: &str, ctx: &RunContext) -> Option<String> {
        let key = PageCacheKey::new(url);
        match self.storage.get_page(&key) {
            Ok(Some(cached)) if cached.is_fresh(self.cache_max_age_hours, Utc::now()) => {
                ctx.record_cache_hit();
                debug!(source = url, "Page cache hit");
                return Some(cached.body);
            }
            Ok(_) => {}
            Err(e) => warn!(source = url, "Ignoring unreadable page cache entry: {e:#}"),
        }

        ctx.record_request();
        let start = Instant::now();
        match self.fetcher.fetch(url) {
            Ok(body) => {
                ctx.record_fetched();
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!(source = url, bytes = body.len(), elapsed_ms, "Fetched source page");
                let value = PageCacheValue::new(url, body, elapsed_ms);
                if let Err(e) = self.storage.store_page(&key, &value) {
                    warn!(source = url, "Failed to cache page: {e:#}");
                }
                Some(value.body)
            }
            Err(e) => {
                ctx.record_failure();
                warn!(source = url, error = %e, "Skipping link-context source");
                None
            }
        }
    }
}
